// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Order: dependency ordering for partially-ordered work.
//!
//! This crate computes safe execution orders for sets of interdependent
//! operations: schema migration steps, build tasks, or any work items where
//! some must happen before others. It is made of:
//!
//! - **Multigraph** ([`MultiGraph`]): vertices plus labeled edges, several per
//!   ordered pair, each carrying a caller payload that explains the dependency.
//! - **Adjacency** ([`Adjacency`], [`VertexId`]): the read-only, handle-based
//!   view the algorithms consume. Any store can implement it.
//! - **Topological sort** ([`TopologicalSorter`], [`sort_ids`],
//!   [`sort_ids_with`]): one linear order, with an optional policy that breaks
//!   "soft" relations to escape cycles.
//! - **Batch scheduling** ([`BatchScheduler`], [`schedule_ids`]): ordered waves
//!   of mutually independent vertices, for parallel execution.
//! - **Cycle diagnostics** ([`Cycle`], [`CycleError`], [`CycleStep`]): one
//!   concrete cycle, with the edges along it, when no order exists.
//!
//! Results are all-or-nothing: either every vertex is ordered, or the call
//! fails with full cycle context. No partial order is ever returned.
//!
//! ## Quick Start
//!
//! ```rust
//! use understory_order::MultiGraph;
//!
//! let mut graph = MultiGraph::<&str, &str>::new();
//! graph.add_vertices(["a", "b", "c", "d"]);
//!
//! // An edge `from -> to` means `from` must come first.
//! graph.add_edge(&"a", &"b", "b reads a").unwrap();
//! graph.add_edge(&"a", &"c", "c reads a").unwrap();
//! graph.add_edge(&"b", &"d", "d reads b").unwrap();
//! graph.add_edge(&"c", &"d", "d reads c").unwrap();
//!
//! assert_eq!(graph.sort().unwrap(), vec![&"a", &"b", &"c", &"d"]);
//! assert_eq!(
//!     graph.schedule().unwrap(),
//!     vec![vec![&"a"], vec![&"b", &"c"], vec![&"d"]],
//! );
//! ```
//!
//! ## Cycles
//!
//! ```rust
//! use understory_order::{MultiGraph, TopologicalSorter};
//!
//! let mut graph = MultiGraph::<&str, &str>::new();
//! graph.add_vertices(["users", "teams"]);
//! graph.add_edge(&"users", &"teams", "teams.owner -> users").unwrap();
//! graph.add_edge(&"teams", &"users", "users.team -> teams (nullable)").unwrap();
//!
//! let err = graph.sort().unwrap_err();
//! assert_eq!(err.to_string(), "dependency cycle: users -> teams -> users");
//! assert_eq!(err.steps()[1].edges, &["users.team -> teams (nullable)"]);
//!
//! // Nullable references can be filled in later, so they may be broken.
//! let mut nullable = |_: &&str, _: &&str, edges: &[&str]| {
//!     edges.iter().all(|e| e.ends_with("(nullable)"))
//! };
//! let order = TopologicalSorter::new(&graph)
//!     .break_edges_with(&mut nullable)
//!     .sort()
//!     .unwrap();
//! assert_eq!(order, vec![&"users", &"teams"]);
//!
//! // Batch scheduling never relaxes a cycle.
//! assert!(graph.schedule().is_err());
//! ```
//!
//! ## Determinism
//!
//! Vertices are enumerated in registration order. Both algorithms seed and
//! break ties in that order, so repeated calls on an unmodified graph return
//! identical results.
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.
//!
//! ## Features
//!
//! - `tracing`: emits `tracing` debug events when a relation is broken and
//!   when a sort or schedule stops on a cycle. Off by default.

#![no_std]

extern crate alloc;

mod adjacency;
mod arena;
mod batch;
mod cycle;
mod graph;
mod topo;

pub use adjacency::{Adjacency, VertexId};
pub use batch::{BatchScheduler, schedule_ids};
pub use cycle::{Cycle, CycleError, CycleFormatter, CycleStep};
pub use graph::{Endpoint, MultiGraph, UnknownVertex};
pub use topo::{EdgeBreaker, TopologicalSorter, sort_ids, sort_ids_with};
