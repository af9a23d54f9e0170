// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Wave scheduling: groups of vertices that can run side by side.

use alloc::vec::Vec;
use core::fmt;
use core::hash::Hash;

use crate::adjacency::{Adjacency, VertexId, predecessor_counts};
use crate::cycle::{Cycle, CycleError, CycleFormatter, find_cycle};
use crate::graph::MultiGraph;

/// Partitions every vertex of `graph` into ordered waves.
///
/// Wave `0` holds the vertices with no predecessors. A vertex joins wave `i`
/// once its last predecessor was committed in wave `i - 1`, so wave `i` is
/// exactly the set of vertices whose longest incoming dependency chain has `i`
/// edges. Vertices unlocked while a wave is being drained wait in a separate
/// buffer until that wave is committed, so no wave contains both ends of an
/// edge.
///
/// Within a wave, vertices appear in the order they were unlocked (the first
/// wave in enumeration order). Parallel edges count once.
///
/// The waves are only a scheduling hint: members of one wave have no ordering
/// constraint between them, which says nothing about whether the work they
/// stand for is safe to run concurrently.
///
/// # Errors
///
/// Returns one [`Cycle`] among the vertices that were never committed. There is
/// no way to relax a cycle here; see [`sort_ids_with`](crate::sort_ids_with)
/// for that.
///
/// # Example
///
/// ```
/// use understory_order::{MultiGraph, schedule_ids};
///
/// let mut graph = MultiGraph::<char, ()>::new();
/// let a = graph.add_vertex('a');
/// let b = graph.add_vertex('b');
/// let c = graph.add_vertex('c');
/// graph.add_edge(&'a', &'c', ()).unwrap();
/// graph.add_edge(&'b', &'c', ()).unwrap();
///
/// assert_eq!(schedule_ids(&graph).unwrap(), vec![vec![a, b], vec![c]]);
/// ```
pub fn schedule_ids<A: Adjacency>(graph: &A) -> Result<Vec<Vec<VertexId>>, Cycle> {
    let mut remaining = predecessor_counts(graph);
    let mut wave: Vec<VertexId> = graph
        .vertex_ids()
        .filter(|v| remaining[v.index()] == 0)
        .collect();
    let mut waves = Vec::new();
    let mut committed = 0;

    while !wave.is_empty() {
        let mut unlocked = Vec::new();
        for &vertex in &wave {
            for target in graph.outgoing(vertex) {
                let left = &mut remaining[target.index()];
                *left -= 1;
                if *left == 0 {
                    unlocked.push(target);
                }
            }
        }
        committed += wave.len();
        waves.push(core::mem::replace(&mut wave, unlocked));
    }

    if committed == graph.vertex_count() {
        return Ok(waves);
    }

    let cycle = find_cycle(graph, |v| remaining[v.index()] > 0, |_, _| false);
    #[cfg(feature = "tracing")]
    tracing::debug!(
        committed,
        vertices = graph.vertex_count(),
        cycle_len = cycle.vertex_count(),
        "batch schedule stalled on a dependency cycle"
    );
    Err(cycle)
}

/// Builder that schedules a [`MultiGraph`] into parallel waves.
///
/// Cycles always fail; only the failure message can be customized, with
/// [`format_cycle_with`](Self::format_cycle_with).
///
/// # Example
///
/// ```
/// use understory_order::{BatchScheduler, MultiGraph};
///
/// let mut graph = MultiGraph::<&str, &str>::new();
/// graph.add_vertices(["schema", "users", "orders", "grants"]);
/// graph.add_edge(&"schema", &"users", "contains").unwrap();
/// graph.add_edge(&"schema", &"orders", "contains").unwrap();
/// graph.add_edge(&"users", &"grants", "grant target").unwrap();
///
/// let waves = BatchScheduler::new(&graph).schedule().unwrap();
/// assert_eq!(
///     waves,
///     vec![vec![&"schema"], vec![&"users", &"orders"], vec![&"grants"]],
/// );
/// ```
pub struct BatchScheduler<'g, 's, V, E> {
    graph: &'g MultiGraph<V, E>,
    format: Option<&'s CycleFormatter<'s, 'g, V, E>>,
}

impl<V, E> fmt::Debug for BatchScheduler<'_, '_, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchScheduler")
            .field("vertices", &self.graph.vertex_count())
            .field("formats_cycle", &self.format.is_some())
            .finish_non_exhaustive()
    }
}

impl<'g, 's, V, E> BatchScheduler<'g, 's, V, E>
where
    V: Eq + Hash,
{
    /// Creates a scheduler over `graph` with the default cycle message.
    #[must_use]
    pub fn new(graph: &'g MultiGraph<V, E>) -> Self {
        Self {
            graph,
            format: None,
        }
    }

    /// Uses `format` to render the cycle message on failure.
    #[must_use]
    pub fn format_cycle_with(mut self, format: &'s CycleFormatter<'s, 'g, V, E>) -> Self {
        self.format = Some(format);
        self
    }

    /// Returns the waves, earliest first.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError`] describing one cycle if the graph is cyclic.
    pub fn schedule(self) -> Result<Vec<Vec<&'g V>>, CycleError<'g, V, E>> {
        let graph = self.graph;
        match schedule_ids(graph) {
            Ok(waves) => Ok(waves
                .into_iter()
                .map(|wave| wave.into_iter().map(|id| graph.value(id)).collect())
                .collect()),
            Err(cycle) => Err(CycleError::new(graph, cycle, self.format)),
        }
    }
}
