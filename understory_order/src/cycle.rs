// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cycle reconstruction and the error reported when ordering is impossible.
//!
//! Both [`sort_ids`](crate::sort_ids) and [`schedule_ids`](crate::schedule_ids)
//! stop with a set of vertices that can never be placed. This module picks
//! **one** concrete cycle among them for reporting. It is a valid simple cycle,
//! but not necessarily the shortest one reachable from the starting vertex.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::hash::Hash;

use crate::adjacency::{Adjacency, VertexId};
use crate::graph::MultiGraph;

/// Marks a vertex the backward walk has not reached yet.
const UNVISITED: usize = usize::MAX;

/// One dependency cycle, as a closed walk of vertex handles.
///
/// The walk follows edge direction and its first and last entries are the same
/// vertex: `a -> b -> a` is stored as `[a, b, a]`, a self-loop as `[a, a]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Cycle {
    walk: Vec<VertexId>,
}

impl Cycle {
    /// Returns the closed walk (first equals last).
    #[must_use]
    pub fn vertices(&self) -> &[VertexId] {
        &self.walk
    }

    /// Returns the number of distinct vertices on the cycle.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.walk.len() - 1
    }

    /// Returns `true` if `vertex` lies on the cycle.
    #[must_use]
    pub fn contains(&self, vertex: VertexId) -> bool {
        self.walk.contains(&vertex)
    }

    /// Returns the consecutive `(from, to)` pairs along the cycle.
    pub fn steps(&self) -> impl ExactSizeIterator<Item = (VertexId, VertexId)> + '_ {
        self.walk.windows(2).map(|pair| (pair[0], pair[1]))
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dependency cycle: ")?;
        write_arrows(f, self.walk.iter())
    }
}

impl core::error::Error for Cycle {}

fn write_arrows<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = T>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(" -> ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Reconstructs one cycle among the vertices for which `is_pending` holds.
///
/// Starting from the first pending vertex in enumeration order, the walk
/// repeatedly steps to the first pending predecessor whose relation to the
/// current vertex is not `is_relaxed`. Every pending vertex is expected to have
/// such a predecessor, which is what stalled it in the first place.
///
/// # Panics
///
/// Panics if no vertex is pending, or if a pending vertex has no pending
/// predecessor (an [`Adjacency`] whose two directions disagree).
pub(crate) fn find_cycle<A: Adjacency>(
    graph: &A,
    is_pending: impl Fn(VertexId) -> bool,
    is_relaxed: impl Fn(VertexId, VertexId) -> bool,
) -> Cycle {
    let mut position = vec![UNVISITED; graph.vertex_count()];
    let mut walk = Vec::new();

    let mut current = graph
        .vertex_ids()
        .find(|&v| is_pending(v))
        .expect("a stalled ordering leaves pending vertices");

    while position[current.index()] == UNVISITED {
        position[current.index()] = walk.len();
        walk.push(current);
        current = graph
            .incoming(current)
            .find(|&source| is_pending(source) && !is_relaxed(source, current))
            .expect("a pending vertex has a pending predecessor");
    }

    // `walk` runs against edge direction; keep the loop part, close it, flip it.
    let mut cycle = walk.split_off(position[current.index()]);
    cycle.push(current);
    cycle.reverse();
    Cycle { walk: cycle }
}

/// One step of a reported cycle: the two vertices and every edge joining them.
pub struct CycleStep<'g, V, E> {
    /// The vertex that must come first.
    pub from: &'g V,
    /// The vertex that depends on `from`.
    pub to: &'g V,
    /// All edges `from -> to`, in insertion order.
    pub edges: &'g [E],
}

impl<V, E> Clone for CycleStep<'_, V, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V, E> Copy for CycleStep<'_, V, E> {}

impl<V: fmt::Debug, E: fmt::Debug> fmt::Debug for CycleStep<'_, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CycleStep")
            .field("from", self.from)
            .field("to", self.to)
            .field("edges", &self.edges)
            .finish()
    }
}

/// Renders a cycle's steps into a message, replacing the default rendering.
pub type CycleFormatter<'f, 'g, V, E> = dyn Fn(&[CycleStep<'g, V, E>]) -> String + 'f;

/// Error returned when a [`MultiGraph`] cannot be ordered because of a cycle.
///
/// Carries the cycle as vertices and as steps with their edge payloads, so
/// callers can explain *why* each dependency exists. The [`Display`](fmt::Display)
/// output is the caller's formatter result if one was supplied, otherwise the
/// vertices joined with arrows, e.g. `dependency cycle: a -> b -> a`.
pub struct CycleError<'g, V, E> {
    cycle: Cycle,
    vertices: Vec<&'g V>,
    steps: Vec<CycleStep<'g, V, E>>,
    message: Option<String>,
}

impl<'g, V, E> CycleError<'g, V, E> {
    pub(crate) fn new(
        graph: &'g MultiGraph<V, E>,
        cycle: Cycle,
        format: Option<&CycleFormatter<'_, 'g, V, E>>,
    ) -> Self {
        let vertices = cycle.vertices().iter().map(|&id| graph.value(id)).collect();
        let steps: Vec<_> = cycle
            .steps()
            .map(|(from, to)| CycleStep {
                from: graph.value(from),
                to: graph.value(to),
                edges: graph.edges_between_ids(from, to),
            })
            .collect();
        let message = format.map(|format| format(steps.as_slice()));
        Self {
            cycle,
            vertices,
            steps,
            message,
        }
    }

    /// Returns the closed walk of vertices (first equals last).
    #[must_use]
    pub fn vertices(&self) -> &[&'g V] {
        &self.vertices
    }

    /// Returns the steps along the cycle, one per consecutive vertex pair.
    #[must_use]
    pub fn steps(&self) -> &[CycleStep<'g, V, E>] {
        &self.steps
    }

    /// Returns the cycle as vertex handles.
    #[must_use]
    pub fn cycle(&self) -> &Cycle {
        &self.cycle
    }

    /// Returns the message produced by a caller-supplied formatter, if any.
    #[must_use]
    pub fn custom_message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Drops the borrowed detail, keeping only the handle-level cycle.
    #[must_use]
    pub fn into_cycle(self) -> Cycle {
        self.cycle
    }
}

impl<V: fmt::Debug, E: fmt::Debug> fmt::Debug for CycleError<'_, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CycleError")
            .field("vertices", &self.vertices)
            .field("steps", &self.steps)
            .field("message", &self.message)
            .finish()
    }
}

impl<V: fmt::Display, E> fmt::Display for CycleError<'_, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => f.write_str(message),
            None => {
                f.write_str("dependency cycle: ")?;
                write_arrows(f, self.vertices.iter())
            }
        }
    }
}

impl<V, E> core::error::Error for CycleError<'_, V, E>
where
    V: fmt::Debug + fmt::Display,
    E: fmt::Debug,
{
}

impl<V, E> MultiGraph<V, E>
where
    V: Eq + Hash,
{
    /// Resolves a handle-level [`Cycle`] against this graph.
    ///
    /// Useful after calling [`sort_ids`](crate::sort_ids) or
    /// [`schedule_ids`](crate::schedule_ids) directly on the graph.
    #[must_use]
    pub fn describe_cycle<'g>(
        &'g self,
        cycle: Cycle,
        format: Option<&CycleFormatter<'_, 'g, V, E>>,
    ) -> CycleError<'g, V, E> {
        CycleError::new(self, cycle, format)
    }
}
