// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vertex handles and the adjacency capability read by the ordering algorithms.

use alloc::vec::Vec;
use core::fmt;

/// A compact handle for a vertex registered in a graph.
///
/// Handles are dense: a graph with `n` vertices uses `0..n`, assigned in
/// registration order. That order is the graph's vertex enumeration order,
/// which the algorithms use to seed their queues and break ties.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct VertexId(u32);

impl VertexId {
    /// Creates a handle from its raw numeric value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Creates a handle for the `index`-th registered vertex.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not fit in a `u32`.
    #[inline]
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).expect("too many vertices for VertexId (u32)"))
    }

    /// Returns this handle as a `usize` index (for tables keyed by handle).
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the raw numeric value.
    #[inline]
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Read-only adjacency over dense [`VertexId`] handles.
///
/// This is the only view of a graph that [`sort_ids`](crate::sort_ids),
/// [`sort_ids_with`](crate::sort_ids_with) and
/// [`schedule_ids`](crate::schedule_ids) need. [`MultiGraph`](crate::MultiGraph)
/// implements it; any other store can too.
///
/// # Contract
///
/// - Vertices are exactly `VertexId::from_index(0..vertex_count())`.
/// - [`outgoing`](Self::outgoing) and [`incoming`](Self::incoming) yield each
///   neighbour at most once, no matter how many parallel edges exist.
/// - The two queries mirror each other: `v` is in `outgoing(u)` iff `u` is in
///   `incoming(v)`. A self-loop shows up in both lists of its vertex.
///
/// The algorithms may panic or report nonsense if the contract is broken.
pub trait Adjacency {
    /// Returns the number of registered vertices.
    fn vertex_count(&self) -> usize;

    /// Returns the distinct targets of edges leaving `vertex`.
    fn outgoing(&self, vertex: VertexId) -> impl Iterator<Item = VertexId> + '_;

    /// Returns the distinct sources of edges entering `vertex`.
    fn incoming(&self, vertex: VertexId) -> impl Iterator<Item = VertexId> + '_;

    /// Returns every vertex handle in enumeration order.
    fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        (0..self.vertex_count()).map(VertexId::from_index)
    }
}

/// Number of distinct predecessors of every vertex, indexed by handle.
pub(crate) fn predecessor_counts<A: Adjacency>(graph: &A) -> Vec<usize> {
    graph
        .vertex_ids()
        .map(|vertex| graph.incoming(vertex).count())
        .collect()
}
