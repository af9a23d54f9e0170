// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Multigraph adjacency store.

use alloc::vec::Vec;
use core::fmt;
use core::hash::Hash;

use hashbrown::hash_map::Entry;
use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::adjacency::{Adjacency, VertexId};
use crate::arena::VertexArena;
use crate::batch::BatchScheduler;
use crate::cycle::CycleError;
use crate::topo::TopologicalSorter;

/// Neighbour lists this short stay inline.
const INLINE_LINKS: usize = 4;

/// Which end of an edge referred to an unregistered vertex.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// The source (`from`) vertex.
    From,
    /// The target (`to`) vertex.
    To,
}

/// Error returned when an edge names a vertex that was never registered.
///
/// This is a programming error on the caller's side: the graph is left exactly
/// as it was before the call, and retrying the same call fails the same way.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnknownVertex {
    /// The endpoint that was not registered. When both are missing this is
    /// [`Endpoint::From`].
    pub endpoint: Endpoint,
}

impl fmt::Display for UnknownVertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = match self.endpoint {
            Endpoint::From => "source",
            Endpoint::To => "target",
        };
        write!(f, "cannot add edge: {end} vertex is not registered")
    }
}

impl core::error::Error for UnknownVertex {}

/// All edges between one ordered vertex pair.
#[derive(Debug, Clone)]
struct Link<E> {
    from: VertexId,
    to: VertexId,
    edges: Vec<E>,
}

/// Directed multigraph: vertices plus labeled edges, several per ordered pair.
///
/// Vertices are interned into [`VertexId`] handles in registration order;
/// adjacency is stored over those handles, so the ordering algorithms never
/// hash caller values. Every edge carries a caller payload `E` describing why
/// the dependency exists. Parallel edges between the same `(from, to)` pair
/// are kept in insertion order and never deduplicated, but they only count as
/// one neighbour relation.
///
/// An edge `from -> to` means "`from` must come before `to`".
///
/// # Example
///
/// ```
/// use understory_order::MultiGraph;
///
/// let mut graph = MultiGraph::<&str, &str>::new();
/// graph.add_vertices(["users", "orders", "items"]);
/// graph.add_edge(&"users", &"orders", "fk_orders_user").unwrap();
/// graph.add_edge(&"orders", &"items", "fk_items_order").unwrap();
/// graph.add_edge(&"users", &"items", "fk_items_buyer").unwrap();
///
/// assert_eq!(graph.edges_between(&"users", &"orders"), &["fk_orders_user"]);
/// assert_eq!(graph.sort().unwrap(), vec![&"users", &"orders", &"items"]);
/// assert_eq!(
///     graph.schedule().unwrap(),
///     vec![vec![&"users"], vec![&"orders"], vec![&"items"]],
/// );
/// ```
#[derive(Debug, Clone)]
pub struct MultiGraph<V, E> {
    vertices: VertexArena<V>,
    /// One entry per ordered pair with at least one edge.
    links: Vec<Link<E>>,
    /// `(from, to)` -> index into `links`.
    pairs: HashMap<(VertexId, VertexId), usize>,
    /// `outgoing[v]` -> links leaving `v`, in first-edge order.
    outgoing: Vec<SmallVec<[usize; INLINE_LINKS]>>,
    /// `incoming[v]` -> links entering `v`, in first-edge order.
    incoming: Vec<SmallVec<[usize; INLINE_LINKS]>>,
}

impl<V, E> Default for MultiGraph<V, E>
where
    V: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V, E> MultiGraph<V, E> {
    /// Returns the number of registered vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns `true` if no vertex is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.len() == 0
    }

    /// Returns the number of ordered pairs joined by at least one edge.
    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.links.len()
    }

    /// Returns the total number of edges, counting parallel edges separately.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.links.iter().map(|link| link.edges.len()).sum()
    }

    /// Returns the vertex registered under `id`, if any.
    #[must_use]
    pub fn vertex(&self, id: VertexId) -> Option<&V> {
        self.vertices.get(id)
    }

    /// Returns all vertices in enumeration (registration) order.
    pub fn vertices(&self) -> impl ExactSizeIterator<Item = &V> + '_ {
        self.vertices.values().iter()
    }

    /// Returns the edges from `from` to `to` by handle, in insertion order.
    ///
    /// Unknown handles and unconnected pairs yield an empty slice.
    #[must_use]
    pub fn edges_between_ids(&self, from: VertexId, to: VertexId) -> &[E] {
        match self.pairs.get(&(from, to)) {
            Some(&index) => self.links[index].edges.as_slice(),
            None => &[],
        }
    }

    /// Returns the vertex for a handle issued by this graph.
    pub(crate) fn value(&self, id: VertexId) -> &V {
        self.vertices.value(id)
    }

    fn neighbours<'a>(
        &'a self,
        lists: &'a [SmallVec<[usize; INLINE_LINKS]>],
        vertex: VertexId,
    ) -> impl Iterator<Item = &'a Link<E>> + 'a {
        lists
            .get(vertex.index())
            .map_or(&[][..], |list| list.as_slice())
            .iter()
            .map(|&index| &self.links[index])
    }
}

impl<V, E> MultiGraph<V, E>
where
    V: Eq + Hash,
{
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty graph with room for `vertices` vertices.
    #[must_use]
    pub fn with_capacity(vertices: usize) -> Self {
        Self {
            vertices: VertexArena::with_capacity(vertices),
            links: Vec::new(),
            pairs: HashMap::new(),
            outgoing: Vec::with_capacity(vertices),
            incoming: Vec::with_capacity(vertices),
        }
    }

    /// Registers `vertex` and returns its handle.
    ///
    /// Registering a value that is already present is a no-op that returns the
    /// existing handle.
    pub fn add_vertex(&mut self, vertex: V) -> VertexId {
        let (id, inserted) = self.vertices.insert(vertex);
        if inserted {
            self.outgoing.push(SmallVec::new());
            self.incoming.push(SmallVec::new());
        }
        id
    }

    /// Registers every vertex in `vertices` (set union).
    pub fn add_vertices(&mut self, vertices: impl IntoIterator<Item = V>) {
        for vertex in vertices {
            self.add_vertex(vertex);
        }
    }

    /// Returns the handle of `vertex`, if it is registered.
    #[must_use]
    pub fn vertex_id(&self, vertex: &V) -> Option<VertexId> {
        self.vertices.find(vertex)
    }

    /// Returns `true` if `vertex` is registered.
    #[must_use]
    pub fn contains_vertex(&self, vertex: &V) -> bool {
        self.vertex_id(vertex).is_some()
    }

    /// Adds one edge `from -> to` carrying `edge`.
    ///
    /// The edge is appended after any existing edges for the same ordered pair.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownVertex`] if either endpoint is not registered; the graph
    /// is not modified.
    pub fn add_edge(&mut self, from: &V, to: &V, edge: E) -> Result<(), UnknownVertex> {
        let (from, to) = self.resolve(from, to)?;
        self.link_edges(from, to).push(edge);
        Ok(())
    }

    /// Adds every edge in `edges` from `from` to `to`, keeping their order.
    ///
    /// An empty `edges` creates no relation between the two vertices.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownVertex`] if either endpoint is not registered; the graph
    /// is not modified.
    pub fn add_edges(
        &mut self,
        from: &V,
        to: &V,
        edges: impl IntoIterator<Item = E>,
    ) -> Result<(), UnknownVertex> {
        let (from, to) = self.resolve(from, to)?;
        let mut edges = edges.into_iter().peekable();
        if edges.peek().is_some() {
            self.link_edges(from, to).extend(edges);
        }
        Ok(())
    }

    /// Adds one edge between two handles previously returned by this graph.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownVertex`] if either handle is out of range.
    pub fn add_edge_by_id(
        &mut self,
        from: VertexId,
        to: VertexId,
        edge: E,
    ) -> Result<(), UnknownVertex> {
        let count = self.vertices.len();
        if from.index() >= count {
            return Err(UnknownVertex {
                endpoint: Endpoint::From,
            });
        }
        if to.index() >= count {
            return Err(UnknownVertex {
                endpoint: Endpoint::To,
            });
        }
        self.link_edges(from, to).push(edge);
        Ok(())
    }

    /// Returns the edges from `from` to `to`, in insertion order.
    ///
    /// Only that exact direction is considered; `to -> from` edges are not
    /// included. Unregistered vertices yield an empty slice.
    #[must_use]
    pub fn edges_between(&self, from: &V, to: &V) -> &[E] {
        match (self.vertex_id(from), self.vertex_id(to)) {
            (Some(from), Some(to)) => self.edges_between_ids(from, to),
            _ => &[],
        }
    }

    /// Returns the distinct targets of edges leaving `vertex`.
    ///
    /// Each neighbour appears once, in the order its first edge was added.
    pub fn outgoing_neighbours(&self, vertex: &V) -> impl Iterator<Item = &V> + '_ {
        let id = self.vertex_id(vertex);
        id.into_iter()
            .flat_map(move |id| self.neighbours(&self.outgoing, id))
            .map(|link| self.value(link.to))
    }

    /// Returns the distinct sources of edges entering `vertex`.
    ///
    /// Each neighbour appears once, in the order its first edge was added.
    pub fn incoming_neighbours(&self, vertex: &V) -> impl Iterator<Item = &V> + '_ {
        let id = self.vertex_id(vertex);
        id.into_iter()
            .flat_map(move |id| self.neighbours(&self.incoming, id))
            .map(|link| self.value(link.from))
    }

    /// Returns a linear order of all vertices that respects every edge.
    ///
    /// Shorthand for [`TopologicalSorter::new(self).sort()`](TopologicalSorter::sort).
    ///
    /// # Errors
    ///
    /// Returns [`CycleError`] describing one cycle if the graph is cyclic.
    pub fn sort(&self) -> Result<Vec<&V>, CycleError<'_, V, E>> {
        TopologicalSorter::new(self).sort()
    }

    /// Groups all vertices into waves that can each run in parallel.
    ///
    /// Shorthand for [`BatchScheduler::new(self).schedule()`](BatchScheduler::schedule).
    ///
    /// # Errors
    ///
    /// Returns [`CycleError`] describing one cycle if the graph is cyclic.
    pub fn schedule(&self) -> Result<Vec<Vec<&V>>, CycleError<'_, V, E>> {
        BatchScheduler::new(self).schedule()
    }

    fn resolve(&self, from: &V, to: &V) -> Result<(VertexId, VertexId), UnknownVertex> {
        let from = self.vertex_id(from).ok_or(UnknownVertex {
            endpoint: Endpoint::From,
        })?;
        let to = self.vertex_id(to).ok_or(UnknownVertex {
            endpoint: Endpoint::To,
        })?;
        Ok((from, to))
    }

    /// Returns the edge list for `(from, to)`, creating the pair on first use.
    fn link_edges(&mut self, from: VertexId, to: VertexId) -> &mut Vec<E> {
        let index = match self.pairs.entry((from, to)) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                let index = self.links.len();
                e.insert(index);
                self.links.push(Link {
                    from,
                    to,
                    edges: Vec::new(),
                });
                self.outgoing[from.index()].push(index);
                self.incoming[to.index()].push(index);
                index
            }
        };
        &mut self.links[index].edges
    }
}

impl<V, E> MultiGraph<V, E>
where
    E: Eq + Hash,
{
    /// Returns every distinct edge payload, in first-insertion order.
    ///
    /// An equal payload used on several pairs is reported once.
    #[must_use]
    pub fn edges(&self) -> Vec<&E> {
        let mut seen = HashSet::new();
        self.links
            .iter()
            .flat_map(|link| link.edges.iter())
            .filter(|&edge| seen.insert(edge))
            .collect()
    }
}

impl<V, E> Adjacency for MultiGraph<V, E> {
    fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    fn outgoing(&self, vertex: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.neighbours(&self.outgoing, vertex).map(|link| link.to)
    }

    fn incoming(&self, vertex: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.neighbours(&self.incoming, vertex).map(|link| link.from)
    }
}
