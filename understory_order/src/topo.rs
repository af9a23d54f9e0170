// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Linear topological order with optional cycle breaking.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::hash::Hash;

use hashbrown::HashSet;

use crate::adjacency::{Adjacency, VertexId, predecessor_counts};
use crate::cycle::{Cycle, CycleError, CycleFormatter, find_cycle};
use crate::graph::MultiGraph;

/// Decides whether the relation `from -> to` may be ignored to escape a cycle.
///
/// Receives both vertices and every edge between them, in insertion order.
pub type EdgeBreaker<'f, V, E> = dyn FnMut(&V, &V, &[E]) -> bool + 'f;

/// Returns every vertex of `graph` in an order that respects all edges.
///
/// Uses Kahn's algorithm. A vertex's predecessor count is the number of
/// *distinct* vertices with an edge into it, so parallel edges add no extra
/// ordering pressure. Ready vertices are taken in enumeration order, which makes
/// the result deterministic for a given graph.
///
/// # Errors
///
/// Returns one [`Cycle`] among the vertices that could not be placed. No
/// partial order is ever returned.
///
/// # Example
///
/// ```
/// use understory_order::{MultiGraph, sort_ids};
///
/// let mut graph = MultiGraph::<u32, ()>::new();
/// let a = graph.add_vertex(10);
/// let b = graph.add_vertex(20);
/// graph.add_edge(&20, &10, ()).unwrap();
///
/// assert_eq!(sort_ids(&graph).unwrap(), vec![b, a]);
/// ```
pub fn sort_ids<A: Adjacency>(graph: &A) -> Result<Vec<VertexId>, Cycle> {
    sort_ids_with(graph, |_, _| false)
}

/// Like [`sort_ids`], but lets `can_break` relax relations that hold a cycle.
///
/// When no vertex is ready, every stalled vertex (in enumeration order) offers
/// its stalled predecessors to `can_break(predecessor, vertex)`. The first
/// accepted relation for a vertex is treated as removed for the rest of the
/// call; a vertex unlocked that way resumes normal processing. Each relation is
/// offered at most once per call.
///
/// On success, every relation `u -> v` has `u` before `v` unless it was broken.
///
/// # Errors
///
/// Returns one [`Cycle`] if a pass over the stalled vertices accepts no break.
/// The reported cycle never uses a broken relation.
pub fn sort_ids_with<A, F>(graph: &A, mut can_break: F) -> Result<Vec<VertexId>, Cycle>
where
    A: Adjacency,
    F: FnMut(VertexId, VertexId) -> bool,
{
    let count = graph.vertex_count();
    let mut kahn = Kahn {
        remaining: predecessor_counts(graph),
        placed: vec![false; count],
        queue: Vec::with_capacity(count),
        broken: HashSet::new(),
    };

    for vertex in graph.vertex_ids() {
        if kahn.remaining[vertex.index()] == 0 {
            kahn.enqueue(vertex);
        }
    }

    // The queue is read by index so placed vertices stay in it.
    let mut next = 0;
    loop {
        while next < kahn.queue.len() {
            let vertex = kahn.queue[next];
            next += 1;
            for target in graph.outgoing(vertex) {
                if kahn.placed[target.index()] || kahn.is_broken(vertex, target) {
                    continue;
                }
                kahn.release(target);
            }
        }

        if kahn.queue.len() == count {
            return Ok(kahn.queue);
        }

        if !kahn.break_one(graph, &mut can_break) {
            let cycle = find_cycle(
                graph,
                |v| !kahn.placed[v.index()],
                |from, to| kahn.is_broken(from, to),
            );
            #[cfg(feature = "tracing")]
            tracing::debug!(
                placed = kahn.queue.len(),
                vertices = count,
                cycle_len = cycle.vertex_count(),
                "topological sort stalled on a dependency cycle"
            );
            return Err(cycle);
        }
    }
}

/// Working state of one [`sort_ids_with`] call.
struct Kahn {
    /// Predecessors of each vertex that are neither placed nor broken.
    remaining: Vec<usize>,
    /// Whether each vertex is in `queue`.
    placed: Vec<bool>,
    queue: Vec<VertexId>,
    /// Relations treated as removed.
    broken: HashSet<(VertexId, VertexId)>,
}

impl Kahn {
    fn enqueue(&mut self, vertex: VertexId) {
        self.placed[vertex.index()] = true;
        self.queue.push(vertex);
    }

    /// Drops one predecessor of `vertex`, queueing it once none are left.
    fn release(&mut self, vertex: VertexId) {
        let remaining = &mut self.remaining[vertex.index()];
        *remaining -= 1;
        if *remaining == 0 {
            self.enqueue(vertex);
        }
    }

    fn is_broken(&self, from: VertexId, to: VertexId) -> bool {
        !self.broken.is_empty() && self.broken.contains(&(from, to))
    }

    /// Offers stalled relations to `can_break` until one vertex is unlocked.
    ///
    /// Returns `false` once a whole pass accepts nothing.
    fn break_one<A, F>(&mut self, graph: &A, can_break: &mut F) -> bool
    where
        A: Adjacency,
        F: FnMut(VertexId, VertexId) -> bool,
    {
        loop {
            let mut accepted = false;
            for candidate in graph.vertex_ids() {
                if self.placed[candidate.index()] {
                    continue;
                }
                let Some(source) = graph.incoming(candidate).find(|&source| {
                    !self.placed[source.index()]
                        && !self.broken.contains(&(source, candidate))
                        && can_break(source, candidate)
                }) else {
                    continue;
                };

                #[cfg(feature = "tracing")]
                tracing::debug!(
                    from = source.as_u32(),
                    to = candidate.as_u32(),
                    "breaking dependency to escape a cycle"
                );
                self.broken.insert((source, candidate));
                accepted = true;
                self.release(candidate);
                if self.placed[candidate.index()] {
                    return true;
                }
            }
            if !accepted {
                return false;
            }
        }
    }
}

/// Builder that sorts a [`MultiGraph`] into a single linear order.
///
/// Optional behavior is configured before calling [`sort`](Self::sort):
///
/// - [`break_edges_with`](Self::break_edges_with): lets domain logic mark
///   relations as "soft" so a cycle through them can be escaped.
/// - [`format_cycle_with`](Self::format_cycle_with): replaces the default
///   cycle message.
///
/// # Example
///
/// ```
/// use understory_order::{MultiGraph, TopologicalSorter};
///
/// let mut graph = MultiGraph::<&str, &str>::new();
/// graph.add_vertices(["a", "b"]);
/// graph.add_edge(&"a", &"b", "hard").unwrap();
/// graph.add_edge(&"b", &"a", "soft").unwrap();
///
/// // Without a breaker the cycle is fatal.
/// assert!(TopologicalSorter::new(&graph).sort().is_err());
///
/// let mut soft_only = |_: &&str, _: &&str, edges: &[&str]| edges.iter().all(|e| *e == "soft");
/// let order = TopologicalSorter::new(&graph)
///     .break_edges_with(&mut soft_only)
///     .sort()
///     .unwrap();
/// assert_eq!(order, vec![&"a", &"b"]);
/// ```
pub struct TopologicalSorter<'g, 's, V, E> {
    graph: &'g MultiGraph<V, E>,
    can_break: Option<&'s mut EdgeBreaker<'s, V, E>>,
    format: Option<&'s CycleFormatter<'s, 'g, V, E>>,
}

impl<V, E> fmt::Debug for TopologicalSorter<'_, '_, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopologicalSorter")
            .field("vertices", &self.graph.vertex_count())
            .field("breaks_edges", &self.can_break.is_some())
            .field("formats_cycle", &self.format.is_some())
            .finish_non_exhaustive()
    }
}

impl<'g, 's, V, E> TopologicalSorter<'g, 's, V, E>
where
    V: Eq + Hash,
{
    /// Creates a sorter over `graph` with no break policy and the default
    /// cycle message.
    #[must_use]
    pub fn new(graph: &'g MultiGraph<V, E>) -> Self {
        Self {
            graph,
            can_break: None,
            format: None,
        }
    }

    /// Consults `can_break(from, to, edges)` when the sort stalls on a cycle.
    ///
    /// See [`sort_ids_with`] for exactly when and in which order relations are
    /// offered.
    #[must_use]
    pub fn break_edges_with(mut self, can_break: &'s mut EdgeBreaker<'s, V, E>) -> Self {
        self.can_break = Some(can_break);
        self
    }

    /// Uses `format` to render the cycle message on failure.
    #[must_use]
    pub fn format_cycle_with(mut self, format: &'s CycleFormatter<'s, 'g, V, E>) -> Self {
        self.format = Some(format);
        self
    }

    /// Returns every vertex in an order that respects all unbroken edges.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError`] describing one remaining cycle.
    pub fn sort(self) -> Result<Vec<&'g V>, CycleError<'g, V, E>> {
        let graph = self.graph;
        let result = match self.can_break {
            Some(can_break) => sort_ids_with(graph, |from, to| {
                can_break(
                    graph.value(from),
                    graph.value(to),
                    graph.edges_between_ids(from, to),
                )
            }),
            None => sort_ids(graph),
        };
        match result {
            Ok(order) => Ok(order.into_iter().map(|id| graph.value(id)).collect()),
            Err(cycle) => Err(CycleError::new(graph, cycle, self.format)),
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;
    use std::string::ToString;

    type Graph = MultiGraph<&'static str, &'static str>;

    fn graph(vertices: &[&'static str], edges: &[(&'static str, &'static str)]) -> Graph {
        let mut graph = MultiGraph::new();
        graph.add_vertices(vertices.iter().copied());
        for (from, to) in edges {
            graph.add_edge(from, to, "dep").unwrap();
        }
        graph
    }

    fn names(order: &[&&'static str]) -> Vec<&'static str> {
        order.iter().map(|v| **v).collect()
    }

    #[test]
    fn chain_in_dependency_order() {
        let g = graph(&["c", "b", "a"], &[("a", "b"), ("b", "c")]);
        assert_eq!(names(&g.sort().unwrap()), vec!["a", "b", "c"]);
    }

    #[test]
    fn diamond_respects_every_edge() {
        let g = graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        assert_eq!(names(&g.sort().unwrap()), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn ready_vertices_follow_enumeration_order() {
        let g = graph(&["x", "y", "z"], &[]);
        assert_eq!(names(&g.sort().unwrap()), vec!["x", "y", "z"]);
    }

    #[test]
    fn empty_graph_sorts_to_nothing() {
        let g = graph(&[], &[]);
        assert!(g.sort().unwrap().is_empty());
    }

    #[test]
    fn parallel_edges_count_once() {
        let mut g = graph(&["a", "b", "c"], &[("b", "c")]);
        g.add_edges(&"a", &"c", ["fk1", "fk2", "fk3"]).unwrap();

        // c has two distinct predecessors; three parallel edges from a do not
        // leave it waiting after both are placed.
        assert_eq!(names(&g.sort().unwrap()), vec!["a", "b", "c"]);
    }

    #[test]
    fn two_cycle_fails_without_breaker() {
        let g = graph(&["a", "b"], &[("a", "b"), ("b", "a")]);
        let err = g.sort().unwrap_err();
        assert_eq!(err.vertices(), &[&"a", &"b", &"a"]);
        assert_eq!(err.to_string(), "dependency cycle: a -> b -> a");
    }

    #[test]
    fn self_loop_fails_without_breaker() {
        let g = graph(&["a"], &[("a", "a")]);
        let err = g.sort().unwrap_err();
        assert_eq!(err.vertices(), &[&"a", &"a"]);
    }

    #[test]
    fn breaker_resolves_two_cycle() {
        let g = graph(&["a", "b"], &[("a", "b"), ("b", "a")]);
        let mut offered = Vec::new();
        let mut breaker = |from: &&'static str, to: &&'static str, _: &[&str]| {
            offered.push((*from, *to));
            (*from, *to) == ("b", "a")
        };
        let order = TopologicalSorter::new(&g)
            .break_edges_with(&mut breaker)
            .sort()
            .unwrap();

        assert_eq!(names(&order), vec!["a", "b"]);
        assert_eq!(offered, vec![("b", "a")]);
    }

    #[test]
    fn breaker_is_offered_other_relations_after_rejection() {
        let g = graph(&["a", "b"], &[("a", "b"), ("b", "a")]);
        let mut breaker = |from: &&str, to: &&str, _: &[&str]| (*from, *to) == ("a", "b");
        let order = TopologicalSorter::new(&g)
            .break_edges_with(&mut breaker)
            .sort()
            .unwrap();

        assert_eq!(names(&order), vec!["b", "a"]);
    }

    #[test]
    fn breaker_can_break_self_loop() {
        let g = graph(&["a", "b"], &[("a", "a"), ("a", "b")]);
        let mut breaker = |from: &&str, to: &&str, _: &[&str]| from == to;
        let order = TopologicalSorter::new(&g)
            .break_edges_with(&mut breaker)
            .sort()
            .unwrap();

        assert_eq!(names(&order), vec!["a", "b"]);
    }

    #[test]
    fn breaker_sees_all_parallel_edges() {
        let mut g = graph(&["a", "b"], &[("a", "b")]);
        g.add_edges(&"b", &"a", ["nullable_fk", "deferred_fk"]).unwrap();

        let mut seen: Vec<String> = Vec::new();
        let mut breaker = |_: &&str, _: &&str, edges: &[&str]| {
            seen.extend(edges.iter().map(|e| e.to_string()));
            true
        };
        let order = TopologicalSorter::new(&g)
            .break_edges_with(&mut breaker)
            .sort()
            .unwrap();

        assert_eq!(names(&order), vec!["a", "b"]);
        assert_eq!(seen, vec!["nullable_fk", "deferred_fk"]);
    }

    #[test]
    fn broken_relation_is_not_counted_again() {
        // a -> b -> a with b -> a broken; when b is placed it must not release
        // a a second time, and c (waiting on a and b) is placed last.
        let g = graph(
            &["a", "b", "c"],
            &[("a", "b"), ("b", "a"), ("a", "c"), ("b", "c")],
        );
        let mut breaker = |from: &&str, to: &&str, _: &[&str]| (*from, *to) == ("b", "a");
        let order = TopologicalSorter::new(&g)
            .break_edges_with(&mut breaker)
            .sort()
            .unwrap();

        assert_eq!(names(&order), vec!["a", "b", "c"]);
    }

    #[test]
    fn breaks_accumulate_across_passes() {
        // a needs both b and c broken before it is free.
        let g = graph(
            &["a", "b", "c"],
            &[("a", "b"), ("b", "a"), ("a", "c"), ("c", "a")],
        );
        let mut accepted = 0;
        let mut breaker = |_: &&str, to: &&str, _: &[&str]| {
            let ok = *to == "a";
            if ok {
                accepted += 1;
            }
            ok
        };
        let order = TopologicalSorter::new(&g)
            .break_edges_with(&mut breaker)
            .sort()
            .unwrap();

        assert_eq!(names(&order), vec!["a", "b", "c"]);
        assert_eq!(accepted, 2);
    }

    #[test]
    fn rejecting_breaker_reports_cycle() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "b")]);
        let mut never = |_: &&str, _: &&str, _: &[&str]| false;
        let err = TopologicalSorter::new(&g)
            .break_edges_with(&mut never)
            .sort()
            .unwrap_err();

        assert_eq!(err.vertices(), &[&"b", &"c", &"b"]);
    }

    #[test]
    fn custom_formatter_sees_cycle_steps() {
        let g = graph(&["a", "b"], &[("a", "b"), ("b", "a")]);
        let format = |steps: &[crate::CycleStep<'_, &str, &str>]| {
            let mut out = String::new();
            for step in steps {
                out.push_str(step.from);
                out.push('>');
            }
            out
        };
        let err = TopologicalSorter::new(&g)
            .format_cycle_with(&format)
            .sort()
            .unwrap_err();

        assert_eq!(err.to_string(), "a>b>");
    }

    #[test]
    fn handle_level_sort_matches() {
        let g = graph(&["a", "b", "c"], &[("c", "a"), ("a", "b")]);
        let ids = sort_ids(&g).unwrap();
        let expected: Vec<_> = ["c", "a", "b"]
            .iter()
            .map(|v| g.vertex_id(v).unwrap())
            .collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn repeated_sorts_agree() {
        let g = graph(
            &["e", "d", "c", "b", "a"],
            &[("a", "c"), ("b", "c"), ("c", "d"), ("a", "e")],
        );
        let first = g.sort().unwrap();
        let second = g.sort().unwrap();
        assert_eq!(first, second);
    }
}
