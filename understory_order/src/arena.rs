// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interning arena mapping caller vertex values to [`VertexId`] handles.
//!
//! Each distinct value is stored once. Lookups go through a hash-bucket index
//! (hash -> small list of candidate handles) so the arena never needs a second
//! copy of the value, and callers are not required to make `V: Clone`.

use alloc::vec::Vec;
use core::hash::{BuildHasher, Hash};

use hashbrown::DefaultHashBuilder;
use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::adjacency::VertexId;

#[derive(Debug, Clone)]
pub(crate) struct VertexArena<V> {
    values: Vec<V>,
    buckets: HashMap<u64, SmallVec<[VertexId; 1]>>,
    build_hasher: DefaultHashBuilder,
}

impl<V> VertexArena<V> {
    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn get(&self, id: VertexId) -> Option<&V> {
        self.values.get(id.index())
    }

    /// Panics if `id` was not issued by this arena.
    pub(crate) fn value(&self, id: VertexId) -> &V {
        &self.values[id.index()]
    }

    pub(crate) fn values(&self) -> &[V] {
        &self.values
    }
}

impl<V> VertexArena<V>
where
    V: Eq + Hash,
{
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            buckets: HashMap::with_capacity(capacity),
            build_hasher: DefaultHashBuilder::default(),
        }
    }

    pub(crate) fn find(&self, value: &V) -> Option<VertexId> {
        let hash = self.build_hasher.hash_one(value);
        self.buckets
            .get(&hash)?
            .iter()
            .copied()
            .find(|&id| self.values[id.index()] == *value)
    }

    /// Interns `value`, returning its handle and whether it was newly added.
    ///
    /// An equal value that is already present keeps its handle; `value` is dropped.
    pub(crate) fn insert(&mut self, value: V) -> (VertexId, bool) {
        let hash = self.build_hasher.hash_one(&value);
        if let Some(ids) = self.buckets.get(&hash) {
            for &id in ids {
                if self.values[id.index()] == value {
                    return (id, false);
                }
            }
        }

        let id = VertexId::from_index(self.values.len());
        self.values.push(value);
        self.buckets.entry(hash).or_default().push(id);
        (id, true)
    }
}
