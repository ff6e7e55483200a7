//! Dense entity-to-data maps.
//!
//! `PrimaryMap` is a `Vec` with entity-based indexing. The value arena of a
//! region and the node arena of a dataflow graph are both primary maps.

use std::{
    marker::PhantomData,
    ops::{Index, IndexMut},
};

use crate::entity::EntityRef;

/// Dense map from entity to data
///
/// - `PrimaryMap<ValueId, ValueData>` - the value arena of a region
/// - `PrimaryMap<NodeId, Node>` - the node arena of a dataflow graph
#[derive(Debug, Clone)]
pub struct PrimaryMap<K: EntityRef, V> {
    data: Vec<V>,
    _phantom: PhantomData<K>,
}

impl<K: EntityRef, V> PrimaryMap<K, V> {
    /// Create a new empty PrimaryMap
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            _phantom: PhantomData,
        }
    }

    /// Push a value and return its entity key
    ///
    /// The key's index equals the length of the map before the push.
    pub fn push(&mut self, value: V) -> K {
        let index = self.data.len();
        self.data.push(value);
        K::from_index(index)
    }

    /// Get a value by entity key
    pub fn get(&self, key: K) -> Option<&V> {
        self.data.get(key.index())
    }

    /// Get a mutable value by entity key
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.data.get_mut(key.index())
    }

    /// Get length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over entries as (entity, value) pairs
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> {
        self.data
            .iter()
            .enumerate()
            .map(|(i, v)| (K::from_index(i), v))
    }

    /// Iterate over keys
    pub fn keys(&self) -> impl Iterator<Item = K> {
        (0..self.data.len()).map(K::from_index)
    }

    /// Iterate over values
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.data.iter()
    }
}

impl<K: EntityRef, V> Default for PrimaryMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EntityRef, V> Index<K> for PrimaryMap<K, V> {
    type Output = V;

    fn index(&self, key: K) -> &V {
        &self.data[key.index()]
    }
}

impl<K: EntityRef, V> IndexMut<K> for PrimaryMap<K, V> {
    fn index_mut(&mut self, key: K) -> &mut V {
        &mut self.data[key.index()]
    }
}
