//! Entity reference system for type-safe arena indices.
//!
//! Every node of a lifted region lives in one arena and is addressed by a
//! [`ValueId`]. Lookup tables (parameters, computations, accesses, induction
//! variables) map textual references to these ids, so resolving a reference
//! is an index rewrite rather than a pointer update.

use std::fmt;

/// Base trait for entity references.
///
/// Entities are type-safe identifiers for IR elements. They provide O(1)
/// conversion to/from indices while keeping different entity kinds apart.
pub trait EntityRef: Copy + Clone + PartialEq + Eq + std::hash::Hash + fmt::Debug {
    /// Get the index of this entity
    fn index(self) -> usize;

    /// Create an entity from an index
    fn from_index(index: usize) -> Self;

    /// Get the next available index
    fn next_index(self) -> Self {
        Self::from_index(self.index() + 1)
    }
}

/// Value entity reference
///
/// Identifies one node of the value arena of a [`crate::Scop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(u32);

impl ValueId {
    /// Create a new value id with the given index
    pub fn new(index: u32) -> Self {
        ValueId(index)
    }

    /// Get the index of this value id
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl EntityRef for ValueId {
    fn index(self) -> usize {
        self.0 as usize
    }

    fn from_index(index: usize) -> Self {
        ValueId(index as u32)
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn test_entity_ref_trait() {
        let value = ValueId::from_index(5);
        assert_eq!(EntityRef::index(value), 5);

        let next = value.next_index();
        assert_eq!(EntityRef::index(next), 6);
    }

    #[test]
    fn test_value_id_ordering() {
        let v1 = ValueId::new(1);
        let v2 = ValueId::new(2);
        let v3 = ValueId::new(1);

        assert!(v1 < v2);
        assert!(v1 == v3);
    }

    #[test]
    fn test_value_id_hashing() {
        let mut set = BTreeSet::new();
        set.insert(ValueId::new(1));
        set.insert(ValueId::new(2));
        set.insert(ValueId::new(1));

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_value_id_display() {
        assert_eq!(format!("{}", ValueId::new(42)), "v42");
    }
}
