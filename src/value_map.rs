// SPDX-License-Identifier: MIT OR Apache-2.0

//! Immutable map from ambient keys to values.
//!
//! Every mutation returns a new map; a map that is reachable from a published
//! snapshot is never modified. Most threads carry zero to two ambient values, so
//! small maps are stored as a linear array and only large ones are hashed.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// A type-erased ambient value.
pub(crate) type AmbientValue = Arc<dyn Any + Send + Sync>;

/// Identity of an ambient key.
///
/// Allocated once per key from a process-wide counter, so two keys are equal
/// only if they are the same key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct KeyId(pub(crate) u64);

/// Number of bindings kept in a linear array before switching to a hash map.
pub(crate) const LINEAR_CAPACITY: usize = 16;

type Binding = (KeyId, Option<AmbientValue>);

/// Identity comparison of two optional ambient values.
///
/// Two absent values are equal; two present values are equal only if they
/// share the same allocation.
pub(crate) fn same_value(a: Option<&AmbientValue>, b: Option<&AmbientValue>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
        _ => false,
    }
}

#[derive(Clone, Default)]
pub(crate) enum ValueMap {
    #[default]
    Empty,
    Linear(Arc<[Binding]>),
    Hashed(Arc<HashMap<KeyId, Option<AmbientValue>>>),
}

impl ValueMap {
    /// Builds a map holding a single binding.
    ///
    /// When `treat_none_as_absent` is set and `value` is `None`, returns the empty map.
    pub(crate) fn create(key: KeyId, value: Option<AmbientValue>, treat_none_as_absent: bool) -> ValueMap {
        if value.is_none() && treat_none_as_absent {
            ValueMap::Empty
        } else {
            ValueMap::Linear(Arc::from(vec![(key, value)]))
        }
    }

    /// Looks up `key`.
    ///
    /// The outer `Option` reports whether the key is bound at all; the inner one
    /// is the bound value, which may itself be `None`.
    pub(crate) fn get(&self, key: KeyId) -> Option<&Option<AmbientValue>> {
        match self {
            ValueMap::Empty => None,
            ValueMap::Linear(bindings) => bindings.iter().find(|(k, _)| *k == key).map(|(_, v)| v),
            ValueMap::Hashed(map) => map.get(&key),
        }
    }

    /// Looks up `key`, collapsing "not bound" and "bound to `None`".
    pub(crate) fn value(&self, key: KeyId) -> Option<&AmbientValue> {
        self.get(key).and_then(Option::as_ref)
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            ValueMap::Empty => 0,
            ValueMap::Linear(bindings) => bindings.len(),
            ValueMap::Hashed(map) => map.len(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a map equal to this one except for `key`.
    ///
    /// When `treat_none_as_absent` is set and `value` is `None`, the binding is
    /// removed instead of stored. Removing the last binding yields the empty map.
    pub(crate) fn set(&self, key: KeyId, value: Option<AmbientValue>, treat_none_as_absent: bool) -> ValueMap {
        let remove = value.is_none() && treat_none_as_absent;
        match self {
            ValueMap::Empty => ValueMap::create(key, value, treat_none_as_absent),
            ValueMap::Linear(bindings) => {
                let position = bindings.iter().position(|(k, _)| *k == key);
                match (position, remove) {
                    (None, true) => self.clone(),
                    (Some(_), true) if bindings.len() == 1 => ValueMap::Empty,
                    (Some(index), true) => ValueMap::Linear(
                        bindings
                            .iter()
                            .enumerate()
                            .filter(|(i, _)| *i != index)
                            .map(|(_, binding)| binding.clone())
                            .collect(),
                    ),
                    (Some(index), false) => {
                        let mut updated = bindings.to_vec();
                        updated[index].1 = value;
                        ValueMap::Linear(Arc::from(updated))
                    }
                    (None, false) if bindings.len() < LINEAR_CAPACITY => {
                        let mut updated = Vec::with_capacity(bindings.len() + 1);
                        updated.extend(bindings.iter().cloned());
                        updated.push((key, value));
                        ValueMap::Linear(Arc::from(updated))
                    }
                    (None, false) => {
                        let mut map: HashMap<KeyId, Option<AmbientValue>> = bindings.iter().cloned().collect();
                        map.insert(key, value);
                        ValueMap::Hashed(Arc::new(map))
                    }
                }
            }
            ValueMap::Hashed(map) => {
                if remove {
                    if !map.contains_key(&key) {
                        self.clone()
                    } else if map.len() - 1 <= LINEAR_CAPACITY {
                        ValueMap::Linear(
                            map.iter()
                                .filter(|(k, _)| **k != key)
                                .map(|(k, v)| (*k, v.clone()))
                                .collect(),
                        )
                    } else {
                        let mut updated = (**map).clone();
                        updated.remove(&key);
                        ValueMap::Hashed(Arc::new(updated))
                    }
                } else {
                    let mut updated = (**map).clone();
                    updated.insert(key, value);
                    ValueMap::Hashed(Arc::new(updated))
                }
            }
        }
    }

    fn keys(&self) -> Vec<KeyId> {
        match self {
            ValueMap::Empty => Vec::new(),
            ValueMap::Linear(bindings) => bindings.iter().map(|(k, _)| *k).collect(),
            ValueMap::Hashed(map) => map.keys().copied().collect(),
        }
    }
}

impl Debug for ValueMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys = self.keys();
        keys.sort();
        f.debug_struct("ValueMap").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(v: u32) -> Option<AmbientValue> {
        Some(Arc::new(v))
    }

    fn read(map: &ValueMap, key: u64) -> Option<u32> {
        map.value(KeyId(key)).and_then(|v| v.downcast_ref::<u32>()).copied()
    }

    #[test]
    fn create_with_absent_value_is_empty() {
        assert!(ValueMap::create(KeyId(1), None, true).is_empty());
        let kept = ValueMap::create(KeyId(1), None, false);
        assert_eq!(kept.len(), 1);
        assert!(matches!(kept.get(KeyId(1)), Some(None)));
        assert!(kept.get(KeyId(2)).is_none());
    }

    #[test]
    fn set_never_mutates_the_original() {
        let one = ValueMap::create(KeyId(1), value(10), true);
        let two = one.set(KeyId(2), value(20), true);
        let replaced = two.set(KeyId(1), value(11), true);

        assert_eq!(one.len(), 1);
        assert_eq!(read(&one, 1), Some(10));
        assert_eq!(read(&two, 1), Some(10));
        assert_eq!(read(&two, 2), Some(20));
        assert_eq!(read(&replaced, 1), Some(11));
        assert_eq!(read(&replaced, 2), Some(20));
    }

    #[test]
    fn removal_collapses_to_empty() {
        let map = ValueMap::create(KeyId(1), value(1), true).set(KeyId(2), value(2), true);
        let map = map.set(KeyId(1), None, true);
        assert_eq!(map.len(), 1);
        let map = map.set(KeyId(2), None, true);
        assert!(matches!(map, ValueMap::Empty));
        // removing something that isn't there is a no-op
        assert!(map.set(KeyId(3), None, true).is_empty());
    }

    #[test]
    fn none_binding_retained_when_requested() {
        let map = ValueMap::create(KeyId(1), value(1), false).set(KeyId(1), None, false);
        assert_eq!(map.len(), 1);
        assert!(matches!(map.get(KeyId(1)), Some(None)));
        assert_eq!(read(&map, 1), None);
    }

    #[test]
    fn grows_into_hash_map_and_shrinks_back() {
        let mut map = ValueMap::Empty;
        for i in 0..=LINEAR_CAPACITY as u64 {
            map = map.set(KeyId(i), value(i as u32), true);
        }
        assert!(matches!(map, ValueMap::Hashed(_)));
        assert_eq!(map.len(), LINEAR_CAPACITY + 1);
        for i in 0..=LINEAR_CAPACITY as u64 {
            assert_eq!(read(&map, i), Some(i as u32));
        }

        let shrunk = map.set(KeyId(0), None, true);
        assert!(matches!(shrunk, ValueMap::Linear(_)));
        assert_eq!(shrunk.len(), LINEAR_CAPACITY);
        assert_eq!(read(&shrunk, 0), None);
        assert_eq!(read(&shrunk, 5), Some(5));
        // the larger map is untouched
        assert_eq!(read(&map, 0), Some(0));
    }

    #[test]
    fn identity_comparison() {
        let a = value(1);
        let b = value(1);
        assert!(same_value(a.as_ref(), a.clone().as_ref()));
        assert!(!same_value(a.as_ref(), b.as_ref()));
        assert!(same_value(None, None));
        assert!(!same_value(a.as_ref(), None));
    }
}
