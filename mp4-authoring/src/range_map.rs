//! Sparse map from range starts to values.

use std::collections::{BTreeMap, btree_map};

/// Ordered map where every key marks the start of a range.
///
/// A value stays in effect from its key up to the next greater key, so runs
/// of equal values cost one entry per transition instead of one per index.
///
/// ```
/// use mp4_authoring::RangeStartMap;
///
/// let mut map = RangeStartMap::new();
/// map.put(0, 'a');
/// map.put(10, 'b');
///
/// assert_eq!(map.get(9), Some(&'a'));
/// assert_eq!(map.get(10), Some(&'b'));
/// assert_eq!(map.get(1000), Some(&'b'));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeStartMap<K, V> {
    inner: BTreeMap<K, V>,
}

impl<K: Ord, V> RangeStartMap<K, V> {
    pub fn new() -> Self {
        Self {
            inner: BTreeMap::new(),
        }
    }

    /// Make `value` effective from `start` onward, replacing any value
    /// previously stored at exactly `start`.
    pub fn put(&mut self, start: K, value: V) {
        self.inner.insert(start, value);
    }

    /// Value of the greatest stored key `<= key`.
    ///
    /// Returns `None` when `key` is smaller than every stored key.
    pub fn get(&self, key: K) -> Option<&V> {
        self.inner.range(..=key).next_back().map(|(_, v)| v)
    }

    /// Number of stored range starts.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Stored `(range start, value)` pairs in ascending order.
    pub fn iter(&self) -> btree_map::Iter<'_, K, V> {
        self.inner.iter()
    }
}

impl<K: Ord, V> Default for RangeStartMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
