//! An ordered multimap implemented with an AVL tree.
//!
//! Each distinct key owns one tree node. The values stored under a key are kept
//! in insertion order in that node, so the tree shape only depends on the set of
//! distinct keys.

use std::alloc::Layout;
use std::cmp::Ordering;
use std::fmt;
use std::iter::{FromIterator, FusedIterator};
use std::slice;

use crate::error::{handle_error, Error, Result};
use crate::tree::{self, Entry, RawTree};

/// An ordered map that can hold several values per key.
///
/// Keys are ordered by the key comparator. Values are compared with the value
/// comparator only to find the occurrence to remove in [`remove`](Self::remove).
///
/// ```
/// use avl_containers::AvlTreeMultiMap;
/// let mut map = AvlTreeMultiMap::new();
/// map.insert(5, "a")?;
/// map.insert(5, "b")?;
/// assert_eq!(map.count(&5), 2);
/// assert_eq!(map.get_all(&5).collect::<Vec<_>>(), [&"a", &"b"]);
/// map.remove(&5, &"a");
/// assert_eq!(map.count(&5), 1);
/// # Ok::<(), avl_containers::Error>(())
/// ```
#[derive(Clone)]
pub struct AvlTreeMultiMap<K, V, C = fn(&K, &K) -> Ordering, VC = fn(&V, &V) -> Ordering> {
    tree: RawTree<K, Vec<V>, C>,
    compare_values: VC,
    len: usize,
}

/// An iterator over the values stored under one key, in insertion order.
///
/// This `struct` is created by the [`get_all`] method on [`AvlTreeMultiMap`].
///
/// [`get_all`]: AvlTreeMultiMap::get_all
pub struct Values<'a, V> {
    inner: slice::Iter<'a, V>,
}

/// An iterator over all key-value pairs of a multimap,
/// sorted by key and in insertion order per key.
pub struct Iter<'a, K, V> {
    nodes: tree::Iter<'a, K, Vec<V>>,
    current: Option<(&'a K, slice::Iter<'a, V>)>,
    remaining: usize,
}

impl<K: Ord, V: Ord> AvlTreeMultiMap<K, V> {
    /// Creates an empty multimap ordering keys and values by `Ord`.
    pub fn new() -> Self {
        Self::with_comparators(K::cmp, V::cmp)
    }
}

impl<K, V, C, VC> AvlTreeMultiMap<K, V, C, VC>
where
    C: Fn(&K, &K) -> Ordering,
    VC: Fn(&V, &V) -> Ordering,
{
    /// Creates an empty multimap with the given key and value comparators.
    pub fn with_comparators(compare_keys: C, compare_values: VC) -> Self {
        Self {
            tree: RawTree::new(compare_keys),
            compare_values,
            len: 0,
        }
    }

    /// Adds a key-value pair. Values under an existing key are appended after
    /// the ones already stored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if the node or the value slot could not
    /// be allocated, and [`Error::CapacityOverflow`] if the element count would
    /// overflow. The multimap is left unchanged in both cases.
    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        let len = self.len.checked_add(1).ok_or(Error::CapacityOverflow)?;
        match self.tree.entry(&key) {
            Entry::Occupied(mut entry) => {
                let values = entry.payload_mut();
                reserve_value(values)?;
                values.push(value);
            }
            Entry::Vacant(entry) => {
                let mut values = Vec::new();
                reserve_value(&mut values)?;
                values.push(value);
                entry.insert(key, values)?;
            }
        }
        self.len = len;
        Ok(())
    }

    /// Returns the number of values stored under the key.
    pub fn count(&self, key: &K) -> usize {
        self.tree.get(key).map_or(0, |(_, values)| values.len())
    }

    /// Returns true if at least one value is stored under the key.
    pub fn contains_key(&self, key: &K) -> bool {
        self.tree.contains(key)
    }

    /// Gets an iterator over the values stored under the key, in insertion order.
    /// The iterator is empty if the key is absent.
    ///
    /// The iterator borrows the multimap, so it cannot outlive a mutation.
    pub fn get_all(&self, key: &K) -> Values<'_, V> {
        let values: &[V] = match self.tree.get(key) {
            Some((_, values)) => values,
            None => &[],
        };
        Values {
            inner: values.iter(),
        }
    }

    /// Removes the first value under the key that compares equal to `value`.
    /// The key itself is removed together with its last value.
    /// Returns whether such a value was found.
    pub fn remove(&mut self, key: &K, value: &V) -> bool {
        let Entry::Occupied(mut entry) = self.tree.entry(key) else {
            return false;
        };
        let compare_values = &self.compare_values;
        let values = entry.payload_mut();
        let Some(index) = values
            .iter()
            .position(|stored| compare_values(stored, value) == Ordering::Equal)
        else {
            return false;
        };
        // Dropped only after the node and length are consistent again
        let removed = values.remove(index);
        let detached = values.is_empty().then(|| entry.remove());
        self.len -= 1;
        drop(detached);
        drop(removed);
        true
    }

    /// Removes the key together with all of its values.
    /// Returns whether the key was present.
    pub fn remove_all(&mut self, key: &K) -> bool {
        match self.tree.entry(key) {
            Entry::Occupied(entry) => {
                let (_key, values) = entry.remove();
                self.len -= values.len();
                true
            }
            Entry::Vacant(_) => false,
        }
    }

    /// Returns the smallest key in the multimap.
    pub fn first(&self) -> Option<&K> {
        self.tree.first()
    }

    /// Returns the largest key in the multimap.
    pub fn last(&self) -> Option<&K> {
        self.tree.last()
    }

    /// Returns the greatest key strictly less than the given key.
    pub fn lower(&self, key: &K) -> Option<&K> {
        self.tree.lower(key)
    }

    /// Returns the least key strictly greater than the given key.
    pub fn higher(&self, key: &K) -> Option<&K> {
        self.tree.higher(key)
    }

    /// Returns the greatest key less than or equal to the given key.
    pub fn floor(&self, key: &K) -> Option<&K> {
        self.tree.floor(key)
    }

    /// Returns the least key greater than or equal to the given key.
    pub fn ceiling(&self, key: &K) -> Option<&K> {
        self.tree.ceiling(key)
    }

    /// Asserts that the internal tree structure is consistent and that the
    /// length matches the stored values.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        self.tree.check_consistency();
        let mut len = 0;
        for (_, values) in self.tree.iter() {
            assert!(!values.is_empty());
            len += values.len();
        }
        assert_eq!(len, self.len);
    }

    /// Distinct keys with their stored balance factors, in preorder.
    #[cfg(test)]
    pub(crate) fn preorder_balances(&self) -> Vec<(&K, i8)> {
        self.tree.preorder_balances()
    }
}

impl<K, V, C, VC> AvlTreeMultiMap<K, V, C, VC> {
    /// Returns true if the multimap contains no values.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the total number of values, counting every occurrence.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns the number of distinct keys.
    pub fn keys_len(&self) -> usize {
        self.tree.len()
    }

    /// Clears the multimap, deallocating all memory.
    pub fn clear(&mut self) {
        self.len = 0;
        self.tree.clear();
    }

    /// Gets an iterator over all key-value pairs,
    /// sorted by key and in insertion order per key.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            nodes: self.tree.iter(),
            current: None,
            remaining: self.len,
        }
    }

    /// Returns the height of the tree, counted in edges.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn height(&self) -> usize {
        self.tree.height()
    }
}

fn reserve_value<V>(values: &mut Vec<V>) -> Result<()> {
    values
        .try_reserve(1)
        .map_err(|_| match Layout::array::<V>(values.len() + 1) {
            Ok(layout) => Error::OutOfMemory { layout },
            Err(_) => Error::CapacityOverflow,
        })
}

impl<K: Ord, V: Ord> Default for AvlTreeMultiMap<K, V> {
    /// Creates an empty multimap.
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C, VC> fmt::Debug for AvlTreeMultiMap<K, V, C, VC> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_map().entries(self.tree.iter()).finish()
    }
}

impl<K: Ord, V: Ord> FromIterator<(K, V)> for AvlTreeMultiMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K, V, C, VC> Extend<(K, V)> for AvlTreeMultiMap<K, V, C, VC>
where
    C: Fn(&K, &K) -> Ordering,
    VC: Fn(&V, &V) -> Ordering,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            if let Err(err) = self.insert(key, value) {
                handle_error(err);
            }
        }
    }
}

impl<'a, K, V, C, VC> IntoIterator for &'a AvlTreeMultiMap<K, V, C, VC> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, V> Iterator for Values<'a, V> {
    type Item = &'a V;
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> DoubleEndedIterator for Values<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<V> ExactSizeIterator for Values<'_, V> {}

impl<V> FusedIterator for Values<'_, V> {}

impl<V> Clone for Values<'_, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Values<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((key, values)) = &mut self.current {
                if let Some(value) = values.next() {
                    self.remaining -= 1;
                    return Some((*key, value));
                }
            }
            let (key, values) = self.nodes.next()?;
            self.current = Some((key, values.iter()));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            current: self.current.clone(),
            remaining: self.remaining,
        }
    }
}
