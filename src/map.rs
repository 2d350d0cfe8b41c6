//! An ordered map implemented with an AVL tree.

use std::cmp::Ordering;
use std::fmt;
use std::iter::{FromIterator, FusedIterator};
use std::mem;

use crate::error::{handle_error, Result};
use crate::tree::{self, Entry, RawTree};

/// An ordered map implemented with an AVL tree.
///
/// Keys are ordered by a three-way comparator, `Ord::cmp` unless another one is
/// supplied with [`with_comparator`](AvlTreeMap::with_comparator).
///
/// ```
/// use avl_containers::AvlTreeMap;
/// let mut map = AvlTreeMap::new();
/// map.insert(0, "zero")?;
/// map.insert(1, "one")?;
/// map.insert(2, "two")?;
/// assert_eq!(map.get(&1), Some(&"one"));
/// assert_eq!(map.floor(&7), Some(&2));
/// map.remove(&1);
/// assert!(map.get(&1).is_none());
/// # Ok::<(), avl_containers::Error>(())
/// ```
#[derive(Clone)]
pub struct AvlTreeMap<K, V, C = fn(&K, &K) -> Ordering> {
    tree: RawTree<K, V, C>,
}

/// An iterator over the entries of a map, sorted by key.
pub struct Iter<'a, K, V> {
    inner: tree::Iter<'a, K, V>,
}

/// An iterator over the keys of a map, in sorted order.
pub struct Keys<'a, K, V> {
    inner: tree::Iter<'a, K, V>,
}

/// An iterator over the values of a map, sorted by key.
pub struct Values<'a, K, V> {
    inner: tree::Iter<'a, K, V>,
}

impl<K: Ord, V> AvlTreeMap<K, V> {
    /// Creates an empty map ordered by `Ord`.
    /// No memory is allocated until the first item is inserted.
    pub fn new() -> Self {
        Self::with_comparator(K::cmp)
    }
}

impl<K, V, C> AvlTreeMap<K, V, C>
where
    C: Fn(&K, &K) -> Ordering,
{
    /// Creates an empty map ordered by `compare`.
    ///
    /// The comparator must be a total order that stays consistent for the
    /// lifetime of the map.
    pub fn with_comparator(compare: C) -> Self {
        Self {
            tree: RawTree::new(compare),
        }
    }

    /// Returns a reference to the value corresponding to the key.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.tree.get(key).map(|(_, value)| value)
    }

    /// Returns references to the key-value pair corresponding to the key.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.tree.get(key)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.tree.get_mut(key)
    }

    /// Returns true if the map contains a value for the key.
    pub fn contains_key(&self, key: &K) -> bool {
        self.tree.contains(key)
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the key is already present its value is overwritten in place, the
    /// stored key is kept and the old value is returned. The length only grows
    /// when the key was absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`](crate::Error::OutOfMemory) if a new node
    /// could not be allocated. The map is left unchanged in that case.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        match self.tree.entry(&key) {
            Entry::Occupied(mut entry) => Ok(Some(mem::replace(entry.payload_mut(), value))),
            Entry::Vacant(entry) => {
                entry.insert(key, value)?;
                Ok(None)
            }
        }
    }

    /// Removes a key from the map.
    /// Returns the value at the key if the key was previously in the map.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes a key from the map.
    /// Returns the stored key and value if the key was previously in the map.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        match self.tree.entry(key) {
            Entry::Occupied(entry) => Some(entry.remove()),
            Entry::Vacant(_) => None,
        }
    }

    /// Returns the smallest key in the map.
    pub fn first(&self) -> Option<&K> {
        self.tree.first()
    }

    /// Returns the largest key in the map.
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

    /// Asserts that the internal tree structure is consistent.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        self.tree.check_consistency()
    }

    /// Keys with their stored balance factors, in preorder.
    #[cfg(test)]
    pub(crate) fn preorder_balances(&self) -> Vec<(&K, i8)> {
        self.tree.preorder_balances()
    }
}

impl<K, V, C> AvlTreeMap<K, V, C> {
    /// Returns true if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the number of elements in the map.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Clears the map, deallocating all memory.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Gets an iterator over the entries of the map, sorted by key.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.tree.iter(),
        }
    }

    /// Gets an iterator over the keys of the map, in sorted order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            inner: self.tree.iter(),
        }
    }

    /// Gets an iterator over the values of the map, sorted by key.
    pub fn values(&self) -> Values<'_, K, V> {
        Values {
            inner: self.tree.iter(),
        }
    }

    /// Returns the height of the tree, counted in edges.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn height(&self) -> usize {
        self.tree.height()
    }
}

impl<K: Ord, V> Default for AvlTreeMap<K, V> {
    /// Creates an empty map.
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for AvlTreeMap<K, V, C> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for AvlTreeMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K, V, C> Extend<(K, V)> for AvlTreeMap<K, V, C>
where
    C: Fn(&K, &K) -> Ordering,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            if let Err(err) = self.insert(key, value) {
                handle_error(err);
            }
        }
    }
}

impl<'a, K, V, C> IntoIterator for &'a AvlTreeMap<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

// Auto derived clone seems to have an invalid type bound of K: Clone
impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(key, _)| key)
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, value)| value)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

impl<K, V> FusedIterator for Values<'_, K, V> {}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
