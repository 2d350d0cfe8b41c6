//! An ordered multiset implemented with an AVL tree.

use std::cmp::Ordering;
use std::fmt;
use std::iter::{FromIterator, FusedIterator};

use crate::error::{handle_error, Error, Result};
use crate::tree::{self, Entry, RawTree};

/// An ordered set that counts repeated insertions of equal values.
///
/// Each distinct value occupies one tree node with an occurrence count.
/// The first inserted representative of a value is the one that is kept.
///
/// ```
/// use avl_containers::AvlTreeMultiSet;
/// let mut set = AvlTreeMultiSet::new();
/// set.insert("x")?;
/// set.insert("x")?;
/// set.insert("y")?;
/// assert_eq!(set.count(&"x"), 2);
/// assert_eq!(set.len(), 3);
/// set.remove(&"x");
/// assert_eq!(set.count(&"x"), 1);
/// # Ok::<(), avl_containers::Error>(())
/// ```
#[derive(Clone)]
pub struct AvlTreeMultiSet<T, C = fn(&T, &T) -> Ordering> {
    tree: RawTree<T, usize, C>,
    len: usize,
}

/// An iterator over the distinct values of a multiset and their counts,
/// in sorted order.
pub struct Iter<'a, T> {
    inner: tree::Iter<'a, T, usize>,
}

impl<T: Ord> AvlTreeMultiSet<T> {
    /// Creates an empty multiset ordered by `Ord`.
    pub fn new() -> Self {
        Self::with_comparator(T::cmp)
    }
}

impl<T, C> AvlTreeMultiSet<T, C>
where
    C: Fn(&T, &T) -> Ordering,
{
    /// Creates an empty multiset ordered by `compare`.
    pub fn with_comparator(compare: C) -> Self {
        Self {
            tree: RawTree::new(compare),
            len: 0,
        }
    }

    /// Adds one occurrence of a value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if a new node could not be allocated and
    /// [`Error::CapacityOverflow`] if a counter would overflow. The multiset is
    /// left unchanged in both cases.
    pub fn insert(&mut self, value: T) -> Result<()> {
        let len = self.len.checked_add(1).ok_or(Error::CapacityOverflow)?;
        match self.tree.entry(&value) {
            Entry::Occupied(mut entry) => {
                let count = entry.payload_mut();
                *count = count.checked_add(1).ok_or(Error::CapacityOverflow)?;
            }
            Entry::Vacant(entry) => {
                entry.insert(value, 1)?;
            }
        }
        self.len = len;
        Ok(())
    }

    /// Returns the number of occurrences of the value.
    pub fn count(&self, value: &T) -> usize {
        self.tree.get(value).map_or(0, |(_, count)| *count)
    }

    /// Returns true if the multiset holds at least one occurrence of the value.
    pub fn contains(&self, value: &T) -> bool {
        self.tree.contains(value)
    }

    /// Returns a reference to the stored representative of the value.
    pub fn get(&self, value: &T) -> Option<&T> {
        self.tree.get(value).map(|(stored, _)| stored)
    }

    /// Removes one occurrence of the value.
    /// Returns whether an occurrence was present.
    pub fn remove(&mut self, value: &T) -> bool {
        let Entry::Occupied(mut entry) = self.tree.entry(value) else {
            return false;
        };
        let count = entry.payload_mut();
        let detached = if *count > 1 {
            *count -= 1;
            None
        } else {
            Some(entry.remove())
        };
        self.len -= 1;
        drop(detached);
        true
    }

    /// Removes every occurrence of the value.
    /// Returns the number of occurrences removed.
    pub fn remove_all(&mut self, value: &T) -> usize {
        match self.tree.entry(value) {
            Entry::Occupied(entry) => {
                let (_value, count) = entry.remove();
                self.len -= count;
                count
            }
            Entry::Vacant(_) => 0,
        }
    }

    /// Returns the smallest value in the multiset.
    pub fn first(&self) -> Option<&T> {
        self.tree.first()
    }

    /// Returns the largest value in the multiset.
    pub fn last(&self) -> Option<&T> {
        self.tree.last()
    }

    /// Returns the greatest value strictly less than the given value.
    pub fn lower(&self, value: &T) -> Option<&T> {
        self.tree.lower(value)
    }

    /// Returns the least value strictly greater than the given value.
    pub fn higher(&self, value: &T) -> Option<&T> {
        self.tree.higher(value)
    }

    /// Returns the greatest value less than or equal to the given value.
    pub fn floor(&self, value: &T) -> Option<&T> {
        self.tree.floor(value)
    }

    /// Returns the least value greater than or equal to the given value.
    pub fn ceiling(&self, value: &T) -> Option<&T> {
        self.tree.ceiling(value)
    }

    /// Asserts that the internal tree structure is consistent and that the
    /// length matches the stored counts.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        self.tree.check_consistency();
        let mut len = 0;
        for (_, count) in self.tree.iter() {
            assert!(*count > 0);
            len += count;
        }
        assert_eq!(len, self.len);
    }

    /// Distinct values with their stored balance factors, in preorder.
    #[cfg(test)]
    pub(crate) fn preorder_balances(&self) -> Vec<(&T, i8)> {
        self.tree.preorder_balances()
    }
}

impl<T, C> AvlTreeMultiSet<T, C> {
    /// Returns true if the multiset holds no values.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the total number of occurrences.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns the number of distinct values.
    pub fn distinct_len(&self) -> usize {
        self.tree.len()
    }

    /// Clears the multiset, deallocating all memory.
    pub fn clear(&mut self) {
        self.len = 0;
        self.tree.clear();
    }

    /// Gets an iterator over the distinct values and their counts, in sorted order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.tree.iter(),
        }
    }

    /// Returns the height of the tree, counted in edges.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn height(&self) -> usize {
        self.tree.height()
    }
}

impl<T: Ord> Default for AvlTreeMultiSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug, C> fmt::Debug for AvlTreeMultiSet<T, C> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_map().entries(self.iter()).finish()
    }
}

impl<T: Ord> FromIterator<T> for AvlTreeMultiSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<T, C> Extend<T> for AvlTreeMultiSet<T, C>
where
    C: Fn(&T, &T) -> Ordering,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            if let Err(err) = self.insert(value) {
                handle_error(err);
            }
        }
    }
}

impl<'a, T, C> IntoIterator for &'a AvlTreeMultiSet<T, C> {
    type Item = (&'a T, usize);
    type IntoIter = Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (&'a T, usize);
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(value, count)| (value, *count))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(value, count)| (value, *count))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
