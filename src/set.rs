//! A set of unique values kept in comparator order.

use std::cmp::Ordering;
use std::fmt;
use std::iter::{FromIterator, FusedIterator};

use crate::error::{handle_error, Result};
use crate::map::{AvlTreeMap, Keys as MapKeys};

/// A set of unique values, stored as the keys of an [`AvlTreeMap`] with unit payloads.
///
/// ```
/// use avl_containers::AvlTreeSet;
/// let mut set = AvlTreeSet::new();
/// set.insert(3)?;
/// set.insert(5)?;
/// set.insert(9)?;
/// assert_eq!(set.ceiling(&7), Some(&9));
/// assert_eq!(set.lower(&3), None);
/// set.remove(&5);
/// assert!(!set.contains(&5));
/// # Ok::<(), avl_containers::Error>(())
/// ```
#[derive(Clone)]
pub struct AvlTreeSet<T, C = fn(&T, &T) -> Ordering> {
    map: AvlTreeMap<T, (), C>,
}

/// An iterator over the values of a set, in sorted order.
pub struct Iter<'a, T> {
    map_keys: MapKeys<'a, T, ()>,
}

impl<T: Ord> AvlTreeSet<T> {
    /// Creates an empty set ordered by `Ord`.
    pub fn new() -> Self {
        Self {
            map: AvlTreeMap::new(),
        }
    }
}

impl<T, C> AvlTreeSet<T, C>
where
    C: Fn(&T, &T) -> Ordering,
{
    /// Creates an empty set ordered by `compare`.
    pub fn with_comparator(compare: C) -> Self {
        Self {
            map: AvlTreeMap::with_comparator(compare),
        }
    }

    /// Returns the stored value that compares equal to `value`.
    pub fn get(&self, value: &T) -> Option<&T> {
        self.map.get_key_value(value).map(|(stored, _)| stored)
    }

    pub fn contains(&self, value: &T) -> bool {
        self.map.contains_key(value)
    }

    /// Adds `value` to the set.
    /// Returns whether the value was newly inserted; an equal value already
    /// in the set is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`](crate::Error::OutOfMemory) if a new node
    /// could not be allocated. The set is left unchanged in that case.
    pub fn insert(&mut self, value: T) -> Result<bool> {
        Ok(self.map.insert(value, ())?.is_none())
    }

    /// Removes `value`, returning whether it was present.
    pub fn remove(&mut self, value: &T) -> bool {
        self.map.remove(value).is_some()
    }

    /// Removes `value` and hands back the stored equal value.
    pub fn take(&mut self, value: &T) -> Option<T> {
        self.map.remove_entry(value).map(|(stored, _)| stored)
    }

    /// Returns the smallest value in the set.
    pub fn first(&self) -> Option<&T> {
        self.map.first()
    }

    /// Returns the largest value in the set.
    pub fn last(&self) -> Option<&T> {
        self.map.last()
    }

    /// Returns the greatest value strictly less than the given value.
    pub fn lower(&self, value: &T) -> Option<&T> {
        self.map.lower(value)
    }

    /// Returns the least value strictly greater than the given value.
    pub fn higher(&self, value: &T) -> Option<&T> {
        self.map.higher(value)
    }

    /// Returns the greatest value less than or equal to the given value.
    pub fn floor(&self, value: &T) -> Option<&T> {
        self.map.floor(value)
    }

    /// Returns the least value greater than or equal to the given value.
    pub fn ceiling(&self, value: &T) -> Option<&T> {
        self.map.ceiling(value)
    }

    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        self.map.check_consistency()
    }
}

impl<T, C> AvlTreeSet<T, C> {
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of values in the set.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Removes every value.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Gets an iterator over the values of the set in sorted order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            map_keys: self.map.keys(),
        }
    }

    /// Returns the height of the tree, counted in edges.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn height(&self) -> usize {
        self.map.height()
    }
}

impl<T: Ord> Default for AvlTreeSet<T> {
    /// Creates an empty set.
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord> FromIterator<T> for AvlTreeSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<T, C> Extend<T> for AvlTreeSet<T, C>
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

impl<T: fmt::Debug, C> fmt::Debug for AvlTreeSet<T, C> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_set().entries(self.iter()).finish()
    }
}

impl<'a, T, C> IntoIterator for &'a AvlTreeSet<T, C> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            map_keys: self.map_keys.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;
    fn next(&mut self) -> Option<Self::Item> {
        self.map_keys.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.map_keys.size_hint()
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.map_keys.next_back()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}
