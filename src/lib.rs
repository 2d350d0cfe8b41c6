//! Ordered containers built on a single AVL tree engine.
//!
//! The crate provides a map with unique keys, a set of unique values, a
//! multimap that keeps every value inserted under a key, and a multiset that
//! counts repeated values. All four keep their entries sorted by a three-way
//! comparator and answer ordered queries such as `floor` and `ceiling` in
//! logarithmic time.
//!
//! Operations that may allocate return [`Result`]. On failure the container
//! is left exactly as it was before the call.
//!
//! ```
//! use avl_containers::{AvlTreeMap, AvlTreeMultiSet};
//!
//! let mut map = AvlTreeMap::new();
//! map.insert(3, "three")?;
//! map.insert(1, "one")?;
//! assert_eq!(map.first(), Some(&1));
//! assert_eq!(map.higher(&1), Some(&3));
//!
//! let words: AvlTreeMultiSet<_> = "a b a c a".split(' ').collect();
//! assert_eq!(words.count(&"a"), 3);
//! # Ok::<(), avl_containers::Error>(())
//! ```

mod error;
pub mod map;
pub mod multimap;
pub mod multiset;
pub mod set;
mod tree;

pub use error::{Error, Result};
pub use map::AvlTreeMap;
pub use multimap::AvlTreeMultiMap;
pub use multiset::AvlTreeMultiSet;
pub use set::AvlTreeSet;

#[cfg(test)]
mod proptests;
