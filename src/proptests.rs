use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Included, Unbounded};

use proptest::prelude::*;

use crate::{AvlTreeMap, AvlTreeMultiMap, AvlTreeMultiSet, AvlTreeSet};

#[derive(Clone, Debug)]
enum Op {
    Insert(i16, u8),
    Remove(i16),
    Get(i16),
    Neighbours(i16),
    Clear,
}

#[derive(Clone, Debug)]
enum MultiOp {
    Insert(i16, u8),
    Remove(i16, u8),
    RemoveAll(i16),
}

// A narrow key range so that removals and duplicates actually hit stored keys
fn key_strategy() -> impl Strategy<Value = i16> + Clone {
    -200i16..200
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        50 => (key.clone(), any::<u8>()).prop_map(|(k, v)| Op::Insert(k, v)),
        30 => key.clone().prop_map(Op::Remove),
        10 => key.clone().prop_map(Op::Get),
        9 => key.clone().prop_map(Op::Neighbours),
        1 => Just(Op::Clear),
    ];
    prop::collection::vec(op, 0..=1000)
}

fn multi_ops_strategy() -> impl Strategy<Value = Vec<MultiOp>> {
    let key = -30i16..30;
    let op = prop_oneof![
        60 => (key.clone(), 0u8..4).prop_map(|(k, v)| MultiOp::Insert(k, v)),
        30 => (key.clone(), 0u8..4).prop_map(|(k, v)| MultiOp::Remove(k, v)),
        10 => key.prop_map(MultiOp::RemoveAll),
    ];
    prop::collection::vec(op, 0..=1000)
}

fn max_levels(len: usize) -> f64 {
    1.4405 * ((len + 2) as f64).log2()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_map_equivalence(ops in ops_strategy()) {
        let mut t: AvlTreeMap<i16, u8> = AvlTreeMap::new();
        let mut m: BTreeMap<i16, u8> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let old_t = t.insert(key, value);
                    let old_m = m.insert(key, value);
                    prop_assert_eq!(old_t, Ok(old_m));
                }
                Op::Remove(key) => {
                    prop_assert_eq!(t.remove(&key), m.remove(&key));
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.get(&key), m.get(&key));
                }
                Op::Neighbours(key) => {
                    let lower = m.range((Unbounded, Excluded(key))).next_back().map(|(k, _)| k);
                    let floor = m.range((Unbounded, Included(key))).next_back().map(|(k, _)| k);
                    let higher = m.range((Excluded(key), Unbounded)).next().map(|(k, _)| k);
                    let ceiling = m.range((Included(key), Unbounded)).next().map(|(k, _)| k);
                    prop_assert_eq!(t.lower(&key), lower);
                    prop_assert_eq!(t.floor(&key), floor);
                    prop_assert_eq!(t.higher(&key), higher);
                    prop_assert_eq!(t.ceiling(&key), ceiling);
                }
                Op::Clear => {
                    t.clear();
                    m.clear();
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        t.check_consistency();
        prop_assert!((t.height() + 1) as f64 <= max_levels(t.len()));
        prop_assert_eq!(t.first(), m.keys().next());
        prop_assert_eq!(t.last(), m.keys().next_back());
        let got: Vec<(i16, u8)> = t.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<(i16, u8)> = m.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_balanced_after_every_step(keys in prop::collection::vec(key_strategy(), 0..=300)) {
        let mut set = AvlTreeSet::new();
        for key in &keys {
            set.insert(*key).unwrap();
            set.check_consistency();
        }
        for key in keys.iter().rev().step_by(2) {
            set.remove(key);
            set.check_consistency();
            prop_assert!((set.height() + 1) as f64 <= max_levels(set.len()));
        }
    }

    #[test]
    fn prop_insert_remove_extra_restores_contents(
        keys in prop::collection::btree_set(key_strategy(), 0..=200),
        extra in 200i16..400,
    ) {
        let mut set: AvlTreeSet<i16> = keys.iter().copied().collect();
        let before: Vec<i16> = set.iter().copied().collect();
        prop_assert!(set.insert(extra).unwrap());
        prop_assert!(set.remove(&extra));
        set.check_consistency();
        let after: Vec<i16> = set.iter().copied().collect();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn prop_multimap_equivalence(ops in multi_ops_strategy()) {
        let mut t: AvlTreeMultiMap<i16, u8> = AvlTreeMultiMap::new();
        let mut m: BTreeMap<i16, Vec<u8>> = BTreeMap::new();

        for op in ops {
            match op {
                MultiOp::Insert(key, value) => {
                    t.insert(key, value).unwrap();
                    m.entry(key).or_default().push(value);
                }
                MultiOp::Remove(key, value) => {
                    let values = m.entry(key).or_default();
                    let position = values.iter().position(|stored| *stored == value);
                    if let Some(position) = position {
                        values.remove(position);
                    }
                    if values.is_empty() {
                        m.remove(&key);
                    }
                    prop_assert_eq!(t.remove(&key, &value), position.is_some());
                }
                MultiOp::RemoveAll(key) => {
                    prop_assert_eq!(t.remove_all(&key), m.remove(&key).is_some());
                }
            }
        }

        t.check_consistency();
        prop_assert_eq!(t.len(), m.values().map(Vec::len).sum::<usize>());
        prop_assert_eq!(t.keys_len(), m.len());
        for (key, values) in &m {
            prop_assert_eq!(t.count(key), values.len());
            prop_assert_eq!(t.get_all(key).copied().collect::<Vec<_>>(), values.clone());
        }
    }

    #[test]
    fn prop_multiset_equivalence(ops in multi_ops_strategy()) {
        let mut t: AvlTreeMultiSet<i16> = AvlTreeMultiSet::new();
        let mut m: BTreeMap<i16, usize> = BTreeMap::new();

        for op in ops {
            match op {
                MultiOp::Insert(key, _) => {
                    t.insert(key).unwrap();
                    *m.entry(key).or_default() += 1;
                }
                MultiOp::Remove(key, _) => {
                    let present = match m.get_mut(&key) {
                        Some(count) if *count > 1 => {
                            *count -= 1;
                            true
                        }
                        Some(_) => {
                            m.remove(&key);
                            true
                        }
                        None => false,
                    };
                    prop_assert_eq!(t.remove(&key), present);
                }
                MultiOp::RemoveAll(key) => {
                    prop_assert_eq!(t.remove_all(&key), m.remove(&key).unwrap_or(0));
                }
            }
        }

        t.check_consistency();
        let got: Vec<(i16, usize)> = t.iter().map(|(k, c)| (*k, c)).collect();
        let expected: Vec<(i16, usize)> = m.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_clone_is_independent(keys in prop::collection::vec(key_strategy(), 1..=200)) {
        let mut map: AvlTreeMap<i16, usize> = AvlTreeMap::new();
        for (index, key) in keys.iter().enumerate() {
            map.insert(*key, index).unwrap();
        }
        let cloned = map.clone();
        prop_assert_eq!(map.preorder_balances(), cloned.preorder_balances());
        let expected: Vec<(i16, usize)> = cloned.iter().map(|(k, v)| (*k, *v)).collect();
        map.remove(&keys[0]);
        let got: Vec<(i16, usize)> = cloned.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(got, expected);
        cloned.check_consistency();
    }
}
