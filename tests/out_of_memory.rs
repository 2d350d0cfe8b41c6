use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

use avl_containers::{AvlTreeMap, AvlTreeMultiMap, AvlTreeMultiSet, AvlTreeSet, Error};

/// Delegates to the system allocator unless failures were requested on the current thread.
struct FailingAllocator;

thread_local! {
    static FAIL: Cell<bool> = const { Cell::new(false) };
}

unsafe impl GlobalAlloc for FailingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if FAIL.with(Cell::get) {
            return std::ptr::null_mut();
        }
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if FAIL.with(Cell::get) {
            return std::ptr::null_mut();
        }
        System.realloc(ptr, layout, new_size)
    }
}

#[global_allocator]
static ALLOCATOR: FailingAllocator = FailingAllocator;

/// Runs `f` with every allocation on this thread failing.
fn without_memory<T>(f: impl FnOnce() -> T) -> T {
    FAIL.with(|fail| fail.set(true));
    let result = f();
    FAIL.with(|fail| fail.set(false));
    result
}

#[test]
fn map_insert_is_atomic() {
    let mut map = AvlTreeMap::new();
    for key in 0..100 {
        map.insert(key, key * 10).unwrap();
    }

    let result = without_memory(|| map.insert(1000, 0));
    assert!(matches!(result, Err(Error::OutOfMemory { .. })));
    assert_eq!(map.len(), 100);
    assert!(!map.contains_key(&1000));
    assert!(map.keys().copied().eq(0..100));

    // Overwriting needs no allocation
    let result = without_memory(|| map.insert(5, 55));
    assert_eq!(result, Ok(Some(50)));

    assert_eq!(map.insert(1000, 0), Ok(None));
    assert_eq!(map.len(), 101);
}

#[test]
fn set_insert_is_atomic() {
    let mut set: AvlTreeSet<u32> = (0..10).collect();
    let result = without_memory(|| set.insert(42));
    assert!(matches!(result, Err(Error::OutOfMemory { .. })));
    assert!(!set.contains(&42));
    assert_eq!(set.len(), 10);

    // Removal only frees memory
    let removed = without_memory(|| set.remove(&3));
    assert!(removed);
    assert_eq!(set.len(), 9);
}

#[test]
fn multimap_insert_is_atomic() {
    let mut map = AvlTreeMultiMap::new();
    map.insert(1, 10).unwrap();

    // A new key needs a node
    let result = without_memory(|| map.insert(2, 20));
    assert!(matches!(result, Err(Error::OutOfMemory { .. })));
    assert!(!map.contains_key(&2));

    // An existing key fails once its spare value slots are used up
    let mut stored = 1;
    let err = without_memory(|| loop {
        match map.insert(1, 11) {
            Ok(()) => stored += 1,
            Err(err) => break err,
        }
    });
    assert!(matches!(err, Error::OutOfMemory { .. }));
    assert_eq!(map.count(&1), stored);
    assert_eq!(map.len(), stored);
    assert_eq!(map.get_all(&1).next(), Some(&10));
    assert!(map.get_all(&1).skip(1).all(|value| *value == 11));
}

#[test]
fn multiset_insert_is_atomic() {
    let mut set = AvlTreeMultiSet::new();
    set.insert('a').unwrap();

    let result = without_memory(|| set.insert('b'));
    assert!(matches!(result, Err(Error::OutOfMemory { .. })));
    assert_eq!(set.len(), 1);
    assert!(!set.contains(&'b'));

    // Counting another occurrence needs no allocation
    assert_eq!(without_memory(|| set.insert('a')), Ok(()));
    assert_eq!(set.count(&'a'), 2);
}

#[test]
fn clear_needs_no_memory() {
    let mut map: AvlTreeMap<i32, String> = (0..50).map(|key| (key, key.to_string())).collect();
    without_memory(|| map.clear());
    assert!(map.is_empty());
}
