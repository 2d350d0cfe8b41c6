use avl_containers::{AvlTreeMap, AvlTreeMultiMap, AvlTreeMultiSet, AvlTreeSet, Result};

fn main() -> Result<()> {
    let mut map = AvlTreeMap::new();
    map.insert(0, "zero")?;
    map.insert(1, "one")?;
    map.insert(2, "two")?;
    map.insert(2, "deux")?;
    map.insert(5, "five")?;
    assert_eq!(map.get(&2), Some(&"deux"));
    map.remove(&1);
    assert!(map.get(&1).is_none());
    assert_eq!(map.floor(&4), Some(&2));

    for (k, v) in &map {
        println!("{k} => {v}");
    }

    let mut set = AvlTreeSet::with_comparator(|a: &i32, b: &i32| b.cmp(a));
    for x in 0..5 {
        set.insert(x)?;
    }
    set.remove(&1);
    println!("descending: {set:?}");

    let mut index = AvlTreeMultiMap::new();
    for (line, text) in ["a b", "b c", "a c"].into_iter().enumerate() {
        for word in text.split(' ') {
            index.insert(word, line)?;
        }
    }
    for word in ["a", "b", "c"] {
        let lines: Vec<_> = index.get_all(&word).collect();
        println!("{word} appears on lines {lines:?}");
    }

    let letters: AvlTreeMultiSet<char> = "mississippi".chars().collect();
    for (letter, count) in &letters {
        println!("{letter}: {count}");
    }

    Ok(())
}
