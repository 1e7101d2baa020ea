use rand::Rng;
use std::collections::HashSet as StdHashSet;
use swisstable::HashSet;

#[test]
fn three_elements_from_empty() {
    let mut set = HashSet::new();
    assert_eq!(set.bucket_count(), 0);
    assert!(set.insert(1));
    assert!(set.insert(2));
    assert!(set.insert(3));
    assert!(!set.insert(2));
    assert_eq!(set.len(), 3);
    assert!(set.contains(&2));
    assert!(!set.contains(&4));
    let mut seen = StdHashSet::new();
    for &v in set.iter() {
        assert!(seen.insert(v), "duplicate {v} during iteration");
    }
    assert_eq!(seen, StdHashSet::from([1, 2, 3]));
}

#[test]
fn take_returns_the_stored_value() {
    let mut set = HashSet::new();
    set.insert("alpha".to_string());
    assert_eq!(set.take("alpha"), Some("alpha".to_string()));
    assert_eq!(set.take("alpha"), None);
    assert!(!set.remove("alpha"));
}

#[test]
fn get_borrows_the_resident_value() {
    let mut set = HashSet::new();
    set.insert("alpha".to_string());
    assert_eq!(set.get("alpha").map(String::as_str), Some("alpha"));
    assert_eq!(set.get("beta"), None);
}

#[test]
fn churn_survives_tombstones() {
    let mut set = HashSet::with_capacity(64);
    for round in 0..100u64 {
        for v in 0..48u64 {
            set.insert(v);
        }
        for v in 0..48u64 {
            if (v + round) % 3 == 0 {
                assert!(set.remove(&v));
            }
        }
        for v in 0..48u64 {
            assert_eq!(set.contains(&v), (v + round) % 3 != 0);
        }
    }
}

#[test]
fn clone_and_equality() {
    let a: HashSet<u64> = (0..200).collect();
    let mut b = a.clone();
    assert_eq!(a, b);
    b.insert(200);
    assert_ne!(a, b);
    b.remove(&200);
    assert_eq!(a, b);
    b.remove(&0);
    b.insert(500);
    assert_ne!(a, b);
    assert!(a.contains(&0));
}

#[test]
fn append_is_union_in_place() {
    let mut a: HashSet<u64> = (0..100).collect();
    let mut b: HashSet<u64> = (50..150).collect();
    a.append(&mut b);
    assert!(b.is_empty());
    assert_eq!(a.len(), 150);
    assert_eq!(a, (0..150).collect());
}

#[test]
fn retain_drain_and_reset() {
    let mut set: HashSet<u64> = (0..100).collect();
    set.retain(|&v| v < 10);
    assert_eq!(set.len(), 10);
    let drained: StdHashSet<u64> = set.drain().collect();
    assert_eq!(drained, (0..10).collect());
    assert!(set.is_empty());
    assert!(set.bucket_count() > 0);
    set.reset();
    assert_eq!(set.bucket_count(), 0);
    set.insert(7);
    assert!(set.contains(&7));
}

#[test]
fn randomized_against_std() {
    let mut rng = rand::thread_rng();
    let mut ours = HashSet::new();
    let mut reference = StdHashSet::new();
    for _ in 0..100_000 {
        let value: u16 = rng.gen_range(0..4096);
        match rng.gen_range(0..10) {
            0..=5 => assert_eq!(ours.insert(value), reference.insert(value)),
            6..=8 => assert_eq!(ours.remove(&value), reference.remove(&value)),
            _ => assert_eq!(ours.contains(&value), reference.contains(&value)),
        }
        assert_eq!(ours.len(), reference.len());
    }
    let collected: StdHashSet<u16> = ours.into_iter().collect();
    assert_eq!(collected, reference);
}

#[test]
fn rehash_keeps_membership() {
    let mut set: HashSet<u64> = (0..500).collect();
    set.rehash(2000);
    assert!(set.bucket_count() >= 2048);
    for v in 0..500 {
        assert!(set.contains(&v));
    }
    set.shrink_to_fit();
    assert!(set.bucket_count() < 2048);
    for v in 0..500 {
        assert!(set.contains(&v));
    }
    assert_eq!(set.len(), 500);
}
