use rand::Rng;
use std::collections::HashMap as StdHashMap;
use swisstable::{Arena, HashMap};

#[test]
fn round_trip_until_erased() {
    let mut map = HashMap::new();
    for key in 0..100u64 {
        assert_eq!(map.insert(key, key * 2), None);
    }
    for key in 0..100u64 {
        assert_eq!(map.get(&key), Some(&(key * 2)));
    }
    for key in 0..100u64 {
        assert_eq!(map.remove(&key), Some(key * 2));
        assert_eq!(map.get(&key), None);
    }
    assert!(map.is_empty());
}

#[test]
fn erase_absent_is_a_noop() {
    let mut map = HashMap::new();
    map.insert(1u64, 1u64);
    assert_eq!(map.remove(&2), None);
    assert_eq!(map.len(), 1);
    let mut empty = HashMap::<u64, u64>::new();
    assert_eq!(empty.remove(&2), None);
    assert_eq!(empty.len(), 0);
}

#[test]
fn thousand_then_evens_out_thousand_more() {
    let mut map = HashMap::new();
    for key in 0..1000u64 {
        map.insert(key, key);
    }
    for key in (0..1000u64).step_by(2) {
        assert_eq!(map.remove(&key), Some(key));
    }
    for key in 1000..2000u64 {
        map.insert(key, key);
    }
    assert_eq!(map.len(), 1500);
    for key in 0..1000u64 {
        if key % 2 == 0 {
            assert_eq!(map.get(&key), None);
        } else {
            assert_eq!(map.get(&key), Some(&key));
        }
    }
    for key in 1000..2000u64 {
        assert_eq!(map.get(&key), Some(&key));
    }
}

#[test]
fn clone_is_independent() {
    let mut a = HashMap::new();
    a.insert("a".to_string(), 1);
    a.insert("b".to_string(), 2);
    let mut b = a.clone();
    b.insert("c".to_string(), 3);
    *b.get_mut("a").unwrap() = 10;
    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 3);
    assert_eq!(a.get("a"), Some(&1));
    assert_eq!(a.get("b"), Some(&2));
    assert_eq!(a.get("c"), None);
    assert_eq!(b.get("a"), Some(&10));
    assert_eq!(b.get("c"), Some(&3));
}

#[test]
fn growth_preserves_reachability() {
    let mut map = HashMap::new();
    let mut grown_at = Vec::new();
    let mut buckets = map.bucket_count();
    for key in 0..10_000u64 {
        map.insert(key, key);
        if map.bucket_count() != buckets {
            buckets = map.bucket_count();
            grown_at.push(key);
            for old in 0..=key {
                assert_eq!(map.get(&old), Some(&old), "key {old} lost at growth {key}");
            }
        }
    }
    assert!(grown_at.len() >= 5);
}

#[test]
fn capacity_is_zero_or_power_of_two_and_load_bounded() {
    let mut map = HashMap::new();
    assert_eq!(map.bucket_count(), 0);
    assert_eq!(map.load_factor(), 0.0);
    let mut rng = rand::thread_rng();
    for _ in 0..10_000 {
        let key: u16 = rng.gen();
        if rng.gen_bool(0.7) {
            map.insert(key, key);
        } else {
            map.remove(&key);
        }
        assert!(map.bucket_count() == 0 || map.bucket_count().is_power_of_two());
        assert!(map.len() <= map.bucket_count());
        assert!(map.load_factor() <= 0.82, "lf={}", map.load_factor());
    }
}

#[test]
fn rehash_and_shrink_preserve_content() {
    let mut map = HashMap::new();
    for key in 0..500u64 {
        map.insert(key, !key);
    }
    let snapshot: StdHashMap<u64, u64> = map.iter().map(|(&k, &v)| (k, v)).collect();
    map.rehash(4000);
    assert!(map.bucket_count() >= 4096);
    assert_eq!(map.len(), 500);
    for (k, v) in &snapshot {
        assert_eq!(map.get(k), Some(v));
    }
    map.shrink_to_fit();
    assert!(map.bucket_count() < 4096);
    for (k, v) in &snapshot {
        assert_eq!(map.get(k), Some(v));
    }
}

#[test]
fn tombstones_do_not_hide_later_inserts() {
    // churn the same small key space so erased slots get reused
    let mut map = HashMap::with_capacity(64);
    for round in 0..100u64 {
        for key in 0..48u64 {
            map.insert(key, round);
        }
        for key in 0..48u64 {
            if (key + round) % 3 == 0 {
                map.remove(&key);
            }
        }
        for key in 0..48u64 {
            let expect = if (key + round) % 3 == 0 {
                None
            } else {
                Some(&round)
            };
            assert_eq!(map.get(&key), expect, "round {round} key {key}");
        }
    }
}

#[test]
fn subscript_and_panicking_index() {
    let mut map = HashMap::new();
    *map.entry_or_default("hits".to_string()) += 1;
    *map.entry_or_default("hits".to_string()) += 1;
    assert_eq!(map["hits"], 2);
    assert_eq!(map.get_or_insert_with("misses".to_string(), || 41), &41);
    *map.get_or_insert_with("misses".to_string(), || 0) += 1;
    assert_eq!(map["misses"], 42);
}

#[test]
#[should_panic(expected = "no entry found for key")]
fn index_panics_on_missing_key() {
    let map = HashMap::<String, u32>::new();
    let _ = &map["nope"];
}

#[test]
fn clear_keeps_buckets_reset_frees_them() {
    let mut map = HashMap::new();
    for key in 0..100u64 {
        map.insert(key, key);
    }
    let buckets = map.bucket_count();
    map.clear();
    assert!(map.is_empty());
    assert_eq!(map.bucket_count(), buckets);
    map.insert(1, 1);
    assert_eq!(map.get(&1), Some(&1));
    map.reset();
    assert_eq!(map.bucket_count(), 0);
    assert!(map.is_empty());
}

#[test]
fn append_moves_everything() {
    let mut a: HashMap<u64, u64> = (0..100).map(|k| (k, k)).collect();
    let mut b: HashMap<u64, u64> = (50..150).map(|k| (k, k + 1000)).collect();
    a.append(&mut b);
    assert!(b.is_empty());
    assert_eq!(a.len(), 150);
    for key in 0..50 {
        assert_eq!(a[&key], key);
    }
    // colliding keys take the appended value
    for key in 50..150 {
        assert_eq!(a[&key], key + 1000);
    }
}

#[test]
fn equality_is_order_independent() {
    let a: HashMap<u64, u64> = (0..100).map(|k| (k, k)).collect();
    let b: HashMap<u64, u64> = (0..100).rev().map(|k| (k, k)).collect();
    assert_eq!(a, b);
    let c: HashMap<u64, u64> = (0..100).map(|k| (k, k + 1)).collect();
    assert_ne!(a, c);
    let d: HashMap<u64, u64> = (0..99).map(|k| (k, k)).collect();
    assert_ne!(a, d);
}

#[test]
fn iterators_cover_every_entry_once() {
    let mut map: HashMap<u64, u64> = (0..500).map(|k| (k, k)).collect();
    let mut seen = StdHashMap::new();
    for (&k, &v) in map.iter() {
        assert_eq!(seen.insert(k, v), None);
    }
    assert_eq!(seen.len(), 500);
    for (_, v) in map.iter_mut() {
        *v += 1;
    }
    assert_eq!(map.values().sum::<u64>(), (0..500u64).map(|k| k + 1).sum());
    assert_eq!(map.keys().count(), 500);
    let owned: StdHashMap<u64, u64> = map.into_iter().collect();
    assert_eq!(owned.len(), 500);
}

#[test]
fn drain_and_retain() {
    let mut map: HashMap<u64, u64> = (0..100).map(|k| (k, k)).collect();
    map.retain(|&k, _| k % 2 == 0);
    assert_eq!(map.len(), 50);
    assert!(map.keys().all(|&k| k % 2 == 0));
    let drained: Vec<(u64, u64)> = map.drain().collect();
    assert_eq!(drained.len(), 50);
    assert!(map.is_empty());
    assert!(map.bucket_count() > 0);
}

#[test]
fn insert_unique_unchecked_bulk_load() {
    let mut map = HashMap::with_capacity(1000);
    for key in 0..1000u64 {
        let (k, v) = map.insert_unique_unchecked(key, key * 3);
        assert_eq!((*k, *v), (key, key * 3));
    }
    assert_eq!(map.len(), 1000);
    for key in 0..1000u64 {
        assert_eq!(map.get(&key), Some(&(key * 3)));
    }
}

#[test]
fn works_in_an_arena() {
    let bump = bumpalo::Bump::new();
    let mut map: HashMap<u64, u64, ahash::RandomState, Arena> =
        HashMap::new_in(Arena(&bump));
    for key in 0..1000u64 {
        map.insert(key, key);
    }
    assert_eq!(map.len(), 1000);
    for key in 0..1000u64 {
        assert_eq!(map.get(&key), Some(&key));
    }
    drop(map);
}

#[test]
fn randomized_against_std() {
    let mut rng = rand::thread_rng();
    let mut ours = HashMap::new();
    let mut reference = StdHashMap::new();
    for _ in 0..100_000 {
        let key: u16 = rng.gen_range(0..4096);
        match rng.gen_range(0..10) {
            0..=5 => {
                let value: u64 = rng.gen();
                assert_eq!(ours.insert(key, value), reference.insert(key, value));
            }
            6..=8 => {
                assert_eq!(ours.remove(&key), reference.remove(&key));
            }
            _ => {
                assert_eq!(ours.get(&key), reference.get(&key));
            }
        }
        assert_eq!(ours.len(), reference.len());
    }
    for (k, v) in &reference {
        assert_eq!(ours.get(k), Some(v));
    }
    let mut seen = 0;
    for (k, v) in ours.iter() {
        assert_eq!(reference.get(k), Some(v));
        seen += 1;
    }
    assert_eq!(seen, reference.len());
}

#[test]
fn max_probe_dist_reports_clustering() {
    let mut map = HashMap::new();
    assert_eq!(map.max_probe_dist(), 0);
    for key in 0..10_000u64 {
        map.insert(key, key);
    }
    // well-spread hashes keep chains short
    assert!(map.max_probe_dist() <= 4, "dist={}", map.max_probe_dist());
}

#[test]
fn drop_frees_values() {
    use std::rc::Rc;
    let token = Rc::new(());
    let mut map = HashMap::new();
    for key in 0..100u64 {
        map.insert(key, token.clone());
    }
    assert_eq!(Rc::strong_count(&token), 101);
    map.remove(&0);
    assert_eq!(Rc::strong_count(&token), 100);
    map.clear();
    assert_eq!(Rc::strong_count(&token), 1);
    for key in 0..100u64 {
        map.insert(key, token.clone());
    }
    drop(map);
    assert_eq!(Rc::strong_count(&token), 1);
}
