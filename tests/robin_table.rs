use robin_table::{BuildIdentity, Modulo, PowerOfTwo, RobinTable, TableError, MAX_PROBE_DISTANCE};

type IdentityTable<V> = RobinTable<usize, V, PowerOfTwo<BuildIdentity>>;

fn identity<V>(capacity: usize) -> IdentityTable<V> {
    RobinTable::with_capacity_and_policy(capacity, PowerOfTwo::with_hasher(BuildIdentity))
        .expect("valid capacity")
}

#[test]
fn insert_find_remove_round_trip() {
    let mut t = RobinTable::new();
    for i in 0..200u32 {
        t.insert_and_grow(format!("k{i}"), i).expect("insert ok");
    }
    assert_eq!(t.len(), 200);
    for i in 0..200u32 {
        assert_eq!(t.get(format!("k{i}").as_str()), Some(&i));
    }
    for i in (0..200u32).step_by(2) {
        assert_eq!(t.remove(format!("k{i}").as_str()), Some((format!("k{i}"), i)));
    }
    assert_eq!(t.len(), 100);
    for i in 0..200u32 {
        assert_eq!(t.contains_key(format!("k{i}").as_str()), i % 2 == 1);
    }
}

#[test]
fn equal_distance_records_are_displaced() {
    let mut t: IdentityTable<&str> = identity(4);
    for k in [0, 1, 2] {
        assert_eq!(t.insert(k, "v"), Ok(false));
    }
    // home of 4 is 0; it displaces 0, which displaces 1, and so on.
    assert_eq!(t.insert(4, "v"), Ok(true));
    assert_eq!(t.find(&4).map(|s| s.index()), Some(0));
    assert_eq!(t.find(&0).map(|s| s.index()), Some(1));
    assert_eq!(t.find(&1).map(|s| s.index()), Some(2));
    assert_eq!(t.find(&2).map(|s| s.index()), Some(3));
    assert_eq!(t.max_search_length(), 2);
}

#[test]
fn slots_go_stale_after_mutation() {
    let mut t: IdentityTable<u32> = identity(8);
    t.insert(3, 30).unwrap();
    let slot = t.find(&3).expect("present");
    assert_eq!(t.element_at(slot), Some(&30));
    assert_eq!(t.identifier_at(slot), Some(&3));
    *t.element_at_mut(slot).unwrap() += 1;
    t.insert(4, 40).unwrap();
    assert_eq!(t.element_at(slot), None);
    let fresh = t.find(&3).unwrap();
    assert_eq!(fresh.value(&t), Some(&31));
}

#[test]
fn growth_keeps_every_record() {
    let mut t: IdentityTable<usize> = identity(8);
    for k in 0..8 {
        if t.insert(k * 8, k).unwrap() {
            t.grow_to_next().unwrap();
        }
    }
    assert!(t.capacity() >= 16);
    for k in 0..8 {
        assert_eq!(t.get(&(k * 8)), Some(&k));
    }
    assert!(matches!(
        t.grow(4),
        Err(TableError::CapacityTooSmall { capacity: 4, len: 8 })
    ));
    assert_eq!(t.grow(24), Err(TableError::InvalidCapacity { capacity: 24 }));
}

#[test]
fn modulo_policy_accepts_any_capacity() {
    let mut t: RobinTable<u64, u64, Modulo> =
        RobinTable::with_capacity_and_policy(7, Modulo::default()).unwrap();
    assert_eq!(t.capacity(), 7);
    for k in 0..50 {
        t.insert_and_grow(k, k * k).unwrap();
    }
    for k in 0..50 {
        assert_eq!(t.get(&k), Some(&(k * k)));
    }
}

#[test]
fn iteration_visits_each_record_once() {
    let mut t: IdentityTable<usize> = identity(16);
    for k in [5, 21, 37, 6, 9] {
        t.insert(k, k + 100).unwrap();
    }
    let mut keys: Vec<usize> = t.iter().map(|(k, _)| *k).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec![5, 6, 9, 21, 37]);

    for (_, v) in t.iter_mut() {
        *v = 0;
    }
    assert!(t.iter().all(|(_, v)| *v == 0));
}

#[test]
fn distances_stay_within_the_margin() {
    let mut t: IdentityTable<()> = identity(64);
    for k in 0..40 {
        t.insert_and_grow(k * 64, ()).unwrap();
    }
    for i in 0..t.capacity() + MAX_PROBE_DISTANCE as usize {
        if let Some(d) = t.distance_at(i) {
            assert!(d >= 1 && d <= MAX_PROBE_DISTANCE);
        }
    }
    assert_eq!(t.len(), 40);
}

#[test]
fn clear_then_reuse() {
    let mut t: IdentityTable<&str> = identity(8);
    t.insert(1, "a").unwrap();
    t.insert(9, "b").unwrap();
    t.clear();
    assert!(t.is_empty());
    assert_eq!(t.max_search_length(), 0);
    assert_eq!(t.capacity(), 8);
    t.insert(9, "c").unwrap();
    assert_eq!(t.get(&9), Some(&"c"));
    assert_eq!(t.get(&1), None);
}
