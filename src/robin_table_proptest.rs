#![cfg(test)]

// Property tests for RobinTable kept inside the crate so the distance
// invariant can be checked against the physical layout.

use crate::policy::{PowerOfTwo, TablePolicy};
use crate::robin_table::{RobinTable, Slot};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::Hasher;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations so shrinking moves towards earlier keys.
#[derive(Clone, Debug)]
enum OpI {
    Upsert(usize, i32),
    Remove(usize),
    Find(usize),
    Contains(String),
    Mutate(usize, i32),
    Iterate,
    ResetSearch,
    GrowToNext,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Upsert(i, v)),
            (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Upsert(i, v)),
            idx.clone().prop_map(OpI::Remove),
            idx.clone().prop_map(OpI::Find),
            prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(OpI::Contains),
            (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            Just(OpI::Iterate),
            Just(OpI::ResetSearch),
            Just(OpI::GrowToNext),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Every live key sits at `home + distance - 1` and within the search bound.
fn check_layout<P>(sut: &RobinTable<Key, i32, P>, model: &HashMap<Key, i32>) -> Result<(), TestCaseError>
where
    P: TablePolicy<Key> + TablePolicy<str>,
{
    for k in model.keys() {
        let slot = sut.find(k);
        prop_assert!(slot.is_some(), "live key {:?} not found", k);
        let index = slot.map(|s| s.index()).unwrap_or_default();
        let home = sut.home_of(k).unwrap_or_default();
        let distance = sut.distance_at(index).unwrap_or_default();
        prop_assert!(index >= home);
        prop_assert_eq!(usize::from(distance), index - home + 1);
        prop_assert!(distance <= sut.max_search_length());
    }
    Ok(())
}

fn run_state_machine<P>(
    mut sut: RobinTable<Key, i32, P>,
    pool: Vec<String>,
    ops: Vec<OpI>,
) -> Result<(), TestCaseError>
where
    P: TablePolicy<Key> + TablePolicy<str>,
{
    let mut model: HashMap<Key, i32> = HashMap::new();
    let mut stale: Vec<Slot> = Vec::new();

    for op in ops {
        match op {
            OpI::Upsert(i, v) => {
                let k = key_from(&pool, i);
                match sut.find(&k) {
                    Some(slot) => {
                        prop_assert!(model.contains_key(&k));
                        if let Some(slot_value) = slot.value_mut(&mut sut) {
                            *slot_value = v;
                        }
                    }
                    None => {
                        prop_assert!(!model.contains_key(&k));
                        prop_assert!(sut.insert_and_grow(k.clone(), v).is_ok());
                    }
                }
                model.insert(k, v);
            }
            OpI::Remove(i) => {
                let k = key_from(&pool, i);
                match sut.find(&k) {
                    Some(slot) => {
                        let removed = sut.remove_at(slot);
                        let expected = model.remove(&k).map(|v| (k.clone(), v));
                        prop_assert_eq!(removed, expected);
                        stale.push(slot);
                    }
                    None => {
                        prop_assert!(!model.contains_key(&k));
                        prop_assert!(sut.remove(&k).is_none());
                    }
                }
            }
            OpI::Find(i) => {
                let k = key_from(&pool, i);
                let found = sut.find(&k);
                prop_assert_eq!(found.is_some(), model.contains_key(&k));
                if let Some(slot) = found {
                    prop_assert_eq!(slot.key(&sut), Some(&k));
                    prop_assert_eq!(slot.value(&sut), model.get(&k));
                }
            }
            OpI::Contains(s) => {
                let has = sut.contains_key(s.as_str());
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(has, has_model);
                prop_assert_eq!(sut.get(s.as_str()), model.get(s.as_str()));
            }
            OpI::Mutate(i, d) => {
                let k = key_from(&pool, i);
                if let Some(v) = sut.get_mut(&k) {
                    *v = v.saturating_add(d);
                    if let Some(mv) = model.get_mut(&k) {
                        *mv = mv.saturating_add(d);
                    }
                }
            }
            OpI::Iterate => {
                let s_keys: BTreeSet<_> = sut.iter().map(|(k, _)| k.clone()).collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
                prop_assert_eq!(sut.iter().count(), model.len());
            }
            OpI::ResetSearch => {
                sut.reset_search_length();
                let widest = (0..sut.capacity() + 32)
                    .filter_map(|i| sut.distance_at(i))
                    .max()
                    .unwrap_or(0);
                prop_assert_eq!(sut.max_search_length(), widest);
            }
            OpI::GrowToNext => {
                let before = sut.capacity();
                if before < 256 {
                    prop_assert!(sut.grow_to_next().is_ok());
                    prop_assert!(sut.capacity() > before);
                }
            }
        }

        for slot in &stale {
            prop_assert!(slot.value(&sut).is_none());
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        check_layout(&sut, &model)?;
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap,
// with the table used as a map through find-then-insert.
// - Lookups, removals and in-place mutation agree with the model.
// - Removed slots never resolve again.
// - After every op each live key satisfies the distance invariant.
// - `reset_search_length` equals the largest stored distance.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let sut: RobinTable<Key, i32> = RobinTable::new();
        run_state_machine(sut, pool, ops)?;
    }
}

// Collision variant using a constant hasher: every key shares home slot 0,
// so lookups are resolved purely by distance and equality.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl std::hash::BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let sut: RobinTable<Key, i32, PowerOfTwo<ConstBuildHasher>> =
            RobinTable::with_policy(PowerOfTwo::with_hasher(ConstBuildHasher));
        run_state_machine(sut, pool, ops)?;
    }
}
