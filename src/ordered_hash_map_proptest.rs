#![cfg(test)]

// Property tests for OrderedHashMap kept inside the crate so they can use
// markers and the structural API directly.

use crate::ordered_hash_map::{Marker, OrderedHashMap};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hasher};
use std::rc::Rc;

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

// Pool-indexed operations to improve shrinking: indices shrink to earlier
// keys, pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    GetOrInsert(usize, i32),
    Remove(usize),
    MarkerOf(usize),
    Contains(String),
    Mutate(usize, i32),
    Iterate,
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
            (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::GetOrInsert(i, v)),
            idx.clone().prop_map(OpI::Remove),
            idx.clone().prop_map(OpI::MarkerOf),
            prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

// State-machine equivalence against an order-keeping Vec model. Invariants
// exercised across random operation sequences:
// - Duplicate inserts are no-ops; on success a unique stable Marker is
//   returned and the key lands at the end of the order.
// - `get_or_insert_with` returns the existing marker for present keys and
//   runs its default closure exactly on insertion.
// - `remove` returns the owned `(K, V)` matching the model, closes the gap
//   in the order and invalidates the marker.
// - `marker_of`/`contains_key` parity with the model; marker stability for
//   live entries; stale markers never resolve.
// - After every op: `len`/`is_empty` parity and full order parity.
fn run_scenario<S: BuildHasher>(
    sut: &mut OrderedHashMap<Key, i32, S>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: Vec<(Key, i32)> = Vec::new();
    let mut live: HashMap<Key, Marker> = HashMap::new();
    let mut stale: Vec<Marker> = Vec::new();

    let default_calls = Rc::new(Cell::new(0));
    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(pool, i);
                let already = model.iter().any(|(mk, _)| mk == &k);
                match sut.insert(k.clone(), v) {
                    Some(marker) => {
                        prop_assert!(!already, "insert must reject duplicates");
                        let prev = live.insert(k.clone(), marker);
                        prop_assert!(prev.is_none());
                        model.push((k, v));
                    }
                    None => {
                        prop_assert!(already, "insert only rejects present keys");
                    }
                }
            }
            OpI::GetOrInsert(i, v) => {
                let k = key_from(pool, i);
                let already = model.iter().any(|(mk, _)| mk == &k);
                let counter = default_calls.clone();
                let before = counter.get();
                let marker = sut.get_or_insert_with(k.clone(), move || {
                    counter.set(counter.get() + 1);
                    v
                });
                if already {
                    prop_assert_eq!(
                        default_calls.get(),
                        before,
                        "default must not run for a present key"
                    );
                    prop_assert_eq!(Some(&marker), live.get(&k));
                } else {
                    prop_assert_eq!(
                        default_calls.get(),
                        before + 1,
                        "default runs exactly once on insert"
                    );
                    let prev = live.insert(k.clone(), marker);
                    prop_assert!(prev.is_none());
                    model.push((k, v));
                }
            }
            OpI::Remove(i) => {
                let k = key_from(pool, i);
                if let Some(&marker) = live.get(&k) {
                    let (kk, vv) = sut.remove(k.0.as_str()).expect("present key removes");
                    prop_assert!(kk == k);
                    let pos = model
                        .iter()
                        .position(|(mk, _)| *mk == kk)
                        .expect("present in model");
                    let (_, mv) = model.remove(pos);
                    prop_assert_eq!(vv, mv);
                    let _ = live.remove(&k);
                    stale.push(marker);
                } else {
                    prop_assert!(sut.remove(k.0.as_str()).is_none());
                }
            }
            OpI::MarkerOf(i) => {
                let k = key_from(pool, i);
                let found = sut.marker_of(k.0.as_str());
                let present = model.iter().any(|(mk, _)| mk == &k);
                prop_assert_eq!(found.is_some(), present);
                if let Some(marker) = found {
                    let &lm = live.get(&k).expect("tracked live marker present");
                    prop_assert_eq!(marker, lm);
                }
            }
            OpI::Contains(s) => {
                let has = sut.contains_key(s.as_str());
                let has_model = model.iter().any(|(k, _)| k.0 == s);
                prop_assert_eq!(has, has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(pool, i);
                if let Some(&marker) = live.get(&k) {
                    if let Some(vr) = sut.value_mut_at(marker) {
                        *vr = vr.saturating_add(d);
                        if let Some((_, mv)) = model.iter_mut().find(|(mk, _)| mk == &k) {
                            *mv = mv.saturating_add(d);
                        }
                    } else {
                        prop_assert!(false, "live marker should resolve");
                    }
                }
            }
            OpI::Iterate => {
                let s_pairs: Vec<(Key, i32)> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(&s_pairs, &model);
            }
        }

        // Post-conditions after each op
        // 1) Stale markers must never resolve again
        for &m in &stale {
            prop_assert!(sut.get_at(m).is_none());
        }
        // 2) Live markers resolve to their key
        for (k, &m) in &live {
            match sut.get_at(m) {
                Some((kk, _)) => prop_assert!(kk == k),
                None => prop_assert!(false, "live marker should resolve"),
            }
        }
        // 3) Size and order parity
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        let order: Vec<Key> = sut.iter().map(|(k, _)| k.clone()).collect();
        let want: Vec<Key> = model.iter().map(|(k, _)| k.clone()).collect();
        prop_assert_eq!(order, want);
    }
    Ok(())
}

// Collision variant uses a constant hasher to stress equality resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
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
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let mut sut: OrderedHashMap<Key, i32> = OrderedHashMap::new();
        run_scenario(&mut sut, &pool, ops)?;
    }

    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let mut sut: OrderedHashMap<Key, i32, ConstBuildHasher> =
            OrderedHashMap::with_hasher(ConstBuildHasher);
        run_scenario(&mut sut, &pool, ops)?;
    }
}
