// CowOrderMap property tests (consolidated).
//
// Property 1: a single handle behaves like an in-order list of pairs.
//  - Model: Vec<(key, value)> in first-insertion order.
//  - Invariant: len(), get(), and iteration order match the model after
//    every step; duplicate inserts and failed removes change nothing.
//  - Operations: insert, remove, get_or_insert_with, get_mut, clear.
//  - Accessor check: the default closure runs exactly when the key is
//    absent.
//
// Property 2: handles over shared states diverge with value semantics.
//  - Model: one Vec<(key, value)> per handle, plus a partition of the
//    handles into sharing groups (two handles share a state iff they are
//    in the same group; any successful write moves the writer into a
//    fresh group).
//  - Invariant: each handle matches its own model after every step;
//    ptr_eq between any two handles matches the modeled partition;
//    snapshot iterators keep replaying their capture-time sequence.
//  - Operations: insert, remove, get_mut, clone-assign, merge, clear,
//    snapshot.
use cow_ordermap::{CowOrderMap, LookupError, SnapshotIter};
use proptest::prelude::*;
use std::cell::Cell;

// Property 1: one handle against an in-order pair list.
proptest! {
    #[test]
    fn prop_single_handle_matches_order_model(keys in 1usize..=5, ops in proptest::collection::vec((0u8..=4u8, 0usize..100usize), 1..100)) {
        // keys in [0..keys-1]
        let mut m: CowOrderMap<String, i32> = CowOrderMap::new();
        let mut model: Vec<(String, i32)> = Vec::new();

        for (op, raw) in ops {
            let k = raw % keys;
            let key = format!("k{}", k);
            match op {
                // Insert: first insertion wins value and position.
                0 => {
                    let fresh = !model.iter().any(|(mk, _)| *mk == key);
                    prop_assert_eq!(m.insert(key.clone(), raw as i32), fresh);
                    if fresh {
                        model.push((key.clone(), raw as i32));
                    }
                }
                // Remove: yields the stored pair, or fails without effect.
                1 => {
                    match model.iter().position(|(mk, _)| *mk == key) {
                        Some(p) => {
                            let (mk, mv) = model.remove(p);
                            prop_assert_eq!(m.remove(&key), Ok((mk, mv)));
                        }
                        None => {
                            prop_assert_eq!(m.remove(&key), Err(LookupError::KeyNotFound));
                        }
                    }
                }
                // Defaulting access: closure runs only for absent keys.
                2 => {
                    let existing = model.iter().find(|(mk, _)| *mk == key).map(|(_, v)| *v);
                    let called = Cell::new(false);
                    let got = *m.get_or_insert_with(key.clone(), || {
                        called.set(true);
                        raw as i32
                    });
                    match existing {
                        Some(v) => {
                            prop_assert!(!called.get());
                            prop_assert_eq!(got, v);
                        }
                        None => {
                            prop_assert!(called.get());
                            model.push((key.clone(), raw as i32));
                        }
                    }
                }
                // In-place update through get_mut; misses change nothing.
                3 => {
                    let updated = match m.get_mut(&key) {
                        Some(v) => { *v += 1; true }
                        None => false,
                    };
                    let pos = model.iter().position(|(mk, _)| *mk == key);
                    prop_assert_eq!(updated, pos.is_some());
                    if let Some(p) = pos {
                        model[p].1 += 1;
                    }
                }
                // Occasional clear, rare enough to keep sequences deep.
                4 => {
                    if raw % 5 == 0 {
                        m.clear();
                        model.clear();
                    }
                }
                _ => unreachable!(),
            }

            // Invariant after each step: size and the touched key agree.
            prop_assert_eq!(m.len(), model.len());
            let want = model.iter().find(|(mk, _)| *mk == key).map(|(_, v)| *v);
            prop_assert_eq!(m.get(&key).copied(), want);
        }

        // Final invariant: the full iteration order matches the model.
        let got: Vec<(String, i32)> = m.iter().map(|(k, v)| (k.clone(), *v)).collect();
        prop_assert_eq!(&got, &model);
        let got_keys: Vec<String> = m.keys().cloned().collect();
        let want_keys: Vec<String> = model.iter().map(|(k, _)| k.clone()).collect();
        prop_assert_eq!(got_keys, want_keys);
        let got_values: Vec<i32> = m.values().copied().collect();
        let want_values: Vec<i32> = model.iter().map(|(_, v)| *v).collect();
        prop_assert_eq!(got_values, want_values);
    }
}

// ---- Property 2: multi-handle divergence proptest ----
fn key(i: usize) -> String {
    format!("k{}", i)
}

proptest! {
    #[test]
    fn prop_shared_handles_diverge_independently(
        n in 2usize..=4,
        ops in proptest::collection::vec((0u8..=6u8, 0usize..64usize, 0usize..64usize), 1..96)
    ) {
        // Handles under test, one pair-list model per handle, and the
        // modeled sharing partition: group[x] == group[y] iff x and y
        // hold the same state.
        let mut handles: Vec<CowOrderMap<String, i32>> = (0..n).map(|_| CowOrderMap::new()).collect();
        let mut models: Vec<Vec<(String, i32)>> = vec![Vec::new(); n];
        let mut group: Vec<usize> = (0..n).collect();
        let mut next_id = n;
        // Outstanding snapshots with their capture-time sequences.
        let mut snaps: Vec<(SnapshotIter<String, i32>, Vec<(String, i32)>)> = Vec::new();

        for (op, a, b) in ops {
            let i = a % n;
            let key = key(b % 8);
            let value = (a * 100 + b) as i32;
            match op {
                0 => {
                    let fresh = !models[i].iter().any(|(mk, _)| *mk == key);
                    prop_assert_eq!(handles[i].insert(key.clone(), value), fresh);
                    if fresh {
                        models[i].push((key.clone(), value));
                        next_id += 1;
                        group[i] = next_id;
                    }
                }
                1 => {
                    match models[i].iter().position(|(mk, _)| *mk == key) {
                        Some(p) => {
                            let (mk, mv) = models[i].remove(p);
                            prop_assert_eq!(handles[i].remove(&key), Ok((mk, mv)));
                            next_id += 1;
                            group[i] = next_id;
                        }
                        None => {
                            prop_assert_eq!(handles[i].remove(&key), Err(LookupError::KeyNotFound));
                        }
                    }
                }
                2 => {
                    let updated = match handles[i].get_mut(&key) {
                        Some(v) => { *v += 1; true }
                        None => false,
                    };
                    let pos = models[i].iter().position(|(mk, _)| *mk == key);
                    prop_assert_eq!(updated, pos.is_some());
                    if let Some(p) = pos {
                        models[i][p].1 += 1;
                        next_id += 1;
                        group[i] = next_id;
                    }
                }
                // Replace handle i with a clone of handle j; they now share.
                3 => {
                    let j = b % n;
                    let fresh = handles[j].clone();
                    handles[i] = fresh;
                    let model = models[j].clone();
                    models[i] = model;
                    group[i] = group[j];
                }
                // Merge j into i. A shared or empty source is a no-op that
                // must not detach; otherwise i commits a fresh state even
                // when every key collides.
                4 => {
                    let j = b % n;
                    let src = handles[j].clone();
                    let noop = group[i] == group[j] || models[j].is_empty();
                    handles[i].merge(&src);
                    if !noop {
                        let additions: Vec<(String, i32)> = models[j]
                            .iter()
                            .filter(|(mk, _)| !models[i].iter().any(|(ik, _)| ik == mk))
                            .cloned()
                            .collect();
                        models[i].extend(additions);
                        next_id += 1;
                        group[i] = next_id;
                    }
                }
                5 => {
                    handles[i].clear();
                    models[i].clear();
                    next_id += 1;
                    group[i] = next_id;
                }
                // Pin a snapshot of handle i's current sequence.
                6 => {
                    if snaps.len() == 4 {
                        snaps.remove(0);
                    }
                    snaps.push((handles[i].snapshot_iter(), models[i].clone()));
                }
                _ => unreachable!(),
            }

            // The touched handle matches its model.
            let got: Vec<(String, i32)> = handles[i].iter().map(|(k, v)| (k.clone(), *v)).collect();
            prop_assert_eq!(&got, &models[i]);

            // Sharing matches the modeled partition, pairwise.
            for x in 0..n {
                for y in (x + 1)..n {
                    prop_assert_eq!(
                        handles[x].ptr_eq(&handles[y]),
                        group[x] == group[y],
                        "sharing mismatch between handles {} and {}", x, y
                    );
                }
            }

            // Every outstanding snapshot still replays its capture.
            for (snap, frozen) in &snaps {
                let mut replay = snap.clone();
                replay.restart();
                let seen: Vec<(String, i32)> = replay.collect();
                prop_assert_eq!(&seen, frozen);
            }
        }

        // Final invariant: every handle matches its own model.
        for (h, model) in handles.iter().zip(&models) {
            let got: Vec<(String, i32)> = h.iter().map(|(k, v)| (k.clone(), *v)).collect();
            prop_assert_eq!(&got, model);
        }
    }
}
