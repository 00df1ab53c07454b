//! cow-ordermap: A single-threaded, insertion-ordered hash map whose
//! handles share one state and copy it on the first write.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: build CowOrderMap in safe, verifiable layers so each piece can
//!   be reasoned about independently.
//! - Layers:
//!   - OrderedHashMap<K, V, S>: structural map combining a hash index with
//!     an intrusive doubly-linked insertion-order list; entries live in
//!     slots addressed by stable, generational markers.
//!   - CowCore<K, V, S>: holds the state behind an `Rc`, decides when a
//!     mutation must deep-copy (copy-on-write) and stages shared-state
//!     mutations so they commit with a single pointer swap.
//!   - CowOrderMap<K, V, S>: public API with value semantics; `Clone` is
//!     O(1) and handles diverge lazily on first write.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` via the `Rc` backbone (no atomics).
//! - O(1) average lookups; O(1) order edits through markers; a detach costs
//!   one deep copy, paid only on the first write to a shared state.
//! - Duplicate inserts are no-ops: first insertion wins, for both the value
//!   and the position in the order.
//! - Strong failure safety: if user code (`K: Hash`/`Eq`, `K`/`V: Clone`,
//!   default-value closures) panics inside a mutating operation, observable
//!   contents and the shared/unshared status are exactly as before the call.
//!
//! Why this split?
//! - Localize invariants: each layer has a small, precise contract.
//! - No unsafe anywhere: stable markers come from generational slot keys,
//!   sharing from `Rc`, exclusivity from the borrow checker.
//! - Clear failure boundaries: OrderedHashMap never calls into user code
//!   once a structural change has begun; CowCore never commits a staged
//!   state that user code abandoned by panicking.
//!
//! Copy-on-write discipline
//! - A state is shared when more than one strong reference to it exists,
//!   counting handles and snapshot iterators alike. Reads never detach.
//! - Mutations on a shared state act on a copy: either an explicit detach
//!   (deep copy, then mutate uniquely) or a staged copy committed after the
//!   operation finishes. Other handles keep the old state either way.
//! - Markers survive deep copies verbatim, so a marker resolved before a
//!   detach addresses the same entry afterwards without re-running `K: Eq`
//!   or `K: Hash`.
//!
//! Mutable access and escape analysis
//! - `get_mut`/`get_or_insert_with` hand out `&mut V` only after detaching,
//!   and the borrow checker scopes that borrow to the handle's `&mut self`.
//!   There is no runtime bookkeeping of escaped references; exclusivity is
//!   static, and `clone()` can never observe a half-mutated state because
//!   it cannot run while a `&mut V` is live.
//!
//! Hasher and rehashing invariants
//! - Each entry stores a precomputed `u64` hash and indexing always uses
//!   the stored hash; `K: Hash` is never invoked after insertion. This
//!   avoids rehash-time calls into user code.
//!
//! Notes and non-goals
//! - Single-threaded by design; an atomically shared variant would swap the
//!   `Rc` for `Arc` and is out of scope.
//! - No `iter_mut`: handing out mutable borrows during iteration would
//!   bypass the detach point. Mutate through `get_mut` or markers instead.
//! - Keys are immutable post-insert; there is no `key_mut`.
//! - Public API surface is `CowOrderMap` and its iterators; `CowCore` is an
//!   implementation detail. `ordered_hash_map` is exposed for direct use of
//!   the structural layer and for benchmarks.

mod cow_core;
mod cow_order_map;
pub mod ordered_hash_map;
mod ordered_hash_map_proptest;

// Public surface
pub use cow_order_map::{CowOrderMap, Keys, LookupError, SnapshotIter, Values};
pub use ordered_hash_map::Iter;
