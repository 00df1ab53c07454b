//! CowOrderMap: public handle over a shared, insertion-ordered state.

use crate::cow_core::CowCore;
use crate::ordered_hash_map::{Iter, Marker, OrderedHashMap};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;
use std::collections::hash_map::RandomState;
use std::rc::Rc;

/// Failed key lookup during a mutating operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LookupError {
    KeyNotFound,
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::KeyNotFound => f.write_str("key not found"),
        }
    }
}

impl std::error::Error for LookupError {}

/// An insertion-ordered hash map whose clones share one state until a write.
///
/// `Clone` is O(1): both handles point at the same state and diverge only
/// when one of them mutates (copy-on-write). Every mutating operation either
/// completes or, if user code panics partway (key hashing or equality, key
/// or value cloning, a default-value constructor), leaves the map's
/// observable contents and its sharing status exactly as they were.
///
/// Iteration visits entries in insertion order. Inserting an already-present
/// key changes nothing; removing and re-inserting a key moves it to the end.
pub struct CowOrderMap<K, V, S = RandomState> {
    core: CowCore<K, V, S>,
}

impl<K, V> CowOrderMap<K, V> {
    /// Creates an empty map with the default hasher.
    pub fn new() -> Self {
        CowOrderMap {
            core: CowCore::new(OrderedHashMap::new()),
        }
    }
}

impl<K, V> Default for CowOrderMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// O(1): the clone shares `self`'s state until either handle writes.
impl<K, V, S> Clone for CowOrderMap<K, V, S> {
    fn clone(&self) -> Self {
        CowOrderMap {
            core: self.core.clone(),
        }
    }
}

impl<K, V, S> CowOrderMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Creates an empty map that hashes with `hasher`.
    pub fn with_hasher(hasher: S) -> Self {
        CowOrderMap {
            core: CowCore::new(OrderedHashMap::with_hasher(hasher)),
        }
    }

    pub fn len(&self) -> usize {
        self.core.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.read().is_empty()
    }

    pub fn hasher(&self) -> &S {
        self.core.read().hasher()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.core.read().contains_key(key)
    }

    /// Borrow the value for `key`. Never detaches.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.core.read().get(key)
    }

    /// Iterate entries in insertion order, borrowing the map.
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.core.read().iter()
    }

    /// Iterate keys in insertion order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Iterate values in insertion order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Capture an O(1) snapshot and iterate it independently of the handle.
    ///
    /// The snapshot pins the current state: later mutations through any
    /// handle detach away from it first, so the iterator always replays the
    /// entry sequence observed here, including across [`clear`].
    ///
    /// [`clear`]: CowOrderMap::clear
    pub fn snapshot_iter(&self) -> SnapshotIter<K, V, S> {
        SnapshotIter::new(self.core.snapshot())
    }

    /// Whether `self` and `other` currently share one state.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.core.ptr_eq(&other.core)
    }
}

impl<K, V, S> CowOrderMap<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    /// Insert `key` at the end of the order. Returns `true` if it was
    /// absent. A present key keeps its value and position, `value` is
    /// dropped, and no detach happens.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        if self.core.is_shared() && self.core.read().contains_key(&key) {
            return false;
        }
        self.core.mutate(|state| state.insert(key, value).is_some())
    }

    /// Remove `key`, returning its entry.
    ///
    /// An absent key fails with [`LookupError::KeyNotFound`] before any
    /// detach or change.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<(K, V), LookupError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if self.core.is_shared() {
            let marker = self
                .core
                .read()
                .marker_of(key)
                .ok_or(LookupError::KeyNotFound)?;
            Ok(self
                .core
                .detach_mut()
                .remove_at(marker)
                .expect("marker stays valid across a detach"))
        } else {
            self.core
                .detach_mut()
                .remove(key)
                .ok_or(LookupError::KeyNotFound)
        }
    }

    /// Mutably borrow the value for `key`, detaching a shared state first.
    /// An absent key returns `None` without detaching.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if self.core.is_shared() {
            let marker = self.core.read().marker_of(key)?;
            self.core.detach_mut().value_mut_at(marker)
        } else {
            self.core.detach_mut().get_mut(key)
        }
    }

    /// Mutably borrow the value for `key`, inserting `default()` at the end
    /// of the order if absent. The closure runs only on insertion.
    pub fn get_or_insert_with<F>(&mut self, key: K, default: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        let found = if self.core.is_shared() {
            self.core.read().marker_of(&key)
        } else {
            None
        };
        let marker = match found {
            Some(marker) => marker,
            None => self
                .core
                .mutate(|state| state.get_or_insert_with(key, default)),
        };
        self.core
            .detach_mut()
            .value_mut_at(marker)
            .expect("marker stays valid across a detach")
    }

    /// [`get_or_insert_with`] for `V: Default`; the indexing operator of
    /// this map.
    ///
    /// [`get_or_insert_with`]: CowOrderMap::get_or_insert_with
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }

    /// Append `other`'s entries that are not yet present, in `other`'s
    /// order. Present keys keep `self`'s value and position.
    ///
    /// The merged state is staged in full and committed last: a panic in
    /// user code mid-merge leaves `self` untouched. Merging with a handle
    /// sharing `self`'s state is a no-op.
    pub fn merge(&mut self, other: &Self) {
        if self.ptr_eq(other) || other.is_empty() {
            return;
        }
        let mut staged = self.core.read().clone();
        for (key, value) in other.iter() {
            let _ = staged.insert(key.clone(), value.clone());
        }
        self.core.replace(staged);
    }

    /// Remove all entries. Handles and snapshots of the previous state are
    /// unaffected: they keep seeing, and replaying, the old entries.
    pub fn clear(&mut self) {
        if self.core.is_shared() {
            let fresh = OrderedHashMap::with_hasher(self.core.read().hasher().clone());
            self.core.replace(fresh);
        } else {
            self.core.detach_mut().clear();
        }
    }
}

impl<K, V, S> fmt::Debug for CowOrderMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.core.read().iter()).finish()
    }
}

impl<K, V, S> Extend<(K, V)> for CowOrderMap<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    /// Extends with first-wins semantics: pairs whose key is already present
    /// are dropped, like [`insert`].
    ///
    /// [`insert`]: CowOrderMap::insert
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for CowOrderMap<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher + Clone + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = CowOrderMap::with_hasher(S::default());
        map.extend(iter);
        map
    }
}

impl<'a, K, V, S> IntoIterator for &'a CowOrderMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S> IntoIterator for CowOrderMap<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher,
{
    type Item = (K, V);
    type IntoIter = SnapshotIter<K, V, S>;
    /// Consuming iteration goes through a snapshot and yields owned clones;
    /// a possibly-shared state cannot be dismantled in place.
    fn into_iter(self) -> Self::IntoIter {
        SnapshotIter::new(self.core.snapshot())
    }
}

/// Iterator over a map's keys in insertion order.
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// Iterator over a map's values in insertion order.
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}

/// Owning, in-order iterator over a pinned snapshot of one map state.
///
/// The iterator keeps its snapshot alive, and mutations through any handle
/// detach away from pinned states, so what it yields is fixed at capture
/// time: it is never invalidated, only exhausted. `restart` rewinds it to
/// the snapshot's first entry; `Clone` forks the cursor.
pub struct SnapshotIter<K, V, S = RandomState> {
    state: Rc<OrderedHashMap<K, V, S>>,
    cursor: Option<Marker>,
    remaining: usize,
}

impl<K, V, S> SnapshotIter<K, V, S> {
    fn new(state: Rc<OrderedHashMap<K, V, S>>) -> Self {
        let cursor = state.first_marker();
        let remaining = state.len();
        SnapshotIter {
            state,
            cursor,
            remaining,
        }
    }

    /// Rewind to the snapshot's first entry.
    pub fn restart(&mut self) {
        self.cursor = self.state.first_marker();
        self.remaining = self.state.len();
    }

    /// Number of entries in the snapshot, yielded or not.
    pub fn snapshot_len(&self) -> usize {
        self.state.len()
    }
}

impl<K, V, S> Clone for SnapshotIter<K, V, S> {
    fn clone(&self) -> Self {
        SnapshotIter {
            state: Rc::clone(&self.state),
            cursor: self.cursor,
            remaining: self.remaining,
        }
    }
}

impl<K, V, S> Iterator for SnapshotIter<K, V, S>
where
    K: Clone,
    V: Clone,
{
    type Item = (K, V);
    fn next(&mut self) -> Option<Self::Item> {
        let marker = self.cursor?;
        let (key, value) = self
            .state
            .get_at(marker)
            .expect("cursor points at a live snapshot entry");
        self.cursor = self.state.next_after(marker);
        self.remaining -= 1;
        Some((key.clone(), value.clone()))
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Clone, V: Clone, S> ExactSizeIterator for SnapshotIter<K, V, S> {}
impl<K: Clone, V: Clone, S> FusedIterator for SnapshotIter<K, V, S> {}
