//! OrderedHashMap: structural layer combining hashed lookup with an
//! intrusive insertion-order list, addressed through stable markers.

use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;
use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

/// Stable identifier for an entry's slot and order position.
///
/// Markers are generational: once an entry is removed its marker never
/// resolves again, even if the physical slot is reused. Deep copies carry
/// slots over verbatim, so a marker taken before a copy resolves to the same
/// entry inside the copy.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Marker(DefaultKey);

impl Marker {
    pub(crate) fn new(k: DefaultKey) -> Self {
        Marker(k)
    }
    pub(crate) fn raw(&self) -> DefaultKey {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

/// Hash map plus intrusive doubly-linked order list.
///
/// The index resolves a key's stored hash to the slot holding its entry; the
/// slots thread `prev`/`next` links in insertion order between `head` and
/// `tail`. Each entry keeps the hash computed at insert, and indexing always
/// uses the stored hash, so `K: Hash` never runs after insertion.
///
/// `Clone` produces an independent deep copy in which every marker of the
/// original still resolves (slot keys survive `SlotMap::clone` unchanged).
#[derive(Clone)]
pub struct OrderedHashMap<K, V, S = RandomState> {
    hasher: S,
    index: HashTable<DefaultKey>,
    slots: SlotMap<DefaultKey, Entry<K, V>>, // storage using generational keys
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
}

impl<K, V> OrderedHashMap<K, V> {
    pub fn new() -> Self {
        Self::with_hasher(RandomState::default())
    }
}

impl<K, V> Default for OrderedHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

// Marker-addressed and order-list operations. None of these run user code
// beyond `Drop`; in particular `remove_at` locates the index entry by stored
// hash and slot identity, not by `K: Eq`.
impl<K, V, S> OrderedHashMap<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            index: HashTable::new(),
            slots: SlotMap::with_key(),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Marker of the first entry in insertion order.
    pub fn first_marker(&self) -> Option<Marker> {
        self.head.map(Marker::new)
    }

    /// Marker of the entry following `marker` in insertion order.
    pub fn next_after(&self, marker: Marker) -> Option<Marker> {
        self.slots.get(marker.raw())?.next.map(Marker::new)
    }

    pub fn get_at(&self, marker: Marker) -> Option<(&K, &V)> {
        self.slots.get(marker.raw()).map(|e| (&e.key, &e.value))
    }

    pub fn value_mut_at(&mut self, marker: Marker) -> Option<&mut V> {
        self.slots.get_mut(marker.raw()).map(|e| &mut e.value)
    }

    /// Remove the entry behind `marker`, relinking its neighbours.
    pub fn remove_at(&mut self, marker: Marker) -> Option<(K, V)> {
        let k = marker.raw();
        let entry = self.slots.remove(k)?;
        self.index
            .find_entry(entry.hash, |&kk| kk == k)
            .expect("live slot is indexed")
            .remove();
        self.unlink(entry.prev, entry.next);
        Some((entry.key, entry.value))
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.head = None;
        self.tail = None;
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: &self.slots,
            cursor: self.head,
            remaining: self.slots.len(),
        }
    }

    fn unlink(&mut self, prev: Option<DefaultKey>, next: Option<DefaultKey>) {
        match prev {
            Some(p) => self.slot_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slot_mut(n).prev = prev,
            None => self.tail = prev,
        }
    }

    fn link_tail(&mut self, k: DefaultKey) {
        match self.tail {
            Some(t) => self.slot_mut(t).next = Some(k),
            None => self.head = Some(k),
        }
        self.tail = Some(k);
    }

    fn slot_mut(&mut self, k: DefaultKey) -> &mut Entry<K, V> {
        self.slots
            .get_mut(k)
            .expect("order links point at live slots")
    }
}

// Key-addressed operations. User code (`K: Hash`, `K: Eq`, default-value
// closures) only runs while probing, before the first structural change.
impl<K, V, S> OrderedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    pub fn marker_of<Q>(&self, q: &Q) -> Option<Marker>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        self.index
            .find(hash, |&k| {
                self.slots
                    .get(k)
                    .map(|e| e.key.borrow() == q)
                    .unwrap_or(false)
            })
            .map(|&k| Marker::new(k))
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.marker_of(q).is_some()
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let marker = self.marker_of(q)?;
        self.slots.get(marker.raw()).map(|e| &e.value)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let marker = self.marker_of(q)?;
        self.value_mut_at(marker)
    }

    /// Insert at the end of the order. Returns the new entry's marker, or
    /// `None` if the key is already present; the map is then unchanged (the
    /// existing value and position are kept, `value` is dropped).
    pub fn insert(&mut self, key: K, value: V) -> Option<Marker> {
        let hash = self.make_hash(&key);
        let entry = Entry {
            key,
            value,
            hash,
            prev: self.tail,
            next: None,
        };
        // Use HashTable::entry to deduplicate or insert.
        let inserted = match self.index.entry(
            hash,
            |&kk| {
                self.slots
                    .get(kk)
                    .map(|e| e.key == entry.key)
                    .unwrap_or(false)
            },
            |&kk| self.slots.get(kk).map(|e| e.hash).unwrap_or(0),
        ) {
            hashbrown::hash_table::Entry::Occupied(_) => None,
            hashbrown::hash_table::Entry::Vacant(v) => {
                let k = self.slots.insert(entry);
                let _ = v.insert(k);
                Some(k)
            }
        };
        let k = inserted?;
        self.link_tail(k);
        Some(Marker::new(k))
    }

    /// Marker of `key`'s entry, inserting one at the end of the order with
    /// `default()`'s value if absent. The closure runs only on insertion,
    /// before the first structural change.
    pub fn get_or_insert_with<F>(&mut self, key: K, default: F) -> Marker
    where
        F: FnOnce() -> V,
    {
        let hash = self.make_hash(&key);
        let (k, inserted) = match self.index.entry(
            hash,
            |&kk| self.slots.get(kk).map(|e| e.key == key).unwrap_or(false),
            |&kk| self.slots.get(kk).map(|e| e.hash).unwrap_or(0),
        ) {
            hashbrown::hash_table::Entry::Occupied(o) => (*o.get(), false),
            hashbrown::hash_table::Entry::Vacant(v) => {
                let value = default();
                let k = self.slots.insert(Entry {
                    key,
                    value,
                    hash,
                    prev: self.tail,
                    next: None,
                });
                let _ = v.insert(k);
                (k, true)
            }
        };
        if inserted {
            self.link_tail(k);
        }
        Marker::new(k)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let marker = self.marker_of(q)?;
        self.remove_at(marker)
    }
}

/// In-order iterator over entries of an [`OrderedHashMap`].
pub struct Iter<'a, K, V> {
    slots: &'a SlotMap<DefaultKey, Entry<K, V>>,
    cursor: Option<DefaultKey>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let k = self.cursor?;
        let e = self.slots.get(k).expect("order links point at live slots");
        self.cursor = e.next;
        self.remaining -= 1;
        Some((&e.key, &e.value))
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            slots: self.slots,
            cursor: self.cursor,
            remaining: self.remaining,
        }
    }
}
