//! CowCore: shared-state holder implementing the copy-on-write discipline.

use crate::ordered_hash_map::OrderedHashMap;
use std::collections::hash_map::RandomState;
use std::rc::Rc;

/// Reference-counted owner of an [`OrderedHashMap`] state.
///
/// Reads go straight to the shared state. Mutations must first prove unique
/// ownership: `detach_mut` deep-copies a state that another holder (or a
/// snapshot) still references, and `mutate` stages the change on such a copy
/// and commits it with a single pointer swap. Either way, a panic while the
/// state is still shared leaves the previous state, and everyone sharing it,
/// untouched.
pub struct CowCore<K, V, S = RandomState> {
    state: Rc<OrderedHashMap<K, V, S>>,
}

impl<K, V, S> CowCore<K, V, S> {
    pub fn new(state: OrderedHashMap<K, V, S>) -> Self {
        CowCore {
            state: Rc::new(state),
        }
    }

    pub fn read(&self) -> &OrderedHashMap<K, V, S> {
        &self.state
    }

    /// Pin the current state. Holders of the returned `Rc` keep it alive and
    /// unchanged; mutations through any `CowCore` detach away from it.
    pub fn snapshot(&self) -> Rc<OrderedHashMap<K, V, S>> {
        Rc::clone(&self.state)
    }

    /// Whether anything else (another core or a snapshot) references the
    /// current state.
    pub fn is_shared(&self) -> bool {
        Rc::strong_count(&self.state) > 1
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Commit `next` as the current state. The previous state stays alive
    /// for holders still referencing it.
    pub fn replace(&mut self, next: OrderedHashMap<K, V, S>) {
        self.state = Rc::new(next);
    }
}

impl<K, V, S> Clone for CowCore<K, V, S> {
    fn clone(&self) -> Self {
        CowCore {
            state: Rc::clone(&self.state),
        }
    }
}

impl<K, V, S> CowCore<K, V, S>
where
    K: Clone,
    V: Clone,
    S: Clone,
{
    /// Make the state uniquely owned, deep-copying if it is shared, and
    /// return it mutably. A panic while copying (user `Clone`) propagates
    /// before the swap, leaving the shared state in place.
    pub fn detach_mut(&mut self) -> &mut OrderedHashMap<K, V, S> {
        if Rc::strong_count(&self.state) > 1 {
            let detached = (*self.state).clone();
            self.state = Rc::new(detached);
        }
        Rc::get_mut(&mut self.state).expect("state is uniquely owned after detach")
    }

    /// Run `f` against the state. On a shared state `f` gets a staged copy
    /// that is committed only after it returns, so a panic inside `f`
    /// changes nothing observable, sharing included. On a unique state `f`
    /// runs in place; callers pass operations that finish their user-code
    /// probing before the first structural change.
    pub fn mutate<R>(&mut self, f: impl FnOnce(&mut OrderedHashMap<K, V, S>) -> R) -> R {
        if Rc::strong_count(&self.state) > 1 {
            let mut staged = (*self.state).clone();
            let out = f(&mut staged);
            self.state = Rc::new(staged);
            out
        } else {
            f(Rc::get_mut(&mut self.state).expect("state has a single holder"))
        }
    }
}
