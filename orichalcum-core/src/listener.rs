//! Listener registry for observing settled state transitions

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Observer called once per drained dispatch with `(state, previous_state, action)`
pub type Listener<S, A> = Arc<dyn Fn(&S, &S, &A) + Send + Sync>;

/// Ordered set of listeners keyed by a monotonically increasing id
pub struct ListenerRegistry<S, A> {
    listeners: Vec<(u64, Listener<S, A>)>,
    next_id: u64,
}

impl<S, A> fmt::Debug for ListenerRegistry<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners_count", &self.listeners.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl<S, A> Default for ListenerRegistry<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A> ListenerRegistry<S, A> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 1,
        }
    }

    /// Store a listener and return its id
    pub fn insert(&mut self, listener: Listener<S, A>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Remove the listener with `id`. Returns whether it was still registered.
    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn contains(&self, id: u64) -> bool {
        self.listeners.iter().any(|(listener_id, _)| *listener_id == id)
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Listeners in registration order, detached from the registry
    pub fn snapshot(&self) -> Vec<Listener<S, A>> {
        self.listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }
}

/// Shared registry as held by a store
pub(crate) type SharedRegistry<S, A> = Arc<Mutex<ListenerRegistry<S, A>>>;

pub(crate) fn lock_registry<S, A>(
    registry: &Mutex<ListenerRegistry<S, A>>,
) -> MutexGuard<'_, ListenerRegistry<S, A>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Invoke every listener registered at the start of the call.
///
/// The registry lock is released before any listener runs, so listeners may
/// register or unsubscribe freely; those changes apply to the next pass.
pub(crate) fn notify<S, A>(
    registry: &Mutex<ListenerRegistry<S, A>>,
    state: &S,
    prev: &S,
    action: &A,
) {
    let listeners = lock_registry(registry).snapshot();
    for listener in listeners {
        listener(state, prev, action);
    }
}

trait Unregister: Send + Sync {
    fn unregister(&self, id: u64) -> bool;
}

impl<S: 'static, A: 'static> Unregister for Mutex<ListenerRegistry<S, A>> {
    fn unregister(&self, id: u64) -> bool {
        lock_registry(self).remove(id)
    }
}

/// Capability returned by [`Store::listen`](crate::Store::listen)
///
/// [`unsubscribe`](Subscription::unsubscribe) removes exactly the listener it
/// was created for. Calling it again, or after the store is gone, does nothing.
/// Dropping a subscription does not unsubscribe.
#[derive(Clone)]
pub struct Subscription {
    id: u64,
    registry: Weak<dyn Unregister>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Subscription {
    pub(crate) fn new<S: 'static, A: 'static>(id: u64, registry: &SharedRegistry<S, A>) -> Self {
        let registry: Arc<dyn Unregister> = registry.clone();
        Self {
            id,
            registry: Arc::downgrade(&registry),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove the listener. Returns `true` only for the call that removed it.
    pub fn unsubscribe(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.unregister(self.id),
            None => false,
        }
    }
}
