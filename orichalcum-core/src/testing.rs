//! Test utilities for applications built on orichalcum
//!
//! - [`ActionRecorder`]: pass-through middleware that records every action it sees
//! - [`RecordingListener`]: listener that records every notification
//! - Assertion macros for verifying recorded actions
//!
//! # Example
//!
//! ```ignore
//! use orichalcum::testing::{ActionRecorder, RecordingListener};
//! use orichalcum::{assert_emitted, create_store};
//!
//! let recorder = ActionRecorder::new();
//! let store = create_store(reducer, recorder.clone(), State::default());
//! let notifications = RecordingListener::attach(&store);
//!
//! store.dispatch(Action::Increment)?;
//!
//! let actions = recorder.drain();
//! assert_emitted!(actions, Action::Increment);
//! assert_eq!(notifications.count(), 1);
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::BoxError;
use crate::listener::Subscription;
use crate::middleware::Middleware;
use crate::store::Store;
use crate::Action;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Middleware that records every action passing through it, unchanged.
///
/// Clones share the same recording, so keep one clone and move another into
/// the store.
#[derive(Debug)]
pub struct ActionRecorder<A> {
    actions: Arc<Mutex<Vec<A>>>,
}

impl<A> Clone for ActionRecorder<A> {
    fn clone(&self) -> Self {
        Self {
            actions: Arc::clone(&self.actions),
        }
    }
}

impl<A> Default for ActionRecorder<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> ActionRecorder<A> {
    pub fn new() -> Self {
        Self {
            actions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Take all recorded actions, oldest first.
    pub fn drain(&self) -> Vec<A> {
        std::mem::take(&mut *lock(&self.actions))
    }

    pub fn len(&self) -> usize {
        lock(&self.actions).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.actions).is_empty()
    }
}

impl<A: Action> ActionRecorder<A> {
    /// Tags of the recorded actions, without draining them.
    pub fn names(&self) -> Vec<&'static str> {
        lock(&self.actions).iter().map(Action::name).collect()
    }
}

impl<S, A: Action> Middleware<S, A> for ActionRecorder<A> {
    fn handle(&self, action: A, _state: &S, _store: &Store<S, A>) -> Result<A, BoxError> {
        lock(&self.actions).push(action.clone());
        Ok(action)
    }
}

/// One recorded listener call
#[derive(Debug, Clone, PartialEq)]
pub struct Notification<S, A> {
    pub state: S,
    pub prev_state: S,
    pub action: A,
}

/// Listener that records every notification it receives.
pub struct RecordingListener<S, A> {
    notifications: Arc<Mutex<Vec<Notification<S, A>>>>,
    subscription: Subscription,
}

impl<S, A> std::fmt::Debug for RecordingListener<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingListener")
            .field("count", &lock(&self.notifications).len())
            .field("subscription", &self.subscription)
            .finish()
    }
}

impl<S, A> RecordingListener<S, A>
where
    S: Clone + Send + Sync + 'static,
    A: Action,
{
    /// Register a recording listener on `store`.
    pub fn attach(store: &Store<S, A>) -> Self {
        let notifications = Arc::new(Mutex::new(Vec::new()));
        let subscription = {
            let notifications = Arc::clone(&notifications);
            store.listen(move |state: &S, prev_state: &S, action: &A| {
                lock(&notifications).push(Notification {
                    state: state.clone(),
                    prev_state: prev_state.clone(),
                    action: action.clone(),
                });
            })
        };
        Self {
            notifications,
            subscription,
        }
    }

    /// Number of notifications received so far.
    pub fn count(&self) -> usize {
        lock(&self.notifications).len()
    }

    pub fn last(&self) -> Option<Notification<S, A>> {
        lock(&self.notifications).last().cloned()
    }

    /// Take all recorded notifications, oldest first.
    pub fn drain(&self) -> Vec<Notification<S, A>> {
        std::mem::take(&mut *lock(&self.notifications))
    }

    /// Actions of the recorded notifications, oldest first.
    pub fn actions(&self) -> Vec<A> {
        lock(&self.notifications)
            .iter()
            .map(|n| n.action.clone())
            .collect()
    }

    /// Stop recording. Already recorded notifications are kept.
    pub fn detach(&self) -> bool {
        self.subscription.unsubscribe()
    }
}

/// Assert that a specific action was emitted.
///
/// # Example
///
/// ```ignore
/// let actions = recorder.drain();
/// assert_emitted!(actions, Action::Increment);
/// assert_emitted!(actions, Action::SetValue(v) if *v > 40);
/// ```
#[macro_export]
macro_rules! assert_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            $actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected action matching `{}` to be emitted, but got: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// Assert that a specific action was NOT emitted.
#[macro_export]
macro_rules! assert_not_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            !$actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected action matching `{}` NOT to be emitted, but it was: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// Count how many actions match a pattern.
///
/// ```ignore
/// assert_eq!(count_emitted!(actions, Action::Tick), 3);
/// ```
#[macro_export]
macro_rules! count_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions.iter().filter(|a| matches!(a, $pattern $(if $guard)?)).count()
    };
}
