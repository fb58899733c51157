//! Centralized state store: action queue, drain loop and listener notification

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::StoreError;
use crate::listener::{self, lock_registry, ListenerRegistry, SharedRegistry, Subscription};
use crate::middleware::{BoxMiddleware, Middleware};
use crate::reducer::{BoxReducer, Reducer, ReducerMap};
use crate::Action;

/// Centralized state container with a Redux-like dispatch loop
///
/// The store owns the current state and evolves it only through dispatched
/// actions. Each action is first passed through the middleware, which may
/// rewrite it or dispatch more actions, then through the reducer, which
/// computes the next state.
///
/// `Store` is a cheap handle: clones share the same state, queue and
/// listeners. Middleware receives the store as its dispatch callback and
/// deferred work (a spawned task, a timer) can hold a clone.
///
/// # Dispatch semantics
///
/// - Actions are processed strictly in FIFO order, including those dispatched
///   by middleware while the queue is draining.
/// - Only one drain loop runs at a time. A `dispatch` made while the loop is
///   running only enqueues and returns `Ok(())`.
/// - Listeners are notified once per drain, after the queue is empty, with
///   the final state, the state from before the drain and the last processed
///   action.
///
/// # Example
/// ```
/// use orichalcum_core::{create_store, Action, NoopMiddleware};
///
/// #[derive(Clone, Debug)]
/// enum CounterAction {
///     Increment,
///     Decrement,
/// }
///
/// impl Action for CounterAction {
///     fn name(&self) -> &'static str {
///         match self {
///             CounterAction::Increment => "Increment",
///             CounterAction::Decrement => "Decrement",
///         }
///     }
/// }
///
/// fn reducer(action: &CounterAction, count: i32) -> i32 {
///     match action {
///         CounterAction::Increment => count + 1,
///         CounterAction::Decrement => count - 1,
///     }
/// }
///
/// let store = create_store(reducer, NoopMiddleware, 0);
/// store
///     .dispatch_all([CounterAction::Increment, CounterAction::Increment])
///     .unwrap();
/// assert_eq!(*store.get_state(), 2);
/// ```
pub struct Store<S, A> {
    inner: Arc<Inner<S, A>>,
}

struct Inner<S, A> {
    reducer: BoxReducer<S, A>,
    middleware: BoxMiddleware<S, A>,
    core: Mutex<Core<S, A>>,
    listeners: SharedRegistry<S, A>,
    shutdown: CancellationToken,
}

/// Mutable engine state, only touched by the dispatch engine
struct Core<S, A> {
    state: Arc<S>,
    queue: VecDeque<A>,
    in_progress: bool,
    disposed: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the in-progress flag on early exit (error or panic) from a drain.
///
/// The normal exit path disarms it while still holding the lock that observed
/// the empty queue.
struct DrainGuard<'a, S, A> {
    core: &'a Mutex<Core<S, A>>,
    armed: bool,
}

impl<S, A> Drop for DrainGuard<'_, S, A> {
    fn drop(&mut self) {
        if self.armed {
            lock(self.core).in_progress = false;
        }
    }
}

impl<S, A> Clone for Store<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, A> fmt::Debug for Store<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = lock(&self.inner.core);
        f.debug_struct("Store")
            .field("pending", &core.queue.len())
            .field("in_progress", &core.in_progress)
            .field("disposed", &core.disposed)
            .field("listeners", &lock_registry(&self.inner.listeners).len())
            .finish()
    }
}

/// Create a store from a reducer, a middleware and the initial state.
///
/// Use [`NoopMiddleware`](crate::NoopMiddleware) when no middleware is needed.
pub fn create_store<S, A, R, M>(reducer: R, middleware: M, initial_state: S) -> Store<S, A>
where
    S: Clone + Send + Sync + 'static,
    A: Action,
    R: Reducer<S, A>,
    M: Middleware<S, A>,
{
    Store::new(reducer, middleware, initial_state)
}

impl<S, A> Store<S, A>
where
    S: Clone + Send + Sync + 'static,
    A: Action,
{
    /// Create a new store with reducer, middleware and initial state
    pub fn new<R, M>(reducer: R, middleware: M, initial_state: S) -> Self
    where
        R: Reducer<S, A>,
        M: Middleware<S, A>,
    {
        Self {
            inner: Arc::new(Inner {
                reducer: Box::new(reducer),
                middleware: Box::new(middleware),
                core: Mutex::new(Core {
                    state: Arc::new(initial_state),
                    queue: VecDeque::new(),
                    in_progress: false,
                    disposed: false,
                }),
                listeners: Arc::new(Mutex::new(ListenerRegistry::new())),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Create a store seeded with the initial state carried by a [`ReducerMap`]
    pub fn from_reducer_map<M>(reducer: ReducerMap<S, A>, middleware: M) -> Self
    where
        M: Middleware<S, A>,
    {
        let initial_state = reducer.initial_state().clone();
        Self::new(reducer, middleware, initial_state)
    }

    /// Get a snapshot of the current state
    pub fn get_state(&self) -> Arc<S> {
        Arc::clone(&lock(&self.inner.core).state)
    }

    /// Number of actions waiting in the queue
    ///
    /// Non-zero between dispatches only after a drain was aborted by an error.
    pub fn pending(&self) -> usize {
        lock(&self.inner.core).queue.len()
    }

    /// Whether a drain loop is currently running
    pub fn is_dispatching(&self) -> bool {
        lock(&self.inner.core).in_progress
    }

    /// Dispatch a single action
    ///
    /// See [`dispatch_all`](Self::dispatch_all).
    pub fn dispatch(&self, action: A) -> Result<(), StoreError> {
        self.enqueue(std::iter::once(action), true)
    }

    /// Append actions to the queue in order and drain it if no loop is running
    ///
    /// Errors from middleware or reducers abort the drain and are returned from
    /// the call that runs the loop. Actions processed before the failure stay
    /// applied, the failing action is dropped, and the rest stay queued for the
    /// next dispatch.
    ///
    /// Listeners are not notified for an aborted drain, even though its
    /// processed actions changed the state. The next successful drain reports
    /// that partially applied state as its `prev_state`, and a state reached
    /// and left again before the failure is never observed, including by
    /// pending [`once`](crate::once) predicates.
    pub fn dispatch_all<I>(&self, actions: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = A>,
    {
        self.enqueue(actions, true)
    }

    /// Dispatch without notifying listeners when this call runs the drain loop
    ///
    /// Called from inside a running drain this behaves like [`dispatch`](Self::dispatch):
    /// whether listeners hear about the drain is decided by its top-level call.
    pub fn dispatch_silent(&self, action: A) -> Result<(), StoreError> {
        self.enqueue(std::iter::once(action), false)
    }

    /// Register a listener called after every drained dispatch
    ///
    /// The listener receives `(state, previous_state, action)`. Listeners are
    /// called in registration order.
    pub fn listen<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&S, &S, &A) + Send + Sync + 'static,
    {
        let id = lock_registry(&self.inner.listeners).insert(Arc::new(listener));
        trace!(listener = id, "listener registered");
        Subscription::new(id, &self.inner.listeners)
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        lock_registry(&self.inner.listeners).len()
    }

    /// Shut the store down
    ///
    /// Clears listeners and queued actions, rejects every pending
    /// [`once`](crate::once) future with [`OnceError::Disposed`](crate::OnceError::Disposed),
    /// and makes later dispatches fail with [`StoreError::Disposed`].
    /// Disposing twice is a no-op.
    pub fn dispose(&self) {
        {
            let mut core = lock(&self.inner.core);
            if core.disposed {
                return;
            }
            core.disposed = true;
            core.queue.clear();
        }
        lock_registry(&self.inner.listeners).clear();
        self.inner.shutdown.cancel();
        debug!("store disposed");
    }

    pub fn is_disposed(&self) -> bool {
        lock(&self.inner.core).disposed
    }

    /// Token cancelled when the store is disposed
    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }

    fn enqueue<I>(&self, actions: I, notify: bool) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = A>,
    {
        let state_before = {
            let mut core = lock(&self.inner.core);
            if core.disposed {
                return Err(StoreError::Disposed);
            }
            core.queue.extend(actions);
            if core.in_progress {
                trace!(pending = core.queue.len(), "enqueued during drain");
                return Ok(());
            }
            core.in_progress = true;
            Arc::clone(&core.state)
        };

        let mut guard = DrainGuard {
            core: &self.inner.core,
            armed: true,
        };

        match self.drain(&mut guard) {
            Ok(Some((final_state, last_action, processed))) => {
                debug!(processed, last_action = %last_action.name(), "dispatch drained");
                if notify {
                    listener::notify(
                        &self.inner.listeners,
                        &final_state,
                        &state_before,
                        &last_action,
                    );
                }
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(err) => {
                warn!(error = %err, pending = self.pending(), "dispatch aborted");
                Err(err)
            }
        }
    }

    /// Process the queue until it is empty.
    ///
    /// Returns the final state, the last processed action and the number of
    /// processed actions, or `None` if the queue was already empty.
    fn drain(
        &self,
        guard: &mut DrainGuard<'_, S, A>,
    ) -> Result<Option<(Arc<S>, A, usize)>, StoreError> {
        let mut last_action = None;
        let mut processed = 0usize;

        loop {
            let (action, state) = {
                let mut core = lock(&self.inner.core);
                match core.queue.pop_front() {
                    Some(action) => (action, Arc::clone(&core.state)),
                    None => {
                        core.in_progress = false;
                        guard.armed = false;
                        let final_state = Arc::clone(&core.state);
                        return Ok(last_action.map(|action| (final_state, action, processed)));
                    }
                }
            };

            let name = action.name();
            trace!(action = %name, "processing action");

            let action = self
                .inner
                .middleware
                .handle(action, &state, self)
                .map_err(|source| StoreError::Middleware {
                    action: name,
                    source,
                })?;

            let next = self
                .inner
                .reducer
                .reduce(&action, S::clone(&state))
                .map_err(|source| StoreError::Reducer {
                    action: action.name(),
                    source,
                })?;

            lock(&self.inner.core).state = Arc::new(next);
            processed += 1;
            last_action = Some(action);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{fallible_middleware, NoopMiddleware};
    use crate::reducer::fallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct TestState {
        counter: i32,
        log: Vec<&'static str>,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Increment,
        Decrement,
        Mark(&'static str),
        /// Middleware dispatches `Mark(first)` then `Mark(second)`
        Fanout(&'static str, &'static str),
        Explode,
    }

    impl Action for TestAction {
        fn name(&self) -> &'static str {
            match self {
                TestAction::Increment => "Increment",
                TestAction::Decrement => "Decrement",
                TestAction::Mark(_) => "Mark",
                TestAction::Fanout(..) => "Fanout",
                TestAction::Explode => "Explode",
            }
        }
    }

    fn test_reducer(action: &TestAction, mut state: TestState) -> TestState {
        match action {
            TestAction::Increment => state.counter += 1,
            TestAction::Decrement => state.counter -= 1,
            TestAction::Mark(label) => state.log.push(label),
            TestAction::Fanout(..) => state.log.push("fanout"),
            TestAction::Explode => {}
        }
        state
    }

    fn fanout(
        action: TestAction,
        _: &TestState,
        store: &Store<TestState, TestAction>,
    ) -> TestAction {
        if let TestAction::Fanout(first, second) = action {
            store.dispatch(TestAction::Mark(first)).unwrap();
            store.dispatch(TestAction::Mark(second)).unwrap();
        }
        action
    }

    fn counting_listener(store: &Store<TestState, TestAction>) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        store.listen(move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        calls
    }

    #[test]
    fn test_store_dispatch() {
        let store = create_store(test_reducer, NoopMiddleware, TestState::default());

        store.dispatch(TestAction::Increment).unwrap();
        assert_eq!(store.get_state().counter, 1);

        store.dispatch(TestAction::Increment).unwrap();
        assert_eq!(store.get_state().counter, 2);

        store.dispatch(TestAction::Decrement).unwrap();
        assert_eq!(store.get_state().counter, 1);
    }

    #[test]
    fn test_batching_is_transparent_to_reducers() {
        let actions = [
            TestAction::Increment,
            TestAction::Mark("a"),
            TestAction::Decrement,
            TestAction::Increment,
        ];

        let one_by_one = create_store(test_reducer, NoopMiddleware, TestState::default());
        for action in actions.clone() {
            one_by_one.dispatch(action).unwrap();
        }

        let batched = create_store(test_reducer, NoopMiddleware, TestState::default());
        batched.dispatch_all(actions).unwrap();

        assert_eq!(*one_by_one.get_state(), *batched.get_state());
    }

    #[test]
    fn test_single_notification_per_dispatch() {
        let store = create_store(test_reducer, fanout, TestState::default());
        let calls = counting_listener(&store);

        store
            .dispatch_all([
                TestAction::Increment,
                TestAction::Fanout("x", "y"),
                TestAction::Increment,
            ])
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get_state().counter, 2);
    }

    #[test]
    fn test_notification_arguments() {
        let store = create_store(test_reducer, NoopMiddleware, TestState::default());
        store.dispatch(TestAction::Increment).unwrap();

        let seen = Arc::new(Mutex::new(None));
        {
            let seen = Arc::clone(&seen);
            store.listen(move |state, prev, action| {
                *seen.lock().unwrap() = Some((state.counter, prev.counter, action.clone()));
            });
        }

        store
            .dispatch_all([TestAction::Increment, TestAction::Increment, TestAction::Mark("end")])
            .unwrap();

        // prev is the state before the whole drain, not before the last action
        assert_eq!(
            *seen.lock().unwrap(),
            Some((3, 1, TestAction::Mark("end")))
        );
    }

    #[test]
    fn test_listener_sees_rewritten_action() {
        let rewrite = |action: TestAction, _: &TestState, _: &Store<TestState, TestAction>| {
            match action {
                TestAction::Decrement => TestAction::Increment,
                other => other,
            }
        };
        let store = create_store(test_reducer, rewrite, TestState::default());
        let seen = Arc::new(Mutex::new(None));
        {
            let seen = Arc::clone(&seen);
            store.listen(move |_, _, action| {
                *seen.lock().unwrap() = Some(action.clone());
            });
        }

        store.dispatch(TestAction::Decrement).unwrap();
        assert_eq!(store.get_state().counter, 1);
        assert_eq!(*seen.lock().unwrap(), Some(TestAction::Increment));
    }

    #[test]
    fn test_middleware_dispatches_run_after_current_and_before_next_top_level() {
        let store = create_store(test_reducer, fanout, TestState::default());

        store
            .dispatch_all([
                TestAction::Mark("a"),
                TestAction::Fanout("b1", "b2"),
                TestAction::Mark("c"),
            ])
            .unwrap();
        store.dispatch(TestAction::Mark("d")).unwrap();

        assert_eq!(
            store.get_state().log,
            vec!["a", "fanout", "c", "b1", "b2", "d"]
        );
    }

    #[test]
    fn test_nested_dispatch_only_enqueues() {
        let entered = Arc::new(AtomicUsize::new(0));
        let max_depth = Arc::new(AtomicUsize::new(0));
        let middleware = {
            let entered = Arc::clone(&entered);
            let max_depth = Arc::clone(&max_depth);
            move |action: TestAction, _: &TestState, store: &Store<TestState, TestAction>| {
                let depth = entered.fetch_add(1, Ordering::SeqCst) + 1;
                max_depth.fetch_max(depth, Ordering::SeqCst);
                assert!(store.is_dispatching());
                if action == TestAction::Increment {
                    store.dispatch(TestAction::Mark("nested")).unwrap();
                }
                entered.fetch_sub(1, Ordering::SeqCst);
                action
            }
        };
        let store = create_store(test_reducer, middleware, TestState::default());

        store.dispatch(TestAction::Increment).unwrap();
        assert_eq!(max_depth.load(Ordering::SeqCst), 1);
        assert_eq!(store.get_state().log, vec!["nested"]);
        assert!(!store.is_dispatching());
    }

    #[test]
    fn test_middleware_sees_state_before_action() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let middleware = {
            let seen = Arc::clone(&seen);
            move |action: TestAction, state: &TestState, _: &Store<TestState, TestAction>| {
                seen.lock().unwrap().push(state.counter);
                action
            }
        };
        let store = create_store(test_reducer, middleware, TestState::default());
        store
            .dispatch_all([TestAction::Increment, TestAction::Increment])
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_reducer_error_resets_flag_and_keeps_queue() {
        let reducer = fallible(|action: &TestAction, state: TestState| match action {
            TestAction::Explode => Err("kaboom"),
            _ => Ok(test_reducer(action, state)),
        });
        let store = create_store(reducer, NoopMiddleware, TestState::default());
        let calls = counting_listener(&store);

        let err = store
            .dispatch_all([
                TestAction::Increment,
                TestAction::Explode,
                TestAction::Increment,
                TestAction::Increment,
            ])
            .unwrap_err();

        assert!(matches!(err, StoreError::Reducer { action: "Explode", .. }));
        assert_eq!(store.get_state().counter, 1, "processed effects stay applied");
        assert_eq!(store.pending(), 2, "unprocessed actions stay queued");
        assert!(!store.is_dispatching());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // The next dispatch drains what was left behind first
        store.dispatch(TestAction::Decrement).unwrap();
        assert_eq!(store.get_state().counter, 2);
        assert_eq!(store.pending(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_middleware_error_propagates_to_outer_dispatch() {
        let middleware = fallible_middleware(
            |action: TestAction, _: &TestState, store: &Store<TestState, TestAction>| {
                match action {
                    TestAction::Explode => Err("middleware refused"),
                    TestAction::Increment => {
                        // Nested enqueue succeeds; the failure surfaces from the outer call
                        store.dispatch(TestAction::Explode).map_err(|_| "nested")?;
                        Ok(action)
                    }
                    other => Ok(other),
                }
            },
        );
        let store = create_store(test_reducer, middleware, TestState::default());

        let err = store.dispatch(TestAction::Increment).unwrap_err();
        assert!(matches!(err, StoreError::Middleware { action: "Explode", .. }));
        assert_eq!(err.to_string(), "middleware failed while processing `Explode`: middleware refused");
        assert_eq!(store.get_state().counter, 1);
        assert!(!store.is_dispatching());
    }

    #[test]
    fn test_panic_in_reducer_does_not_wedge_store() {
        let reducer = |action: &TestAction, state: TestState| {
            if *action == TestAction::Explode {
                panic!("reducer panic");
            }
            test_reducer(action, state)
        };
        let store = create_store(reducer, NoopMiddleware, TestState::default());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = store.dispatch(TestAction::Explode);
        }));
        assert!(result.is_err());
        assert!(!store.is_dispatching());

        store.dispatch(TestAction::Increment).unwrap();
        assert_eq!(store.get_state().counter, 1);
    }

    #[test]
    fn test_dispatch_silent_skips_notification() {
        let store = create_store(test_reducer, fanout, TestState::default());
        let calls = counting_listener(&store);

        store.dispatch_silent(TestAction::Fanout("a", "b")).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.get_state().log, vec!["fanout", "a", "b"]);

        store.dispatch(TestAction::Increment).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_dispatch_does_not_notify() {
        let store = create_store(test_reducer, NoopMiddleware, TestState::default());
        let calls = counting_listener(&store);

        store.dispatch_all(Vec::new()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let store = create_store(test_reducer, NoopMiddleware, TestState::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let subscription = {
            let calls = Arc::clone(&calls);
            store.listen(move |_, _, _| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        store.dispatch(TestAction::Increment).unwrap();
        assert!(subscription.unsubscribe());
        assert!(!subscription.unsubscribe());
        store.dispatch(TestAction::Increment).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_self_unsubscribe_during_notification() {
        let store = create_store(test_reducer, NoopMiddleware, TestState::default());
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let first_calls = Arc::new(AtomicUsize::new(0));
        let other_calls = counting_listener(&store);

        let subscription = {
            let slot = Arc::clone(&slot);
            let first_calls = Arc::clone(&first_calls);
            store.listen(move |_, _, _| {
                first_calls.fetch_add(1, Ordering::SeqCst);
                if let Some(sub) = slot.lock().unwrap().as_ref() {
                    sub.unsubscribe();
                }
            })
        };
        *slot.lock().unwrap() = Some(subscription);
        let later_calls = counting_listener(&store);

        store.dispatch(TestAction::Increment).unwrap();
        store.dispatch(TestAction::Increment).unwrap();

        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(other_calls.load(Ordering::SeqCst), 2);
        assert_eq!(later_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_listener_may_dispatch() {
        let store = create_store(test_reducer, NoopMiddleware, TestState::default());
        {
            let handle = store.clone();
            store.listen(move |state, _, _| {
                if state.counter == 1 {
                    handle.dispatch(TestAction::Mark("from listener")).unwrap();
                }
            });
        }

        store.dispatch(TestAction::Increment).unwrap();
        assert_eq!(store.get_state().log, vec!["from listener"]);
    }

    #[test]
    fn test_dispose() {
        let store = create_store(test_reducer, NoopMiddleware, TestState::default());
        let calls = counting_listener(&store);
        store.dispatch(TestAction::Increment).unwrap();

        store.dispose();
        store.dispose();
        assert!(store.is_disposed());
        assert_eq!(store.listener_count(), 0);
        assert!(matches!(
            store.dispatch(TestAction::Increment),
            Err(StoreError::Disposed)
        ));
        assert_eq!(store.get_state().counter, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_from_reducer_map() {
        let reducer = ReducerMap::new(TestState {
            counter: 10,
            log: vec![],
        })
        .on("Increment", test_reducer);
        let store = Store::from_reducer_map(reducer, NoopMiddleware);

        assert_eq!(store.get_state().counter, 10);
        store
            .dispatch_all([TestAction::Increment, TestAction::Decrement])
            .unwrap();
        assert_eq!(store.get_state().counter, 11, "unmapped tags are ignored");
    }

    #[test]
    fn test_dispatch_from_other_thread_joins_running_drain() {
        let (started_tx, started_rx) = mpsc::channel::<()>();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let gate = Mutex::new(Some((started_tx, release_rx)));
        // Blocks the first action until released
        let slow = move |action: TestAction, _: &TestState, _: &Store<TestState, TestAction>| {
            let first = gate.lock().unwrap().take();
            if let Some((started, release)) = first {
                started.send(()).unwrap();
                release.recv().unwrap();
            }
            action
        };
        let store = create_store(test_reducer, slow, TestState::default());
        let calls = counting_listener(&store);

        let drainer = {
            let store = store.clone();
            thread::spawn(move || store.dispatch(TestAction::Increment))
        };
        started_rx.recv().unwrap();
        assert!(store.is_dispatching());

        let producer = {
            let store = store.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    store.dispatch(TestAction::Increment).unwrap();
                }
            })
        };
        producer.join().unwrap();

        // The other thread only enqueued
        assert_eq!(store.pending(), 50);
        assert_eq!(store.get_state().counter, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        release_tx.send(()).unwrap();
        drainer.join().unwrap().unwrap();

        assert_eq!(store.get_state().counter, 51);
        assert_eq!(store.pending(), 0);
        assert!(!store.is_dispatching());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_dispatchers_apply_every_action_once() {
        let store = create_store(test_reducer, NoopMiddleware, TestState::default());

        thread::scope(|scope| {
            for _ in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    for _ in 0..200 {
                        store.dispatch(TestAction::Increment).unwrap();
                    }
                });
            }
        });

        assert_eq!(store.get_state().counter, 8 * 200);
        assert_eq!(store.pending(), 0);
        assert!(!store.is_dispatching());
    }

    #[test]
    fn test_clones_share_state() {
        let store = create_store(test_reducer, NoopMiddleware, TestState::default());
        let other = store.clone();
        other.dispatch(TestAction::Increment).unwrap();
        assert_eq!(store.get_state().counter, 1);
    }
}
