//! Core traits and types for orichalcum
//!
//! This crate provides the dispatch engine behind orichalcum: a single state
//! value evolved only through dispatched actions, following a Redux-inspired
//! architecture.
//!
//! # Core Concepts
//!
//! - **Action**: Tagged values describing intended state changes
//! - **Reducer**: Pure `(action, state) -> state` functions, composable in order
//! - **Middleware**: Rewrites actions and performs side effects before the reducer
//! - **Store**: Owns state and the action queue; drains it in FIFO order
//! - **Listener**: Notified once per drained dispatch
//! - **once**: Future resolving when the state first satisfies a predicate
//!
//! # Basic Example
//!
//! ```ignore
//! use orichalcum_core::prelude::*;
//!
//! #[derive(Action, Clone, Debug)]
//! enum MyAction {
//!     Increment,
//!     Decrement,
//! }
//!
//! fn reducer(action: &MyAction, count: i32) -> i32 {
//!     match action {
//!         MyAction::Increment => count + 1,
//!         MyAction::Decrement => count - 1,
//!     }
//! }
//!
//! let store = create_store(reducer, NoopMiddleware, 0);
//! store.listen(|count, prev, action| println!("{prev} -> {count} after {action:?}"));
//! store.dispatch(MyAction::Increment)?;
//! ```
//!
//! # Deferred Work Pattern
//!
//! Middleware never blocks. For work that completes later (timers, I/O), the
//! middleware spawns a task holding a store clone and dispatches a result
//! action when the work is done:
//!
//! ```ignore
//! fn effects(action: AppAction, _: &AppState, store: &Store<AppState, AppAction>) -> AppAction {
//!     if let AppAction::DelayFoo = action {
//!         let store = store.clone();
//!         tokio::spawn(async move {
//!             tokio::time::sleep(Duration::from_millis(10)).await;
//!             let _ = store.dispatch(AppAction::SetFoo("time is no matter!".into()));
//!         });
//!     }
//!     action
//! }
//! ```

pub mod action;
pub mod error;
pub mod listener;
pub mod logger;
pub mod middleware;
pub mod once;
pub mod reducer;
pub mod store;
pub mod testing;

// Core trait exports
pub use action::{Action, ActionSummary};

// Error exports
pub use error::{BoxError, OnceError, StoreError};

// Store exports
pub use listener::{Listener, ListenerRegistry, Subscription};
pub use store::{create_store, Store};

// Pipeline exports
pub use middleware::{
    apply_effects, combine_middleware, fallible_middleware, BoxMiddleware, ComposedMiddleware,
    EffectMap, FallibleMiddleware, LoggingMiddleware, Middleware, NoopMiddleware,
};
pub use reducer::{
    apply_reducers, combine_reducers, fallible, BoxReducer, ComposedReducer, Fallible, Reducer,
    ReducerMap,
};

// Once exports
pub use once::{once, once_with_default, Once, OnceCancel, OnceOptions, DEFAULT_ONCE_TIMEOUT};

// Logger exports
pub use logger::{
    ActionFilter, ActionHistory, ActionLoggerConfig, ActionLoggerMiddleware, ActionRecord,
    DEFAULT_HISTORY_CAPACITY,
};

// Testing exports
pub use testing::{ActionRecorder, Notification, RecordingListener};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::Action;
    pub use crate::error::{OnceError, StoreError};
    pub use crate::listener::Subscription;
    pub use crate::middleware::{
        ComposedMiddleware, EffectMap, LoggingMiddleware, Middleware, NoopMiddleware,
    };
    pub use crate::once::{once, OnceOptions};
    pub use crate::reducer::{ComposedReducer, Reducer, ReducerMap};
    pub use crate::store::{create_store, Store};
}
