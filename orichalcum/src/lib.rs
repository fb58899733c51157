//! orichalcum: a small Redux-style state container
//!
//! One state value, evolved only by dispatched actions. Middleware rewrites
//! actions and runs side effects, reducers compute the next state, listeners
//! observe each settled dispatch, and [`once`] waits for a state of interest.
//!
//! # Example
//! ```ignore
//! use orichalcum::prelude::*;
//!
//! #[derive(Action, Clone, Debug)]
//! #[action(rename_all = "SCREAMING_SNAKE_CASE")]
//! enum MyAction {
//!     FlipBits,
//!     SetFoo(String),
//! }
//!
//! let reducer = ReducerMap::new(AppState::default())
//!     .on("FLIP_BITS", flip_bits)
//!     .on("SET_FOO", set_foo);
//! let store = Store::from_reducer_map(reducer, LoggingMiddleware::new());
//! ```

// Re-export everything from core
pub use orichalcum_core::*;

// Re-export derive macros
pub use orichalcum_macros::Action;

/// Prelude for convenient imports
pub mod prelude {
    // Traits
    pub use orichalcum_core::{Action, Middleware, Reducer};

    // Store
    pub use orichalcum_core::{create_store, Store, StoreError, Subscription};

    // Pipelines
    pub use orichalcum_core::{
        apply_effects, apply_reducers, combine_middleware, combine_reducers, ComposedMiddleware,
        ComposedReducer, EffectMap, LoggingMiddleware, NoopMiddleware, ReducerMap,
    };

    // Once
    pub use orichalcum_core::{once, Once, OnceCancel, OnceError, OnceOptions};

    // Derive macros
    pub use orichalcum_macros::Action;
}
