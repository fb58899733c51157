//! Middleware pipeline: action rewriting and side effects ahead of the reducer

use std::collections::HashMap;
use std::fmt;

use crate::error::BoxError;
use crate::store::Store;
use crate::Action;

/// Middleware trait for intercepting actions before they reach the reducer
///
/// A middleware receives the action by value, the state as it was when the
/// action was dequeued, and the store itself. It returns the action the reducer
/// should see: the same value when it has nothing to change.
///
/// Middleware never touches state. To cause further state changes it calls
/// `store.dispatch(...)`; while the drain loop is running that only enqueues,
/// and the queued actions are processed after the current one.
///
/// Any `Fn(A, &S, &Store<S, A>) -> A` closure is a middleware. Wrap closures
/// that can fail with [`fallible_middleware`].
pub trait Middleware<S, A>: Send + Sync + 'static {
    fn handle(&self, action: A, state: &S, store: &Store<S, A>) -> Result<A, BoxError>;
}

/// Boxed middleware, the unit of composition for [`ComposedMiddleware`] and [`EffectMap`]
pub type BoxMiddleware<S, A> = Box<dyn Middleware<S, A>>;

impl<S, A, F> Middleware<S, A> for F
where
    F: Fn(A, &S, &Store<S, A>) -> A + Send + Sync + 'static,
{
    fn handle(&self, action: A, state: &S, store: &Store<S, A>) -> Result<A, BoxError> {
        Ok(self(action, state, store))
    }
}

/// Adapter turning `Fn(A, &S, &Store<S, A>) -> Result<A, E>` into a [`Middleware`]
#[derive(Clone, Copy)]
pub struct FallibleMiddleware<F>(F);

/// Wrap a middleware closure that can fail.
///
/// An `Err` aborts the current drain loop and surfaces from `dispatch` as
/// [`StoreError::Middleware`](crate::StoreError::Middleware).
pub fn fallible_middleware<F>(f: F) -> FallibleMiddleware<F> {
    FallibleMiddleware(f)
}

impl<S, A, F, E> Middleware<S, A> for FallibleMiddleware<F>
where
    F: Fn(A, &S, &Store<S, A>) -> Result<A, E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    fn handle(&self, action: A, state: &S, store: &Store<S, A>) -> Result<A, BoxError> {
        (self.0)(action, state, store).map_err(Into::into)
    }
}

/// A no-op middleware that passes every action through
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMiddleware;

impl<S, A: Action> Middleware<S, A> for NoopMiddleware {
    fn handle(&self, action: A, _state: &S, _store: &Store<S, A>) -> Result<A, BoxError> {
        Ok(action)
    }
}

/// Middleware that logs actions (for debugging)
#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware {
    /// Whether to include the action's `Debug` output
    pub include_payload: bool,
}

impl LoggingMiddleware {
    /// Create a new logging middleware that logs action names only
    pub fn new() -> Self {
        Self {
            include_payload: false,
        }
    }

    /// Create a logging middleware that also logs the action payload
    pub fn verbose() -> Self {
        Self {
            include_payload: true,
        }
    }
}

impl<S, A: Action> Middleware<S, A> for LoggingMiddleware {
    fn handle(&self, action: A, _state: &S, _store: &Store<S, A>) -> Result<A, BoxError> {
        if self.include_payload {
            tracing::debug!(action = %action.name(), payload = ?action, "Dispatching action");
        } else {
            tracing::debug!(action = %action.name(), "Dispatching action");
        }
        Ok(action)
    }
}

/// Compose multiple middleware into a single middleware
///
/// The action returned by each stage is the input of the next. Every stage sees
/// the same state snapshot and the same store.
pub struct ComposedMiddleware<S, A> {
    middlewares: Vec<BoxMiddleware<S, A>>,
}

impl<S, A> fmt::Debug for ComposedMiddleware<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedMiddleware")
            .field("middlewares_count", &self.middlewares.len())
            .finish()
    }
}

impl<S, A> Default for ComposedMiddleware<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A> ComposedMiddleware<S, A> {
    /// Create a new composed middleware
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    /// Add a middleware to the composition
    pub fn add<M: Middleware<S, A>>(&mut self, middleware: M) {
        self.middlewares.push(Box::new(middleware));
    }

    /// Builder form of [`add`](Self::add)
    pub fn with<M: Middleware<S, A>>(mut self, middleware: M) -> Self {
        self.add(middleware);
        self
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

impl<S: 'static, A: 'static> Middleware<S, A> for ComposedMiddleware<S, A> {
    fn handle(&self, mut action: A, state: &S, store: &Store<S, A>) -> Result<A, BoxError> {
        for middleware in &self.middlewares {
            action = middleware.handle(action, state, store)?;
        }
        Ok(action)
    }
}

/// Compose boxed middleware into one, applied in iteration order.
pub fn combine_middleware<S, A, I>(middlewares: I) -> ComposedMiddleware<S, A>
where
    I: IntoIterator<Item = BoxMiddleware<S, A>>,
{
    ComposedMiddleware {
        middlewares: middlewares.into_iter().collect(),
    }
}

/// Compose middleware into a [`ComposedMiddleware`], applied left to right.
///
/// ```ignore
/// let middleware = combine_middleware!(effects, LoggingMiddleware::new());
/// ```
#[macro_export]
macro_rules! combine_middleware {
    ($($middleware:expr),* $(,)?) => {
        $crate::ComposedMiddleware::new()$(.with($middleware))*
    };
}

/// Routes each action to the middleware registered for its tag
///
/// Actions whose [`name`](Action::name) has no entry pass through unchanged.
pub struct EffectMap<S, A> {
    handlers: HashMap<&'static str, BoxMiddleware<S, A>>,
}

impl<S, A> fmt::Debug for EffectMap<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.handlers.keys().collect();
        tags.sort();
        f.debug_struct("EffectMap").field("tags", &tags).finish()
    }
}

impl<S, A> Default for EffectMap<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A> EffectMap<S, A> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register the middleware for `tag`, replacing any previous one.
    pub fn on<M: Middleware<S, A>>(mut self, tag: &'static str, middleware: M) -> Self {
        self.handlers.insert(tag, Box::new(middleware));
        self
    }

    pub fn handles(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }
}

impl<S, A> Middleware<S, A> for EffectMap<S, A>
where
    S: 'static,
    A: Action,
{
    fn handle(&self, action: A, state: &S, store: &Store<S, A>) -> Result<A, BoxError> {
        match self.handlers.get(action.name()) {
            Some(middleware) => middleware.handle(action, state, store),
            None => Ok(action),
        }
    }
}

/// Build an [`EffectMap`] from `(tag, middleware)` pairs.
pub fn apply_effects<S, A, I>(handlers: I) -> EffectMap<S, A>
where
    I: IntoIterator<Item = (&'static str, BoxMiddleware<S, A>)>,
{
    EffectMap {
        handlers: handlers.into_iter().collect(),
    }
}
