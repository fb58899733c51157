//! Reducer pipeline: pure `(action, state) -> state` functions and their composition

use std::collections::HashMap;
use std::fmt;

use crate::error::BoxError;
use crate::Action;

/// A pure function computing the next state from an action and the previous state
///
/// Reducers take the previous state by value and return the next one. Returning
/// the input unchanged is how a reducer says "nothing to do".
///
/// Any `Fn(&A, S) -> S` closure is a reducer. Wrap closures that can fail with
/// [`fallible`].
///
/// # Example
/// ```
/// use orichalcum_core::{Action, Reducer};
///
/// #[derive(Clone, Debug)]
/// enum CounterAction {
///     Increment,
///     Reset,
/// }
///
/// impl Action for CounterAction {
///     fn name(&self) -> &'static str {
///         match self {
///             CounterAction::Increment => "Increment",
///             CounterAction::Reset => "Reset",
///         }
///     }
/// }
///
/// let reducer = |action: &CounterAction, count: i32| match action {
///     CounterAction::Increment => count + 1,
///     CounterAction::Reset => 0,
/// };
///
/// assert_eq!(reducer.reduce(&CounterAction::Increment, 41).unwrap(), 42);
/// ```
pub trait Reducer<S, A>: Send + Sync + 'static {
    fn reduce(&self, action: &A, state: S) -> Result<S, BoxError>;
}

/// Boxed reducer, the unit of composition for [`ComposedReducer`] and [`ReducerMap`]
pub type BoxReducer<S, A> = Box<dyn Reducer<S, A>>;

impl<S, A, F> Reducer<S, A> for F
where
    F: Fn(&A, S) -> S + Send + Sync + 'static,
{
    fn reduce(&self, action: &A, state: S) -> Result<S, BoxError> {
        Ok(self(action, state))
    }
}

/// Adapter turning `Fn(&A, S) -> Result<S, E>` into a [`Reducer`]
#[derive(Clone, Copy)]
pub struct Fallible<F>(F);

/// Wrap a reducer closure that can fail.
///
/// An `Err` aborts the current drain loop and surfaces from `dispatch` as
/// [`StoreError::Reducer`](crate::StoreError::Reducer).
pub fn fallible<F>(f: F) -> Fallible<F> {
    Fallible(f)
}

impl<S, A, F, E> Reducer<S, A> for Fallible<F>
where
    F: Fn(&A, S) -> Result<S, E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    fn reduce(&self, action: &A, state: S) -> Result<S, BoxError> {
        (self.0)(action, state).map_err(Into::into)
    }
}

/// Threads state through several reducers in order
///
/// Each stage receives the same action and the state produced by the previous
/// stage.
pub struct ComposedReducer<S, A> {
    reducers: Vec<BoxReducer<S, A>>,
}

impl<S, A> fmt::Debug for ComposedReducer<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedReducer")
            .field("reducers_count", &self.reducers.len())
            .finish()
    }
}

impl<S, A> Default for ComposedReducer<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A> ComposedReducer<S, A> {
    pub fn new() -> Self {
        Self {
            reducers: Vec::new(),
        }
    }

    /// Append a reducer to the end of the pipeline
    pub fn add<R: Reducer<S, A>>(&mut self, reducer: R) {
        self.reducers.push(Box::new(reducer));
    }

    /// Builder form of [`add`](Self::add)
    pub fn with<R: Reducer<S, A>>(mut self, reducer: R) -> Self {
        self.add(reducer);
        self
    }

    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }
}

impl<S: 'static, A: 'static> Reducer<S, A> for ComposedReducer<S, A> {
    fn reduce(&self, action: &A, mut state: S) -> Result<S, BoxError> {
        for reducer in &self.reducers {
            state = reducer.reduce(action, state)?;
        }
        Ok(state)
    }
}

/// Compose boxed reducers into one, applied in iteration order.
///
/// See also the [`combine_reducers!`](crate::combine_reducers) macro, which
/// accepts unboxed reducers.
pub fn combine_reducers<S, A, I>(reducers: I) -> ComposedReducer<S, A>
where
    I: IntoIterator<Item = BoxReducer<S, A>>,
{
    ComposedReducer {
        reducers: reducers.into_iter().collect(),
    }
}

/// Compose reducers into a [`ComposedReducer`], applied left to right.
///
/// ```ignore
/// let reducer = combine_reducers!(todos_reducer, filter_reducer);
/// ```
#[macro_export]
macro_rules! combine_reducers {
    ($($reducer:expr),* $(,)?) => {
        $crate::ComposedReducer::new()$(.with($reducer))*
    };
}

/// Routes each action to the reducer registered for its tag
///
/// Actions whose [`name`](Action::name) has no entry leave state unchanged.
/// The map also carries the initial state of the slice it manages, which
/// [`Store::from_reducer_map`](crate::Store::from_reducer_map) uses to seed a
/// store.
pub struct ReducerMap<S, A> {
    handlers: HashMap<&'static str, BoxReducer<S, A>>,
    initial_state: S,
}

impl<S: fmt::Debug, A> fmt::Debug for ReducerMap<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.handlers.keys().collect();
        tags.sort();
        f.debug_struct("ReducerMap")
            .field("tags", &tags)
            .field("initial_state", &self.initial_state)
            .finish()
    }
}

impl<S, A> ReducerMap<S, A> {
    pub fn new(initial_state: S) -> Self {
        Self {
            handlers: HashMap::new(),
            initial_state,
        }
    }

    /// Register the reducer for `tag`, replacing any previous one.
    pub fn on<R: Reducer<S, A>>(mut self, tag: &'static str, reducer: R) -> Self {
        self.handlers.insert(tag, Box::new(reducer));
        self
    }

    pub fn handles(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }

    pub fn initial_state(&self) -> &S {
        &self.initial_state
    }
}

impl<S, A> Reducer<S, A> for ReducerMap<S, A>
where
    S: Send + Sync + 'static,
    A: Action,
{
    fn reduce(&self, action: &A, state: S) -> Result<S, BoxError> {
        match self.handlers.get(action.name()) {
            Some(reducer) => reducer.reduce(action, state),
            None => Ok(state),
        }
    }
}

/// Build a [`ReducerMap`] from `(tag, reducer)` pairs.
pub fn apply_reducers<S, A, I>(handlers: I, initial_state: S) -> ReducerMap<S, A>
where
    I: IntoIterator<Item = (&'static str, BoxReducer<S, A>)>,
{
    ReducerMap {
        handlers: handlers.into_iter().collect(),
        initial_state,
    }
}
