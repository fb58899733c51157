//! Action trait for tagged, serializable state transitions

use std::fmt::Debug;

/// Marker trait for actions that can be dispatched to the store
///
/// Actions represent intents to change state. They should be:
/// - Clone: the last processed action is handed to every listener
/// - Debug: for logging and test assertions
/// - Send + Sync + 'static: deferred work may dispatch from a spawned task
///
/// Use `#[derive(Action)]` from `orichalcum-macros` to auto-implement this trait.
pub trait Action: Clone + Debug + Send + Sync + 'static {
    /// The discriminant tag of this action.
    ///
    /// Routing maps such as [`ReducerMap`](crate::ReducerMap) and
    /// [`EffectMap`](crate::EffectMap) key on this value.
    fn name(&self) -> &'static str;
}

/// Short textual form of an action used by the action logger
///
/// Blanket-implemented for every [`Action`] using its `Debug` output.
pub trait ActionSummary: Action {
    fn summary(&self) -> String {
        format!("{:?}", self)
    }
}

impl<A: Action> ActionSummary for A {}
