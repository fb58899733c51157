//! Error types for dispatch and `once`

use std::time::Duration;

/// Error type returned by fallible reducers and middleware stages.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure of a top-level `dispatch` call.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A middleware stage returned an error while processing `action`.
    #[error("middleware failed while processing `{action}`: {source}")]
    Middleware {
        action: &'static str,
        #[source]
        source: BoxError,
    },

    /// A reducer returned an error while processing `action`.
    #[error("reducer failed while processing `{action}`: {source}")]
    Reducer {
        action: &'static str,
        #[source]
        source: BoxError,
    },

    /// The store was disposed and no longer accepts actions.
    #[error("store has been disposed")]
    Disposed,
}

impl StoreError {
    /// Name of the action being processed when the drain loop failed.
    pub fn action(&self) -> Option<&'static str> {
        match self {
            StoreError::Middleware { action, .. } | StoreError::Reducer { action, .. } => {
                Some(action)
            }
            StoreError::Disposed => None,
        }
    }
}

/// Reason a [`Once`](crate::Once) future settled without its predicate matching.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OnceError {
    #[error("once listener timed out (waited {} ms)", .waited.as_millis())]
    Timeout { waited: Duration },

    #[error("once listener canceled")]
    Canceled,

    #[error("store disposed before once listener settled")]
    Disposed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_action() {
        let err = StoreError::Reducer {
            action: "AddTodo",
            source: "boom".into(),
        };
        assert_eq!(err.action(), Some("AddTodo"));
        assert_eq!(
            err.to_string(),
            "reducer failed while processing `AddTodo`: boom"
        );
        assert_eq!(StoreError::Disposed.action(), None);
    }

    #[test]
    fn test_once_timeout_message() {
        let err = OnceError::Timeout {
            waited: Duration::from_millis(300),
        };
        assert_eq!(err.to_string(), "once listener timed out (waited 300 ms)");
    }
}
