//! Action logging middleware
//!
//! [`ActionLoggerMiddleware`] emits a `tracing` event for every action that
//! reaches it, filtered by glob patterns on the action tag, and can keep a
//! bounded [`ActionHistory`] of what the store processed. Place it after any
//! rewriting middleware to record what the reducer will see.
//!
//! # Example
//!
//! ```ignore
//! use orichalcum::{ActionLoggerConfig, ActionLoggerMiddleware};
//!
//! let config = ActionLoggerConfig::from_patterns(Some("*_TODO"), None);
//! let logger = ActionLoggerMiddleware::with_history(&config, 50)?;
//! let store = create_store(reducer, logger.clone(), State::default());
//!
//! store.dispatch(add_todo("milk", false))?;
//! for record in logger.history().unwrap_or_default().records() {
//!     println!("#{} {} (queue: {})", record.sequence, record.name, record.pending);
//! }
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use regex::RegexSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::action::ActionSummary;
use crate::error::BoxError;
use crate::middleware::Middleware;
use crate::store::Store;

/// Capacity of the history kept by [`ActionLoggerMiddleware::with_history`] callers
/// that have no better number
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Which action tags get logged
///
/// Patterns are globs over [`Action::name`](crate::Action::name): `*` matches any
/// run of characters, `?` exactly one. An empty `include` list admits every
/// tag; `exclude` is applied afterwards. The default logs everything.
///
/// Deserializes from JSON such as `{"include": ["*_TODO"], "exclude": ["REMOVE_*"]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionLoggerConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl ActionLoggerConfig {
    /// Build from comma-separated pattern lists, as taken from the command line.
    ///
    /// ```
    /// use orichalcum_core::ActionLoggerConfig;
    ///
    /// let config = ActionLoggerConfig::from_patterns(Some("ADD_*, UPDATE_*"), None);
    /// assert_eq!(config.include, vec!["ADD_*", "UPDATE_*"]);
    /// assert!(config.exclude.is_empty());
    /// ```
    pub fn from_patterns(include: Option<&str>, exclude: Option<&str>) -> Self {
        Self {
            include: include.map(split_patterns).unwrap_or_default(),
            exclude: exclude.map(split_patterns).unwrap_or_default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Compile the patterns into a matcher.
    pub fn compile(&self) -> Result<ActionFilter, regex::Error> {
        Ok(ActionFilter {
            include: glob_set(&self.include)?,
            exclude: glob_set(&self.exclude)?,
        })
    }
}

fn split_patterns(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Translate a tag glob into an anchored regex.
fn glob_to_regex(glob: &str) -> String {
    let mut re = String::with_capacity(glob.len() + 2);
    re.push('^');
    let mut literal = String::new();
    for ch in glob.chars() {
        let wildcard = match ch {
            '*' => ".*",
            '?' => ".",
            _ => {
                literal.push(ch);
                continue;
            }
        };
        re.push_str(&regex::escape(&literal));
        literal.clear();
        re.push_str(wildcard);
    }
    re.push_str(&regex::escape(&literal));
    re.push('$');
    re
}

fn glob_set(globs: &[String]) -> Result<RegexSet, regex::Error> {
    RegexSet::new(globs.iter().map(|glob| glob_to_regex(glob)))
}

/// Compiled form of an [`ActionLoggerConfig`]
#[derive(Debug, Clone)]
pub struct ActionFilter {
    include: RegexSet,
    exclude: RegexSet,
}

impl ActionFilter {
    pub fn allows(&self, tag: &str) -> bool {
        (self.include.is_empty() || self.include.is_match(tag)) && !self.exclude.is_match(tag)
    }
}

/// One action seen by the logger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    /// Position among the actions this logger admitted, starting at 0
    pub sequence: u64,
    pub name: &'static str,
    /// `Debug` rendering of the action
    pub summary: String,
    /// Actions still queued behind this one when it was handled
    pub pending: usize,
}

/// Bounded history of logged actions, oldest first
///
/// Once full, each new record evicts the oldest. A zero capacity keeps nothing.
#[derive(Debug, Clone, Default)]
pub struct ActionHistory {
    records: VecDeque<ActionRecord>,
    capacity: usize,
    next_sequence: u64,
}

impl ActionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
            next_sequence: 0,
        }
    }

    fn push(&mut self, name: &'static str, summary: String, pending: usize) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        if self.capacity == 0 {
            return sequence;
        }
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(ActionRecord {
            sequence,
            name,
            summary,
            pending,
        });
        sequence
    }

    pub fn records(&self) -> impl Iterator<Item = &ActionRecord> {
        self.records.iter()
    }

    /// Tags of the retained records, oldest first
    pub fn names(&self) -> Vec<&'static str> {
        self.records.iter().map(|record| record.name).collect()
    }

    /// Total number of actions logged, including evicted ones
    pub fn total(&self) -> u64 {
        self.next_sequence
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

/// Pass-through middleware that logs each admitted action
///
/// Clones share the history, so keep one clone to read it after moving
/// another into the store.
#[derive(Debug, Clone)]
pub struct ActionLoggerMiddleware {
    filter: ActionFilter,
    history: Option<Arc<Mutex<ActionHistory>>>,
    enabled: bool,
}

impl ActionLoggerMiddleware {
    /// Log through `tracing` only.
    pub fn new(config: &ActionLoggerConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            filter: config.compile()?,
            history: None,
            enabled: true,
        })
    }

    /// Log through `tracing` and keep the last `capacity` records.
    pub fn with_history(config: &ActionLoggerConfig, capacity: usize) -> Result<Self, regex::Error> {
        Ok(Self {
            history: Some(Arc::new(Mutex::new(ActionHistory::new(capacity)))),
            ..Self::new(config)?
        })
    }

    /// Turn logging on or off; a disabled logger only passes actions through.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn filter(&self) -> &ActionFilter {
        &self.filter
    }

    /// Copy of the history, if this logger keeps one
    pub fn history(&self) -> Option<ActionHistory> {
        self.history
            .as_ref()
            .map(|history| history.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }
}

impl<S: Clone + Send + Sync + 'static, A: ActionSummary> Middleware<S, A> for ActionLoggerMiddleware {
    fn handle(&self, action: A, _state: &S, store: &Store<S, A>) -> Result<A, BoxError> {
        let name = action.name();
        if !self.enabled || !self.filter.allows(name) {
            return Ok(action);
        }

        let pending = store.pending();
        debug!(action = %name, pending, "action");
        if let Some(history) = &self.history {
            let summary = action.summary();
            trace!(action = %name, %summary, "action payload");
            history
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(name, summary, pending);
        }

        Ok(action)
    }
}
