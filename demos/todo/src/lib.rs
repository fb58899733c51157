//! Todo list built on an orichalcum store
//!
//! State, actions and reducers live here so the binary and the tests share
//! them. New todos get their id from the effects middleware, reducers stay
//! pure.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use orichalcum::prelude::*;
use orichalcum::ActionLoggerMiddleware;
use serde::{Deserialize, Serialize};

pub type TodoId = u64;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub message: String,
    pub completed: bool,
}

/// Partial todo carried by add/update actions; `None` fields are left alone
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            completed: None,
        }
    }

    pub fn completed(completed: bool) -> Self {
        Self {
            message: None,
            completed: Some(completed),
        }
    }

    fn apply(&self, todo: &mut Todo) {
        if let Some(message) = &self.message {
            todo.message.clone_from(message);
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoState {
    pub todo_list: BTreeMap<TodoId, Todo>,
}

#[derive(Action, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[action(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TodoAction {
    /// `id` is filled in by [`TodoEffects`] before the reducer runs
    AddTodo {
        #[serde(default)]
        id: Option<TodoId>,
        todo: TodoPatch,
    },
    UpdateTodo {
        id: TodoId,
        todo: TodoPatch,
    },
    RemoveTodo {
        id: TodoId,
    },
}

// ============================================================================
// Action creators
// ============================================================================

pub fn add_todo(message: impl Into<String>, completed: bool) -> TodoAction {
    TodoAction::AddTodo {
        id: None,
        todo: TodoPatch {
            message: Some(message.into()),
            completed: Some(completed),
        },
    }
}

pub fn update_todo(id: TodoId, todo: TodoPatch) -> TodoAction {
    TodoAction::UpdateTodo { id, todo }
}

pub fn remove_todo(id: TodoId) -> TodoAction {
    TodoAction::RemoveTodo { id }
}

// ============================================================================
// Reducers
// ============================================================================

fn set_todo(id: TodoId, patch: &TodoPatch, mut state: TodoState) -> TodoState {
    let todo = state.todo_list.entry(id).or_insert_with(|| Todo {
        id,
        ..Todo::default()
    });
    patch.apply(todo);
    state
}

fn reduce_add(action: &TodoAction, state: TodoState) -> TodoState {
    match action {
        TodoAction::AddTodo {
            id: Some(id),
            todo,
        } => set_todo(*id, todo, state),
        _ => state,
    }
}

fn reduce_update(action: &TodoAction, state: TodoState) -> TodoState {
    match action {
        TodoAction::UpdateTodo { id, todo } => set_todo(*id, todo, state),
        _ => state,
    }
}

fn reduce_remove(action: &TodoAction, mut state: TodoState) -> TodoState {
    if let TodoAction::RemoveTodo { id } = action {
        state.todo_list.remove(id);
    }
    state
}

pub fn todo_reducer() -> ReducerMap<TodoState, TodoAction> {
    ReducerMap::new(TodoState::default())
        .on("ADD_TODO", reduce_add)
        .on("UPDATE_TODO", reduce_update)
        .on("REMOVE_TODO", reduce_remove)
}

// ============================================================================
// Effects
// ============================================================================

/// Assigns ids to new todos
#[derive(Debug, Default)]
pub struct TodoEffects {
    next_id: AtomicU64,
}

impl TodoEffects {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Middleware<TodoState, TodoAction> for TodoEffects {
    fn handle(
        &self,
        action: TodoAction,
        _state: &TodoState,
        _store: &Store<TodoState, TodoAction>,
    ) -> Result<TodoAction, orichalcum::BoxError> {
        Ok(match action {
            TodoAction::AddTodo { id: None, todo } => TodoAction::AddTodo {
                id: Some(self.next_id.fetch_add(1, Ordering::Relaxed)),
                todo,
            },
            other => other,
        })
    }
}

/// Build the todo store: id assignment first, then the action logger.
pub fn todo_store(logger: ActionLoggerMiddleware) -> Store<TodoState, TodoAction> {
    let middleware = EffectMap::new().on("ADD_TODO", TodoEffects::new());
    Store::from_reducer_map(
        todo_reducer(),
        orichalcum::combine_middleware!(middleware, logger),
    )
}

// ============================================================================
// Selectors
// ============================================================================

pub fn select_todo_list(state: &TodoState) -> Vec<&Todo> {
    state.todo_list.values().collect()
}

pub fn select_todo_ids(state: &TodoState) -> Vec<TodoId> {
    state.todo_list.keys().copied().collect()
}

pub fn select_todo(id: TodoId, state: &TodoState) -> Option<&Todo> {
    state.todo_list.get(&id)
}

/// Run the grocery scenario: two adds, two updates, one removal.
pub fn run_groceries(store: &Store<TodoState, TodoAction>) -> Result<(), StoreError> {
    store.dispatch_all([
        add_todo("clown portrait", false),
        add_todo("banana cream pie", true),
    ])?;

    let ids = select_todo_ids(&store.get_state());
    if let [first, second, ..] = ids[..] {
        store.dispatch_all([
            update_todo(first, TodoPatch::message("Get groceries")),
            update_todo(second, TodoPatch::completed(true)),
        ])?;
        store.dispatch(remove_todo(second))?;
    }
    Ok(())
}
