//! Todo - command-line walkthrough of an orichalcum store
//!
//! Runs the grocery scenario, then schedules a deferred add and waits for it
//! with `once`. Set RUST_LOG=debug to watch the drain loop.

use std::error::Error;
use std::time::Duration;

use clap::Parser;
use orichalcum::{
    once, Action, ActionLoggerConfig, ActionLoggerMiddleware, OnceOptions, DEFAULT_HISTORY_CAPACITY,
};
use todo_demo::{add_todo, run_groceries, select_todo_list, todo_store, TodoAction, TodoState};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Todo list driven by an orichalcum store
#[derive(Parser, Debug)]
#[command(name = "todo")]
#[command(about = "Walk through the todo store: dispatch, listen and wait with once")]
struct Args {
    /// Action names to log (comma-separated globs, e.g. "ADD_*,REMOVE_TODO")
    #[arg(long)]
    include: Option<String>,

    /// Action names to skip in the log (comma-separated globs)
    #[arg(long)]
    exclude: Option<String>,

    /// Delay before the deferred todo is added, in milliseconds
    #[arg(long, default_value = "20")]
    delay_ms: u64,

    /// How long to wait for the deferred todo, in milliseconds (0 waits forever)
    #[arg(long, default_value = "300")]
    timeout_ms: u64,

    /// Print the final state as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("todo=info".parse()?))
        .init();

    let filter = ActionLoggerConfig::from_patterns(args.include.as_deref(), args.exclude.as_deref());
    let logger = ActionLoggerMiddleware::with_history(&filter, DEFAULT_HISTORY_CAPACITY)?;
    let store = todo_store(logger.clone());

    let _transitions = store.listen(|state: &TodoState, prev: &TodoState, action: &TodoAction| {
        info!(
            action = action.name(),
            before = prev.todo_list.len(),
            after = state.todo_list.len(),
            "state changed"
        );
    });

    run_groceries(&store)?;
    for todo in select_todo_list(&store.get_state()) {
        info!(id = todo.id, message = %todo.message, completed = todo.completed, "todo");
    }

    let (added, _cancel) = once(
        |state: &TodoState, _: &TodoState, _: &TodoAction| {
            state.todo_list.values().any(|todo| todo.message == "Call the bakery")
        },
        &store,
        OnceOptions::with_timeout(Duration::from_millis(args.timeout_ms)),
    );

    let deferred = store.clone();
    let delay = Duration::from_millis(args.delay_ms);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = deferred.dispatch(add_todo("Call the bakery", false)) {
            tracing::warn!(error = %e, "deferred dispatch failed");
        }
    });

    match added.await {
        Ok(()) => info!("deferred todo arrived"),
        Err(e) => info!(error = %e, "stopped waiting for deferred todo"),
    }

    if let Some(history) = logger.history() {
        for record in history.records() {
            info!(
                seq = record.sequence,
                action = record.name,
                pending = record.pending,
                "processed"
            );
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&*store.get_state())?);
    }

    store.dispose();
    Ok(())
}
