//! Wait until the store reaches a state matching a predicate
//!
//! [`once`] registers a self-removing listener and hands back a future that
//! resolves the first time the predicate holds after a dispatch. The future is
//! bounded by a timeout (300 ms unless configured otherwise) and can be
//! cancelled explicitly.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use orichalcum::{once, OnceOptions};
//!
//! let (loaded, cancel) = once(
//!     |state: &AppState, _prev, _action| state.loaded,
//!     &store,
//!     OnceOptions::with_timeout(Duration::from_secs(2)),
//! );
//!
//! store.dispatch(AppAction::Load)?;
//! loaded.await?;
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::OnceError;
use crate::listener::Subscription;
use crate::store::Store;
use crate::Action;

/// Timeout applied by [`OnceOptions::default`]
pub const DEFAULT_ONCE_TIMEOUT: Duration = Duration::from_millis(300);

/// Options for [`once`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnceOptions {
    /// How long to wait for a matching state. `Duration::ZERO` waits forever.
    pub timeout: Duration,
}

impl Default for OnceOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_ONCE_TIMEOUT,
        }
    }
}

impl OnceOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// No timeout: settle only on a match, a cancel or disposal
    pub fn no_timeout() -> Self {
        Self {
            timeout: Duration::ZERO,
        }
    }
}

type Outcome = Result<(), OnceError>;

/// First-settlement-wins slot shared by the listener, the future and the cancel handle
struct Settle {
    tx: Option<oneshot::Sender<Outcome>>,
    subscription: Option<Subscription>,
    /// Cancelled on settlement, stops the deadline watcher
    done: CancellationToken,
}

#[derive(Clone)]
struct SettleSlot(Arc<Mutex<Settle>>);

impl SettleSlot {
    /// Settle with `outcome` unless already settled. Returns whether this call won.
    fn settle(&self, outcome: Outcome) -> bool {
        let (tx, subscription) = {
            let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            slot.done.cancel();
            (slot.tx.take(), slot.subscription.clone())
        };
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
        match tx {
            Some(tx) => {
                debug!(outcome = ?outcome, "once settled");
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    fn attach(&self, subscription: Subscription) {
        let settled = {
            let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            slot.subscription = Some(subscription.clone());
            slot.tx.is_none()
        };
        // The listener may have fired before it knew its own subscription
        if settled {
            subscription.unsubscribe();
        }
    }

    fn is_settled(&self) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tx
            .is_none()
    }

    fn done(&self) -> CancellationToken {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .done
            .clone()
    }
}

/// Future returned by [`once`]
///
/// Resolves to `Ok(())` on the first matching state, or to an [`OnceError`]
/// on timeout, cancellation or store disposal. The timeout is measured from
/// the `once` call on the tokio clock, so awaiting it requires a tokio runtime
/// with the time driver enabled.
///
/// Dropping an unsettled `Once` cancels it and unregisters its listener.
#[must_use = "futures do nothing unless polled"]
pub struct Once {
    inner: Pin<Box<dyn Future<Output = Outcome> + Send>>,
    slot: SettleSlot,
}

impl Drop for Once {
    fn drop(&mut self) {
        self.slot.settle(Err(OnceError::Canceled));
    }
}

impl fmt::Debug for Once {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Once").finish_non_exhaustive()
    }
}

impl Future for Once {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

/// Cancel handle returned by [`once`]
#[derive(Clone)]
pub struct OnceCancel {
    slot: SettleSlot,
}

impl fmt::Debug for OnceCancel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnceCancel")
            .field("settled", &self.slot.is_settled())
            .finish()
    }
}

impl OnceCancel {
    /// Unregister the listener, stop the timer and reject the future with
    /// [`OnceError::Canceled`]. Returns `false` if it had already settled.
    pub fn cancel(&self) -> bool {
        self.slot.settle(Err(OnceError::Canceled))
    }

    pub fn is_settled(&self) -> bool {
        self.slot.is_settled()
    }
}

/// Wait for the first dispatch after which `predicate(state, prev_state, action)` holds.
///
/// Returns the future and a cancel handle. The predicate is only evaluated on
/// listener notifications, so a state that already matches does not resolve
/// the future until the next dispatch.
///
/// When called inside a tokio runtime the deadline is watched by a spawned
/// task, so the listener is unregistered on timeout even if the future is
/// never polled. A timeout too large to represent as an instant means no
/// timeout.
pub fn once<S, A, P>(predicate: P, store: &Store<S, A>, options: OnceOptions) -> (Once, OnceCancel)
where
    S: Clone + Send + Sync + 'static,
    A: Action,
    P: Fn(&S, &S, &A) -> bool + Send + Sync + 'static,
{
    let (tx, rx) = oneshot::channel();
    let slot = SettleSlot(Arc::new(Mutex::new(Settle {
        tx: Some(tx),
        subscription: None,
        done: CancellationToken::new(),
    })));

    let timeout = options.timeout;
    let deadline = if timeout.is_zero() {
        None
    } else {
        Instant::now().checked_add(timeout)
    };

    let subscription = {
        let slot = slot.clone();
        store.listen(move |state, prev, action| {
            if slot.is_settled() {
                return;
            }
            // A deadline may pass while nobody polls the future
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                slot.settle(Err(OnceError::Timeout { waited: timeout }));
            } else if predicate(state, prev, action) {
                slot.settle(Ok(()));
            }
        })
    };
    slot.attach(subscription);

    let shutdown = store.shutdown_token();

    if let (Some(deadline), Ok(handle)) = (deadline, Handle::try_current()) {
        let slot = slot.clone();
        let done = slot.done();
        let shutdown = shutdown.clone();
        handle.spawn(async move {
            tokio::select! {
                _ = done.cancelled() => {}
                _ = shutdown.cancelled() => {
                    slot.settle(Err(OnceError::Disposed));
                }
                _ = tokio::time::sleep_until(deadline) => {
                    slot.settle(Err(OnceError::Timeout { waited: timeout }));
                }
            }
        });
    }

    let waiter = slot.clone();
    let inner = Box::pin(async move {
        let mut rx = rx;
        let timer = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            outcome = &mut rx => return outcome.unwrap_or(Err(OnceError::Canceled)),
            _ = shutdown.cancelled() => {
                waiter.settle(Err(OnceError::Disposed));
            }
            _ = timer => {
                waiter.settle(Err(OnceError::Timeout { waited: timeout }));
            }
        }

        // Whichever settlement won is now in the channel
        rx.await.unwrap_or(Err(OnceError::Canceled))
    });

    (
        Once {
            inner,
            slot: slot.clone(),
        },
        OnceCancel { slot },
    )
}

/// [`once`] with [`OnceOptions::default`]
pub fn once_with_default<S, A, P>(predicate: P, store: &Store<S, A>) -> (Once, OnceCancel)
where
    S: Clone + Send + Sync + 'static,
    A: Action,
    P: Fn(&S, &S, &A) -> bool + Send + Sync + 'static,
{
    once(predicate, store, OnceOptions::default())
}
