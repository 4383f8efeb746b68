//! Reconnect-and-retry call layer.
//!
//! Every chain interaction goes through `ResilientInvoker::invoke`, which runs
//! an operation against the shared connection and, on a transient failure,
//! replaces the connection and runs the operation again from scratch.
//!
//! # Connection ownership
//!
//! ```text
//! ConnectionSlot ── Mutex<SlotState> ── Lease { connection, generation }
//!       │
//!       └── reconnect hooks (notified after the slot lock is released)
//! ```
//!
//! A reconnect names the generation it saw fail. If the slot already moved
//! past that generation, the newer connection is handed out instead of
//! opening another one, so concurrent failures cost one reconnect.
//!
//! # Lock order
//!
//! The slot lock is never held while a hook runs. Hooks may therefore take
//! their own locks, and holders of those locks may read the slot.

use std::future::Future;
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use chain_core::{ChainConnection, Connector, TransportError};
use tokio::sync::Mutex as AsyncMutex;

use crate::error::CallError;

/// What an operation does to the chain. Decides whether an ambiguous
/// failure may be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Storage read; always safe to reissue.
    Read,

    /// Extrinsic submission; never reissued once the node may have seen it.
    Submit,
}

/// A connection together with the slot generation it was stored under.
#[derive(Clone)]
pub struct Lease {
    pub connection: Arc<dyn ChainConnection>,
    pub generation: u64,
}

/// Notified whenever the slot stores a newly opened connection.
#[async_trait]
pub trait ReconnectHook: Send + Sync {
    async fn on_reconnect(&self, lease: &Lease);
}

#[derive(Default)]
struct SlotState {
    lease: Option<Lease>,
    generation: u64,
}

/// Owner of the single shared connection.
pub struct ConnectionSlot {
    connector: Arc<dyn Connector>,
    state: AsyncMutex<SlotState>,
    hooks: Mutex<Vec<Weak<dyn ReconnectHook>>>,
}

impl ConnectionSlot {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            state: AsyncMutex::new(SlotState::default()),
            hooks: Mutex::new(Vec::new()),
        }
    }

    /// Register a hook. Dropped hooks are pruned on the next notification.
    pub fn add_hook(&self, hook: Weak<dyn ReconnectHook>) {
        self.hooks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(hook);
    }

    /// Current connection, opened lazily if there is none.
    pub async fn acquire(&self) -> Result<Lease, TransportError> {
        let lease = {
            let mut state = self.state.lock().await;
            if let Some(lease) = &state.lease {
                return Ok(lease.clone());
            }
            self.open(&mut state).await?
        };

        self.notify(&lease).await;
        Ok(lease)
    }

    /// Current connection without opening one.
    pub async fn current(&self) -> Option<Lease> {
        self.state.lock().await.lease.clone()
    }

    /// Replace the connection that failed under `failed` generation.
    ///
    /// Closes the old connection before opening the new one. If the slot
    /// already holds a different generation, that connection is returned and
    /// nothing is opened.
    pub async fn reconnect(&self, failed: Option<u64>) -> Result<Lease, TransportError> {
        let lease = {
            let mut state = self.state.lock().await;

            if let Some(lease) = &state.lease
                && Some(lease.generation) != failed
            {
                tracing::debug!(
                    "connection generation {} already replaced failed {:?}",
                    lease.generation,
                    failed
                );
                return Ok(lease.clone());
            }

            if let Some(stale) = state.lease.take() {
                tracing::debug!(
                    "closing {} (generation {})",
                    stale.connection.id(),
                    stale.generation
                );
                stale.connection.close().await;
            }

            self.open(&mut state).await?
        };

        self.notify(&lease).await;
        Ok(lease)
    }

    /// Close and forget the connection stored under `generation`.
    ///
    /// Does nothing if the slot already moved on to another generation.
    /// No hooks run; the next `acquire` opens and announces a new connection.
    pub async fn discard(&self, generation: u64) {
        let stale = {
            let mut state = self.state.lock().await;
            match &state.lease {
                Some(lease) if lease.generation == generation => state.lease.take(),
                _ => None,
            }
        };

        if let Some(stale) = stale {
            tracing::debug!(
                "discarding {} (generation {})",
                stale.connection.id(),
                stale.generation
            );
            stale.connection.close().await;
        }
    }

    /// Close and forget the current connection, if any.
    pub async fn close(&self) {
        let stale = self.state.lock().await.lease.take();
        if let Some(stale) = stale {
            tracing::debug!("closing {} on shutdown", stale.connection.id());
            stale.connection.close().await;
        }
    }

    async fn open(&self, state: &mut SlotState) -> Result<Lease, TransportError> {
        let connection = self.connector.connect().await?;
        state.generation += 1;

        let lease = Lease {
            connection,
            generation: state.generation,
        };
        state.lease = Some(lease.clone());

        tracing::debug!(
            "opened {} (generation {})",
            lease.connection.id(),
            lease.generation
        );
        Ok(lease)
    }

    async fn notify(&self, lease: &Lease) {
        let hooks: Vec<Arc<dyn ReconnectHook>> = {
            let mut hooks = self
                .hooks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            hooks.retain(|hook| hook.strong_count() > 0);
            hooks.iter().filter_map(Weak::upgrade).collect()
        };

        for hook in hooks {
            hook.on_reconnect(lease).await;
        }
    }
}

/// Runs chain operations with bounded reconnect-and-retry.
pub struct ResilientInvoker {
    slot: Arc<ConnectionSlot>,
}

impl ResilientInvoker {
    pub fn new(slot: Arc<ConnectionSlot>) -> Self {
        Self { slot }
    }

    pub fn slot(&self) -> &Arc<ConnectionSlot> {
        &self.slot
    }

    /// Run `operation` against the shared connection.
    ///
    /// # Arguments
    ///
    /// * `kind` - Whether the operation reads or submits
    /// * `max_reconnects` - Reconnects allowed; zero means a single attempt
    /// * `operation` - Re-issuable operation; it is called once per attempt
    ///
    /// # Errors
    ///
    /// - `Rejected` / `Transport` on the first non-transient failure
    /// - `Unconfirmed` when a submit may already have reached the node
    /// - `ReconnectExhausted` with the last transient error once
    ///   `max_reconnects` reconnects were spent
    ///
    /// A connection that failed transiently never stays in the slot, even
    /// when the call gives up; the next call starts on a fresh one.
    pub async fn invoke<T, F, Fut>(
        &self,
        kind: CallKind,
        max_reconnects: u32,
        operation: F,
    ) -> Result<T, CallError>
    where
        F: Fn(Arc<dyn ChainConnection>) -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        self.invoke_leased(kind, max_reconnects, |lease| operation(lease.connection))
            .await
    }

    /// Like `invoke`, but hands the operation the whole `Lease` so it can
    /// remember which generation it ran against.
    pub async fn invoke_leased<T, F, Fut>(
        &self,
        kind: CallKind,
        max_reconnects: u32,
        operation: F,
    ) -> Result<T, CallError>
    where
        F: Fn(Lease) -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let mut reconnects = 0u32;
        let mut failed_generation: Option<u64> = None;

        loop {
            let lease = if reconnects == 0 {
                self.slot.acquire().await
            } else {
                self.slot.reconnect(failed_generation).await
            };

            // Generation the operation ran on; `None` when opening failed.
            let mut used: Option<u64> = None;
            let outcome = match lease {
                Ok(lease) => {
                    used = Some(lease.generation);
                    failed_generation = used;
                    operation(lease).await
                }
                Err(error) => Err(error),
            };

            let error = match outcome {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !error.is_transient() {
                return Err(terminal(error));
            }

            if kind == CallKind::Submit && error.may_have_applied() {
                self.discard(used).await;
                return Err(CallError::Unconfirmed(error.to_string()));
            }

            if reconnects >= max_reconnects {
                tracing::warn!("giving up after {} reconnects: {}", reconnects, error);
                self.discard(used).await;
                return Err(CallError::ReconnectExhausted {
                    attempts: reconnects + 1,
                    last: error,
                });
            }

            reconnects += 1;
            tracing::warn!(
                "transient failure, reconnecting ({}/{}): {}",
                reconnects,
                max_reconnects,
                error
            );
        }
    }

    async fn discard(&self, generation: Option<u64>) {
        if let Some(generation) = generation {
            self.slot.discard(generation).await;
        }
    }
}

fn terminal(error: TransportError) -> CallError {
    match error {
        TransportError::Rejected(reason) => CallError::Rejected(reason),
        other => CallError::Transport(other),
    }
}
