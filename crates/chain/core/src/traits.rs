//! Chain connection traits.
//!
//! This module defines the two seams the call layer depends on:
//! - `Connector`: opens a fresh session on demand
//! - `ChainConnection`: one live session (submit, query, event feed)

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{ConnectionId, EventOrigin, Extrinsic, RawEvent, SubscriptionId, TxHash};

// ============================================================================
// Error Types
// ============================================================================

/// Transport layer errors.
///
/// Implementations must pick the variant by *when* the failure happened:
/// `Disconnected`, `Timeout` and `Retryable` are raised before the request
/// was handed to the node, `Unconfirmed` after.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Connection dropped: {0}")]
    Disconnected(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Transport asked for a retry: {0}")]
    Retryable(String),

    #[error("Request sent but no response received: {0}")]
    Unconfirmed(String),

    #[error("Chain rejected the request: {0}")]
    Rejected(String),

    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Backend-specific error: {0}")]
    Backend(String),
}

impl TransportError {
    /// Whether a fresh connection could make the same request succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::Disconnected(_)
                | TransportError::Timeout(_)
                | TransportError::Retryable(_)
                | TransportError::Unconfirmed(_)
        )
    }

    /// Whether the node may already have acted on the request.
    pub fn may_have_applied(&self) -> bool {
        matches!(self, TransportError::Unconfirmed(_))
    }
}

// ============================================================================
// Connection
// ============================================================================

/// Callback receiving every raw event of a subscribed connection.
pub type RawEventSink = Arc<dyn Fn(&EventOrigin, &RawEvent) + Send + Sync>;

/// One live session with a chain node.
///
/// A connection is never reused after it reported a transient failure; the
/// caller closes it and asks its `Connector` for a new one.
#[async_trait]
pub trait ChainConnection: Send + Sync {
    /// Identifier used to tag events coming out of this session.
    fn id(&self) -> ConnectionId;

    /// Sign and submit an extrinsic.
    async fn submit(&self, extrinsic: Extrinsic) -> Result<TxHash, TransportError>;

    /// Read one storage entry. `Ok(None)` means the entry does not exist.
    async fn query(
        &self,
        key: &[u8],
        module: &str,
        item: &str,
    ) -> Result<Option<Vec<u8>>, TransportError>;

    /// Attach a sink to the raw event feed of this session.
    ///
    /// The feed ends when the session is closed or lost.
    async fn subscribe_events(&self, sink: RawEventSink) -> Result<SubscriptionId, TransportError>;

    /// Detach a sink previously returned by `subscribe_events`.
    async fn unsubscribe_events(&self, subscription: SubscriptionId) -> Result<(), TransportError>;

    /// Close the session. Idempotent.
    async fn close(&self);
}

/// Opens new sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a fresh connection.
    async fn connect(&self) -> Result<Arc<dyn ChainConnection>, TransportError>;
}
