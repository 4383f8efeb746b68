//! NFT pallet client.

use std::future::Future;
use std::sync::Arc;

use chain_core::{ChainConnection, Connector, TransportError};

use crate::collection::CollectionService;
use crate::config::CallSettings;
use crate::error::Result;
use crate::events::EventMultiplexer;
use crate::invoker::{CallKind, ConnectionSlot, ResilientInvoker};

/// Composition root: one connection slot, one invoker, one event
/// multiplexer, and the method groups built on them.
///
/// The connection is opened lazily by the first call or listener.
pub struct NftClient {
    settings: CallSettings,
    slot: Arc<ConnectionSlot>,
    invoker: Arc<ResilientInvoker>,
    events: Arc<EventMultiplexer>,
    collections: CollectionService,
}

impl NftClient {
    pub fn new(connector: Arc<dyn Connector>, settings: CallSettings) -> Self {
        let slot = Arc::new(ConnectionSlot::new(connector));
        let invoker = Arc::new(ResilientInvoker::new(Arc::clone(&slot)));
        let events = EventMultiplexer::new(Arc::clone(&invoker), settings);
        let collections =
            CollectionService::new(Arc::clone(&invoker), Arc::clone(&events), settings);

        tracing::debug!(
            "NFT client ready (max reconnects per call: {})",
            settings.max_reconnect_count
        );

        Self {
            settings,
            slot,
            invoker,
            events,
            collections,
        }
    }

    pub fn settings(&self) -> &CallSettings {
        &self.settings
    }

    pub fn collections(&self) -> &CollectionService {
        &self.collections
    }

    pub fn events(&self) -> &Arc<EventMultiplexer> {
        &self.events
    }

    /// Run an arbitrary operation under the configured reconnect bound.
    pub async fn call_with_reconnect<T, F, Fut>(&self, kind: CallKind, operation: F) -> Result<T>
    where
        F: Fn(Arc<dyn ChainConnection>) -> Fut,
        Fut: Future<Output = std::result::Result<T, TransportError>>,
    {
        self.invoker
            .invoke(kind, self.settings.max_reconnect_count, operation)
            .await
    }

    /// Close the current connection. The next call opens a new one.
    pub async fn disconnect(&self) {
        self.slot.close().await;
    }
}
