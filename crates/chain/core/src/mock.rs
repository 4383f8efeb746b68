//! In-memory chain for testing.
//!
//! Storage, submitted extrinsics and event subscriptions live in one shared
//! `MockChain`; every `MockConnection` opened through a `MockConnector` is a
//! view onto it. Faults are scripted ahead of time and consumed in order.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::traits::{ChainConnection, Connector, RawEventSink, TransportError};
use crate::types::{ConnectionId, EventOrigin, Extrinsic, RawEvent, SubscriptionId, TxHash};

/// Extrinsic accepted (or possibly accepted) by the mock chain.
#[derive(Debug, Clone)]
pub struct SubmittedCall {
    pub connection: ConnectionId,
    pub module: String,
    pub method: String,
    pub payload: Vec<u8>,
    pub sender: String,
}

/// Counters for every interaction with the mock chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockCounters {
    pub connects: usize,
    pub closes: usize,
    pub submits: usize,
    pub queries: usize,
    pub subscribes: usize,
    pub unsubscribes: usize,
}

#[derive(Default)]
struct MockState {
    storage: HashMap<(String, String, Vec<u8>), Vec<u8>>,
    submitted: Vec<SubmittedCall>,
    connect_faults: VecDeque<TransportError>,
    call_faults: VecDeque<TransportError>,
    subscriptions: BTreeMap<u64, (ConnectionId, RawEventSink)>,
    dead: HashSet<ConnectionId>,
    next_connection: u64,
    next_subscription: u64,
    next_tx: u64,
    counters: MockCounters,
}

impl MockState {
    /// Marks a connection unusable and ends its event feed.
    fn kill(&mut self, connection: ConnectionId) {
        self.dead.insert(connection);
        self.subscriptions.retain(|_, (owner, _)| *owner != connection);
    }

    /// Pops the next scripted fault, if any, and applies its side effects.
    fn take_fault(&mut self, connection: ConnectionId) -> Option<TransportError> {
        if self.dead.contains(&connection) {
            return Some(TransportError::Disconnected(format!("{} is closed", connection)));
        }
        let fault = self.call_faults.pop_front()?;
        if fault.is_transient() {
            self.kill(connection);
        }
        Some(fault)
    }
}

/// Shared in-memory chain.
#[derive(Clone, Default)]
pub struct MockChain {
    state: Arc<Mutex<MockState>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector opening connections onto this chain.
    pub fn connector(&self) -> MockConnector {
        MockConnector {
            chain: self.clone(),
        }
    }

    /// Store a value under an already-encoded key.
    pub fn insert_storage(&self, module: &str, item: &str, key: Vec<u8>, value: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .storage
            .insert((module.to_string(), item.to_string(), key), value);
    }

    /// Make the next submit or query fail with `error`.
    ///
    /// A transient fault also drops the connection it hits.
    pub fn fail_next_call(&self, error: TransportError) {
        self.state.lock().unwrap().call_faults.push_back(error);
    }

    /// Make the next `connect` fail with `error`.
    pub fn fail_next_connect(&self, error: TransportError) {
        self.state.lock().unwrap().connect_faults.push_back(error);
    }

    /// Drop a connection as if the socket closed.
    pub fn drop_connection(&self, connection: ConnectionId) {
        self.state.lock().unwrap().kill(connection);
    }

    /// Deliver `event` to every live subscription.
    ///
    /// Sinks run outside the chain lock, in subscription order.
    pub fn emit(&self, event: RawEvent) {
        let sinks: Vec<(ConnectionId, RawEventSink)> = {
            let state = self.state.lock().unwrap();
            state
                .subscriptions
                .values()
                .map(|(connection, sink)| (*connection, Arc::clone(sink)))
                .collect()
        };

        for (connection, sink) in sinks {
            sink(&EventOrigin { connection }, &event);
        }
    }

    pub fn counters(&self) -> MockCounters {
        self.state.lock().unwrap().counters
    }

    pub fn submitted(&self) -> Vec<SubmittedCall> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn active_subscriptions(&self) -> usize {
        self.state.lock().unwrap().subscriptions.len()
    }

    /// Connections with at least one live subscription.
    pub fn subscribed_connections(&self) -> Vec<ConnectionId> {
        let state = self.state.lock().unwrap();
        let mut connections: Vec<_> = state.subscriptions.values().map(|(c, _)| *c).collect();
        connections.sort();
        connections.dedup();
        connections
    }
}

/// Opens `MockConnection`s.
#[derive(Clone)]
pub struct MockConnector {
    chain: MockChain,
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Arc<dyn ChainConnection>, TransportError> {
        let mut state = self.chain.state.lock().unwrap();
        state.counters.connects += 1;

        if let Some(fault) = state.connect_faults.pop_front() {
            return Err(fault);
        }

        state.next_connection += 1;
        let id = ConnectionId(state.next_connection);
        tracing::trace!("mock chain opened {}", id);

        Ok(Arc::new(MockConnection {
            id,
            chain: self.chain.clone(),
        }))
    }
}

/// One session onto a `MockChain`.
pub struct MockConnection {
    id: ConnectionId,
    chain: MockChain,
}

#[async_trait]
impl ChainConnection for MockConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn submit(&self, extrinsic: Extrinsic) -> Result<TxHash, TransportError> {
        let mut state = self.chain.state.lock().unwrap();
        state.counters.submits += 1;

        let call = SubmittedCall {
            connection: self.id,
            module: extrinsic.module.to_string(),
            method: extrinsic.method.to_string(),
            payload: extrinsic.payload,
            sender: extrinsic.sender.to_string(),
        };

        if let Some(fault) = state.take_fault(self.id) {
            // The node got the call but the reply was lost.
            if fault.may_have_applied() {
                state.submitted.push(call);
            }
            return Err(fault);
        }

        state.submitted.push(call);
        state.next_tx += 1;
        Ok(TxHash::from_bytes(state.next_tx.to_be_bytes().to_vec()))
    }

    async fn query(
        &self,
        key: &[u8],
        module: &str,
        item: &str,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        let mut state = self.chain.state.lock().unwrap();
        state.counters.queries += 1;

        if let Some(fault) = state.take_fault(self.id) {
            return Err(fault);
        }

        Ok(state
            .storage
            .get(&(module.to_string(), item.to_string(), key.to_vec()))
            .cloned())
    }

    async fn subscribe_events(&self, sink: RawEventSink) -> Result<SubscriptionId, TransportError> {
        let mut state = self.chain.state.lock().unwrap();
        state.counters.subscribes += 1;

        if state.dead.contains(&self.id) {
            return Err(TransportError::Disconnected(format!("{} is closed", self.id)));
        }

        state.next_subscription += 1;
        let id = state.next_subscription;
        state.subscriptions.insert(id, (self.id, sink));
        Ok(SubscriptionId(id))
    }

    async fn unsubscribe_events(&self, subscription: SubscriptionId) -> Result<(), TransportError> {
        let mut state = self.chain.state.lock().unwrap();
        state.counters.unsubscribes += 1;

        if state.dead.contains(&self.id) {
            return Err(TransportError::Disconnected(format!("{} is closed", self.id)));
        }

        state.subscriptions.remove(&subscription.0);
        Ok(())
    }

    async fn close(&self) {
        let mut state = self.chain.state.lock().unwrap();
        if !state.dead.contains(&self.id) {
            state.counters.closes += 1;
        }
        state.kill(self.id);
    }
}
