//! Common types for chain interactions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Identifier of one connection instance. Unique per `Connector`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Handle of one raw event subscription on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

/// Extrinsic hash returned by a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub Vec<u8>);

impl TxHash {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

/// Secret used by the connection to sign an extrinsic.
///
/// Never printed; `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey(String);

impl SigningKey {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// An encoded call ready to be signed and submitted.
#[derive(Debug, Clone)]
pub struct Extrinsic {
    /// Pallet name (e.g. "Nft")
    pub module: &'static str,

    /// Dispatchable name (e.g. "create_collection")
    pub method: &'static str,

    /// Encoded call arguments
    pub payload: Vec<u8>,

    /// Account paying for and signing the call
    pub sender: Address,

    /// Key the connection signs with
    pub signer: SigningKey,
}

/// Event as delivered by the node, before any pallet-specific decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Emitting pallet
    pub module: String,

    /// Event variant name
    pub name: String,

    /// Encoded event fields
    pub data: Vec<u8>,
}

impl RawEvent {
    pub fn new(module: impl Into<String>, name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
            data,
        }
    }
}

/// Where a raw event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventOrigin {
    pub connection: ConnectionId,
}
