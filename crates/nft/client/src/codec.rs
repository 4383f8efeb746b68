//! Storage key encoding.
//!
//! Storage maps are addressed by one of three key shapes:
//!
//! ```text
//! Unit       → []                                   (plain storage values)
//! Simple     → bincode(value)                       (single-key maps)
//! Composite  → u64 LE | u64 LE len | secondary      (double maps)
//! ```
//!
//! The composite layout is fixed-width in the primary part and
//! length-prefixed in the secondary part, so distinct pairs never encode to
//! the same bytes. Decoding is not needed: the bytes only travel to the node.

use chain_core::{Address, AddressError};
use serde::Serialize;

/// Key construction errors. Raised before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("Composite key is missing its {0} part")]
    MissingPart(&'static str),

    #[error("Invalid account in key: {0}")]
    InvalidAccount(#[from] AddressError),

    #[error("Failed to encode key: {0}")]
    Encode(String),
}

/// Lookup key for one storage map entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// Plain storage value without a key.
    Unit,

    /// Single-key map; holds the already-encoded value.
    Simple(Vec<u8>),

    /// Double map keyed by (collection id, raw bytes).
    Composite { primary: u64, secondary: Vec<u8> },
}

impl StorageKey {
    pub fn unit() -> Self {
        StorageKey::Unit
    }

    /// Key for a single-key map.
    pub fn simple<V: Serialize + ?Sized>(value: &V) -> Result<Self, KeyError> {
        KeyCodec::encode_simple(value).map(StorageKey::Simple)
    }

    pub fn composite(primary: u64, secondary: impl Into<Vec<u8>>) -> Self {
        StorageKey::Composite {
            primary,
            secondary: secondary.into(),
        }
    }

    /// Build a composite key from parts that may be missing.
    ///
    /// Both parts are mandatory; a missing one is an error, never a
    /// fallback to a simple key.
    pub fn from_parts(primary: Option<u64>, secondary: Option<Vec<u8>>) -> Result<Self, KeyError> {
        let primary = primary.ok_or(KeyError::MissingPart("primary"))?;
        let secondary = secondary.ok_or(KeyError::MissingPart("secondary"))?;
        Ok(Self::composite(primary, secondary))
    }

    /// Per-account entry of a collection: (collection id, account public key).
    pub fn account(collection_id: u64, account: &Address) -> Result<Self, KeyError> {
        let key = account.public_key()?;
        Ok(Self::composite(collection_id, key.as_bytes().to_vec()))
    }

    /// Bytes handed to the storage query.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            StorageKey::Unit => Vec::new(),
            StorageKey::Simple(encoded) => encoded.clone(),
            StorageKey::Composite { primary, secondary } => {
                KeyCodec::encode_composite(*primary, secondary)
            }
        }
    }
}

/// Stateless key encoder.
pub struct KeyCodec;

impl KeyCodec {
    pub fn encode_simple<V: Serialize + ?Sized>(value: &V) -> Result<Vec<u8>, KeyError> {
        bincode::serialize(value).map_err(|e| KeyError::Encode(e.to_string()))
    }

    /// Same layout bincode produces for `(u64, Vec<u8>)`.
    pub fn encode_composite(primary: u64, secondary: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + secondary.len());
        out.extend_from_slice(&primary.to_le_bytes());
        out.extend_from_slice(&(secondary.len() as u64).to_le_bytes());
        out.extend_from_slice(secondary);
        out
    }
}
