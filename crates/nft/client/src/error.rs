//! Error types for NFT pallet calls.

use chain_core::TransportError;
use thiserror::Error;

use crate::codec::KeyError;

/// Terminal failure of one logical call.
///
/// Absence of a storage entry is not an error; reads return `Ok(None)`.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("Chain rejected the call: {0}")]
    Rejected(String),

    #[error("Transport error: {0}")]
    Transport(TransportError),

    #[error("Submission outcome unknown, not resubmitted: {0}")]
    Unconfirmed(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    ReconnectExhausted {
        attempts: u32,
        #[source]
        last: TransportError,
    },

    #[error("Invalid storage key: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("Failed to encode {what}: {reason}")]
    Encode { what: &'static str, reason: String },

    #[error("Failed to decode {module}::{item}: {reason}")]
    Decode {
        module: &'static str,
        item: &'static str,
        reason: String,
    },
}

impl CallError {
    /// Whether the failure came from running out of reconnects.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, CallError::ReconnectExhausted { .. })
    }
}

pub type Result<T> = std::result::Result<T, CallError>;
