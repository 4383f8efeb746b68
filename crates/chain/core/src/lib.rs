//! Chain connection abstraction for the NFT pallet client.
//!
//! This crate defines the collaborators the call layer talks to. It knows
//! nothing about collections, retries, or event kinds.
//!
//! # Architecture
//!
//! ```text
//! Connector            (opens fresh sessions)
//!     └── ChainConnection
//!          ├── submit            (signed extrinsic → TxHash)
//!          ├── query             (encoded key → Option<bytes>)
//!          └── subscribe_events  (raw event feed → sink)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use chain_core::{ChainConnection, Connector};
//!
//! async fn read(connector: &dyn Connector) -> Result<(), TransportError> {
//!     let connection = connector.connect().await?;
//!     let value = connection.query(&key, "Nft", "Collection").await?;
//!     connection.close().await;
//!     Ok(())
//! }
//! ```

pub mod address;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use address::{Address, AddressError, PublicKey, SUBSTRATE_PREFIX};
pub use traits::{ChainConnection, Connector, RawEventSink, TransportError};
pub use types::{
    ConnectionId, EventOrigin, Extrinsic, RawEvent, SigningKey, SubscriptionId, TxHash,
};

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockChain, MockConnector};
