//! Typed client for the NFT pallet.
//!
//! # Architecture
//!
//! ```text
//! NftClient
//!   ├── CollectionService      (fixed module/method names, request shapes)
//!   │     ├── KeyCodec         (simple and composite storage keys)
//!   │     └── ResilientInvoker (reconnect-and-retry around every call)
//!   └── EventMultiplexer       (one raw feed → typed listeners)
//!           │
//!     ConnectionSlot ── Connector ── ChainConnection (chain-core)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use nft_client::{CallSettings, NftClient};
//!
//! let client = NftClient::new(connector, CallSettings::from_env());
//!
//! let tx = client
//!     .collections()
//!     .create_collection(&request, &sender, &signer)
//!     .await?;
//!
//! match client.collections().collection(id).await? {
//!     Some(collection) => println!("owner: {}", collection.owner),
//!     None => println!("no collection {}", id),
//! }
//! ```

pub mod client;
pub mod codec;
pub mod collection;
pub mod config;
pub mod error;
pub mod events;
pub mod invoker;
pub mod models;

pub use client::NftClient;
pub use codec::{KeyCodec, KeyError, StorageKey};
pub use collection::{CollectionService, MODULE};
pub use config::CallSettings;
pub use error::{CallError, Result};
pub use events::{EventMultiplexer, ListenerId};
pub use invoker::{CallKind, ConnectionSlot, Lease, ReconnectHook, ResilientInvoker};
