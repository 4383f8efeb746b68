//! Collection management on the NFT pallet.
//!
//! Every operation is a fixed (module, method or storage item) pair routed
//! through `ResilientInvoker`. Nothing here retries, reconnects, or swallows
//! errors on its own.

use std::sync::Arc;

use chain_core::{Address, EventOrigin, Extrinsic, SigningKey, TxHash};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec::StorageKey;
use crate::config::CallSettings;
use crate::error::{CallError, Result};
use crate::events::{EventMultiplexer, ListenerId};
use crate::invoker::{CallKind, ResilientInvoker};
use crate::models::{
    AddCollectionAdmin, AddressTokens, AdminList, ChangeOwner, Collection, CreateCollection,
    Created, DestroyCollection, GetBalanceOf, RemoveCollectionAdmin, RemoveCollectionSponsor,
    SetCollectionSponsor, SetOffChainSchema, TokensList,
};

/// Pallet name.
pub const MODULE: &str = "Nft";

/// Dispatchable names.
pub mod method {
    pub const CREATE_COLLECTION: &str = "create_collection";
    pub const DESTROY_COLLECTION: &str = "destroy_collection";
    pub const CHANGE_OWNER: &str = "change_collection_owner";
    pub const ADD_ADMIN: &str = "add_collection_admin";
    pub const REMOVE_ADMIN: &str = "remove_collection_admin";
    pub const SET_SPONSOR: &str = "set_collection_sponsor";
    pub const CONFIRM_SPONSORSHIP: &str = "confirm_sponsorship";
    pub const REMOVE_SPONSOR: &str = "remove_collection_sponsor";
    pub const SET_OFFCHAIN_SCHEMA: &str = "set_offchain_schema";
}

/// Storage item names.
pub mod storage {
    pub const COLLECTION: &str = "Collection";
    pub const ADMIN_LIST: &str = "AdminList";
    pub const BALANCE: &str = "Balance";
    pub const NEXT_ID: &str = "NextCollectionID";
    pub const ADDRESS_TOKENS: &str = "AddressTokens";
}

/// Collection-level calls and queries.
pub struct CollectionService {
    invoker: Arc<ResilientInvoker>,
    events: Arc<EventMultiplexer>,
    settings: CallSettings,
}

impl CollectionService {
    pub fn new(
        invoker: Arc<ResilientInvoker>,
        events: Arc<EventMultiplexer>,
        settings: CallSettings,
    ) -> Self {
        Self {
            invoker,
            events,
            settings,
        }
    }

    // ------------------------------------------------------------------------
    // Extrinsics
    // ------------------------------------------------------------------------

    pub async fn create_collection(
        &self,
        request: &CreateCollection,
        sender: &Address,
        signer: &SigningKey,
    ) -> Result<TxHash> {
        self.submit(request, method::CREATE_COLLECTION, sender, signer)
            .await
    }

    pub async fn destroy_collection(
        &self,
        request: &DestroyCollection,
        sender: &Address,
        signer: &SigningKey,
    ) -> Result<TxHash> {
        self.submit(request, method::DESTROY_COLLECTION, sender, signer)
            .await
    }

    pub async fn change_collection_owner(
        &self,
        request: &ChangeOwner,
        sender: &Address,
        signer: &SigningKey,
    ) -> Result<TxHash> {
        self.submit(request, method::CHANGE_OWNER, sender, signer)
            .await
    }

    pub async fn add_collection_admin(
        &self,
        request: &AddCollectionAdmin,
        sender: &Address,
        signer: &SigningKey,
    ) -> Result<TxHash> {
        self.submit(request, method::ADD_ADMIN, sender, signer).await
    }

    pub async fn remove_collection_admin(
        &self,
        request: &RemoveCollectionAdmin,
        sender: &Address,
        signer: &SigningKey,
    ) -> Result<TxHash> {
        self.submit(request, method::REMOVE_ADMIN, sender, signer)
            .await
    }

    pub async fn set_collection_sponsor(
        &self,
        request: &SetCollectionSponsor,
        sender: &Address,
        signer: &SigningKey,
    ) -> Result<TxHash> {
        self.submit(request, method::SET_SPONSOR, sender, signer)
            .await
    }

    /// Accept a pending sponsorship; the sender must be the proposed sponsor.
    pub async fn confirm_sponsorship(
        &self,
        collection_id: u64,
        sender: &Address,
        signer: &SigningKey,
    ) -> Result<TxHash> {
        self.submit(&collection_id, method::CONFIRM_SPONSORSHIP, sender, signer)
            .await
    }

    pub async fn remove_collection_sponsor(
        &self,
        request: &RemoveCollectionSponsor,
        sender: &Address,
        signer: &SigningKey,
    ) -> Result<TxHash> {
        self.submit(request, method::REMOVE_SPONSOR, sender, signer)
            .await
    }

    pub async fn set_offchain_schema(
        &self,
        request: &SetOffChainSchema,
        sender: &Address,
        signer: &SigningKey,
    ) -> Result<TxHash> {
        self.submit(request, method::SET_OFFCHAIN_SCHEMA, sender, signer)
            .await
    }

    // ------------------------------------------------------------------------
    // Storage
    // ------------------------------------------------------------------------

    pub async fn collection(&self, collection_id: u64) -> Result<Option<Collection>> {
        self.read(StorageKey::simple(&collection_id)?, storage::COLLECTION)
            .await
    }

    /// Off-chain schema of a collection, `None` if the collection does not exist.
    pub async fn offchain_schema(&self, collection_id: u64) -> Result<Option<String>> {
        Ok(self
            .collection(collection_id)
            .await?
            .map(|collection| collection.offchain_schema()))
    }

    pub async fn admin_list(&self, collection_id: u64) -> Result<Option<AdminList>> {
        self.read(StorageKey::simple(&collection_id)?, storage::ADMIN_LIST)
            .await
    }

    pub async fn balance_of(&self, request: &GetBalanceOf) -> Result<Option<u64>> {
        let key = StorageKey::account(request.collection_id, &request.account)?;
        self.read(key, storage::BALANCE).await
    }

    pub async fn address_tokens(&self, request: &AddressTokens) -> Result<Option<TokensList>> {
        let key = StorageKey::account(request.collection_id, &request.owner)?;
        self.read(key, storage::ADDRESS_TOKENS).await
    }

    /// Id the next created collection will get.
    pub async fn next_collection_id(&self) -> Result<Option<u64>> {
        self.read(StorageKey::unit(), storage::NEXT_ID).await
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    pub async fn on_collection_created<F>(&self, callback: F) -> Result<ListenerId>
    where
        F: Fn(&EventOrigin, &Created) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.events.add_listener(callback).await
    }

    pub async fn remove_listener(&self, listener: ListenerId) -> bool {
        self.events.remove_listener(listener).await
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    async fn submit<R>(
        &self,
        request: &R,
        method: &'static str,
        sender: &Address,
        signer: &SigningKey,
    ) -> Result<TxHash>
    where
        R: Serialize + ?Sized,
    {
        let payload = bincode::serialize(request).map_err(|e| CallError::Encode {
            what: method,
            reason: e.to_string(),
        })?;

        let extrinsic = Extrinsic {
            module: MODULE,
            method,
            payload,
            sender: sender.clone(),
            signer: signer.clone(),
        };

        self.invoker
            .invoke(
                CallKind::Submit,
                self.settings.max_reconnect_count,
                |connection| {
                    let extrinsic = extrinsic.clone();
                    async move { connection.submit(extrinsic).await }
                },
            )
            .await
    }

    async fn read<V>(&self, key: StorageKey, item: &'static str) -> Result<Option<V>>
    where
        V: DeserializeOwned,
    {
        let key = key.encode();

        let raw = self
            .invoker
            .invoke(
                CallKind::Read,
                self.settings.max_reconnect_count,
                |connection| {
                    let key = key.clone();
                    async move { connection.query(&key, MODULE, item).await }
                },
            )
            .await?;

        raw.map(|bytes| {
            bincode::deserialize(&bytes).map_err(|e| CallError::Decode {
                module: MODULE,
                item,
                reason: e.to_string(),
            })
        })
        .transpose()
    }
}
