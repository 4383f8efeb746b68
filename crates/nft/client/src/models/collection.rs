//! Collection requests and records.

use chain_core::{Address, PublicKey};
use serde::{Deserialize, Serialize};

/// Token model of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionMode {
    Invalid,
    Nft { custom_data_size: u32 },
    Fungible { decimal_points: u32 },
    ReFungible {
        custom_data_size: u32,
        decimal_points: u32,
    },
}

/// Who may own tokens of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessMode {
    Normal,
    WhiteList,
}

// ============================================================================
// Requests
// ============================================================================

/// Arguments of `create_collection`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateCollection {
    #[serde(with = "utf16")]
    pub name: String,

    #[serde(with = "utf16")]
    pub description: String,

    pub token_prefix: String,

    pub mode: CollectionMode,
}

impl CreateCollection {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        token_prefix: impl Into<String>,
        mode: CollectionMode,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            token_prefix: token_prefix.into(),
            mode,
        }
    }
}

/// Arguments of `destroy_collection`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DestroyCollection {
    pub collection_id: u64,
}

/// Arguments of `change_collection_owner`.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeOwner {
    pub collection_id: u64,
    pub new_owner: Address,
}

/// Arguments of `add_collection_admin`.
#[derive(Debug, Clone, Serialize)]
pub struct AddCollectionAdmin {
    pub collection_id: u64,
    pub new_admin: Address,
}

/// Arguments of `remove_collection_admin`.
#[derive(Debug, Clone, Serialize)]
pub struct RemoveCollectionAdmin {
    pub collection_id: u64,
    pub account: Address,
}

/// Arguments of `set_collection_sponsor`.
#[derive(Debug, Clone, Serialize)]
pub struct SetCollectionSponsor {
    pub collection_id: u64,
    pub new_sponsor: Address,
}

/// Arguments of `remove_collection_sponsor`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RemoveCollectionSponsor {
    pub collection_id: u64,
}

/// Arguments of `set_offchain_schema`.
#[derive(Debug, Clone, Serialize)]
pub struct SetOffChainSchema {
    pub collection_id: u64,
    pub schema: String,
}

/// Balance lookup for one account in one collection.
#[derive(Debug, Clone)]
pub struct GetBalanceOf {
    pub collection_id: u64,
    pub account: Address,
}

/// Token index lookup for one owner in one collection.
#[derive(Debug, Clone)]
pub struct AddressTokens {
    pub collection_id: u64,
    pub owner: Address,
}

// ============================================================================
// Storage records
// ============================================================================

/// Value of the `Collection` storage map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub owner: PublicKey,
    pub mode: CollectionMode,
    pub access: AccessMode,
    pub decimal_points: u32,

    #[serde(with = "utf16")]
    pub name: String,

    #[serde(with = "utf16")]
    pub description: String,

    pub token_prefix: Vec<u8>,
    pub custom_data_size: u32,
    pub offchain_schema: Vec<u8>,
    pub sponsor: PublicKey,
    pub unconfirmed_sponsor: PublicKey,
}

impl Collection {
    /// Off-chain schema as text.
    ///
    /// Invalid UTF-8 sequences become U+FFFD, so the result may differ from
    /// the stored bytes. Use the `offchain_schema` field for the exact value.
    pub fn offchain_schema(&self) -> String {
        String::from_utf8_lossy(&self.offchain_schema).into_owned()
    }
}

/// Value of the `AdminList` storage map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminList(pub Vec<PublicKey>);

impl AdminList {
    pub fn contains(&self, key: &PublicKey) -> bool {
        self.0.contains(key)
    }
}

/// Value of the `AddressTokens` storage map: token ids held by one owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokensList(pub Vec<u64>);

/// Collection names and descriptions travel as UTF-16 code units.
mod utf16 {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(text: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: AsRef<str>,
        S: Serializer,
    {
        let units: Vec<u16> = text.as_ref().encode_utf16().collect();
        units.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        let units = Vec::<u16>::deserialize(deserializer)?;
        String::from_utf16(&units).map_err(serde::de::Error::custom)
    }
}
