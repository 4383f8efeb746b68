//! Request shapes, storage records and event payloads of the NFT pallet.
//!
//! Everything here is plain data. Requests serialize to the call payload,
//! records deserialize from storage values, both with bincode.

pub mod collection;
pub mod events;

pub use collection::{
    AccessMode, AddCollectionAdmin, AddressTokens, AdminList, ChangeOwner, Collection,
    CollectionMode, CreateCollection, DestroyCollection, GetBalanceOf, RemoveCollectionAdmin,
    RemoveCollectionSponsor, SetCollectionSponsor, SetOffChainSchema, TokensList,
};
pub use events::{ChainEvent, Created, EventKind, ItemCreated, ItemDestroyed, NftEvent};
