//! NFT pallet events.

use chain_core::{PublicKey, RawEvent};
use serde::{Deserialize, Serialize};

use super::collection::CollectionMode;
use crate::collection::MODULE;

/// Event kinds the client recognizes. The string form is the on-chain
/// variant name.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
pub enum EventKind {
    Created,
    ItemCreated,
    ItemDestroyed,
}

/// A collection was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
    pub id: u64,
    pub mode: CollectionMode,
    pub account: PublicKey,
}

/// A token was minted in a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCreated {
    pub collection_id: u64,
    pub item_id: u64,
}

/// A token was burned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDestroyed {
    pub collection_id: u64,
    pub item_id: u64,
}

/// Decoded event. Anything not recognized lands in `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NftEvent {
    Created(Created),
    ItemCreated(ItemCreated),
    ItemDestroyed(ItemDestroyed),
    Other { module: String, name: String },
}

impl NftEvent {
    /// Decode a raw event. Events from other pallets, unknown variants and
    /// undecodable payloads all become `Other`.
    pub fn decode(raw: &RawEvent) -> Self {
        let other = || NftEvent::Other {
            module: raw.module.clone(),
            name: raw.name.clone(),
        };

        if raw.module != MODULE {
            return other();
        }
        let Ok(kind) = raw.name.parse::<EventKind>() else {
            return other();
        };

        let decoded = match kind {
            EventKind::Created => bincode::deserialize(&raw.data).map(NftEvent::Created),
            EventKind::ItemCreated => bincode::deserialize(&raw.data).map(NftEvent::ItemCreated),
            EventKind::ItemDestroyed => {
                bincode::deserialize(&raw.data).map(NftEvent::ItemDestroyed)
            }
        };

        decoded.unwrap_or_else(|e| {
            tracing::trace!("undecodable {}::{} event: {}", raw.module, raw.name, e);
            other()
        })
    }

    pub fn kind(&self) -> Option<EventKind> {
        match self {
            NftEvent::Created(_) => Some(EventKind::Created),
            NftEvent::ItemCreated(_) => Some(EventKind::ItemCreated),
            NftEvent::ItemDestroyed(_) => Some(EventKind::ItemDestroyed),
            NftEvent::Other { .. } => None,
        }
    }
}

/// Typed view of one `NftEvent` variant, used to register listeners.
pub trait ChainEvent: Send + Sync + 'static {
    const KIND: EventKind;

    fn extract(event: &NftEvent) -> Option<&Self>;

    /// Raw form of this event, as a node would deliver it.
    fn to_raw(&self) -> bincode::Result<RawEvent>
    where
        Self: Serialize,
    {
        let kind: &'static str = Self::KIND.into();
        Ok(RawEvent::new(MODULE, kind, bincode::serialize(self)?))
    }
}

impl ChainEvent for Created {
    const KIND: EventKind = EventKind::Created;

    fn extract(event: &NftEvent) -> Option<&Self> {
        match event {
            NftEvent::Created(created) => Some(created),
            _ => None,
        }
    }
}

impl ChainEvent for ItemCreated {
    const KIND: EventKind = EventKind::ItemCreated;

    fn extract(event: &NftEvent) -> Option<&Self> {
        match event {
            NftEvent::ItemCreated(item) => Some(item),
            _ => None,
        }
    }
}

impl ChainEvent for ItemDestroyed {
    const KIND: EventKind = EventKind::ItemDestroyed;

    fn extract(event: &NftEvent) -> Option<&Self> {
        match event {
            NftEvent::ItemDestroyed(item) => Some(item),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_created() {
        let created = Created {
            id: 4,
            mode: CollectionMode::Fungible { decimal_points: 6 },
            account: PublicKey([2u8; 32]),
        };

        let raw = created.to_raw().unwrap();
        assert_eq!(raw.module, "Nft");
        assert_eq!(raw.name, "Created");
        assert_eq!(NftEvent::decode(&raw), NftEvent::Created(created));
    }

    #[test]
    fn test_foreign_module_is_other() {
        let raw = RawEvent::new("Balances", "Created", vec![]);
        assert_eq!(NftEvent::decode(&raw).kind(), None);
    }

    #[test]
    fn test_unknown_variant_is_other() {
        let raw = RawEvent::new("Nft", "Approved", vec![]);
        assert!(matches!(
            NftEvent::decode(&raw),
            NftEvent::Other { name, .. } if name == "Approved"
        ));
    }

    #[test]
    fn test_truncated_payload_is_other() {
        let raw = RawEvent::new("Nft", "ItemCreated", vec![1, 2, 3]);
        assert_eq!(NftEvent::decode(&raw).kind(), None);
    }
}
