use std::sync::{Arc, Mutex};

use chain_core::{
    Address, ConnectionId, MockChain, PublicKey, SUBSTRATE_PREFIX, SigningKey, TransportError,
};
use nft_client::collection::{method, storage};
use nft_client::models::{
    AccessMode, AddressTokens, AdminList, ChainEvent, ChangeOwner, Collection, CollectionMode,
    CreateCollection, Created, GetBalanceOf, SetOffChainSchema, TokensList,
};
use nft_client::{CallError, CallSettings, KeyCodec, KeyError, NftClient, StorageKey};

fn account(seed: u8) -> (PublicKey, Address) {
    let key = PublicKey([seed; 32]);
    (key, key.to_address(SUBSTRATE_PREFIX))
}

fn signer() -> SigningKey {
    SigningKey::new("//Alice")
}

fn client(chain: &MockChain, max_reconnects: u32) -> NftClient {
    NftClient::new(
        Arc::new(chain.connector()),
        CallSettings::default().with_max_reconnect_count(max_reconnects),
    )
}

fn punks(owner: PublicKey) -> Collection {
    Collection {
        owner,
        mode: CollectionMode::Nft {
            custom_data_size: 32,
        },
        access: AccessMode::Normal,
        decimal_points: 0,
        name: "Punks".into(),
        description: "Pixel art".into(),
        token_prefix: b"PNK".to_vec(),
        custom_data_size: 32,
        offchain_schema: b"ipfs://punks/{id}".to_vec(),
        sponsor: PublicKey([0u8; 32]),
        unconfirmed_sponsor: PublicKey([0u8; 32]),
    }
}

fn store<V: serde::Serialize>(chain: &MockChain, item: &str, key: StorageKey, value: &V) {
    chain.insert_storage("Nft", item, key.encode(), bincode::serialize(value).unwrap());
}

// ============================================================================
// Extrinsics
// ============================================================================

#[tokio::test]
async fn test_create_collection_submits_encoded_request() {
    let chain = MockChain::new();
    let client = client(&chain, 3);
    let (_, alice) = account(1);

    let request = CreateCollection::new(
        "Punks",
        "Pixel art",
        "PNK",
        CollectionMode::Nft {
            custom_data_size: 32,
        },
    );
    let tx = client
        .collections()
        .create_collection(&request, &alice, &signer())
        .await
        .unwrap();

    assert!(!tx.as_bytes().is_empty());
    let submitted = chain.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].module, "Nft");
    assert_eq!(submitted[0].method, method::CREATE_COLLECTION);
    assert_eq!(submitted[0].payload, bincode::serialize(&request).unwrap());
    assert_eq!(submitted[0].sender, alice.to_string());
}

#[tokio::test]
async fn test_submit_retries_through_dropped_connection() {
    let chain = MockChain::new();
    let client = client(&chain, 2);
    let (_, alice) = account(1);
    let (_, bob) = account(2);

    chain.fail_next_call(TransportError::Disconnected("socket closed".into()));
    let request = ChangeOwner {
        collection_id: 7,
        new_owner: bob,
    };
    client
        .collections()
        .change_collection_owner(&request, &alice, &signer())
        .await
        .unwrap();

    assert_eq!(chain.counters().connects, 2);
    assert_eq!(chain.counters().submits, 2);
    assert_eq!(chain.submitted().len(), 1);
    assert_eq!(chain.submitted()[0].connection, ConnectionId(2));
}

#[tokio::test]
async fn test_unconfirmed_submit_is_never_resubmitted() {
    let chain = MockChain::new();
    let client = client(&chain, 5);
    let (_, alice) = account(1);

    chain.fail_next_call(TransportError::Unconfirmed("reply lost".into()));
    let err = client
        .collections()
        .create_collection(
            &CreateCollection::new("A", "", "", CollectionMode::Invalid),
            &alice,
            &signer(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CallError::Unconfirmed(_)));
    assert_eq!(chain.counters().submits, 1);
    assert_eq!(chain.counters().connects, 1);
}

#[tokio::test]
async fn test_rejection_surfaces_without_reconnect() {
    let chain = MockChain::new();
    let client = client(&chain, 5);
    let (_, alice) = account(1);

    chain.fail_next_call(TransportError::Rejected("NoPermission".into()));
    let err = client
        .collections()
        .confirm_sponsorship(3, &alice, &signer())
        .await
        .unwrap_err();

    assert!(matches!(err, CallError::Rejected(reason) if reason == "NoPermission"));
    assert_eq!(chain.counters().connects, 1);
}

#[tokio::test]
async fn test_exhaustion_propagates_to_caller() {
    let chain = MockChain::new();
    let client = client(&chain, 1);
    let (_, alice) = account(1);

    chain.fail_next_call(TransportError::Timeout("no reply in 30s".into()));
    chain.fail_next_call(TransportError::Timeout("no reply in 30s".into()));
    let err = client
        .collections()
        .set_offchain_schema(
            &SetOffChainSchema {
                collection_id: 1,
                schema: "ipfs://x".into(),
            },
            &alice,
            &signer(),
        )
        .await
        .unwrap_err();

    match err {
        CallError::ReconnectExhausted { attempts, last } => {
            assert_eq!(attempts, 2);
            assert!(matches!(last, TransportError::Timeout(_)));
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn test_confirm_sponsorship_payload_is_collection_id() {
    let chain = MockChain::new();
    let client = client(&chain, 0);
    let (_, alice) = account(1);

    client
        .collections()
        .confirm_sponsorship(258, &alice, &signer())
        .await
        .unwrap();

    let submitted = chain.submitted();
    assert_eq!(submitted[0].method, method::CONFIRM_SPONSORSHIP);
    assert_eq!(submitted[0].payload, 258u64.to_le_bytes().to_vec());
}

#[tokio::test]
async fn test_malformed_address_fails_before_network() {
    let chain = MockChain::new();
    let client = client(&chain, 3);
    let (_, alice) = account(1);

    let err = client
        .collections()
        .change_collection_owner(
            &ChangeOwner {
                collection_id: 1,
                new_owner: Address::new("nope"),
            },
            &alice,
            &signer(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CallError::Encode { .. }));
    assert_eq!(chain.counters().connects, 0);
}

// ============================================================================
// Storage
// ============================================================================

#[tokio::test]
async fn test_missing_collection_is_absent_not_error() {
    let chain = MockChain::new();
    let client = client(&chain, 3);

    assert_eq!(client.collections().collection(404).await.unwrap(), None);
    assert_eq!(client.collections().offchain_schema(404).await.unwrap(), None);
    assert_eq!(client.collections().next_collection_id().await.unwrap(), None);
}

#[tokio::test]
async fn test_reads_collection_and_schema() {
    let chain = MockChain::new();
    let client = client(&chain, 3);
    let (owner, _) = account(1);

    store(
        &chain,
        storage::COLLECTION,
        StorageKey::simple(&5u64).unwrap(),
        &punks(owner),
    );

    let collection = client.collections().collection(5).await.unwrap().unwrap();
    assert_eq!(collection, punks(owner));
    assert_eq!(
        client.collections().offchain_schema(5).await.unwrap(),
        Some("ipfs://punks/{id}".to_string())
    );
}

#[tokio::test]
async fn test_read_retries_through_dropped_connection() {
    let chain = MockChain::new();
    let client = client(&chain, 1);
    let (admin, _) = account(9);

    store(
        &chain,
        storage::ADMIN_LIST,
        StorageKey::simple(&1u64).unwrap(),
        &AdminList(vec![admin]),
    );
    chain.fail_next_call(TransportError::Retryable("node syncing".into()));

    let admins = client.collections().admin_list(1).await.unwrap().unwrap();
    assert!(admins.contains(&admin));
    assert_eq!(chain.counters().connects, 2);
}

#[tokio::test]
async fn test_balance_uses_composite_key() {
    let chain = MockChain::new();
    let client = client(&chain, 3);
    let (key, address) = account(4);

    chain.insert_storage(
        "Nft",
        storage::BALANCE,
        KeyCodec::encode_composite(2, key.as_bytes()),
        bincode::serialize(&11u64).unwrap(),
    );

    let request = GetBalanceOf {
        collection_id: 2,
        account: address.clone(),
    };
    assert_eq!(client.collections().balance_of(&request).await.unwrap(), Some(11));

    let other_collection = GetBalanceOf {
        collection_id: 3,
        account: address,
    };
    assert_eq!(
        client.collections().balance_of(&other_collection).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_address_tokens_uses_composite_key() {
    let chain = MockChain::new();
    let client = client(&chain, 3);
    let (key, owner) = account(6);

    store(
        &chain,
        storage::ADDRESS_TOKENS,
        StorageKey::composite(8, key.as_bytes().to_vec()),
        &TokensList(vec![1, 2, 3]),
    );

    let tokens = client
        .collections()
        .address_tokens(&AddressTokens {
            collection_id: 8,
            owner,
        })
        .await
        .unwrap();
    assert_eq!(tokens, Some(TokensList(vec![1, 2, 3])));
}

#[tokio::test]
async fn test_invalid_account_key_fails_fast() {
    let chain = MockChain::new();
    let client = client(&chain, 3);

    let err = client
        .collections()
        .balance_of(&GetBalanceOf {
            collection_id: 1,
            account: Address::new("0OIl"),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, CallError::InvalidKey(KeyError::InvalidAccount(_))));
    assert_eq!(chain.counters().connects, 0);
    assert_eq!(chain.counters().queries, 0);
}

#[tokio::test]
async fn test_next_collection_id_uses_unit_key() {
    let chain = MockChain::new();
    let client = client(&chain, 3);

    store(&chain, storage::NEXT_ID, StorageKey::unit(), &12u64);
    assert_eq!(
        client.collections().next_collection_id().await.unwrap(),
        Some(12)
    );
}

#[tokio::test]
async fn test_undecodable_value_is_decode_error() {
    let chain = MockChain::new();
    let client = client(&chain, 3);

    chain.insert_storage(
        "Nft",
        storage::COLLECTION,
        StorageKey::simple(&1u64).unwrap().encode(),
        vec![1, 2, 3],
    );

    let err = client.collections().collection(1).await.unwrap_err();
    assert!(matches!(
        err,
        CallError::Decode {
            item: "Collection",
            ..
        }
    ));
}

// ============================================================================
// Events
// ============================================================================

#[tokio::test]
async fn test_collection_created_listener_lifecycle() {
    let chain = MockChain::new();
    let client = client(&chain, 3);
    let (owner, _) = account(1);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&seen);
    let listener = client
        .collections()
        .on_collection_created(move |_, created| {
            sink.lock().unwrap().push(created.id);
            Ok(())
        })
        .await
        .unwrap();

    let created = Created {
        id: 1,
        mode: CollectionMode::Invalid,
        account: owner,
    };
    chain.emit(created.to_raw().unwrap());

    assert!(client.collections().remove_listener(listener).await);
    chain.emit(created.to_raw().unwrap());

    assert_eq!(*seen.lock().unwrap(), vec![1]);
    assert_eq!(chain.counters().subscribes, 1);
    assert_eq!(chain.counters().unsubscribes, 1);
}

#[tokio::test]
async fn test_listener_survives_reconnect_caused_by_call() {
    let chain = MockChain::new();
    let client = client(&chain, 2);
    let (owner, _) = account(1);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&seen);
    client
        .collections()
        .on_collection_created(move |origin, created| {
            sink.lock().unwrap().push((origin.connection, created.id));
            Ok(())
        })
        .await
        .unwrap();

    chain.fail_next_call(TransportError::Disconnected("socket closed".into()));
    client.collections().collection(1).await.unwrap();

    chain.emit(
        Created {
            id: 2,
            mode: CollectionMode::Invalid,
            account: owner,
        }
        .to_raw()
        .unwrap(),
    );

    assert_eq!(*seen.lock().unwrap(), vec![(ConnectionId(2), 2)]);
    assert_eq!(chain.active_subscriptions(), 1);
}

#[tokio::test]
async fn test_client_recovers_after_exhausted_call() {
    let chain = MockChain::new();
    let client = client(&chain, 0);
    let (owner, _) = account(1);

    store(
        &chain,
        storage::COLLECTION,
        StorageKey::simple(&1u64).unwrap(),
        &punks(owner),
    );
    chain.fail_next_call(TransportError::Disconnected("blip".into()));

    let err = client.collections().collection(1).await.unwrap_err();
    assert!(err.is_exhausted());

    assert_eq!(
        client.collections().collection(1).await.unwrap(),
        Some(punks(owner))
    );
    assert!(client.collections().collection(1).await.unwrap().is_some());
    assert_eq!(chain.counters().connects, 2);
    assert_eq!(chain.counters().queries, 3);
}

#[tokio::test]
async fn test_listener_added_after_exhausted_call() {
    let chain = MockChain::new();
    let client = client(&chain, 0);
    let (owner, _) = account(1);
    let seen = Arc::new(Mutex::new(Vec::new()));

    chain.fail_next_call(TransportError::Disconnected("blip".into()));
    assert!(client.collections().collection(1).await.is_err());

    let sink = Arc::clone(&seen);
    client
        .collections()
        .on_collection_created(move |origin, created| {
            sink.lock().unwrap().push((origin.connection, created.id));
            Ok(())
        })
        .await
        .unwrap();

    chain.emit(
        Created {
            id: 3,
            mode: CollectionMode::Invalid,
            account: owner,
        }
        .to_raw()
        .unwrap(),
    );
    assert_eq!(*seen.lock().unwrap(), vec![(ConnectionId(2), 3)]);
}

#[tokio::test]
async fn test_listener_subscribe_reconnects_past_dropped_connection() {
    let chain = MockChain::new();
    let client = client(&chain, 2);

    client.collections().next_collection_id().await.unwrap();
    chain.drop_connection(ConnectionId(1));

    client
        .collections()
        .on_collection_created(|_, _| Ok(()))
        .await
        .unwrap();
    assert_eq!(chain.subscribed_connections(), vec![ConnectionId(2)]);
}
