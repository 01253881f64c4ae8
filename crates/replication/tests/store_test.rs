//! Data store against a live ring.
//!
//! # Test Strategy
//!
//! 1. **Round trip**: a value written by one store is read by another
//! 2. **Misses**: unknown keys come back as not-found after the retries
//! 3. **Liveness**: re-publishing outlives the ring's object TTL

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use corelib::{Identifier, NodeAddress, RingConfig, StoreConfig};
use node::ChordNode;
use replication::{DataStore, ReplicationStrategy, SaltedStrategy, StoreError};
use rpc::ClientPool;
use tokio::net::TcpListener;

const ID_BITS: usize = 16;

fn ring_config(object_ttl: Duration) -> RingConfig {
    RingConfig {
        id_bits: ID_BITS,
        stabilize_interval: Duration::from_millis(20),
        object_ttl,
        rpc_timeout: Duration::from_secs(1),
    }
}

fn store_config(redundancy: usize, remote_ttl: Duration) -> StoreConfig {
    StoreConfig {
        redundancy,
        retries: 2,
        retry_delay: Duration::from_millis(50),
        remote_ttl,
    }
}

/// Join a ring of `count` nodes and wait until every successor is right.
async fn ring(count: u16, object_ttl: Duration) -> Vec<Arc<ChordNode>> {
    let pool = Arc::new(ClientPool::new(Duration::from_secs(1), ID_BITS));
    let mut nodes: Vec<Arc<ChordNode>> = Vec::new();
    for i in 0..count {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let position = i.wrapping_mul(0x3100).wrapping_add(0x0400);
        let id = Identifier::from_le_bytes(&position.to_le_bytes(), ID_BITS);
        let address = NodeAddress::new("127.0.0.1", port, id);
        let node = ChordNode::new(address, ring_config(object_ttl), Arc::clone(&pool))
            .expect("node");
        let seed = nodes.first().map(|n| n.address().clone());
        node.join_on(listener, seed).await.expect("join");
        nodes.push(node);
    }

    let mut sorted: Vec<NodeAddress> = nodes.iter().map(|n| n.address().clone()).collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let linked = nodes.iter().all(|n| {
            let at = sorted.iter().position(|a| a == n.address()).expect("member");
            n.get_successor() == sorted[(at + 1) % sorted.len()]
        });
        if linked {
            break;
        }
        assert!(Instant::now() < deadline, "ring did not stabilize");
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    nodes
}

async fn stop_all(nodes: &[Arc<ChordNode>]) {
    for node in nodes {
        node.stop().await;
    }
}

fn client_store(entry: &ChordNode, config: StoreConfig) -> DataStore {
    let pool = Arc::new(ClientPool::new(Duration::from_secs(1), ID_BITS));
    DataStore::new(entry.address().clone(), pool, config).expect("store")
}

// ============================================================================
// Round trip
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_round_trip_across_stores() {
    let nodes = ring(4, Duration::from_secs(60)).await;
    let writer = client_store(&nodes[0], store_config(1, Duration::from_secs(60)));
    let reader = client_store(&nodes[2], store_config(1, Duration::from_secs(60)));

    writer.store("greeting", Bytes::from_static(b"hello")).await.expect("store");
    assert_eq!(writer.get("greeting").await, Some(Bytes::from_static(b"hello")));
    assert_eq!(reader.get("greeting").await, Some(Bytes::from_static(b"hello")));

    writer.store("greeting", Bytes::from_static(b"bye")).await.expect("overwrite");
    assert_eq!(reader.get("greeting").await, Some(Bytes::from_static(b"bye")));

    writer.shutdown().await;
    reader.shutdown().await;
    stop_all(&nodes).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_copy_is_placed() {
    let nodes = ring(4, Duration::from_secs(60)).await;
    let writer = client_store(&nodes[1], store_config(3, Duration::from_secs(60)));
    writer.store("k", Bytes::from_static(b"v")).await.expect("store");

    let pool = ClientPool::new(Duration::from_secs(1), ID_BITS);
    for id in SaltedStrategy::new(3, ID_BITS).replica_ids("k") {
        let owner = pool.client(nodes[0].address()).find_successor(&id).await.expect("lookup");
        let copy = pool.client(&owner).get(&id).await.expect("get");
        assert_eq!(copy, Some(Bytes::from_static(b"v")), "copy at {id}");
    }

    writer.shutdown().await;
    stop_all(&nodes).await;
}

// ============================================================================
// Misses
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unknown_key_is_not_found_after_retries() {
    let nodes = ring(3, Duration::from_secs(60)).await;
    let reader = client_store(&nodes[0], store_config(2, Duration::from_secs(60)));

    let started = Instant::now();
    assert_eq!(reader.get("never-written").await, None);
    // One delay between the two rounds.
    assert!(started.elapsed() >= Duration::from_millis(50));

    assert_eq!(
        reader
            .get_with_retries("never-written", 0, Duration::from_secs(10))
            .await,
        None
    );

    reader.shutdown().await;
    stop_all(&nodes).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_store_without_ring_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    let entry = NodeAddress::new("127.0.0.1", port, Identifier::from_le_bytes(&[1, 0], ID_BITS));
    let pool = Arc::new(ClientPool::new(Duration::from_millis(200), ID_BITS));
    let store =
        DataStore::new(entry, pool, store_config(1, Duration::from_secs(60))).expect("store");

    let err = store.store("k", Bytes::from_static(b"v")).await.unwrap_err();
    assert!(matches!(err, StoreError::Publish { .. }));
    assert_eq!(store.get_with_retries("k", 1, Duration::ZERO).await, None);
    store.shutdown().await;
}

#[tokio::test]
async fn test_rejects_zero_redundancy() {
    let entry = NodeAddress::new("127.0.0.1", 1, Identifier::from_le_bytes(&[1, 0], ID_BITS));
    let pool = Arc::new(ClientPool::new(Duration::from_millis(200), ID_BITS));
    let result = DataStore::new(entry, pool, store_config(0, Duration::from_secs(60)));
    assert!(matches!(result, Err(StoreError::Config(_))));
}

#[tokio::test]
async fn test_rejects_entry_of_other_width() {
    let entry = NodeAddress::new("127.0.0.1", 1, Identifier::from_le_bytes(&[1], 8));
    let pool = Arc::new(ClientPool::new(Duration::from_millis(200), ID_BITS));
    let result = DataStore::new(entry, pool, store_config(1, Duration::from_secs(60)));
    assert!(matches!(result, Err(StoreError::Config(_))));
}

// ============================================================================
// Liveness
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_republish_outlives_object_ttl() {
    let ttl = Duration::from_millis(300);
    let nodes = ring(3, ttl).await;
    let writer = client_store(&nodes[0], store_config(1, ttl));
    writer.store("lasting", Bytes::from_static(b"value")).await.expect("store");

    tokio::time::sleep(ttl * 4).await;

    // A fresh store has no cache, so this read must hit the ring.
    let reader = client_store(&nodes[1], store_config(1, ttl));
    assert_eq!(reader.get("lasting").await, Some(Bytes::from_static(b"value")));

    writer.shutdown().await;
    reader.shutdown().await;
    stop_all(&nodes).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_values_lapse_after_writer_shuts_down() {
    let ttl = Duration::from_millis(300);
    let nodes = ring(2, ttl).await;
    let writer = client_store(&nodes[0], store_config(1, ttl));
    writer.store("fleeting", Bytes::from_static(b"value")).await.expect("store");
    writer.shutdown().await;

    tokio::time::sleep(ttl * 3).await;

    let reader = client_store(&nodes[1], store_config(1, ttl));
    assert_eq!(reader.get("fleeting").await, None);

    reader.shutdown().await;
    stop_all(&nodes).await;
}
