//! Helpers for building small rings on loopback.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use corelib::{Identifier, NodeAddress, RingConfig};
use node::ChordNode;
use rpc::ClientPool;
use tokio::net::TcpListener;

pub const ID_BITS: usize = 8;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn config() -> RingConfig {
    RingConfig {
        id_bits: ID_BITS,
        stabilize_interval: Duration::from_millis(20),
        object_ttl: Duration::from_secs(60),
        rpc_timeout: Duration::from_secs(1),
    }
}

pub fn id(b: u8) -> Identifier {
    Identifier::from_le_bytes(&[b], ID_BITS)
}

pub fn pool() -> Arc<ClientPool> {
    Arc::new(ClientPool::new(config().rpc_timeout, ID_BITS))
}

/// Bind one loopback listener per id and name each node after its port.
pub async fn bind(ids: &[u8]) -> Vec<(NodeAddress, TcpListener)> {
    let mut bound = Vec::with_capacity(ids.len());
    for &b in ids {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        bound.push((NodeAddress::new("127.0.0.1", port, id(b)), listener));
    }
    bound
}

/// The member responsible for `target`: smallest id at or after it, wrapping.
pub fn successor_of<'a>(target: &Identifier, members: &'a [NodeAddress]) -> &'a NodeAddress {
    let mut sorted: Vec<&NodeAddress> = members.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    sorted
        .iter()
        .copied()
        .find(|m| m.id >= *target)
        .unwrap_or(sorted[0])
}

/// The finger table `owner` has once the ring is fully repaired.
pub fn expected_table(owner: &NodeAddress, members: &[NodeAddress]) -> Vec<NodeAddress> {
    (0..ID_BITS)
        .map(|row| successor_of(&owner.id.finger_target(row), members).clone())
        .collect()
}

/// Serve a ring whose finger tables are correct from the start.
pub async fn precomputed_ring(ids: &[u8]) -> Vec<Arc<ChordNode>> {
    let bound = bind(ids).await;
    let members: Vec<NodeAddress> = bound.iter().map(|(a, _)| a.clone()).collect();
    let pool = pool();

    let mut nodes = Vec::new();
    for (address, listener) in bound {
        let fingers = expected_table(&address, &members);
        let node = ChordNode::with_fingers(address, fingers, config(), Arc::clone(&pool))
            .expect("node");
        node.start_on(listener).expect("start");
        nodes.push(node);
    }
    nodes
}

/// Join every id in order, the first creating the ring.
pub async fn joined_ring(ids: &[u8]) -> Vec<Arc<ChordNode>> {
    let bound = bind(ids).await;
    let pool = pool();

    let mut nodes: Vec<Arc<ChordNode>> = Vec::new();
    for (address, listener) in bound {
        let seed = nodes.first().map(|n| n.address().clone());
        let node = ChordNode::new(address, config(), Arc::clone(&pool)).expect("node");
        node.join_on(listener, seed).await.expect("join");
        nodes.push(node);
    }
    nodes
}

pub fn members(nodes: &[Arc<ChordNode>]) -> Vec<NodeAddress> {
    nodes.iter().map(|n| n.address().clone()).collect()
}

pub async fn stop_all(nodes: &[Arc<ChordNode>]) {
    for node in nodes {
        node.stop().await;
    }
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
