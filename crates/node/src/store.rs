//! Objects a node holds on behalf of the ring.

use std::time::Duration;

use bytes::Bytes;
use corelib::{Identifier, NodeAddress, TtlMap};
use rpc::ClientPool;
use tracing::debug;

use crate::error::Result;

/// Received-object store of one ring node.
///
/// Objects live until their TTL runs out; a re-put restarts it. Nothing is
/// ever deleted explicitly.
pub struct ObjectStore {
    owner: NodeAddress,
    objects: TtlMap<Identifier, Bytes>,
}

impl ObjectStore {
    /// Must be called from within a tokio runtime.
    pub fn new(owner: NodeAddress, ttl: Duration) -> Self {
        let name = format!("objects@{}", owner.socket_addr());
        Self {
            owner,
            objects: TtlMap::new(name, ttl),
        }
    }

    pub fn put(&self, id: Identifier, content: Bytes) {
        self.objects.insert(id, content);
    }

    pub fn get(&self, id: &Identifier) -> Option<Bytes> {
        self.objects.get(id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Objects whose id lies in `(from, self]`.
    pub fn handoff_batch(&self, from: &Identifier) -> Vec<(Identifier, Bytes)> {
        self.objects
            .entries()
            .into_iter()
            .filter(|(id, _)| id.is_between(from, &self.owner.id, true))
            .collect()
    }

    /// Send the hand-off batch for a new predecessor `pred`. Local copies are
    /// kept and expire on their own.
    pub async fn on_new_predecessor(&self, pred: &NodeAddress, pool: &ClientPool) -> Result<usize> {
        let batch = self.handoff_batch(&pred.id);
        let count = batch.len();
        if count == 0 {
            return Ok(0);
        }
        debug!(node = %self.owner, predecessor = %pred, count, "transferring objects");
        pool.client(pred)
            .transfer(batch)
            .await
            .inspect_err(|e| pool.evict_if_down(pred, e))?;
        Ok(count)
    }

    /// Stop the expiry sweeper.
    pub async fn shutdown(&self) {
        self.objects.shutdown().await;
    }
}
