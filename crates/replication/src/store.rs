//! Client-side data store.
//!
//! Values are written to every placement chosen by the replication strategy
//! and remembered in a local cache whose TTL is a third of the ring's object
//! TTL. When a cache entry expires, it is published again, which restarts
//! the ring's TTL before the remote copy can lapse. A value therefore lives
//! as long as the store that wrote it.
//!
//! Every lookup and write goes through a single entry node.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use corelib::{Identifier, NodeAddress, StoreConfig, TtlMap};
use parking_lot::Mutex;
use rpc::{ClientPool, RpcError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::{Result, StoreError};
use crate::strategy::{ReplicationStrategy, SaltedStrategy};

/// Entry node, pool and cache, shared with the republish task.
struct Publisher {
    entry: NodeAddress,
    pool: Arc<ClientPool>,
    cache: TtlMap<Identifier, Bytes>,
}

impl Publisher {
    /// Put `content` at the owner of `id` and (re)start its cache entry.
    async fn publish(
        &self,
        id: &Identifier,
        content: Bytes,
    ) -> std::result::Result<NodeAddress, RpcError> {
        let owner = self.put(id, content.clone()).await?;
        self.cache.insert(id.clone(), content);
        Ok(owner)
    }

    /// Publish an evicted entry again, unless a newer value for `id` has been
    /// stored since. Returns the owner written to, if any.
    async fn refresh(
        &self,
        id: &Identifier,
        content: Bytes,
    ) -> std::result::Result<Option<NodeAddress>, RpcError> {
        if self.cache.get(id).is_some() {
            return Ok(None);
        }
        let owner = self.put(id, content.clone()).await?;
        if !self.cache.insert_if_vacant(id.clone(), content) {
            // A newer value landed while this one was in flight.
            if let Some(newer) = self.cache.get(id) {
                self.put(id, newer).await?;
            }
        }
        Ok(Some(owner))
    }

    async fn put(
        &self,
        id: &Identifier,
        content: Bytes,
    ) -> std::result::Result<NodeAddress, RpcError> {
        let owner = self.owner_of(id).await?;
        self.pool
            .client(&owner)
            .put(id, content)
            .await
            .inspect_err(|e| self.pool.evict_if_down(&owner, e))?;
        Ok(owner)
    }

    /// Ask the owner of `id` for its copy.
    async fn fetch(&self, id: &Identifier) -> std::result::Result<Option<Bytes>, RpcError> {
        let owner = self.owner_of(id).await?;
        self.pool
            .client(&owner)
            .get(id)
            .await
            .inspect_err(|e| self.pool.evict_if_down(&owner, e))
    }

    async fn owner_of(&self, id: &Identifier) -> std::result::Result<NodeAddress, RpcError> {
        self.pool
            .client(&self.entry)
            .find_successor(id)
            .await
            .inspect_err(|e| self.pool.evict_if_down(&self.entry, e))
    }
}

pub struct DataStore {
    publisher: Arc<Publisher>,
    strategy: Arc<dyn ReplicationStrategy>,
    config: StoreConfig,
    cancel: CancellationToken,
    republisher: Mutex<Option<JoinHandle<()>>>,
}

impl DataStore {
    /// A store writing `config.redundancy` salted copies on the ring reached
    /// through `entry`. Identifier width follows the pool.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(entry: NodeAddress, pool: Arc<ClientPool>, config: StoreConfig) -> Result<Self> {
        let strategy = Arc::new(SaltedStrategy::new(config.redundancy, pool.id_bits()));
        Self::with_strategy(entry, pool, config, strategy)
    }

    pub fn with_strategy(
        entry: NodeAddress,
        pool: Arc<ClientPool>,
        config: StoreConfig,
        strategy: Arc<dyn ReplicationStrategy>,
    ) -> Result<Self> {
        config.validate()?;
        entry.id.check_width(pool.id_bits())?;

        let (expired_tx, expired_rx) = mpsc::unbounded_channel();
        let cache = TtlMap::with_eviction_handler(
            format!("datastore@{}", entry.socket_addr()),
            config.cache_ttl(),
            move |id: Identifier, content: Bytes| {
                // Receiver gone means the store is shutting down.
                let _ = expired_tx.send((id, content));
            },
        );

        let publisher = Arc::new(Publisher { entry, pool, cache });
        let cancel = CancellationToken::new();
        let republisher = tokio::spawn(republish(
            Arc::clone(&publisher),
            expired_rx,
            cancel.clone(),
        ));

        debug!(
            entry = %publisher.entry,
            strategy = strategy.name(),
            copies = strategy.replication_factor(),
            "data store ready"
        );
        Ok(Self {
            publisher,
            strategy,
            config,
            cancel,
            republisher: Mutex::new(Some(republisher)),
        })
    }

    pub fn entry(&self) -> &NodeAddress {
        &self.publisher.entry
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Publish `content` under `key` at every placement.
    pub async fn store(&self, key: &str, content: Bytes) -> Result<()> {
        for id in self.strategy.replica_ids(key) {
            let owner = self
                .publisher
                .publish(&id, content.clone())
                .await
                .map_err(|source| StoreError::Publish { id: id.clone(), source })?;
            debug!(key, %id, %owner, "published");
        }
        Ok(())
    }

    /// Read `key` with the configured retry count and delay.
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        self.get_with_retries(key, self.config.retries, self.config.retry_delay)
            .await
    }

    /// Read `key`, trying every placement up to `retries` times and sleeping
    /// `retry_delay` between rounds. Unreachable owners count as misses.
    pub async fn get_with_retries(
        &self,
        key: &str,
        retries: usize,
        retry_delay: Duration,
    ) -> Option<Bytes> {
        let ids = self.strategy.replica_ids(key);
        let primary = ids.first()?;

        for attempt in 0..retries {
            if let Some(cached) = self.publisher.cache.get(primary) {
                return Some(cached);
            }
            for id in &ids {
                match self.publisher.fetch(id).await {
                    Ok(Some(content)) => return Some(content),
                    Ok(None) => {}
                    Err(e) => warn!(key, %id, error = %e, "replica fetch failed"),
                }
            }
            if attempt + 1 < retries {
                debug!(key, attempt, "not found, retrying");
                tokio::time::sleep(retry_delay).await;
            }
        }
        None
    }

    /// Stop re-publishing. Values already written expire on the ring after
    /// their TTL.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.republisher.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.publisher.cache.shutdown().await;
    }
}

impl Drop for DataStore {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn republish(
    publisher: Arc<Publisher>,
    mut expired: mpsc::UnboundedReceiver<(Identifier, Bytes)>,
    cancel: CancellationToken,
) {
    loop {
        let (id, content) = tokio::select! {
            _ = cancel.cancelled() => break,
            next = expired.recv() => match next {
                Some(item) => item,
                None => break,
            },
        };
        match publisher.refresh(&id, content.clone()).await {
            Ok(Some(owner)) => debug!(%id, %owner, "re-published"),
            Ok(None) => trace!(%id, "newer value cached, not re-publishing"),
            Err(e) => {
                warn!(%id, error = %e, "re-publish failed");
                // Try again when the entry expires next.
                publisher.cache.insert_if_vacant(id, content);
            }
        }
    }
    debug!(entry = %publisher.entry, "republisher stopped");
}
