//! Ring node state and the operations it serves.
//!
//! Locking: the finger table and the predecessor each sit behind their own
//! `parking_lot::Mutex`. Neither is ever held across an `.await`, and no code
//! path holds both at once.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use corelib::{FingerTable, Identifier, NodeAddress, RingConfig};
use metrics::counter;
use parking_lot::Mutex;
use rpc::{ClientPool, RingService};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{NodeError, Result};
use crate::maintenance;
use crate::store::ObjectStore;

/// Lifecycle of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Built, not serving.
    Created,
    /// Resolving its finger table through a seed.
    Joining,
    /// Serving, and maintaining its routing state if it joined.
    Active,
    Stopping,
    Stopped,
}

pub struct ChordNode {
    address: NodeAddress,
    config: RingConfig,
    table: Mutex<FingerTable>,
    predecessor: Mutex<Option<NodeAddress>>,
    store: ObjectStore,
    pool: Arc<ClientPool>,
    state: Mutex<NodeState>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ChordNode {
    /// A node whose finger table points back at itself.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        address: NodeAddress,
        config: RingConfig,
        pool: Arc<ClientPool>,
    ) -> Result<Arc<Self>> {
        Self::with_fingers(address, Vec::new(), config, pool)
    }

    /// A node with a precomputed finger table. Rows not given point at the
    /// node itself.
    pub fn with_fingers(
        address: NodeAddress,
        fingers: Vec<NodeAddress>,
        config: RingConfig,
        pool: Arc<ClientPool>,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        if pool.id_bits() != config.id_bits {
            return Err(NodeError::Invalid(corelib::Error::InvalidConfig(format!(
                "client pool expects {}-bit identifiers, ring uses {}",
                pool.id_bits(),
                config.id_bits
            ))));
        }
        address.id.check_width(config.id_bits)?;
        for finger in &fingers {
            finger.id.check_width(config.id_bits)?;
        }

        let store = ObjectStore::new(address.clone(), config.object_ttl);
        Ok(Arc::new(Self {
            table: Mutex::new(FingerTable::with_entries(address.clone(), fingers)),
            predecessor: Mutex::new(None),
            store,
            pool,
            config,
            address,
            state: Mutex::new(NodeState::Created),
            cancel: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }))
    }

    pub fn address(&self) -> &NodeAddress {
        &self.address
    }

    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    pub fn state(&self) -> NodeState {
        *self.state.lock()
    }

    pub(crate) fn pool(&self) -> &ClientPool {
        &self.pool
    }

    pub(crate) fn table(&self) -> &Mutex<FingerTable> {
        &self.table
    }

    /// Copy of the current finger table rows.
    pub fn table_snapshot(&self) -> Vec<NodeAddress> {
        self.table.lock().list().to_vec()
    }

    /// Number of objects held in the received-object store.
    pub fn stored_len(&self) -> usize {
        self.store.len()
    }

    fn transition(&self, expected: NodeState, next: NodeState) -> Result<()> {
        let mut state = self.state.lock();
        if *state != expected {
            return Err(NodeError::InvalidState {
                expected,
                actual: *state,
            });
        }
        *state = next;
        Ok(())
    }

    async fn bind(&self) -> Result<TcpListener> {
        let addr = self.address.socket_addr();
        TcpListener::bind((self.address.host.as_str(), self.address.port))
            .await
            .map_err(|source| NodeError::Bind { addr, source })
    }

    // ---- lifecycle ----------------------------------------------------------

    /// Serve RPCs on the node's own address without running maintenance.
    ///
    /// Meant for rings assembled from precomputed finger tables.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let listener = self.bind().await?;
        self.start_on(listener)
    }

    /// Like [`start`](Self::start), on an already-bound listener.
    pub fn start_on(self: &Arc<Self>, listener: TcpListener) -> Result<()> {
        self.transition(NodeState::Created, NodeState::Active)?;
        self.spawn_server(listener);
        info!(node = %self.address, "node serving");
        Ok(())
    }

    /// Create a ring (`seed == None`) or join the ring `seed` belongs to,
    /// then serve and run the maintenance cycle.
    pub async fn join(self: &Arc<Self>, seed: Option<NodeAddress>) -> Result<()> {
        let listener = self.bind().await?;
        self.join_on(listener, seed).await
    }

    /// Like [`join`](Self::join), on an already-bound listener.
    pub async fn join_on(
        self: &Arc<Self>,
        listener: TcpListener,
        seed: Option<NodeAddress>,
    ) -> Result<()> {
        self.transition(NodeState::Created, NodeState::Joining)?;

        if let Err(e) = self.resolve_table(seed.as_ref()).await {
            *self.state.lock() = NodeState::Created;
            return Err(e);
        }

        self.transition(NodeState::Joining, NodeState::Active)?;
        self.spawn_server(listener);
        let cycle = tokio::spawn(maintenance::run(Arc::clone(self), self.cancel.clone()));
        self.tasks.lock().push(cycle);

        info!(node = %self.address, seed = ?seed.map(|s| s.to_string()), "node joined");
        Ok(())
    }

    async fn resolve_table(&self, seed: Option<&NodeAddress>) -> Result<()> {
        let seed = match seed {
            Some(seed) if *seed != self.address => seed,
            _ => {
                self.table.lock().set(0, self.address.clone());
                return Ok(());
            }
        };

        let successor = self
            .pool
            .client(seed)
            .find_successor(&self.address.id)
            .await
            .inspect_err(|e| self.pool.evict_if_down(seed, e))?;
        debug!(node = %self.address, %successor, "resolved successor");
        self.table.lock().set(0, successor);

        for row in 1..self.config.id_bits {
            let target = self.address.id.finger_target(row);
            let owner = self.find_successor(&target).await?;
            self.table.lock().set(row, owner);
        }
        Ok(())
    }

    fn spawn_server(self: &Arc<Self>, listener: TcpListener) {
        let server = tokio::spawn(rpc::serve(listener, Arc::clone(self), self.cancel.clone()));
        self.tasks.lock().push(server);
    }

    /// Halt the server and the maintenance cycle and wait for both to exit.
    pub async fn stop(&self) {
        {
            let mut state = self.state.lock();
            match *state {
                NodeState::Stopping | NodeState::Stopped => return,
                _ => *state = NodeState::Stopping,
            }
        }

        self.cancel.cancel();
        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!(node = %self.address, error = %e, "node task ended abnormally");
            }
        }
        self.store.shutdown().await;

        *self.state.lock() = NodeState::Stopped;
        info!(node = %self.address, "node stopped");
    }

    // ---- ring operations ----------------------------------------------------

    pub fn get_predecessor(&self) -> Option<NodeAddress> {
        self.predecessor.lock().clone()
    }

    /// Finger table row 0.
    pub fn get_successor(&self) -> NodeAddress {
        self.table.lock().successor().clone()
    }

    /// Consider `candidate` as the new predecessor.
    ///
    /// When the predecessor changes, the objects now owned by it are handed
    /// over. A failed hand-off is logged; the predecessor change stands.
    pub async fn notify(&self, candidate: NodeAddress) -> Result<()> {
        if candidate.id == self.address.id {
            return Ok(());
        }

        let changed = {
            let mut pred = self.predecessor.lock();
            let replace = match pred.as_ref() {
                None => true,
                Some(current) => candidate.id.is_between(&current.id, &self.address.id, true),
            };
            if replace {
                *pred = Some(candidate.clone());
            }
            replace
        };

        if changed {
            debug!(node = %self.address, predecessor = %candidate, "predecessor changed");
            if let Err(e) = self.store.on_new_predecessor(&candidate, &self.pool).await {
                warn!(
                    node = %self.address,
                    predecessor = %candidate,
                    error = %e,
                    "object hand-off failed"
                );
            }
        }
        Ok(())
    }

    /// Highest finger strictly between this node and `target`, or this node.
    pub fn closest_preceding_finger(&self, target: &Identifier) -> NodeAddress {
        for row in (0..self.config.id_bits).rev() {
            let entry = match self.table.lock().get(row) {
                Some(entry) => entry.clone(),
                None => continue,
            };
            if entry == self.address {
                continue;
            }
            if entry.id.is_between(&self.address.id, target, false) {
                return entry;
            }
        }
        self.address.clone()
    }

    /// Node responsible for `target`.
    ///
    /// Forwards to the closest preceding finger when the answer is not local.
    /// A failed forward fails the whole lookup.
    pub async fn find_successor(&self, target: &Identifier) -> Result<NodeAddress> {
        counter!("chord_lookups_total").increment(1);
        {
            let table = self.table.lock();
            let successor = table.successor();
            if target.is_between(&self.address.id, &successor.id, true) {
                return Ok(successor.clone());
            }
        }

        let next = self.closest_preceding_finger(target);
        if next == self.address {
            return Ok(next);
        }
        let owner = self
            .pool
            .client(&next)
            .find_successor(target)
            .await
            .inspect_err(|e| self.pool.evict_if_down(&next, e))?;
        Ok(owner)
    }

    pub fn put(&self, id: Identifier, content: Bytes) {
        self.store.put(id, content);
    }

    pub fn get(&self, id: &Identifier) -> Option<Bytes> {
        self.store.get(id)
    }

    pub fn transfer(&self, items: Vec<(Identifier, Bytes)>) {
        debug!(node = %self.address, count = items.len(), "received transfer");
        for (id, content) in items {
            self.store.put(id, content);
        }
    }
}

impl std::fmt::Debug for ChordNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChordNode")
            .field("address", &self.address)
            .field("state", &self.state())
            .finish()
    }
}

#[async_trait]
impl RingService for ChordNode {
    type Error = NodeError;

    async fn get_predecessor(&self) -> Result<Option<NodeAddress>> {
        Ok(ChordNode::get_predecessor(self))
    }

    async fn get_successor(&self) -> Result<NodeAddress> {
        Ok(ChordNode::get_successor(self))
    }

    async fn notify(&self, candidate: NodeAddress) -> Result<()> {
        candidate.id.check_width(self.config.id_bits)?;
        ChordNode::notify(self, candidate).await
    }

    async fn find_successor(&self, target: Identifier) -> Result<NodeAddress> {
        target.check_width(self.config.id_bits)?;
        ChordNode::find_successor(self, &target).await
    }

    async fn closest_preceding_finger(&self, target: Identifier) -> Result<NodeAddress> {
        target.check_width(self.config.id_bits)?;
        Ok(ChordNode::closest_preceding_finger(self, &target))
    }

    async fn put(&self, id: Identifier, content: Bytes) -> Result<()> {
        id.check_width(self.config.id_bits)?;
        ChordNode::put(self, id, content);
        Ok(())
    }

    async fn get(&self, id: Identifier) -> Result<Option<Bytes>> {
        id.check_width(self.config.id_bits)?;
        Ok(ChordNode::get(self, &id))
    }

    async fn transfer(&self, items: Vec<(Identifier, Bytes)>) -> Result<()> {
        for (id, _) in &items {
            id.check_width(self.config.id_bits)?;
        }
        ChordNode::transfer(self, items);
        Ok(())
    }
}
