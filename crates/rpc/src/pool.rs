//! Connection pool keyed by endpoint.
//!
//! One pool is created per process and handed to every component that dials
//! peers. Asking twice for the same `(host, port)` returns the same
//! [`Client`], whatever identifier the address carries. Every client of a
//! pool expects identifiers of the pool's width in replies.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use corelib::{Endpoint, NodeAddress};
use parking_lot::Mutex;
use tracing::debug;

use crate::client::Client;
use crate::error::RpcError;

pub struct ClientPool {
    call_timeout: Duration,
    id_bits: usize,
    clients: Mutex<HashMap<Endpoint, Arc<Client>>>,
}

impl ClientPool {
    /// A pool for an `id_bits`-bit ring whose clients bound every call by
    /// `call_timeout`.
    pub fn new(call_timeout: Duration, id_bits: usize) -> Self {
        Self {
            call_timeout,
            id_bits,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Client for `addr`, created on first use.
    pub fn client(&self, addr: &NodeAddress) -> Arc<Client> {
        let mut clients = self.clients.lock();
        let client = clients.entry(addr.endpoint()).or_insert_with(|| {
            Arc::new(Client::new(
                addr.host.clone(),
                addr.port,
                self.call_timeout,
                self.id_bits,
            ))
        });
        Arc::clone(client)
    }

    /// Identifier width expected in replies.
    pub fn id_bits(&self) -> usize {
        self.id_bits
    }

    /// Forget the client for `addr`, closing its idle connections.
    pub fn evict(&self, addr: &NodeAddress) -> bool {
        self.clients.lock().remove(&addr.endpoint()).is_some()
    }

    /// Evict the client for `addr` when `err` shows the peer is gone.
    pub fn evict_if_down(&self, addr: &NodeAddress, err: &RpcError) {
        if err.is_connection_failure() && self.evict(addr) {
            debug!(peer = %addr, error = %err, "evicted client");
        }
    }

    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ClientPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientPool")
            .field("call_timeout", &self.call_timeout)
            .field("id_bits", &self.id_bits)
            .field("clients", &self.len())
            .finish()
    }
}
