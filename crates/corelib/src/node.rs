//! Node addresses.
//!
//! A [`NodeAddress`] names a ring participant: where to dial it, and where it
//! sits on the ring. Equality and hashing look at the endpoint only, so that
//! independently built addresses of the same peer share one connection.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::id::Identifier;
use crate::partitioner::Partitioner;

/// `(host, port)` pair a peer is reachable on.
pub type Endpoint = (String, u16);

/// Logical node participating in the ring.
///
/// Keep this struct small and cheap to clone; connection state lives in the
/// RPC client pool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeAddress {
    pub host: String,
    pub port: u16,
    /// Ring position. Not part of endpoint equality.
    pub id: Identifier,
}

impl NodeAddress {
    /// Construct an address with an explicitly assigned ring position.
    pub fn new(host: impl Into<String>, port: u16, id: Identifier) -> Self {
        Self {
            host: host.into(),
            port,
            id,
        }
    }

    /// Construct an address whose ring position is the hash of `host:port`.
    pub fn hashed<P: Partitioner + ?Sized>(
        host: impl Into<String>,
        port: u16,
        partitioner: &P,
    ) -> Self {
        let host = host.into();
        let id = partitioner.partition_address(&host, port);
        Self { host, port, id }
    }

    pub fn endpoint(&self) -> Endpoint {
        (self.host.clone(), self.port)
    }

    /// `host:port`, suitable for dialing.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether both addresses sit at the same ring position.
    pub fn same_id(&self, other: &NodeAddress) -> bool {
        self.id == other.id
    }
}

impl PartialEq for NodeAddress {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host && self.port == other.port
    }
}

impl Eq for NodeAddress {}

impl Hash for NodeAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.host.hash(state);
        self.port.hash(state);
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.id, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partitioner::Sha256Partitioner;
    use std::collections::HashSet;

    #[test]
    fn test_equality_ignores_identifier() {
        let a = NodeAddress::new("localhost", 4000, Identifier::from_bytes(&[1]));
        let b = NodeAddress::new("localhost", 4000, Identifier::from_bytes(&[2]));
        let c = NodeAddress::new("localhost", 4001, Identifier::from_bytes(&[1]));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.same_id(&b));
        assert!(a.same_id(&c));

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_hashed_address_uses_endpoint() {
        let p = Sha256Partitioner::default();
        let addr = NodeAddress::hashed("10.0.0.1", 4300, &p);
        assert_eq!(addr.id, Identifier::from_address_and_port("10.0.0.1", 4300));
        assert_eq!(addr.socket_addr(), "10.0.0.1:4300");
    }
}
