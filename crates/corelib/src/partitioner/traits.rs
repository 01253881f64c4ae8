//! Core partitioner trait definitions.

use crate::id::Identifier;

/// A partitioner converts keys into identifiers for placement on the ring.
///
/// Partitioners are stateless and thread-safe, allowing concurrent
/// identifier generation without synchronization overhead.
pub trait Partitioner: Send + Sync + 'static {
    /// Converts a key into an identifier.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to partition
    ///
    /// # Returns
    ///
    /// An identifier of exactly [`Partitioner::bits`] bits
    fn partition(&self, key: &[u8]) -> Identifier;

    /// Width, in bits, of every identifier this partitioner produces.
    fn bits(&self) -> usize;

    /// Returns the name of this partitioner.
    fn name(&self) -> &'static str;

    /// Place a network endpoint on the ring by partitioning `"host:port"`.
    fn partition_address(&self, host: &str, port: u16) -> Identifier {
        self.partition(format!("{}:{}", host, port).as_bytes())
    }

    /// Derive the `salt`-th placement of `key`.
    ///
    /// Distinct salts give independent ring positions for the same key, which
    /// is how replicas are spread.
    fn partition_salted(&self, key: &str, salt: usize) -> Identifier {
        self.partition(format!("{}#{}", key, salt).as_bytes())
    }
}
