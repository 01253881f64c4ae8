//! Salted-hash replication strategy.
//!
//! Copy `i` of a key is placed at `hash("{key}#{i}")`. Different salts land
//! on unrelated ring positions, so in a large enough ring the copies end up
//! on about `replication_factor` distinct nodes. Small rings give no such
//! guarantee: several salts may share an owner.

use corelib::partitioner::Sha256Partitioner;
use corelib::{Identifier, Partitioner};

use crate::strategy::ReplicationStrategy;

#[derive(Debug, Clone)]
pub struct SaltedStrategy {
    replication_factor: usize,
    partitioner: Sha256Partitioner,
}

impl SaltedStrategy {
    /// `replication_factor` copies on an `id_bits`-bit ring.
    pub fn new(replication_factor: usize, id_bits: usize) -> Self {
        Self {
            replication_factor,
            partitioner: Sha256Partitioner::new(id_bits),
        }
    }
}

impl ReplicationStrategy for SaltedStrategy {
    fn replication_factor(&self) -> usize {
        self.replication_factor
    }

    fn replica_ids(&self, key: &str) -> Vec<Identifier> {
        (0..self.replication_factor)
            .map(|salt| self.partitioner.partition_salted(key, salt))
            .collect()
    }

    fn name(&self) -> &'static str {
        "SaltedStrategy"
    }
}
