//! SHA-256 partitioner.

use sha2::{Digest, Sha256};

use crate::id::{Identifier, DEFAULT_ID_BITS};
use crate::partitioner::traits::Partitioner;

/// Hashes keys with SHA-256 and keeps the low `bits` bits of the digest.
#[derive(Clone, Debug)]
pub struct Sha256Partitioner {
    bits: usize,
}

impl Sha256Partitioner {
    pub fn new(bits: usize) -> Self {
        Self { bits }
    }
}

impl Default for Sha256Partitioner {
    fn default() -> Self {
        Self::new(DEFAULT_ID_BITS)
    }
}

impl Partitioner for Sha256Partitioner {
    fn partition(&self, key: &[u8]) -> Identifier {
        let digest = Sha256::digest(key);
        Identifier::from_le_bytes(&digest, self.bits)
    }

    fn bits(&self) -> usize {
        self.bits
    }

    fn name(&self) -> &'static str {
        "Sha256Partitioner"
    }
}
