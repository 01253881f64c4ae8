//! Raw partitioner: key bytes are the identifier.

use crate::id::{Identifier, DEFAULT_ID_BITS};
use crate::partitioner::traits::Partitioner;

/// Uses the key bytes verbatim (least significant byte first). Ring positions
/// become predictable, which tests rely on.
#[derive(Clone, Debug)]
pub struct RawPartitioner {
    bits: usize,
}

impl RawPartitioner {
    pub fn new(bits: usize) -> Self {
        Self { bits }
    }
}

impl Default for RawPartitioner {
    fn default() -> Self {
        Self::new(DEFAULT_ID_BITS)
    }
}

impl Partitioner for RawPartitioner {
    fn partition(&self, key: &[u8]) -> Identifier {
        Identifier::from_le_bytes(key, self.bits)
    }

    fn bits(&self) -> usize {
        self.bits
    }

    fn name(&self) -> &'static str {
        "RawPartitioner"
    }
}
