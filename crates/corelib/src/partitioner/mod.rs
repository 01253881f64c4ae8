//! Partitioner abstraction for the identifier ring.
//!
//! Partitioners are responsible for converting keys into identifiers
//! that can be placed on the ring.

pub mod raw;
pub mod sha256;
pub mod traits;

pub use raw::RawPartitioner;
pub use sha256::Sha256Partitioner;
pub use traits::Partitioner;
