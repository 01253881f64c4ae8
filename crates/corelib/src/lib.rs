//! Core library for the Chord ring.
//!
//! This crate provides the fundamental abstractions shared by every node:
//! - Ring identifiers and their arithmetic
//! - Partitioners (hashing keys and endpoints onto the ring)
//! - Node addresses and finger tables
//! - A TTL-expiring map used by both storage layers
//! - Configuration

pub mod config;
pub mod error;
pub mod finger;
pub mod id;
pub mod node;
pub mod partitioner;
pub mod ttl;

pub use config::{Config, RingConfig, StoreConfig};
pub use error::{Error, Result};
pub use finger::FingerTable;
pub use id::{Identifier, DEFAULT_ID_BITS};
pub use node::{Endpoint, NodeAddress};
pub use partitioner::Partitioner;
pub use ttl::TtlMap;
