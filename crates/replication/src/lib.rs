//! Replicated key-value store on top of the Chord ring.
//!
//! This crate provides the application-facing side of the ring:
//! - Replication strategies deciding where the copies of a key sit
//! - A [`DataStore`] that publishes values, keeps them alive by
//!   re-publishing before the ring forgets them, and reads them back

pub mod error;
pub mod store;
pub mod strategy;

pub use error::{Result, StoreError};
pub use store::DataStore;
pub use strategy::{ReplicationStrategy, SaltedStrategy};
