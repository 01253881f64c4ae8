//! Replication strategy abstractions.
//!
//! A strategy decides how many copies of a key are written and at which ring
//! positions. The ring itself then decides which node owns each position.
//!
//! - **SaltedStrategy**: copy `i` sits at the hash of `key#i`

pub mod salted;

pub use salted::SaltedStrategy;

use corelib::Identifier;

/// Trait for replication strategies.
///
/// # Thread Safety
///
/// Implementations must be thread-safe (Send + Sync) as they are shared by
/// every caller of a data store.
pub trait ReplicationStrategy: Send + Sync + 'static {
    /// Number of copies written per key.
    fn replication_factor(&self) -> usize;

    /// Ring positions of every copy of `key`, primary first.
    ///
    /// Must return exactly `replication_factor()` identifiers and be
    /// deterministic, so that readers find what writers placed.
    fn replica_ids(&self, key: &str) -> Vec<Identifier>;

    /// Get the strategy name (for logging/debugging).
    fn name(&self) -> &'static str;
}
