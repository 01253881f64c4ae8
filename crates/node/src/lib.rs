//! Chord ring node.
//!
//! A [`ChordNode`] owns a finger table, an optional predecessor and a
//! received-object store. It answers the ring RPCs of its peers and keeps its
//! routing state correct with a periodic maintenance cycle (stabilize,
//! fix-fingers, check-predecessor).

pub mod error;
pub mod maintenance;
pub mod node;
pub mod store;

pub use error::{NodeError, Result};
pub use node::{ChordNode, NodeState};
pub use store::ObjectStore;
