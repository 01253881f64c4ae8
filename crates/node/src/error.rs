//! Error types for ring nodes.

use rpc::RpcError;
use thiserror::Error;

use crate::node::NodeState;

/// Result type alias for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;

#[derive(Debug, Error)]
pub enum NodeError {
    /// A remote call made on behalf of this node failed.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Invalid(#[from] corelib::Error),

    /// Could not bind the serving endpoint.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The operation is not allowed in the node's current lifecycle state.
    #[error("node is {actual:?}, expected {expected:?}")]
    InvalidState { expected: NodeState, actual: NodeState },
}
