//! Error types for the data store.

use corelib::Identifier;
use rpc::RpcError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Publishing one placement of a key failed.
    #[error("failed to publish {id}: {source}")]
    Publish {
        id: Identifier,
        #[source]
        source: RpcError,
    },

    /// The store was configured with an unusable setting.
    #[error(transparent)]
    Config(#[from] corelib::Error),
}
