//! RPC layer between ring nodes.
//!
//! This crate provides the protocol and transport for remote ring calls:
//! - Wire messages for the eight ring operations
//! - A length-delimited `bincode` codec
//! - Per-endpoint clients cached in an explicit [`ClientPool`]
//! - A TCP server dispatching calls to a [`RingService`]

pub mod client;
pub mod codec;
pub mod error;
pub mod pool;
pub mod protocol;
pub mod server;

pub use client::Client;
pub use error::{Result, RpcError};
pub use pool::ClientPool;
pub use protocol::{Request, Response, WireAddress, WireItem};
pub use server::{serve, RingService};
