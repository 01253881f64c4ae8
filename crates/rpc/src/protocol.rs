//! Wire messages.
//!
//! | Call | Request | Response |
//! |---|---|---|
//! | `Pred` | none | address or missing sentinel |
//! | `Notify` | address | ack |
//! | `FindSuccessor` | identifier | address |
//! | `Succ` | none | address |
//! | `ClosestPrecedingFinger` | identifier | address |
//! | `Put` | identifier, bytes | ack |
//! | `Get` | identifier | success flag + bytes |
//! | `Transfer` | list of (identifier, bytes) | ack |
//!
//! A handler failure is answered with [`Response::Error`].

use bytes::Bytes;
use corelib::{Identifier, NodeAddress};
use serde::{Deserialize, Serialize};

/// Node address as it travels on the wire.
///
/// `missing` marks "no address" (e.g. a node without a predecessor); such a
/// value cannot be turned into a [`NodeAddress`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireAddress {
    pub host: String,
    pub port: u16,
    pub id: Identifier,
    pub missing: bool,
}

impl WireAddress {
    /// The "no address" sentinel.
    pub fn missing() -> Self {
        Self {
            host: String::new(),
            port: 0,
            id: Identifier::zero(0),
            missing: true,
        }
    }
}

impl From<&NodeAddress> for WireAddress {
    fn from(addr: &NodeAddress) -> Self {
        Self {
            host: addr.host.clone(),
            port: addr.port,
            id: addr.id.clone(),
            missing: false,
        }
    }
}

impl From<Option<&NodeAddress>> for WireAddress {
    fn from(addr: Option<&NodeAddress>) -> Self {
        addr.map_or_else(WireAddress::missing, WireAddress::from)
    }
}

impl TryFrom<WireAddress> for NodeAddress {
    type Error = corelib::Error;

    fn try_from(wire: WireAddress) -> Result<Self, Self::Error> {
        if wire.missing {
            return Err(corelib::Error::InvalidArgument(
                "address was marked as missing, cannot build a node address".into(),
            ));
        }
        Ok(NodeAddress::new(wire.host, wire.port, wire.id))
    }
}

/// One stored object in a `Transfer` batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireItem {
    pub id: Identifier,
    pub content: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    Pred,
    Notify(WireAddress),
    FindSuccessor(Identifier),
    Succ,
    ClosestPrecedingFinger(Identifier),
    Put { id: Identifier, content: Bytes },
    Get(Identifier),
    Transfer(Vec<WireItem>),
}

impl Request {
    /// Call name, for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Request::Pred => "Pred",
            Request::Notify(_) => "Notify",
            Request::FindSuccessor(_) => "FindSuccessor",
            Request::Succ => "Succ",
            Request::ClosestPrecedingFinger(_) => "ClosestPrecedingFinger",
            Request::Put { .. } => "Put",
            Request::Get(_) => "Get",
            Request::Transfer(_) => "Transfer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Address(WireAddress),
    Ack,
    Get { success: bool, content: Bytes },
    Error(String),
}

impl Response {
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Address(_) => "Address",
            Response::Ack => "Ack",
            Response::Get { .. } => "Get",
            Response::Error(_) => "Error",
        }
    }
}
