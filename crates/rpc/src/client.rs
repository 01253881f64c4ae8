//! Client bound to one remote node.
//!
//! A [`Client`] keeps a few idle connections to its peer and checks one out
//! per call. Lookups can re-enter a node through a chain of hops, so calls to
//! the same peer must never queue behind each other on a single connection.
//!
//! There is no retry here: a failed call surfaces as an [`RpcError`] and the
//! connection it ran on is dropped.
//!
//! Addresses in replies must carry identifiers of the ring's width; anything
//! else is rejected as [`RpcError::Invalid`].

use std::time::Duration;

use bytes::Bytes;
use corelib::{Identifier, NodeAddress};
use futures::{SinkExt, StreamExt};
use metrics::counter;
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::trace;

use crate::codec::ClientCodec;
use crate::error::{Result, RpcError};
use crate::protocol::{Request, Response, WireAddress, WireItem};

/// Idle connections kept per peer.
const MAX_IDLE_CONNECTIONS: usize = 4;

type Connection = Framed<TcpStream, ClientCodec>;

pub struct Client {
    host: String,
    port: u16,
    peer: String,
    call_timeout: Duration,
    id_bits: usize,
    idle: Mutex<Vec<Connection>>,
}

impl Client {
    /// A client for the peer at `host:port` on an `id_bits`-bit ring.
    pub fn new(host: impl Into<String>, port: u16, call_timeout: Duration, id_bits: usize) -> Self {
        let host = host.into();
        let peer = format!("{}:{}", host, port);
        Self {
            host,
            port,
            peer,
            call_timeout,
            id_bits,
            idle: Mutex::new(Vec::new()),
        }
    }

    /// `host:port` of the peer.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Ask the peer for its predecessor.
    pub async fn get_predecessor(&self) -> Result<Option<NodeAddress>> {
        match self.call(Request::Pred).await? {
            Response::Address(wire) if wire.missing => Ok(None),
            Response::Address(wire) => Ok(Some(self.address(wire)?)),
            other => Err(unexpected("Pred", &other)),
        }
    }

    /// Ask the peer for its successor (finger table row 0).
    pub async fn get_successor(&self) -> Result<NodeAddress> {
        self.address_call(Request::Succ).await
    }

    /// Tell the peer that `candidate` may be its predecessor.
    pub async fn notify(&self, candidate: &NodeAddress) -> Result<()> {
        self.ack_call(Request::Notify(WireAddress::from(candidate))).await
    }

    /// Have the peer resolve the node responsible for `target`.
    pub async fn find_successor(&self, target: &Identifier) -> Result<NodeAddress> {
        self.address_call(Request::FindSuccessor(target.clone())).await
    }

    pub async fn closest_preceding_finger(&self, target: &Identifier) -> Result<NodeAddress> {
        self.address_call(Request::ClosestPrecedingFinger(target.clone()))
            .await
    }

    /// Store `content` under `id` on the peer.
    pub async fn put(&self, id: &Identifier, content: Bytes) -> Result<()> {
        self.ack_call(Request::Put {
            id: id.clone(),
            content,
        })
        .await
    }

    /// Fetch the object stored under `id` on the peer, if it holds one.
    pub async fn get(&self, id: &Identifier) -> Result<Option<Bytes>> {
        match self.call(Request::Get(id.clone())).await? {
            Response::Get { success: true, content } => Ok(Some(content)),
            Response::Get { success: false, .. } => Ok(None),
            other => Err(unexpected("Get", &other)),
        }
    }

    /// Hand a batch of objects to the peer.
    pub async fn transfer(&self, items: Vec<(Identifier, Bytes)>) -> Result<()> {
        let items = items
            .into_iter()
            .map(|(id, content)| WireItem { id, content })
            .collect();
        self.ack_call(Request::Transfer(items)).await
    }

    async fn address_call(&self, request: Request) -> Result<NodeAddress> {
        let call = request.name();
        match self.call(request).await? {
            Response::Address(wire) => self.address(wire),
            other => Err(unexpected(call, &other)),
        }
    }

    fn address(&self, wire: WireAddress) -> Result<NodeAddress> {
        let address = NodeAddress::try_from(wire)?;
        address.id.check_width(self.id_bits)?;
        Ok(address)
    }

    async fn ack_call(&self, request: Request) -> Result<()> {
        let call = request.name();
        match self.call(request).await? {
            Response::Ack => Ok(()),
            other => Err(unexpected(call, &other)),
        }
    }

    /// One request/response exchange, bounded by the call timeout.
    pub async fn call(&self, request: Request) -> Result<Response> {
        let call = request.name();
        counter!("chord_rpc_calls_total", "call" => call).increment(1);
        trace!(peer = %self.peer, call, "rpc call");

        let outcome = match timeout(self.call_timeout, self.round_trip(request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(RpcError::Timeout {
                peer: self.peer.clone(),
                call,
                after: self.call_timeout,
            }),
        };
        if outcome.is_err() {
            counter!("chord_rpc_failures_total", "call" => call).increment(1);
        }

        match outcome? {
            Response::Error(message) => Err(RpcError::Remote {
                peer: self.peer.clone(),
                call,
                message,
            }),
            response => Ok(response),
        }
    }

    async fn round_trip(&self, request: Request) -> Result<Response> {
        let mut conn = match self.checkout() {
            Some(conn) => conn,
            None => self.connect().await?,
        };
        conn.send(request).await?;
        let response = match conn.next().await {
            Some(response) => response?,
            None => {
                return Err(RpcError::Closed {
                    peer: self.peer.clone(),
                })
            }
        };
        self.checkin(conn);
        Ok(response)
    }

    async fn connect(&self) -> Result<Connection> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| RpcError::Unreachable {
                peer: self.peer.clone(),
                reason: e.to_string(),
            })?;
        stream.set_nodelay(true)?;
        Ok(Framed::new(stream, ClientCodec::new()))
    }

    fn checkout(&self) -> Option<Connection> {
        self.idle.lock().pop()
    }

    fn checkin(&self, conn: Connection) {
        let mut idle = self.idle.lock();
        if idle.len() < MAX_IDLE_CONNECTIONS {
            idle.push(conn);
        }
    }
}

fn unexpected(call: &'static str, got: &Response) -> RpcError {
    RpcError::UnexpectedResponse {
        call,
        got: got.kind().to_string(),
    }
}
