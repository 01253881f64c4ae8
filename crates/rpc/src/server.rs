//! Serving side of the ring RPC.
//!
//! [`serve`] accepts connections on a bound listener and runs one task per
//! connection. Each task reads requests in order, dispatches them to a
//! [`RingService`] and writes back the response. A handler error becomes
//! [`Response::Error`]; the connection stays open.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use corelib::{Identifier, NodeAddress};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::codec::ServerCodec;
use crate::protocol::{Request, Response, WireAddress};

/// Ring operations a node exposes to its peers.
#[async_trait]
pub trait RingService: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn get_predecessor(&self) -> Result<Option<NodeAddress>, Self::Error>;
    async fn get_successor(&self) -> Result<NodeAddress, Self::Error>;
    async fn notify(&self, candidate: NodeAddress) -> Result<(), Self::Error>;
    async fn find_successor(&self, target: Identifier) -> Result<NodeAddress, Self::Error>;
    async fn closest_preceding_finger(
        &self,
        target: Identifier,
    ) -> Result<NodeAddress, Self::Error>;
    async fn put(&self, id: Identifier, content: Bytes) -> Result<(), Self::Error>;
    async fn get(&self, id: Identifier) -> Result<Option<Bytes>, Self::Error>;
    async fn transfer(&self, items: Vec<(Identifier, Bytes)>) -> Result<(), Self::Error>;
}

/// Accept connections until `cancel` fires.
pub async fn serve<S: RingService>(
    listener: TcpListener,
    service: Arc<S>,
    cancel: CancellationToken,
) {
    let local = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".into());
    info!(addr = %local, "RPC server listening");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    trace!(%peer, "accepted connection");
                    let service = Arc::clone(&service);
                    let cancel = cancel.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, service, cancel).await;
                    });
                }
                Err(e) => warn!(addr = %local, error = %e, "accept failed"),
            },
        }
    }

    info!(addr = %local, "RPC server stopped");
}

async fn handle_connection<S: RingService>(
    stream: TcpStream,
    service: Arc<S>,
    cancel: CancellationToken,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(error = %e, "set_nodelay failed");
    }
    let mut framed = Framed::new(stream, ServerCodec::new());

    loop {
        let request = tokio::select! {
            _ = cancel.cancelled() => return,
            next = framed.next() => match next {
                Some(Ok(request)) => request,
                Some(Err(e)) => {
                    debug!(error = %e, "dropping connection on bad frame");
                    return;
                }
                None => return,
            },
        };

        let call = request.name();
        let response = dispatch(service.as_ref(), request).await;
        if let Response::Error(message) = &response {
            debug!(call, %message, "handler failed");
        }
        if let Err(e) = framed.send(response).await {
            debug!(call, error = %e, "failed to write response");
            return;
        }
    }
}

/// Run one request against `service`.
pub async fn dispatch<S: RingService + ?Sized>(service: &S, request: Request) -> Response {
    let outcome = match request {
        Request::Pred => service
            .get_predecessor()
            .await
            .map(|pred| Response::Address(WireAddress::from(pred.as_ref()))),
        Request::Succ => service
            .get_successor()
            .await
            .map(|succ| Response::Address(WireAddress::from(&succ))),
        Request::Notify(wire) => match NodeAddress::try_from(wire) {
            Ok(candidate) => service.notify(candidate).await.map(|()| Response::Ack),
            Err(e) => return Response::Error(e.to_string()),
        },
        Request::FindSuccessor(target) => service
            .find_successor(target)
            .await
            .map(|addr| Response::Address(WireAddress::from(&addr))),
        Request::ClosestPrecedingFinger(target) => service
            .closest_preceding_finger(target)
            .await
            .map(|addr| Response::Address(WireAddress::from(&addr))),
        Request::Put { id, content } => service.put(id, content).await.map(|()| Response::Ack),
        Request::Get(id) => service.get(id).await.map(|found| match found {
            Some(content) => Response::Get {
                success: true,
                content,
            },
            None => Response::Get {
                success: false,
                content: Bytes::new(),
            },
        }),
        Request::Transfer(items) => {
            let items = items.into_iter().map(|item| (item.id, item.content)).collect();
            service.transfer(items).await.map(|()| Response::Ack)
        }
    };

    outcome.unwrap_or_else(|e| Response::Error(e.to_string()))
}
