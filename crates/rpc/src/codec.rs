//! Frame codec: 4-byte big-endian length prefix, `bincode` body.

use std::marker::PhantomData;

use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use crate::error::RpcError;
use crate::protocol::{Request, Response};

/// Largest frame either side accepts.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Encodes `Out` values and decodes `In` values.
pub struct RpcCodec<Out, In> {
    inner: LengthDelimitedCodec,
    _marker: PhantomData<fn(Out) -> In>,
}

/// Codec for the dialing side.
pub type ClientCodec = RpcCodec<Request, Response>;
/// Codec for the serving side.
pub type ServerCodec = RpcCodec<Response, Request>;

impl<Out, In> RpcCodec<Out, In> {
    pub fn new() -> Self {
        Self {
            inner: LengthDelimitedCodec::builder()
                .max_frame_length(MAX_FRAME_LEN)
                .new_codec(),
            _marker: PhantomData,
        }
    }
}

impl<Out, In> Default for RpcCodec<Out, In> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Out: Serialize, In> Encoder<Out> for RpcCodec<Out, In> {
    type Error = RpcError;

    fn encode(&mut self, item: Out, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = bincode::serialize(&item)?;
        self.inner.encode(Bytes::from(body), dst)?;
        Ok(())
    }
}

impl<Out, In: DeserializeOwned> Decoder for RpcCodec<Out, In> {
    type Item = In;
    type Error = RpcError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.inner.decode(src)? {
            Some(frame) => Ok(Some(bincode::deserialize(&frame)?)),
            None => Ok(None),
        }
    }
}
