//! Framed, typed connections between the coordinator and its endpoints.

mod codec;
mod handshake;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

pub use codec::{JsonLinesCodec, MalformedFrame, TransportError};
pub use handshake::{accept_ready, announce, HandshakeError};

/// Anything a connection can run over: a TCP stream to a child process, or an
/// in-memory duplex pipe in tests.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin + 'static> Transport for T {}

pub type BoxTransport = Box<dyn Transport>;

/// A connection that decodes `D` and encodes any serializable frame.
pub type FramedEndpoint<D> = Framed<BoxTransport, JsonLinesCodec<D>>;

pub fn framed<D>(io: impl Transport) -> FramedEndpoint<D> {
    Framed::new(Box::new(io), JsonLinesCodec::new())
}
