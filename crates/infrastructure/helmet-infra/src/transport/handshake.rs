use futures::{SinkExt, StreamExt};
use helmet_core::{EndpointKind, Ready};
use tokio_util::codec::Framed;

use super::{BoxTransport, FramedEndpoint, JsonLinesCodec, MalformedFrame, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("malformed ready frame: {0}")]
    Malformed(#[from] MalformedFrame),
    #[error("connection closed before the endpoint reported ready")]
    Closed,
    #[error("expected the {expected} endpoint, but {found} connected")]
    RoleMismatch {
        expected: EndpointKind,
        found: EndpointKind,
    },
}

/// Endpoint side: report that the interface is loaded.
pub async fn announce<D>(
    framed: &mut FramedEndpoint<D>,
    role: EndpointKind,
) -> Result<(), TransportError> {
    framed.send(Ready::current(role)).await
}

/// Coordinator side: wait for the ready frame and check who sent it.
///
/// Bytes that arrive after the ready frame stay buffered in the returned connection.
pub async fn accept_ready<D>(
    io: BoxTransport,
    expected: EndpointKind,
) -> Result<(FramedEndpoint<D>, Ready), HandshakeError> {
    let mut framed = Framed::new(io, JsonLinesCodec::<Ready>::new());
    let ready = match framed.next().await {
        Some(Ok(Ok(ready))) => ready,
        Some(Ok(Err(bad))) => return Err(bad.into()),
        Some(Err(e)) => return Err(e.into()),
        None => return Err(HandshakeError::Closed),
    };

    if ready.role != expected {
        return Err(HandshakeError::RoleMismatch {
            expected,
            found: ready.role,
        });
    }

    Ok((framed.map_codec(|codec| codec.retarget()), ready))
}
