use std::time::Duration;

use helmet_core::EndpointKind;
use helmet_infra::HandshakeError;

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("failed to launch the {endpoint} endpoint: {source}")]
    Launch {
        endpoint: EndpointKind,
        #[source]
        source: std::io::Error,
    },
    #[error("the {endpoint} endpoint did not become ready: {source}")]
    Handshake {
        endpoint: EndpointKind,
        #[source]
        source: HandshakeError,
    },
    #[error("the {endpoint} endpoint did not report ready within {timeout:?}")]
    Timeout {
        endpoint: EndpointKind,
        timeout: Duration,
    },
}

impl CoordinatorError {
    pub fn endpoint(&self) -> EndpointKind {
        match self {
            CoordinatorError::Launch { endpoint, .. }
            | CoordinatorError::Handshake { endpoint, .. }
            | CoordinatorError::Timeout { endpoint, .. } => *endpoint,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("no live {endpoint} endpoint to deliver {channel} to")]
    EndpointUnavailable {
        endpoint: EndpointKind,
        channel: &'static str,
    },
}
