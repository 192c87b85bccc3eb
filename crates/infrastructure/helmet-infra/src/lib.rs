pub mod discovery;
pub mod engine;
pub mod transport;

// Re-exports for convenience
pub use discovery::{DiscoveryError, EmmePythonLocator};
pub use engine::{run_engine, EngineCommand, EngineError, EngineOutput};
pub use transport::{
    accept_ready, announce, framed, BoxTransport, FramedEndpoint, HandshakeError, JsonLinesCodec,
    MalformedFrame, Transport, TransportError,
};
