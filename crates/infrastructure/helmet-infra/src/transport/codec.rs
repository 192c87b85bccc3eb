use std::marker::PhantomData;

use bytes::BytesMut;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A line that could not be turned into a frame. The connection stays usable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedFrame {
    #[error("frame exceeds {0} bytes")]
    TooLong(usize),
    #[error("frame does not match the channel's message type: {0}")]
    Invalid(String),
}

/// One JSON document per line.
///
/// Decoding yields `Ok(Err(MalformedFrame))` for a bad line rather than failing the
/// stream, since a `Framed` stream stops after its first decode error.
pub struct JsonLinesCodec<D> {
    lines: LinesCodec,
    max_length: usize,
    _decode: PhantomData<fn() -> D>,
}

impl<D> JsonLinesCodec<D> {
    pub fn new() -> Self {
        Self::with_max_length(helmet_config::MAX_FRAME_BYTES)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(max_length),
            max_length,
            _decode: PhantomData,
        }
    }

    /// Same line state, different inbound message type.
    pub fn retarget<D2>(self) -> JsonLinesCodec<D2> {
        JsonLinesCodec {
            lines: self.lines,
            max_length: self.max_length,
            _decode: PhantomData,
        }
    }

    fn parse(&self, line: Option<String>) -> Option<Result<D, MalformedFrame>>
    where
        D: DeserializeOwned,
    {
        let line = line?;
        Some(serde_json::from_str(&line).map_err(|e| MalformedFrame::Invalid(e.to_string())))
    }
}

impl<D> Default for JsonLinesCodec<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DeserializeOwned> Decoder for JsonLinesCodec<D> {
    type Item = Result<D, MalformedFrame>;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.lines.decode(src) {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(line) => return Ok(self.parse(line)),
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    return Ok(Some(Err(MalformedFrame::TooLong(self.max_length))))
                }
                Err(LinesCodecError::Io(e)) => return Err(e.into()),
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.lines.decode_eof(src) {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(line) => return Ok(self.parse(line)),
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    return Ok(Some(Err(MalformedFrame::TooLong(self.max_length))))
                }
                Err(LinesCodecError::Io(e)) => return Err(e.into()),
            }
        }
    }
}

impl<D, T: Serialize> Encoder<T> for JsonLinesCodec<D> {
    type Error = TransportError;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = serde_json::to_string(&item)?;
        self.lines.encode(line, dst).map_err(|e| match e {
            LinesCodecError::Io(e) => TransportError::Io(e),
            LinesCodecError::MaxLineLengthExceeded => TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "frame exceeds maximum length",
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helmet_core::{ScenarioDescriptor, UiRequest, WorkerCommand};

    #[test]
    fn frames_split_across_reads_are_reassembled() {
        let mut codec = JsonLinesCodec::<WorkerCommand>::new();
        let mut buf = BytesMut::new();
        codec
            .encode(
                WorkerCommand::RunScenarios(vec![ScenarioDescriptor::named("a")]),
                &mut buf,
            )
            .unwrap();
        let tail = buf.split_off(10);

        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.unsplit(tail);
        let frame = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(
            frame,
            WorkerCommand::RunScenarios(vec![ScenarioDescriptor::named("a")])
        );
    }

    #[test]
    fn malformed_line_does_not_poison_following_frames() {
        let mut codec = JsonLinesCodec::<UiRequest>::new();
        let mut buf = BytesMut::from(&b"{\"channel\":\"reboot\"}\n\n{\"channel\":\"cancel-scenarios\"}\n"[..]);

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert!(matches!(first, Err(MalformedFrame::Invalid(_))));

        let second = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(second, UiRequest::CancelScenarios);
    }

    #[test]
    fn overlong_line_is_reported_and_skipped() {
        let mut codec = JsonLinesCodec::<UiRequest>::with_max_length(32);
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[b'x'; 64]);
        buf.extend_from_slice(b"\n{\"channel\":\"cancel-scenarios\"}\n");

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first, Err(MalformedFrame::TooLong(32)));

        let second = loop {
            if let Some(frame) = codec.decode(&mut buf).unwrap() {
                break frame;
            }
        };
        assert_eq!(second, Ok(UiRequest::CancelScenarios));
    }
}
