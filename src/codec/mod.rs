//! Pure byte-stream <-> typed-message mapping for the BGP-4 wire protocol.
//!
//! Framing, OPEN/capability negotiation, and UPDATE/path-attribute encoding all live here as
//! plain functions over byte slices; the only stateful piece is `MessageCodec`, a thin
//! `tokio_util::codec::{Decoder, Encoder}` adapter so a `Session` can drive it via `Framed`.

pub mod attribute;
pub mod header;
pub mod message;
pub mod notification;
pub mod open;
pub mod update;

pub use attribute::{AsPathSegment, Attribute, Community, MpReach, MpUnreach, Origin, SegmentKind};
pub use message::Message;
pub use notification::{CeaseSubcode, FsmSubcode, HeaderSubcode, NotificationMessage, OpenSubcode, ProtocolError, UpdateSubcode};
pub use open::{Capability, GracefulRestartAf, OpenMessage, AS_TRANS};
pub use update::{Prefix, UpdateMessage};

use bytes::BytesMut;
use std::io;
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder, Framed};

pub type MessageProtocol = Framed<TcpStream, MessageCodec>;

/// Wraps decode/encode errors in the `io::Error` shape `tokio_util::codec` requires, while
/// keeping the original `ProtocolError` reachable for the Session to turn into a NOTIFICATION.
#[derive(Debug)]
pub struct CodecError(pub ProtocolError);

impl From<CodecError> for io::Error {
    fn from(err: CodecError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, err.0.to_string())
    }
}

impl From<io::Error> for CodecError {
    fn from(err: io::Error) -> Self {
        CodecError(ProtocolError::new(1, 1, err.to_string().into_bytes()))
    }
}

/// `Decoder`/`Encoder` adapter driving the streaming codec over a `Framed<TcpStream, _>`.
/// `four_octets_asn`/`extended_message` are updated by the Session once OPEN negotiation
/// completes, since attribute/frame-length rules change after that point.
#[derive(Debug, Default)]
pub struct MessageCodec {
    pub four_octets_asn: bool,
    pub extended_message: bool,
}

impl MessageCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match header::decode_frame(buf, self.extended_message) {
            Ok(Some((message_type, body))) => {
                let message = Message::decode(message_type, &body, self.four_octets_asn)
                    .map_err(CodecError)?;
                Ok(Some(message))
            }
            Ok(None) => Ok(None),
            Err(err) => Err(CodecError(err).into()),
        }
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = io::Error;

    fn encode(&mut self, message: Message, buf: &mut BytesMut) -> Result<(), Self::Error> {
        message.encode(self.four_octets_asn, self.extended_message, buf);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_yields_frame() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::new();
        Message::Keepalive.encode(false, false, &mut buf);
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, Message::Keepalive);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decoder_waits_for_full_frame() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::new();
        Message::Keepalive.encode(false, false, &mut buf);
        buf.truncate(buf.len() - 1);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_encoder_then_decoder_roundtrip() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::new();
        let message = Message::RouteRefresh { afi: 1, safi: 1 };
        codec.encode(message.clone(), &mut buf).unwrap();
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, message);
    }
}
