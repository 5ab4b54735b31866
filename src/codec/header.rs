use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use bytes::{Buf, BufMut, BytesMut};

use super::notification::{HeaderSubcode, ProtocolError};

/// All-ones 16-octet marker that opens every BGP message.
pub const MARKER: [u8; 16] = [0xff; 16];
pub const HEADER_LEN: usize = 19;
pub const MIN_MESSAGE_LEN: usize = 19;
pub const MAX_MESSAGE_LEN: usize = 4096;
pub const MAX_EXTENDED_MESSAGE_LEN: usize = 65535;

pub const TYPE_OPEN: u8 = 1;
pub const TYPE_UPDATE: u8 = 2;
pub const TYPE_NOTIFICATION: u8 = 3;
pub const TYPE_KEEPALIVE: u8 = 4;
pub const TYPE_ROUTE_REFRESH: u8 = 5;

pub struct Header {
    pub length: u16,
    pub message_type: u8,
}

fn max_len(extended_message: bool) -> usize {
    if extended_message {
        MAX_EXTENDED_MESSAGE_LEN
    } else {
        MAX_MESSAGE_LEN
    }
}

/// Find and validate the next frame header in `buf` without consuming anything.
/// Returns `Ok(None)` when the buffer doesn't yet hold a full header.
pub fn peek_header(buf: &[u8], extended_message: bool) -> Result<Option<Header>, ProtocolError> {
    if buf.len() < HEADER_LEN {
        return Ok(None);
    }
    if buf[..16] != MARKER {
        return Err(ProtocolError::message_header(
            HeaderSubcode::ConnectionNotSynchronized,
        ));
    }
    let mut length_bytes = &buf[16..18];
    let length = length_bytes.read_u16::<NetworkEndian>().unwrap();
    let message_type = buf[18];

    if (length as usize) < MIN_MESSAGE_LEN || (length as usize) > max_len(extended_message) {
        return Err(ProtocolError::message_header_with_data(
            HeaderSubcode::BadMessageLength,
            length.to_be_bytes().to_vec(),
        ));
    }
    if !(TYPE_OPEN..=TYPE_ROUTE_REFRESH).contains(&message_type) {
        return Err(ProtocolError::message_header_with_data(
            HeaderSubcode::BadMessageType,
            vec![message_type],
        ));
    }
    Ok(Some(Header {
        length,
        message_type,
    }))
}

/// Given a complete buffer, consume a frame if present, yielding `(message_type, body_bytes)`.
/// `body_bytes` holds everything after the 19-byte header. Never copies unparsed tail bytes.
pub fn decode_frame(
    buf: &mut BytesMut,
    extended_message: bool,
) -> Result<Option<(u8, BytesMut)>, ProtocolError> {
    let header = match peek_header(buf, extended_message)? {
        Some(header) => header,
        None => return Ok(None),
    };
    let total_len = header.length as usize;
    if buf.len() < total_len {
        return Ok(None);
    }
    let mut frame = buf.split_to(total_len);
    frame.advance(HEADER_LEN);
    Ok(Some((header.message_type, frame)))
}

/// Wrap an encoded message body with the marker/length/type header.
pub fn encode_frame(message_type: u8, body: &[u8], buf: &mut BytesMut) {
    let total_len = (HEADER_LEN + body.len()) as u16;
    buf.reserve(total_len as usize);
    buf.put_slice(&MARKER);
    let mut length_bytes = [0u8; 2];
    (&mut length_bytes[..])
        .write_u16::<NetworkEndian>(total_len)
        .unwrap();
    buf.put_slice(&length_bytes);
    buf.put_u8(message_type);
    buf.put_slice(body);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(message_type: u8, body: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_frame(message_type, body, &mut buf);
        buf
    }

    #[test]
    fn test_decode_frame_roundtrip() {
        let mut buf = frame(TYPE_KEEPALIVE, &[]);
        let (message_type, body) = decode_frame(&mut buf, false).unwrap().unwrap();
        assert_eq!(message_type, TYPE_KEEPALIVE);
        assert!(body.is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_frame_incomplete() {
        let mut buf = frame(TYPE_UPDATE, &[1, 2, 3]);
        buf.truncate(buf.len() - 1);
        assert!(decode_frame(&mut buf, false).unwrap().is_none());
    }

    #[test]
    fn test_decode_frame_bad_marker() {
        let mut buf = BytesMut::from(&[0u8; 32][..]);
        assert!(decode_frame(&mut buf, false).is_err());
    }

    #[test]
    fn test_decode_frame_bad_length() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MARKER);
        buf.put_u16(18);
        buf.put_u8(TYPE_KEEPALIVE);
        assert!(decode_frame(&mut buf, false).is_err());
    }

    #[test]
    fn test_decode_frame_bad_type() {
        let mut buf = frame(9, &[]);
        assert!(decode_frame(&mut buf, false).is_err());
    }

    #[test]
    fn test_extended_message_length() {
        let body = vec![0u8; 5000];
        let mut buf = frame(TYPE_UPDATE, &body);
        assert!(decode_frame(&mut buf.clone(), false).is_err());
        let (message_type, decoded_body) = decode_frame(&mut buf, true).unwrap().unwrap();
        assert_eq!(message_type, TYPE_UPDATE);
        assert_eq!(decoded_body.len(), 5000);
    }
}
