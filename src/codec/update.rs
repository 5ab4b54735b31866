use bytes::{BufMut, BytesMut};
use std::net::Ipv4Addr;

use super::attribute::{self, Attribute};
use super::notification::{ProtocolError, UpdateSubcode};

/// A wire-compact IPv4 prefix: `length` significant bits, packed into the minimum number
/// of bytes, left-aligned with unused trailing bits zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Prefix {
    pub length: u8,
    bytes: [u8; 4],
}

impl Prefix {
    pub fn new(addr: Ipv4Addr, length: u8) -> Self {
        let mut bytes = addr.octets();
        mask_trailing_bits(&mut bytes, length);
        Prefix { length, bytes }
    }

    pub fn addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.bytes)
    }

    fn octet_count(&self) -> usize {
        (self.length as usize).div_ceil(8)
    }

    fn decode(cursor: &mut &[u8]) -> Result<Self, ProtocolError> {
        let err = || ProtocolError::update_message(UpdateSubcode::InvalidNetworkField);
        if cursor.is_empty() {
            return Err(err());
        }
        let length = cursor[0];
        *cursor = &cursor[1..];
        if length > 32 {
            return Err(err());
        }
        let octet_count = (length as usize).div_ceil(8);
        if cursor.len() < octet_count {
            return Err(err());
        }
        let mut bytes = [0u8; 4];
        bytes[..octet_count].copy_from_slice(&cursor[..octet_count]);
        *cursor = &cursor[octet_count..];
        mask_trailing_bits(&mut bytes, length);
        Ok(Prefix { length, bytes })
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.length);
        buf.put_slice(&self.bytes[..self.octet_count()]);
    }
}

fn mask_trailing_bits(bytes: &mut [u8; 4], length: u8) {
    if length >= 32 {
        return;
    }
    let full_bytes = (length / 8) as usize;
    let remaining_bits = length % 8;
    if remaining_bits > 0 {
        let mask = 0xffu8 << (8 - remaining_bits);
        bytes[full_bytes] &= mask;
    }
    for byte in bytes.iter_mut().skip(full_bytes + if remaining_bits > 0 { 1 } else { 0 }) {
        *byte = 0;
    }
}

fn decode_prefixes(mut buf: &[u8]) -> Result<Vec<Prefix>, ProtocolError> {
    let mut prefixes = Vec::new();
    while !buf.is_empty() {
        prefixes.push(Prefix::decode(&mut buf)?);
    }
    Ok(prefixes)
}

fn encode_prefixes(prefixes: &[Prefix], buf: &mut BytesMut) {
    for prefix in prefixes {
        prefix.encode(buf);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateMessage {
    pub withdrawn_routes: Vec<Prefix>,
    pub path_attributes: Vec<Attribute>,
    pub nlri: Vec<Prefix>,
}

impl UpdateMessage {
    pub fn decode(buf: &[u8], four_octets_asn: bool) -> Result<Self, ProtocolError> {
        let len_err = || ProtocolError::update_message(UpdateSubcode::MalformedAttributeList);
        if buf.len() < 2 {
            return Err(len_err());
        }
        let withdrawn_len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
        let mut offset = 2;
        if buf.len() < offset + withdrawn_len {
            return Err(len_err());
        }
        let withdrawn_routes = decode_prefixes(&buf[offset..offset + withdrawn_len])?;
        offset += withdrawn_len;

        if buf.len() < offset + 2 {
            return Err(len_err());
        }
        let attr_len = u16::from_be_bytes([buf[offset], buf[offset + 1]]) as usize;
        offset += 2;
        if buf.len() < offset + attr_len {
            return Err(len_err());
        }
        let path_attributes = attribute::decode_all(&buf[offset..offset + attr_len], four_octets_asn)?;
        offset += attr_len;

        let nlri = decode_prefixes(&buf[offset..])?;

        Ok(UpdateMessage {
            withdrawn_routes,
            path_attributes,
            nlri,
        })
    }

    pub fn encode(&self, four_octets_asn: bool, buf: &mut BytesMut) {
        let mut withdrawn = BytesMut::new();
        encode_prefixes(&self.withdrawn_routes, &mut withdrawn);
        buf.put_u16(withdrawn.len() as u16);
        buf.put_slice(&withdrawn);

        let mut attrs = BytesMut::new();
        attribute::encode_all(&self.path_attributes, four_octets_asn, &mut attrs);
        buf.put_u16(attrs.len() as u16);
        buf.put_slice(&attrs);

        encode_prefixes(&self.nlri, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::attribute::{AsPathSegment, Origin, SegmentKind};

    #[test]
    fn test_prefix_masks_trailing_bits() {
        let prefix = Prefix::new(Ipv4Addr::new(10, 1, 2, 255), 16);
        assert_eq!(prefix.addr(), Ipv4Addr::new(10, 1, 0, 0));
    }

    #[test]
    fn test_prefix_roundtrip() {
        let prefix = Prefix::new(Ipv4Addr::new(192, 168, 10, 0), 24);
        let mut buf = BytesMut::new();
        prefix.encode(&mut buf);
        assert_eq!(buf.len(), 4);
        let mut cursor = &buf[..];
        let decoded = Prefix::decode(&mut cursor).unwrap();
        assert_eq!(decoded, prefix);
    }

    #[test]
    fn test_update_roundtrip() {
        let update = UpdateMessage {
            withdrawn_routes: vec![Prefix::new(Ipv4Addr::new(10, 0, 0, 0), 8)],
            path_attributes: vec![
                Attribute::Origin(Origin::Igp),
                Attribute::AsPath(vec![AsPathSegment {
                    kind: SegmentKind::AsSequence,
                    asns: vec![65000],
                }]),
                Attribute::NextHop(Ipv4Addr::new(10, 0, 0, 1)),
            ],
            nlri: vec![Prefix::new(Ipv4Addr::new(192, 168, 1, 0), 24)],
        };
        let mut buf = BytesMut::new();
        update.encode(false, &mut buf);
        let decoded = UpdateMessage::decode(&buf, false).unwrap();
        assert_eq!(decoded, update);
    }

    #[test]
    fn test_update_truncated_errors() {
        let buf = [0u8, 5, 1, 2, 3];
        assert!(UpdateMessage::decode(&buf, false).is_err());
    }
}
