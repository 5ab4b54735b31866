use byteorder::{NetworkEndian, ReadBytesExt};
use bytes::{BufMut, BytesMut};
use std::convert::TryInto;
use std::io::Read;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::notification::{ProtocolError, UpdateSubcode};
use super::open::AS_TRANS;

const FLAG_OPTIONAL: u8 = 0x80;
const FLAG_TRANSITIVE: u8 = 0x40;
const FLAG_PARTIAL: u8 = 0x20;
const FLAG_EXTENDED_LENGTH: u8 = 0x10;

pub const TYPE_ORIGIN: u8 = 1;
pub const TYPE_AS_PATH: u8 = 2;
pub const TYPE_NEXT_HOP: u8 = 3;
pub const TYPE_MULTI_EXIT_DISC: u8 = 4;
pub const TYPE_LOCAL_PREF: u8 = 5;
pub const TYPE_ATOMIC_AGGREGATE: u8 = 6;
pub const TYPE_AGGREGATOR: u8 = 7;
pub const TYPE_COMMUNITIES: u8 = 8;
pub const TYPE_ORIGINATOR_ID: u8 = 9;
pub const TYPE_CLUSTER_LIST: u8 = 10;
pub const TYPE_MP_REACH_NLRI: u8 = 14;
pub const TYPE_MP_UNREACH_NLRI: u8 = 15;
pub const TYPE_EXTENDED_COMMUNITIES: u8 = 16;
pub const TYPE_AS4_PATH: u8 = 17;
pub const TYPE_AS4_AGGREGATOR: u8 = 18;
pub const TYPE_IPV6_EXTENDED_COMMUNITIES: u8 = 25;
pub const TYPE_LARGE_COMMUNITIES: u8 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Origin {
    Igp = 0,
    Egp = 1,
    Incomplete = 2,
}

impl Origin {
    fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        match value {
            0 => Ok(Origin::Igp),
            1 => Ok(Origin::Egp),
            2 => Ok(Origin::Incomplete),
            _ => Err(ProtocolError::update_message(
                UpdateSubcode::InvalidOriginAttribute,
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    AsSet = 1,
    AsSequence = 2,
    AsConfedSequence = 3,
    AsConfedSet = 4,
}

impl SegmentKind {
    fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        match value {
            1 => Ok(SegmentKind::AsSet),
            2 => Ok(SegmentKind::AsSequence),
            3 => Ok(SegmentKind::AsConfedSequence),
            4 => Ok(SegmentKind::AsConfedSet),
            _ => Err(ProtocolError::update_message(UpdateSubcode::MalformedAspath)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsPathSegment {
    pub kind: SegmentKind,
    pub asns: Vec<u32>,
}

/// A decoded community, with well-known reservations tagged symbolically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Community {
    NoExport,
    NoAdvertise,
    NoExportSubconfed,
    GracefulShutdown,
    NoPeer,
    Value(u32),
}

const NO_EXPORT: u32 = 0xFFFF_FF01;
const NO_ADVERTISE: u32 = 0xFFFF_FF02;
const NO_EXPORT_SUBCONFED: u32 = 0xFFFF_FF03;
const GRACEFUL_SHUTDOWN: u32 = 0xFFFF_0000;
const NO_PEER: u32 = 0xFFFF_FF04;

impl Community {
    pub fn from_u32(value: u32) -> Self {
        match value {
            NO_EXPORT => Community::NoExport,
            NO_ADVERTISE => Community::NoAdvertise,
            NO_EXPORT_SUBCONFED => Community::NoExportSubconfed,
            GRACEFUL_SHUTDOWN => Community::GracefulShutdown,
            NO_PEER => Community::NoPeer,
            other => Community::Value(other),
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            Community::NoExport => NO_EXPORT,
            Community::NoAdvertise => NO_ADVERTISE,
            Community::NoExportSubconfed => NO_EXPORT_SUBCONFED,
            Community::GracefulShutdown => GRACEFUL_SHUTDOWN,
            Community::NoPeer => NO_PEER,
            Community::Value(value) => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpReach {
    pub afi: u16,
    pub safi: u8,
    pub next_hop: Vec<u8>,
    pub nlri: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpUnreach {
    pub afi: u16,
    pub safi: u8,
    pub withdrawn: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    Origin(Origin),
    AsPath(Vec<AsPathSegment>),
    NextHop(Ipv4Addr),
    MultiExitDisc(u32),
    LocalPref(u32),
    AtomicAggregate,
    Aggregator { asn: u32, address: Ipv4Addr },
    Communities(Vec<Community>),
    OriginatorId(Ipv4Addr),
    ClusterList(Vec<Ipv4Addr>),
    MpReachNlri(MpReach),
    MpUnreachNlri(MpUnreach),
    ExtendedCommunities(Vec<u64>),
    As4Path(Vec<AsPathSegment>),
    As4Aggregator { asn: u32, address: Ipv4Addr },
    Ipv6ExtendedCommunities(Vec<u64>),
    LargeCommunities(Vec<(u32, u32, u32)>),
    /// Preserved verbatim for a type this codec doesn't structurally model.
    Unknown { attr_type: u8, value: Vec<u8> },
}

struct FlagPolicy {
    optional: bool,
    transitive: bool,
    /// `None` means the partial bit is not constrained (well-known attributes require 0,
    /// optional-transitive attributes may legitimately carry either value once a partial
    /// path is summarized by an intermediate AS, so only well-known mandatory is checked).
    partial: Option<bool>,
}

fn flag_policy(attr_type: u8) -> Option<FlagPolicy> {
    match attr_type {
        TYPE_ORIGIN | TYPE_AS_PATH | TYPE_NEXT_HOP => Some(FlagPolicy {
            optional: false,
            transitive: true,
            partial: Some(false),
        }),
        TYPE_MULTI_EXIT_DISC => Some(FlagPolicy {
            optional: true,
            transitive: false,
            partial: Some(false),
        }),
        TYPE_LOCAL_PREF | TYPE_ATOMIC_AGGREGATE => Some(FlagPolicy {
            optional: false,
            transitive: true,
            partial: None,
        }),
        TYPE_AGGREGATOR
        | TYPE_COMMUNITIES
        | TYPE_ORIGINATOR_ID
        | TYPE_CLUSTER_LIST
        | TYPE_EXTENDED_COMMUNITIES
        | TYPE_AS4_PATH
        | TYPE_AS4_AGGREGATOR
        | TYPE_IPV6_EXTENDED_COMMUNITIES
        | TYPE_LARGE_COMMUNITIES => Some(FlagPolicy {
            optional: true,
            transitive: true,
            partial: None,
        }),
        TYPE_MP_REACH_NLRI | TYPE_MP_UNREACH_NLRI => Some(FlagPolicy {
            optional: true,
            transitive: false,
            partial: Some(false),
        }),
        _ => None,
    }
}

fn check_flags(attr_type: u8, flags: u8) -> Result<(), ProtocolError> {
    let policy = match flag_policy(attr_type) {
        Some(policy) => policy,
        None => return Ok(()),
    };
    let optional = flags & FLAG_OPTIONAL != 0;
    let transitive = flags & FLAG_TRANSITIVE != 0;
    let partial = flags & FLAG_PARTIAL != 0;
    let ok = optional == policy.optional
        && transitive == policy.transitive
        && policy.partial.is_none_or(|expected| expected == partial);
    if ok {
        Ok(())
    } else {
        Err(ProtocolError::update_message_with_data(
            UpdateSubcode::AttributeFlagsError,
            vec![flags, attr_type],
        ))
    }
}

fn encode_flags(attr_type: u8, extended_length: bool) -> u8 {
    let policy = flag_policy(attr_type).unwrap_or(FlagPolicy {
        optional: true,
        transitive: true,
        partial: None,
    });
    let mut flags = 0u8;
    if policy.optional {
        flags |= FLAG_OPTIONAL;
    }
    if policy.transitive {
        flags |= FLAG_TRANSITIVE;
    }
    if extended_length {
        flags |= FLAG_EXTENDED_LENGTH;
    }
    flags
}

fn asn_width(four_octets_asn: bool) -> usize {
    if four_octets_asn {
        4
    } else {
        2
    }
}

fn read_asn(cursor: &mut &[u8], four_octets_asn: bool) -> Result<u32, ProtocolError> {
    let err = || ProtocolError::update_message(UpdateSubcode::MalformedAspath);
    if four_octets_asn {
        cursor.read_u32::<NetworkEndian>().map_err(|_| err())
    } else {
        cursor
            .read_u16::<NetworkEndian>()
            .map(u32::from)
            .map_err(|_| err())
    }
}

fn decode_as_path(value: &[u8], four_octets_asn: bool) -> Result<Vec<AsPathSegment>, ProtocolError> {
    let err = || ProtocolError::update_message(UpdateSubcode::MalformedAspath);
    let mut cursor = value;
    let mut segments = Vec::new();
    while !cursor.is_empty() {
        let kind = SegmentKind::from_u8(cursor.read_u8().map_err(|_| err())?)?;
        let count = cursor.read_u8().map_err(|_| err())? as usize;
        let mut asns = Vec::with_capacity(count);
        for _ in 0..count {
            asns.push(read_asn(&mut cursor, four_octets_asn)?);
        }
        segments.push(AsPathSegment { kind, asns });
    }
    Ok(segments)
}

fn encode_as_path(segments: &[AsPathSegment], four_octets_asn: bool, buf: &mut BytesMut) {
    for segment in segments {
        buf.put_u8(segment.kind as u8);
        buf.put_u8(segment.asns.len() as u8);
        for asn in &segment.asns {
            if four_octets_asn {
                buf.put_u32(*asn);
            } else if *asn > u16::MAX as u32 {
                buf.put_u16(AS_TRANS);
            } else {
                buf.put_u16(*asn as u16);
            }
        }
    }
}

fn read_ipv4(cursor: &mut &[u8]) -> Result<Ipv4Addr, ProtocolError> {
    let err = || ProtocolError::update_message(UpdateSubcode::InvalidNexthopAttribute);
    let mut bytes = [0u8; 4];
    cursor.read_exact(&mut bytes).map_err(|_| err())?;
    Ok(Ipv4Addr::from(bytes))
}

impl Attribute {
    pub fn attr_type(&self) -> u8 {
        match self {
            Attribute::Origin(_) => TYPE_ORIGIN,
            Attribute::AsPath(_) => TYPE_AS_PATH,
            Attribute::NextHop(_) => TYPE_NEXT_HOP,
            Attribute::MultiExitDisc(_) => TYPE_MULTI_EXIT_DISC,
            Attribute::LocalPref(_) => TYPE_LOCAL_PREF,
            Attribute::AtomicAggregate => TYPE_ATOMIC_AGGREGATE,
            Attribute::Aggregator { .. } => TYPE_AGGREGATOR,
            Attribute::Communities(_) => TYPE_COMMUNITIES,
            Attribute::OriginatorId(_) => TYPE_ORIGINATOR_ID,
            Attribute::ClusterList(_) => TYPE_CLUSTER_LIST,
            Attribute::MpReachNlri(_) => TYPE_MP_REACH_NLRI,
            Attribute::MpUnreachNlri(_) => TYPE_MP_UNREACH_NLRI,
            Attribute::ExtendedCommunities(_) => TYPE_EXTENDED_COMMUNITIES,
            Attribute::As4Path(_) => TYPE_AS4_PATH,
            Attribute::As4Aggregator { .. } => TYPE_AS4_AGGREGATOR,
            Attribute::Ipv6ExtendedCommunities(_) => TYPE_IPV6_EXTENDED_COMMUNITIES,
            Attribute::LargeCommunities(_) => TYPE_LARGE_COMMUNITIES,
            Attribute::Unknown { attr_type, .. } => *attr_type,
        }
    }

    fn decode_value(attr_type: u8, value: &[u8], four_octets_asn: bool) -> Result<Self, ProtocolError> {
        let len_err = || ProtocolError::update_message(UpdateSubcode::AttributeLengthError);
        let mut cursor = value;
        Ok(match attr_type {
            TYPE_ORIGIN => {
                if value.len() != 1 {
                    return Err(len_err());
                }
                Attribute::Origin(Origin::from_u8(value[0])?)
            }
            TYPE_AS_PATH => Attribute::AsPath(decode_as_path(value, four_octets_asn)?),
            TYPE_NEXT_HOP => {
                if value.len() != 4 {
                    return Err(len_err());
                }
                Attribute::NextHop(read_ipv4(&mut cursor)?)
            }
            TYPE_MULTI_EXIT_DISC => {
                if value.len() != 4 {
                    return Err(len_err());
                }
                Attribute::MultiExitDisc(cursor.read_u32::<NetworkEndian>().map_err(|_| len_err())?)
            }
            TYPE_LOCAL_PREF => {
                if value.len() != 4 {
                    return Err(len_err());
                }
                Attribute::LocalPref(cursor.read_u32::<NetworkEndian>().map_err(|_| len_err())?)
            }
            TYPE_ATOMIC_AGGREGATE => Attribute::AtomicAggregate,
            TYPE_AGGREGATOR => {
                let width = asn_width(four_octets_asn);
                if value.len() != width + 4 {
                    return Err(len_err());
                }
                let asn = read_asn(&mut cursor, four_octets_asn)?;
                let address = read_ipv4(&mut cursor)?;
                Attribute::Aggregator { asn, address }
            }
            TYPE_COMMUNITIES => {
                if !value.len().is_multiple_of(4) {
                    return Err(len_err());
                }
                let mut communities = Vec::with_capacity(value.len() / 4);
                while !cursor.is_empty() {
                    communities.push(Community::from_u32(
                        cursor.read_u32::<NetworkEndian>().map_err(|_| len_err())?,
                    ));
                }
                Attribute::Communities(communities)
            }
            TYPE_ORIGINATOR_ID => {
                if value.len() != 4 {
                    return Err(len_err());
                }
                Attribute::OriginatorId(read_ipv4(&mut cursor)?)
            }
            TYPE_CLUSTER_LIST => {
                if !value.len().is_multiple_of(4) {
                    return Err(len_err());
                }
                let mut ids = Vec::with_capacity(value.len() / 4);
                while !cursor.is_empty() {
                    ids.push(read_ipv4(&mut cursor)?);
                }
                Attribute::ClusterList(ids)
            }
            TYPE_MP_REACH_NLRI => {
                let afi = cursor.read_u16::<NetworkEndian>().map_err(|_| len_err())?;
                let safi = cursor.read_u8().map_err(|_| len_err())?;
                let nh_len = cursor.read_u8().map_err(|_| len_err())? as usize;
                if cursor.len() < nh_len {
                    return Err(len_err());
                }
                let (next_hop, rest) = cursor.split_at(nh_len);
                cursor = rest;
                let _reserved = cursor.read_u8().map_err(|_| len_err())?;
                Attribute::MpReachNlri(MpReach {
                    afi,
                    safi,
                    next_hop: next_hop.to_vec(),
                    nlri: cursor.to_vec(),
                })
            }
            TYPE_MP_UNREACH_NLRI => {
                let afi = cursor.read_u16::<NetworkEndian>().map_err(|_| len_err())?;
                let safi = cursor.read_u8().map_err(|_| len_err())?;
                Attribute::MpUnreachNlri(MpUnreach {
                    afi,
                    safi,
                    withdrawn: cursor.to_vec(),
                })
            }
            TYPE_EXTENDED_COMMUNITIES => {
                if !value.len().is_multiple_of(8) {
                    return Err(len_err());
                }
                let mut communities = Vec::with_capacity(value.len() / 8);
                while !cursor.is_empty() {
                    communities.push(cursor.read_u64::<NetworkEndian>().map_err(|_| len_err())?);
                }
                Attribute::ExtendedCommunities(communities)
            }
            TYPE_AS4_PATH => Attribute::As4Path(decode_as_path(value, true)?),
            TYPE_AS4_AGGREGATOR => {
                if value.len() != 8 {
                    return Err(len_err());
                }
                let asn = cursor.read_u32::<NetworkEndian>().map_err(|_| len_err())?;
                let address = read_ipv4(&mut cursor)?;
                Attribute::As4Aggregator { asn, address }
            }
            TYPE_IPV6_EXTENDED_COMMUNITIES => {
                if !value.len().is_multiple_of(8) {
                    return Err(len_err());
                }
                let mut communities = Vec::with_capacity(value.len() / 8);
                while !cursor.is_empty() {
                    communities.push(cursor.read_u64::<NetworkEndian>().map_err(|_| len_err())?);
                }
                Attribute::Ipv6ExtendedCommunities(communities)
            }
            TYPE_LARGE_COMMUNITIES => {
                if !value.len().is_multiple_of(12) {
                    return Err(len_err());
                }
                let mut communities = Vec::with_capacity(value.len() / 12);
                while !cursor.is_empty() {
                    let global = cursor.read_u32::<NetworkEndian>().map_err(|_| len_err())?;
                    let local1 = cursor.read_u32::<NetworkEndian>().map_err(|_| len_err())?;
                    let local2 = cursor.read_u32::<NetworkEndian>().map_err(|_| len_err())?;
                    communities.push((global, local1, local2));
                }
                Attribute::LargeCommunities(communities)
            }
            other => Attribute::Unknown {
                attr_type: other,
                value: value.to_vec(),
            },
        })
    }

    fn encode_value(&self, four_octets_asn: bool, buf: &mut BytesMut) {
        match self {
            Attribute::Origin(origin) => buf.put_u8(*origin as u8),
            Attribute::AsPath(segments) => encode_as_path(segments, four_octets_asn, buf),
            Attribute::NextHop(addr) => buf.put_slice(&addr.octets()),
            Attribute::MultiExitDisc(med) => buf.put_u32(*med),
            Attribute::LocalPref(pref) => buf.put_u32(*pref),
            Attribute::AtomicAggregate => {}
            Attribute::Aggregator { asn, address } => {
                if four_octets_asn {
                    buf.put_u32(*asn);
                } else if *asn > u16::MAX as u32 {
                    buf.put_u16(AS_TRANS);
                } else {
                    buf.put_u16(*asn as u16);
                }
                buf.put_slice(&address.octets());
            }
            Attribute::Communities(communities) => {
                for community in communities {
                    buf.put_u32(community.to_u32());
                }
            }
            Attribute::OriginatorId(addr) => buf.put_slice(&addr.octets()),
            Attribute::ClusterList(ids) => {
                for id in ids {
                    buf.put_slice(&id.octets());
                }
            }
            Attribute::MpReachNlri(mp) => {
                buf.put_u16(mp.afi);
                buf.put_u8(mp.safi);
                buf.put_u8(mp.next_hop.len() as u8);
                buf.put_slice(&mp.next_hop);
                buf.put_u8(0);
                buf.put_slice(&mp.nlri);
            }
            Attribute::MpUnreachNlri(mp) => {
                buf.put_u16(mp.afi);
                buf.put_u8(mp.safi);
                buf.put_slice(&mp.withdrawn);
            }
            Attribute::ExtendedCommunities(communities) | Attribute::Ipv6ExtendedCommunities(communities) => {
                for community in communities {
                    buf.put_u64(*community);
                }
            }
            Attribute::As4Path(segments) => encode_as_path(segments, true, buf),
            Attribute::As4Aggregator { asn, address } => {
                buf.put_u32(*asn);
                buf.put_slice(&address.octets());
            }
            Attribute::LargeCommunities(communities) => {
                for (global, local1, local2) in communities {
                    buf.put_u32(*global);
                    buf.put_u32(*local1);
                    buf.put_u32(*local2);
                }
            }
            Attribute::Unknown { value, .. } => buf.put_slice(value),
        }
    }

    /// Re-expresses a peer's AS_PATH as an AS4_PATH, used when encoding outbound to a
    /// non-four-octet peer while the original path carries an ASN that doesn't fit in 16 bits.
    pub fn needs_as4_path(&self, four_octets_asn: bool) -> bool {
        if four_octets_asn {
            return false;
        }
        match self {
            Attribute::AsPath(segments) => segments
                .iter()
                .any(|s| s.asns.iter().any(|asn| *asn > u16::MAX as u32)),
            _ => false,
        }
    }

    pub fn decode(buf: &[u8], four_octets_asn: bool) -> Result<(Self, usize), ProtocolError> {
        let len_err = || ProtocolError::update_message(UpdateSubcode::MalformedAttributeList);
        let mut cursor = buf;
        let flags = cursor.read_u8().map_err(|_| len_err())?;
        let attr_type = cursor.read_u8().map_err(|_| len_err())?;
        check_flags(attr_type, flags)?;
        let extended = flags & FLAG_EXTENDED_LENGTH != 0;
        let length = if extended {
            cursor.read_u16::<NetworkEndian>().map_err(|_| len_err())? as usize
        } else {
            cursor.read_u8().map_err(|_| len_err())? as usize
        };
        if cursor.len() < length {
            return Err(ProtocolError::update_message(
                UpdateSubcode::AttributeLengthError,
            ));
        }
        let (value, _) = cursor.split_at(length);
        let consumed = buf.len() - cursor.len() + length;
        let attribute = Attribute::decode_value(attr_type, value, four_octets_asn)?;
        Ok((attribute, consumed))
    }

    pub fn encode(&self, four_octets_asn: bool, buf: &mut BytesMut) {
        let attr_type = self.attr_type();
        let mut value = BytesMut::new();
        self.encode_value(four_octets_asn, &mut value);
        let extended = value.len() > u8::MAX as usize;
        buf.put_u8(encode_flags(attr_type, extended));
        buf.put_u8(attr_type);
        if extended {
            buf.put_u16(value.len() as u16);
        } else {
            buf.put_u8(value.len() as u8);
        }
        buf.put_slice(&value);
    }
}

pub fn decode_all(mut buf: &[u8], four_octets_asn: bool) -> Result<Vec<Attribute>, ProtocolError> {
    let mut attributes = Vec::new();
    while !buf.is_empty() {
        let (attribute, consumed) = Attribute::decode(buf, four_octets_asn)?;
        attributes.push(attribute);
        buf = &buf[consumed..];
    }
    Ok(attributes)
}

pub fn encode_all(attributes: &[Attribute], four_octets_asn: bool, buf: &mut BytesMut) {
    for attribute in attributes {
        attribute.encode(four_octets_asn, buf);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AddressFamily {
    pub afi: u16,
    pub safi: u8,
}

pub const AFI_IPV4: u16 = 1;
pub const AFI_IPV6: u16 = 2;
pub const SAFI_UNICAST: u8 = 1;

#[allow(dead_code)]
fn ipv6_from_bytes(bytes: &[u8]) -> Option<Ipv6Addr> {
    let arr: [u8; 16] = bytes.try_into().ok()?;
    Some(Ipv6Addr::from(arr))
}

#[allow(dead_code)]
fn ip_from_mp(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => {
            let arr: [u8; 4] = bytes.try_into().ok()?;
            Some(IpAddr::from(arr))
        }
        16 => ipv6_from_bytes(bytes).map(IpAddr::from),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_roundtrip() {
        let attr = Attribute::Origin(Origin::Egp);
        let mut buf = BytesMut::new();
        attr.encode(false, &mut buf);
        let (decoded, consumed) = Attribute::decode(&buf, false).unwrap();
        assert_eq!(decoded, attr);
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn test_origin_flag_violation() {
        let mut buf = BytesMut::new();
        buf.put_u8(FLAG_OPTIONAL | FLAG_TRANSITIVE);
        buf.put_u8(TYPE_ORIGIN);
        buf.put_u8(1);
        buf.put_u8(0);
        assert!(Attribute::decode(&buf, false).is_err());
    }

    #[test]
    fn test_as_path_roundtrip_2byte() {
        let attr = Attribute::AsPath(vec![AsPathSegment {
            kind: SegmentKind::AsSequence,
            asns: vec![65000, 65001],
        }]);
        let mut buf = BytesMut::new();
        attr.encode(false, &mut buf);
        let (decoded, _) = Attribute::decode(&buf, false).unwrap();
        assert_eq!(decoded, attr);
    }

    #[test]
    fn test_as_path_as_trans_mapping() {
        let attr = Attribute::AsPath(vec![AsPathSegment {
            kind: SegmentKind::AsSequence,
            asns: vec![4259840100],
        }]);
        let mut buf = BytesMut::new();
        attr.encode(false, &mut buf);
        let (decoded, _) = Attribute::decode(&buf, false).unwrap();
        assert_eq!(
            decoded,
            Attribute::AsPath(vec![AsPathSegment {
                kind: SegmentKind::AsSequence,
                asns: vec![AS_TRANS as u32],
            }])
        );
        assert!(attr.needs_as4_path(false));
    }

    #[test]
    fn test_aggregator_roundtrip_4byte() {
        let attr = Attribute::Aggregator {
            asn: 4259840100,
            address: Ipv4Addr::new(10, 0, 0, 1),
        };
        let mut buf = BytesMut::new();
        attr.encode(true, &mut buf);
        let (decoded, _) = Attribute::decode(&buf, true).unwrap();
        assert_eq!(decoded, attr);
    }

    #[test]
    fn test_communities_symbolic_tags() {
        let attr = Attribute::Communities(vec![Community::NoExport, Community::Value(42)]);
        let mut buf = BytesMut::new();
        attr.encode(false, &mut buf);
        let (decoded, _) = Attribute::decode(&buf, false).unwrap();
        assert_eq!(decoded, attr);
    }

    #[test]
    fn test_mp_reach_roundtrip() {
        let attr = Attribute::MpReachNlri(MpReach {
            afi: AFI_IPV6,
            safi: SAFI_UNICAST,
            next_hop: vec![0; 16],
            nlri: vec![64, 0x20, 0x01, 0x0d, 0xb8],
        });
        let mut buf = BytesMut::new();
        attr.encode(false, &mut buf);
        let (decoded, _) = Attribute::decode(&buf, false).unwrap();
        assert_eq!(decoded, attr);
    }

    #[test]
    fn test_extended_length_attribute() {
        let attr = Attribute::Unknown {
            attr_type: 200,
            value: vec![0u8; 300],
        };
        let mut buf = BytesMut::new();
        attr.encode(false, &mut buf);
        assert!(buf[0] & FLAG_EXTENDED_LENGTH != 0);
        let (decoded, _) = Attribute::decode(&buf, false).unwrap();
        assert_eq!(decoded, attr);
    }
}
