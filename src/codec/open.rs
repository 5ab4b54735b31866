use byteorder::{NetworkEndian, ReadBytesExt};
use bytes::{BufMut, BytesMut};
use std::io::Read;
use std::net::Ipv4Addr;

use super::notification::{OpenSubcode, ProtocolError};

pub const VERSION: u8 = 4;
/// Reserved ASN used to carry a 4-octet ASN across a 2-octet-only speaker.
pub const AS_TRANS: u16 = 23456;

const CAP_MULTIPROTOCOL: u8 = 1;
const CAP_ROUTE_REFRESH: u8 = 2;
const CAP_EXTENDED_MESSAGE: u8 = 6;
const CAP_GRACEFUL_RESTART: u8 = 64;
const CAP_FOUR_OCTET_ASN: u8 = 65;
const CAP_ENHANCED_ROUTE_REFRESH: u8 = 70;

const PARAM_CAPABILITIES: u8 = 2;
/// Sentinel legacy-length byte signalling the RFC 9072 extended parameter form.
const EXTENDED_PARAM_SENTINEL: u8 = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GracefulRestartAf {
    pub afi: u16,
    pub safi: u8,
    pub forwarding_state_preserved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    MultiProtocol { afi: u16, safi: u8 },
    RouteRefresh,
    ExtendedMessage,
    GracefulRestart {
        restarted: bool,
        restart_time: u16,
        afs: Vec<GracefulRestartAf>,
    },
    FourOctetAsn(u32),
    EnhancedRouteRefresh,
    /// Recognized-but-unstructured, or genuinely unknown: preserved verbatim so
    /// encoding can round-trip a peer's own capability set back out.
    Unknown { code: u8, value: Vec<u8> },
}

impl Capability {
    fn code(&self) -> u8 {
        match self {
            Capability::MultiProtocol { .. } => CAP_MULTIPROTOCOL,
            Capability::RouteRefresh => CAP_ROUTE_REFRESH,
            Capability::ExtendedMessage => CAP_EXTENDED_MESSAGE,
            Capability::GracefulRestart { .. } => CAP_GRACEFUL_RESTART,
            Capability::FourOctetAsn(_) => CAP_FOUR_OCTET_ASN,
            Capability::EnhancedRouteRefresh => CAP_ENHANCED_ROUTE_REFRESH,
            Capability::Unknown { code, .. } => *code,
        }
    }

    fn encode_value(&self, buf: &mut BytesMut) {
        match self {
            Capability::MultiProtocol { afi, safi } => {
                buf.put_u16(*afi);
                buf.put_u8(0);
                buf.put_u8(*safi);
            }
            Capability::RouteRefresh | Capability::ExtendedMessage | Capability::EnhancedRouteRefresh => {}
            Capability::GracefulRestart {
                restarted,
                restart_time,
                afs,
            } => {
                let mut flags_and_time = *restart_time & 0x0fff;
                if *restarted {
                    flags_and_time |= 0x8000;
                }
                buf.put_u16(flags_and_time);
                for af in afs {
                    buf.put_u16(af.afi);
                    buf.put_u8(af.safi);
                    buf.put_u8(if af.forwarding_state_preserved { 0x80 } else { 0 });
                }
            }
            Capability::FourOctetAsn(asn) => buf.put_u32(*asn),
            Capability::Unknown { value, .. } => buf.put_slice(value),
        }
    }

    fn decode(code: u8, value: &[u8]) -> Result<Self, ProtocolError> {
        let unspecific = || ProtocolError::open_message(OpenSubcode::Unspecific);
        Ok(match code {
            CAP_MULTIPROTOCOL => {
                if value.len() != 4 {
                    return Err(unspecific());
                }
                let mut cursor = value;
                let afi = cursor.read_u16::<NetworkEndian>().map_err(|_| unspecific())?;
                let _reserved = cursor.read_u8().map_err(|_| unspecific())?;
                let safi = cursor.read_u8().map_err(|_| unspecific())?;
                Capability::MultiProtocol { afi, safi }
            }
            CAP_ROUTE_REFRESH => Capability::RouteRefresh,
            CAP_EXTENDED_MESSAGE => Capability::ExtendedMessage,
            CAP_GRACEFUL_RESTART => {
                if value.len() < 2 {
                    return Err(unspecific());
                }
                let mut cursor = value;
                let flags_and_time = cursor.read_u16::<NetworkEndian>().map_err(|_| unspecific())?;
                let mut afs = Vec::new();
                while cursor.len() >= 4 {
                    let afi = cursor.read_u16::<NetworkEndian>().map_err(|_| unspecific())?;
                    let safi = cursor.read_u8().map_err(|_| unspecific())?;
                    let flags = cursor.read_u8().map_err(|_| unspecific())?;
                    afs.push(GracefulRestartAf {
                        afi,
                        safi,
                        forwarding_state_preserved: flags & 0x80 != 0,
                    });
                }
                Capability::GracefulRestart {
                    restarted: flags_and_time & 0x8000 != 0,
                    restart_time: flags_and_time & 0x0fff,
                    afs,
                }
            }
            CAP_FOUR_OCTET_ASN => {
                if value.len() != 4 {
                    return Err(unspecific());
                }
                let mut cursor = value;
                Capability::FourOctetAsn(cursor.read_u32::<NetworkEndian>().map_err(|_| unspecific())?)
            }
            CAP_ENHANCED_ROUTE_REFRESH => Capability::EnhancedRouteRefresh,
            other => Capability::Unknown {
                code: other,
                value: value.to_vec(),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenMessage {
    pub version: u8,
    /// 16-bit wire ASN; see `Capability::FourOctetAsn` for the real ASN when negotiated.
    pub asn: u16,
    pub hold_time: u16,
    pub bgp_id: Ipv4Addr,
    pub capabilities: Vec<Capability>,
}

impl OpenMessage {
    pub fn four_octet_asn(&self) -> Option<u32> {
        self.capabilities.iter().find_map(|cap| match cap {
            Capability::FourOctetAsn(asn) => Some(*asn),
            _ => None,
        })
    }

    pub fn has(&self, code: u8) -> bool {
        self.capabilities.iter().any(|cap| cap.code() == code)
    }

    pub fn has_extended_message(&self) -> bool {
        self.capabilities
            .iter()
            .any(|c| matches!(c, Capability::ExtendedMessage))
    }

    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        let unspecific = || ProtocolError::open_message(OpenSubcode::Unspecific);
        let mut cursor = buf;
        let version = cursor.read_u8().map_err(|_| unspecific())?;
        if version != VERSION {
            return Err(ProtocolError::open_message(
                OpenSubcode::UnsupportedVersionNumber,
            ));
        }
        let asn = cursor.read_u16::<NetworkEndian>().map_err(|_| unspecific())?;
        let hold_time = cursor.read_u16::<NetworkEndian>().map_err(|_| unspecific())?;
        if hold_time != 0 && hold_time < 3 {
            return Err(ProtocolError::open_message(
                OpenSubcode::UnacceptableHoldTime,
            ));
        }
        let mut bgp_id_bytes = [0u8; 4];
        cursor.read_exact(&mut bgp_id_bytes).map_err(|_| unspecific())?;
        let bgp_id = Ipv4Addr::from(bgp_id_bytes);

        let param_len_indicator = cursor.read_u8().map_err(|_| unspecific())?;
        let params = if param_len_indicator == EXTENDED_PARAM_SENTINEL {
            let ext_len = cursor.read_u16::<NetworkEndian>().map_err(|_| unspecific())? as usize;
            if cursor.len() < ext_len {
                return Err(unspecific());
            }
            &cursor[..ext_len]
        } else {
            let len = param_len_indicator as usize;
            if cursor.len() < len {
                return Err(unspecific());
            }
            &cursor[..len]
        };

        let extended = param_len_indicator == EXTENDED_PARAM_SENTINEL;
        let capabilities = decode_parameters(params, extended)?;
        Ok(OpenMessage {
            version,
            asn,
            hold_time,
            bgp_id,
            capabilities,
        })
    }

    /// Encodes using the legacy 1-octet parameter length, unless `extended_params` is set
    /// (RFC 9072), in which case the sentinel + 2-octet length form is used.
    pub fn encode(&self, extended_params: bool, buf: &mut BytesMut) {
        buf.put_u8(self.version);
        buf.put_u16(self.asn);
        buf.put_u16(self.hold_time);
        buf.put_slice(&self.bgp_id.octets());

        let mut params = BytesMut::new();
        if !self.capabilities.is_empty() {
            let mut cap_bytes = BytesMut::new();
            for cap in &self.capabilities {
                let mut value = BytesMut::new();
                cap.encode_value(&mut value);
                cap_bytes.put_u8(cap.code());
                cap_bytes.put_u8(value.len() as u8);
                cap_bytes.put_slice(&value);
            }
            params.put_u8(PARAM_CAPABILITIES);
            if extended_params {
                params.put_u16(cap_bytes.len() as u16);
            } else {
                params.put_u8(cap_bytes.len() as u8);
            }
            params.put_slice(&cap_bytes);
        }

        if extended_params {
            buf.put_u8(EXTENDED_PARAM_SENTINEL);
            buf.put_u16(params.len() as u16);
        } else {
            buf.put_u8(params.len() as u8);
        }
        buf.put_slice(&params);
    }
}

/// Parameters area: a sequence of {type(1), length(1, or 2 under RFC 9072 extended form),
/// value}. Only type 2 (Capabilities) is recognized; others are skipped. Each Capabilities
/// parameter's value is itself a concatenation of {code(1), length(1), value} -- capability
/// lengths stay 1 octet even in the extended parameter form, only the outer parameter lengths
/// widen.
fn decode_parameters(mut buf: &[u8], extended: bool) -> Result<Vec<Capability>, ProtocolError> {
    let unspecific = || ProtocolError::open_message(OpenSubcode::Unspecific);
    let mut capabilities = Vec::new();
    while !buf.is_empty() {
        let param_type = buf.read_u8().map_err(|_| unspecific())?;
        let len = if extended {
            buf.read_u16::<NetworkEndian>().map_err(|_| unspecific())? as usize
        } else {
            buf.read_u8().map_err(|_| unspecific())? as usize
        };
        if buf.len() < len {
            return Err(unspecific());
        }
        let (value, rest) = buf.split_at(len);
        if param_type == PARAM_CAPABILITIES {
            capabilities.extend(decode_capabilities(value)?);
        }
        buf = rest;
    }
    Ok(capabilities)
}

fn decode_capabilities(mut buf: &[u8]) -> Result<Vec<Capability>, ProtocolError> {
    let unspecific = || ProtocolError::open_message(OpenSubcode::Unspecific);
    let mut capabilities = Vec::new();
    while !buf.is_empty() {
        let code = buf.read_u8().map_err(|_| unspecific())?;
        let len = buf.read_u8().map_err(|_| unspecific())? as usize;
        if buf.len() < len {
            return Err(unspecific());
        }
        let (value, rest) = buf.split_at(len);
        capabilities.push(Capability::decode(code, value)?);
        buf = rest;
    }
    Ok(capabilities)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OpenMessage {
        OpenMessage {
            version: VERSION,
            asn: 65000,
            hold_time: 90,
            bgp_id: Ipv4Addr::new(10, 0, 0, 1),
            capabilities: vec![
                Capability::FourOctetAsn(65000),
                Capability::MultiProtocol { afi: 1, safi: 1 },
                Capability::RouteRefresh,
            ],
        }
    }

    #[test]
    fn test_open_roundtrip_legacy() {
        let open = sample();
        let mut buf = BytesMut::new();
        open.encode(false, &mut buf);
        let decoded = OpenMessage::decode(&buf).unwrap();
        assert_eq!(decoded, open);
    }

    #[test]
    fn test_open_roundtrip_extended_params() {
        let open = sample();
        let mut buf = BytesMut::new();
        open.encode(true, &mut buf);
        let decoded = OpenMessage::decode(&buf).unwrap();
        assert_eq!(decoded, open);
    }

    #[test]
    fn test_open_bad_version() {
        let mut buf = BytesMut::new();
        buf.put_u8(5);
        buf.put_u16(100);
        buf.put_u16(90);
        buf.put_slice(&[10, 0, 0, 1]);
        buf.put_u8(0);
        assert!(OpenMessage::decode(&buf).is_err());
    }

    #[test]
    fn test_open_unacceptable_hold_time() {
        let mut buf = BytesMut::new();
        buf.put_u8(VERSION);
        buf.put_u16(100);
        buf.put_u16(2);
        buf.put_slice(&[10, 0, 0, 1]);
        buf.put_u8(0);
        assert!(OpenMessage::decode(&buf).is_err());
    }

    #[test]
    fn test_four_octet_asn_capability() {
        let open = sample();
        assert_eq!(open.four_octet_asn(), Some(65000));
    }
}
