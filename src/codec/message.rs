use bytes::BytesMut;

use super::header::{self, TYPE_KEEPALIVE, TYPE_NOTIFICATION, TYPE_OPEN, TYPE_ROUTE_REFRESH, TYPE_UPDATE};
use super::notification::{NotificationMessage, ProtocolError};
use super::open::OpenMessage;
use super::update::UpdateMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Open(OpenMessage),
    Keepalive,
    Notification(NotificationMessage),
    Update(UpdateMessage),
    RouteRefresh { afi: u16, safi: u8 },
}

impl Message {
    /// Decode a single already-framed message body (the bytes after the 19-byte header).
    pub fn decode(message_type: u8, body: &[u8], four_octets_asn: bool) -> Result<Self, ProtocolError> {
        Ok(match message_type {
            TYPE_OPEN => Message::Open(OpenMessage::decode(body)?),
            TYPE_KEEPALIVE => Message::Keepalive,
            TYPE_NOTIFICATION => {
                if body.len() < 2 {
                    return Err(ProtocolError::new(1, 0, Vec::new()));
                }
                Message::Notification(NotificationMessage {
                    code: body[0],
                    subcode: body[1],
                    data: body[2..].to_vec(),
                })
            }
            TYPE_UPDATE => Message::Update(UpdateMessage::decode(body, four_octets_asn)?),
            TYPE_ROUTE_REFRESH => {
                if body.len() < 4 {
                    return Err(ProtocolError::new(1, 0, Vec::new()));
                }
                Message::RouteRefresh {
                    afi: u16::from_be_bytes([body[0], body[1]]),
                    safi: body[3],
                }
            }
            other => {
                return Err(ProtocolError::new(1, 3, vec![other]));
            }
        })
    }

    fn message_type(&self) -> u8 {
        match self {
            Message::Open(_) => TYPE_OPEN,
            Message::Keepalive => TYPE_KEEPALIVE,
            Message::Notification(_) => TYPE_NOTIFICATION,
            Message::Update(_) => TYPE_UPDATE,
            Message::RouteRefresh { .. } => TYPE_ROUTE_REFRESH,
        }
    }

    /// Encode this message as a complete framed wire message (marker+length+type+body).
    pub fn encode(
        &self,
        four_octets_asn: bool,
        extended_params: bool,
        buf: &mut BytesMut,
    ) {
        let mut body = BytesMut::new();
        match self {
            Message::Open(open) => open.encode(extended_params, &mut body),
            Message::Keepalive => {}
            Message::Notification(notification) => {
                body.extend_from_slice(&[notification.code, notification.subcode]);
                body.extend_from_slice(&notification.data);
            }
            Message::Update(update) => update.encode(four_octets_asn, &mut body),
            Message::RouteRefresh { afi, safi } => {
                body.extend_from_slice(&afi.to_be_bytes());
                body.extend_from_slice(&[0, *safi]);
            }
        }
        header::encode_frame(self.message_type(), &body, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keepalive_roundtrip() {
        let message = Message::Keepalive;
        let mut buf = BytesMut::new();
        message.encode(false, false, &mut buf);
        let (message_type, body) = header::decode_frame(&mut buf, false).unwrap().unwrap();
        let decoded = Message::decode(message_type, &body, false).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_route_refresh_roundtrip() {
        let message = Message::RouteRefresh { afi: 1, safi: 1 };
        let mut buf = BytesMut::new();
        message.encode(false, false, &mut buf);
        let (message_type, body) = header::decode_frame(&mut buf, false).unwrap().unwrap();
        let decoded = Message::decode(message_type, &body, false).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_notification_roundtrip() {
        let message = Message::Notification(NotificationMessage {
            code: 4,
            subcode: 0,
            data: vec![],
        });
        let mut buf = BytesMut::new();
        message.encode(false, false, &mut buf);
        let (message_type, body) = header::decode_frame(&mut buf, false).unwrap().unwrap();
        let decoded = Message::decode(message_type, &body, false).unwrap();
        assert_eq!(decoded, message);
    }
}
