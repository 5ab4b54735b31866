use std::error::Error;
use std::fmt;

/// The error taxonomy from RFC 4271 §6, carried as (code, subcode, offending bytes).
/// This is also the shape of a wire NOTIFICATION message, so a `ProtocolError` raised
/// by the codec converts directly into one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError {
    pub code: u8,
    pub subcode: u8,
    pub data: Vec<u8>,
}

impl ProtocolError {
    pub fn new(code: u8, subcode: u8, data: Vec<u8>) -> Self {
        ProtocolError { code, subcode, data }
    }

    pub fn message_header(subcode: HeaderSubcode) -> Self {
        ProtocolError::new(1, subcode as u8, Vec::new())
    }

    pub fn message_header_with_data(subcode: HeaderSubcode, data: Vec<u8>) -> Self {
        ProtocolError::new(1, subcode as u8, data)
    }

    pub fn open_message(subcode: OpenSubcode) -> Self {
        ProtocolError::new(2, subcode as u8, Vec::new())
    }

    pub fn update_message(subcode: UpdateSubcode) -> Self {
        ProtocolError::new(3, subcode as u8, Vec::new())
    }

    pub fn update_message_with_data(subcode: UpdateSubcode, data: Vec<u8>) -> Self {
        ProtocolError::new(3, subcode as u8, data)
    }

    pub fn hold_timer_expired() -> Self {
        ProtocolError::new(4, 0, Vec::new())
    }

    pub fn fsm(subcode: FsmSubcode) -> Self {
        ProtocolError::new(5, subcode as u8, Vec::new())
    }

    pub fn cease(subcode: CeaseSubcode) -> Self {
        ProtocolError::new(6, subcode as u8, Vec::new())
    }

    /// Render this error as the wire NOTIFICATION message it becomes at the Session boundary.
    pub fn into_notification(self) -> super::NotificationMessage {
        super::NotificationMessage {
            code: self.code,
            subcode: self.subcode,
            data: self.data,
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BGP protocol error {}/{} ({} bytes)",
            self.code,
            self.subcode,
            self.data.len()
        )
    }
}

impl Error for ProtocolError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HeaderSubcode {
    ConnectionNotSynchronized = 1,
    BadMessageLength = 2,
    BadMessageType = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpenSubcode {
    Unspecific = 0,
    UnsupportedVersionNumber = 1,
    BadPeerAs = 2,
    BadBgpIdentifier = 3,
    UnsupportedOptionalParameter = 4,
    AuthenticationFailure = 5,
    UnacceptableHoldTime = 6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UpdateSubcode {
    MalformedAttributeList = 1,
    UnrecognizedWellknownAttribute = 2,
    MissingWellknownAttribute = 3,
    AttributeFlagsError = 4,
    AttributeLengthError = 5,
    InvalidOriginAttribute = 6,
    AsRoutingLoop = 7,
    InvalidNexthopAttribute = 8,
    OptionalAttributeError = 9,
    InvalidNetworkField = 10,
    MalformedAspath = 11,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FsmSubcode {
    Unspecified = 0,
    UnexpectedMessageInOpenSent = 1,
    UnexpectedMessageInOpenConfirm = 2,
    UnexpectedMessageInEstablished = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CeaseSubcode {
    Unspecific = 0,
    MaxPrefixesReached = 1,
    AdministrativeShutdown = 2,
    PeerDeconfigured = 3,
    AdministrativeReset = 4,
    ConnectionRejected = 5,
    OtherConfigurationChange = 6,
    ConnectionCollisionResolution = 7,
    OutOfResources = 8,
}

/// A decoded/to-be-encoded wire NOTIFICATION, identical in shape to `ProtocolError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub code: u8,
    pub subcode: u8,
    pub data: Vec<u8>,
}

impl From<ProtocolError> for NotificationMessage {
    fn from(err: ProtocolError) -> Self {
        err.into_notification()
    }
}

impl NotificationMessage {
    pub fn into_protocol_error(self) -> ProtocolError {
        ProtocolError::new(self.code, self.subcode, self.data)
    }
}
