//! STUN attribute types and the small value types carried by attributes.
//!
//! Attributes are TLV encoded (RFC 3489 Section 11.2):
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |         Type                  |            Length             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                             Value                             ....
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use crate::error::FormatError;
use serde::Serialize;
use std::fmt;

/// STUN attribute type codes known to this client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u16)]
pub enum AttributeType {
    /// MAPPED-ADDRESS (0x0001)
    MappedAddress = 0x0001,
    /// RESPONSE-ADDRESS (0x0002)
    ResponseAddress = 0x0002,
    /// CHANGE-REQUEST (0x0003)
    ChangeRequest = 0x0003,
    /// SOURCE-ADDRESS (0x0004)
    SourceAddress = 0x0004,
    /// CHANGED-ADDRESS (0x0005)
    ChangedAddress = 0x0005,
    /// USERNAME (0x0006)
    Username = 0x0006,
    /// PASSWORD (0x0007)
    Password = 0x0007,
    /// MESSAGE-INTEGRITY (0x0008)
    MessageIntegrity = 0x0008,
    /// ERROR-CODE (0x0009)
    ErrorCode = 0x0009,
    /// UNKNOWN-ATTRIBUTES (0x000A)
    UnknownAttributes = 0x000A,
    /// REFLECTED-FROM (0x000B)
    ReflectedFrom = 0x000B,
    /// XOR-ONLY (0x0021)
    XorOnly = 0x0021,
    /// XOR-MAPPED-ADDRESS (0x8020)
    XorMappedAddress = 0x8020,
    /// SERVER-NAME (0x8022)
    ServerName = 0x8022,
}

impl AttributeType {
    /// Look up a wire code, `None` for codes this client does not know
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        let attr = match value {
            0x0001 => Self::MappedAddress,
            0x0002 => Self::ResponseAddress,
            0x0003 => Self::ChangeRequest,
            0x0004 => Self::SourceAddress,
            0x0005 => Self::ChangedAddress,
            0x0006 => Self::Username,
            0x0007 => Self::Password,
            0x0008 => Self::MessageIntegrity,
            0x0009 => Self::ErrorCode,
            0x000A => Self::UnknownAttributes,
            0x000B => Self::ReflectedFrom,
            0x0021 => Self::XorOnly,
            0x8020 => Self::XorMappedAddress,
            0x8022 => Self::ServerName,
            _ => return None,
        };
        Some(attr)
    }

    /// Wire code
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// RFC name of the attribute
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::MappedAddress => "MAPPED-ADDRESS",
            Self::ResponseAddress => "RESPONSE-ADDRESS",
            Self::ChangeRequest => "CHANGE-REQUEST",
            Self::SourceAddress => "SOURCE-ADDRESS",
            Self::ChangedAddress => "CHANGED-ADDRESS",
            Self::Username => "USERNAME",
            Self::Password => "PASSWORD",
            Self::MessageIntegrity => "MESSAGE-INTEGRITY",
            Self::ErrorCode => "ERROR-CODE",
            Self::UnknownAttributes => "UNKNOWN-ATTRIBUTES",
            Self::ReflectedFrom => "REFLECTED-FROM",
            Self::XorOnly => "XOR-ONLY",
            Self::XorMappedAddress => "XOR-MAPPED-ADDRESS",
            Self::ServerName => "SERVER-NAME",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// CHANGE-REQUEST flags
///
/// Only two bits of the 32-bit value are used:
///
/// ```text
/// |0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 A B 0|
/// ```
///
/// `A` asks the server to answer from a different IP, `B` from a different port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeRequest {
    change_ip: bool,
    change_port: bool,
}

impl ChangeRequest {
    const CHANGE_IP: u8 = 0x04;
    const CHANGE_PORT: u8 = 0x02;

    /// Create a new change request
    #[must_use]
    pub const fn new(change_ip: bool, change_port: bool) -> Self {
        Self {
            change_ip,
            change_port,
        }
    }

    /// Whether the server should respond from a different IP
    #[must_use]
    pub const fn change_ip(&self) -> bool {
        self.change_ip
    }

    /// Whether the server should respond from a different port
    #[must_use]
    pub const fn change_port(&self) -> bool {
        self.change_port
    }

    /// Flag byte as carried in the last octet of the attribute value
    #[must_use]
    pub const fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.change_ip {
            flags |= Self::CHANGE_IP;
        }
        if self.change_port {
            flags |= Self::CHANGE_PORT;
        }
        flags
    }

    /// Rebuild from the flag byte, other bits ignored
    #[must_use]
    pub const fn from_flags(flags: u8) -> Self {
        Self::new(flags & Self::CHANGE_IP != 0, flags & Self::CHANGE_PORT != 0)
    }
}

/// ERROR-CODE value: numeric code (class * 100 + number) and reason phrase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCode {
    code: u16,
    reason: String,
}

impl ErrorCode {
    /// Largest code the three class bits can carry
    pub const MAX_CODE: u16 = 799;

    /// Create a new error code
    ///
    /// # Errors
    ///
    /// Returns `FormatError::ErrorCodeOutOfRange` if `code` exceeds
    /// [`Self::MAX_CODE`], since the class would not fit on the wire.
    pub fn new(code: u16, reason: impl Into<String>) -> Result<Self, FormatError> {
        if code > Self::MAX_CODE {
            return Err(FormatError::ErrorCodeOutOfRange(code));
        }
        Ok(Self {
            code,
            reason: reason.into(),
        })
    }

    /// Rebuild from the wire octets. The number octet is taken as-is, so a
    /// peer sending a number above 99 yields a code that may exceed
    /// [`Self::MAX_CODE`].
    pub(crate) fn from_wire(class: u8, number: u8, reason: impl Into<String>) -> Self {
        Self {
            code: u16::from(class & 0x07) * 100 + u16::from(number),
            reason: reason.into(),
        }
    }

    /// Full numeric code, e.g. 420
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.code
    }

    /// Hundreds digit, carried in the low three bits of the class octet
    #[must_use]
    pub const fn class(&self) -> u8 {
        (self.code / 100) as u8
    }

    /// Code modulo 100
    #[must_use]
    pub const fn number(&self) -> u8 {
        (self.code % 100) as u8
    }

    /// Reason phrase
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.reason)
    }
}
