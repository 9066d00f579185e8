//! STUN message codec (RFC 3489 with the RFC 5389 header layout)
//!
//! All STUN messages start with a 20-byte header followed by zero or more
//! attributes:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |0 0|     STUN Message Type     |         Message Length        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                         Magic Cookie                          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     Transaction ID (96 bits)                  |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! The message length counts body bytes only. The magic cookie is carried
//! through untouched; RFC 3489 servers treat it as part of the transaction ID.
//!
//! The encoder writes at most one address or CHANGE-REQUEST attribute, picked
//! in the order MAPPED-ADDRESS, RESPONSE-ADDRESS, CHANGE-REQUEST,
//! SOURCE-ADDRESS, CHANGED-ADDRESS, followed by ERROR-CODE when present.
//! Discovery requests never need more than that.

use crate::attribute::{AttributeType, ChangeRequest, ErrorCode};
use crate::error::FormatError;
use rand::RngCore;
use std::net::{Ipv4Addr, SocketAddrV4};

/// STUN magic cookie (0x2112A442)
pub const MAGIC_COOKIE: u32 = 0x2112_A442;

/// STUN message header size (20 bytes)
pub const HEADER_SIZE: usize = 20;

/// Largest message this client produces or expects to receive
pub const MAX_MESSAGE_SIZE: usize = 512;

/// Transaction ID length in bytes
pub const TRANSACTION_ID_SIZE: usize = 12;

/// Opaque request/response correlation token
pub type TransactionId = [u8; TRANSACTION_ID_SIZE];

/// Address attribute value size: unused, family, port, IPv4 address
const ADDRESS_VALUE_SIZE: usize = 8;

/// CHANGE-REQUEST value size
const CHANGE_REQUEST_VALUE_SIZE: usize = 4;

/// ERROR-CODE fixed part: reserved, class, number
const ERROR_CODE_FIXED_SIZE: usize = 4;

/// Attribute header size: type and length
const ATTR_HEADER_SIZE: usize = 4;

/// IPv4 address family marker
const FAMILY_IPV4: u8 = 0x01;

/// Longest reason phrase that still fits in [`MAX_MESSAGE_SIZE`] next to an
/// address attribute
const MAX_REASON_SIZE: usize = MAX_MESSAGE_SIZE
    - HEADER_SIZE
    - (ATTR_HEADER_SIZE + ADDRESS_VALUE_SIZE)
    - (ATTR_HEADER_SIZE + ERROR_CODE_FIXED_SIZE);

/// STUN message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageType {
    /// Binding request
    BindingRequest = 0x0001,
    /// Binding success response
    BindingResponse = 0x0101,
    /// Binding error response
    BindingErrorResponse = 0x0111,
    /// Shared secret request
    SharedSecretRequest = 0x0002,
    /// Shared secret success response
    SharedSecretResponse = 0x0102,
    /// Shared secret error response
    SharedSecretErrorResponse = 0x0112,
}

impl MessageType {
    /// Look up a wire code
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        let message_type = match value {
            0x0001 => Self::BindingRequest,
            0x0101 => Self::BindingResponse,
            0x0111 => Self::BindingErrorResponse,
            0x0002 => Self::SharedSecretRequest,
            0x0102 => Self::SharedSecretResponse,
            0x0112 => Self::SharedSecretErrorResponse,
            _ => return None,
        };
        Some(message_type)
    }

    /// Wire code
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }
}

/// Generate a fresh random transaction ID
#[must_use]
pub fn new_transaction_id() -> TransactionId {
    let mut transaction_id = [0u8; TRANSACTION_ID_SIZE];
    rand::thread_rng().fill_bytes(&mut transaction_id);
    transaction_id
}

/// STUN message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message type
    pub message_type: MessageType,
    /// Transaction ID (96 bits)
    pub transaction_id: TransactionId,
    /// Magic cookie as read from or written to the header
    pub magic_cookie: u32,
    /// MAPPED-ADDRESS
    pub mapped_address: Option<SocketAddrV4>,
    /// RESPONSE-ADDRESS
    pub response_address: Option<SocketAddrV4>,
    /// SOURCE-ADDRESS
    pub source_address: Option<SocketAddrV4>,
    /// CHANGED-ADDRESS
    pub changed_address: Option<SocketAddrV4>,
    /// CHANGE-REQUEST
    pub change_request: Option<ChangeRequest>,
    /// ERROR-CODE
    pub error_code: Option<ErrorCode>,
}

impl Message {
    /// Create an empty message with a random transaction ID
    #[must_use]
    pub fn new(message_type: MessageType) -> Self {
        Self::with_transaction_id(message_type, new_transaction_id())
    }

    /// Create an empty message with a caller-chosen transaction ID
    #[must_use]
    pub fn with_transaction_id(message_type: MessageType, transaction_id: TransactionId) -> Self {
        Self {
            message_type,
            transaction_id,
            magic_cookie: MAGIC_COOKIE,
            mapped_address: None,
            response_address: None,
            source_address: None,
            changed_address: None,
            change_request: None,
            error_code: None,
        }
    }

    /// Create a plain Binding Request (Test I)
    #[must_use]
    pub fn binding_request() -> Self {
        Self::new(MessageType::BindingRequest)
    }

    /// Create a Binding Request carrying CHANGE-REQUEST flags (Tests II and III)
    #[must_use]
    pub fn binding_request_with_change(change_ip: bool, change_port: bool) -> Self {
        let mut message = Self::binding_request();
        message.change_request = Some(ChangeRequest::new(change_ip, change_port));
        message
    }

    /// Encode message to bytes
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(MAX_MESSAGE_SIZE);

        // Message Type (2 bytes), top two bits reserved
        let msg_type = self.message_type.as_u16() & 0x3FFF;
        bytes.extend_from_slice(&msg_type.to_be_bytes());

        // Message Length (2 bytes) - placeholder
        let length_offset = bytes.len();
        bytes.extend_from_slice(&[0u8; 2]);

        bytes.extend_from_slice(&self.magic_cookie.to_be_bytes());
        bytes.extend_from_slice(&self.transaction_id);

        if let Some(addr) = self.mapped_address {
            encode_address(&mut bytes, AttributeType::MappedAddress, addr);
        } else if let Some(addr) = self.response_address {
            encode_address(&mut bytes, AttributeType::ResponseAddress, addr);
        } else if let Some(change) = self.change_request {
            encode_change_request(&mut bytes, change);
        } else if let Some(addr) = self.source_address {
            encode_address(&mut bytes, AttributeType::SourceAddress, addr);
        } else if let Some(addr) = self.changed_address {
            encode_address(&mut bytes, AttributeType::ChangedAddress, addr);
        }

        if let Some(error_code) = &self.error_code {
            encode_error_code(&mut bytes, error_code);
        }

        // Update message length (excludes 20-byte header)
        let msg_length = (bytes.len() - HEADER_SIZE) as u16;
        bytes[length_offset..length_offset + 2].copy_from_slice(&msg_length.to_be_bytes());

        bytes
    }

    /// Decode message from bytes
    ///
    /// Attributes are consumed in order until the declared body length is
    /// reached. Unknown attributes are skipped by their length.
    ///
    /// # Errors
    ///
    /// Returns `FormatError` if the header is truncated, the message type is
    /// unknown, an attribute runs past the buffer, or an address attribute
    /// is not IPv4.
    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < HEADER_SIZE {
            return Err(FormatError::HeaderTruncated {
                actual: bytes.len(),
            });
        }

        let raw_type = u16::from_be_bytes([bytes[0], bytes[1]]);
        let message_type =
            MessageType::from_u16(raw_type).ok_or(FormatError::UnknownMessageType(raw_type))?;
        let msg_length = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
        let magic_cookie = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

        let mut transaction_id = [0u8; TRANSACTION_ID_SIZE];
        transaction_id.copy_from_slice(&bytes[8..HEADER_SIZE]);

        let mut message = Self::with_transaction_id(message_type, transaction_id);
        message.magic_cookie = magic_cookie;

        let mut offset = HEADER_SIZE;
        while offset - HEADER_SIZE < msg_length {
            let header = bytes
                .get(offset..offset + ATTR_HEADER_SIZE)
                .ok_or(FormatError::AttributeTruncated { offset })?;
            let attr_type = u16::from_be_bytes([header[0], header[1]]);
            let attr_length = u16::from_be_bytes([header[2], header[3]]) as usize;

            let value_start = offset + ATTR_HEADER_SIZE;
            let value = bytes
                .get(value_start..value_start + attr_length)
                .ok_or(FormatError::AttributeTruncated { offset })?;

            message.apply_attribute(attr_type, value)?;

            offset = value_start + attr_length;
        }

        Ok(message)
    }

    fn apply_attribute(&mut self, attr_type: u16, value: &[u8]) -> Result<(), FormatError> {
        let Some(attr) = AttributeType::from_u16(attr_type) else {
            return Ok(());
        };

        match attr {
            AttributeType::MappedAddress => {
                self.mapped_address = Some(decode_address(attr, value)?);
            }
            AttributeType::ResponseAddress => {
                self.response_address = Some(decode_address(attr, value)?);
            }
            AttributeType::SourceAddress => {
                self.source_address = Some(decode_address(attr, value)?);
            }
            AttributeType::ChangedAddress => {
                self.changed_address = Some(decode_address(attr, value)?);
            }
            AttributeType::ChangeRequest => {
                check_length(attr, value, CHANGE_REQUEST_VALUE_SIZE)?;
                // First three octets are reserved
                self.change_request = Some(ChangeRequest::from_flags(value[3]));
            }
            AttributeType::ErrorCode => {
                check_length(attr, value, ERROR_CODE_FIXED_SIZE)?;
                let reason = String::from_utf8_lossy(&value[ERROR_CODE_FIXED_SIZE..]);
                self.error_code = Some(ErrorCode::from_wire(value[2], value[3], reason));
            }
            // MESSAGE-INTEGRITY, UNKNOWN-ATTRIBUTES and the rest are recognized but not interpreted
            _ => {}
        }

        Ok(())
    }
}

fn check_length(attr: AttributeType, value: &[u8], expected: usize) -> Result<(), FormatError> {
    if value.len() < expected {
        return Err(FormatError::AttributeTooShort {
            attr_type: attr,
            expected,
            actual: value.len(),
        });
    }
    Ok(())
}

/// Address attribute value:
///
/// ```text
/// |x x x x x x x x|    Family     |           Port                |
/// |                             Address                           |
/// ```
fn decode_address(attr: AttributeType, value: &[u8]) -> Result<SocketAddrV4, FormatError> {
    check_length(attr, value, ADDRESS_VALUE_SIZE)?;

    let family = value[1];
    if family != FAMILY_IPV4 {
        return Err(FormatError::UnsupportedAddressFamily(family));
    }

    let port = u16::from_be_bytes([value[2], value[3]]);
    let ip = Ipv4Addr::new(value[4], value[5], value[6], value[7]);
    Ok(SocketAddrV4::new(ip, port))
}

fn encode_address(bytes: &mut Vec<u8>, attr: AttributeType, addr: SocketAddrV4) {
    bytes.extend_from_slice(&attr.as_u16().to_be_bytes());
    bytes.extend_from_slice(&(ADDRESS_VALUE_SIZE as u16).to_be_bytes());
    bytes.push(0);
    bytes.push(FAMILY_IPV4);
    bytes.extend_from_slice(&addr.port().to_be_bytes());
    bytes.extend_from_slice(&addr.ip().octets());
}

/// Append an IPv4 address attribute to an already encoded message and fix up
/// the header length.
///
/// [`Message::encode`] writes a single address attribute; responders that
/// need MAPPED-ADDRESS next to CHANGED-ADDRESS add the rest with this.
///
/// # Errors
///
/// Returns `FormatError::HeaderTruncated` if `bytes` is shorter than a STUN
/// header; `bytes` is left untouched.
pub fn append_address_attribute(
    bytes: &mut Vec<u8>,
    attr: AttributeType,
    addr: SocketAddrV4,
) -> Result<(), FormatError> {
    if bytes.len() < HEADER_SIZE {
        return Err(FormatError::HeaderTruncated {
            actual: bytes.len(),
        });
    }
    encode_address(bytes, attr, addr);
    let msg_length = (bytes.len() - HEADER_SIZE) as u16;
    bytes[2..4].copy_from_slice(&msg_length.to_be_bytes());
    Ok(())
}

fn encode_change_request(bytes: &mut Vec<u8>, change: ChangeRequest) {
    bytes.extend_from_slice(&AttributeType::ChangeRequest.as_u16().to_be_bytes());
    bytes.extend_from_slice(&(CHANGE_REQUEST_VALUE_SIZE as u16).to_be_bytes());
    bytes.extend_from_slice(&[0, 0, 0, change.flags()]);
}

/// ERROR-CODE value (RFC 3489 Section 11.2.9):
///
/// ```text
/// |                   0                     |Class|     Number    |
/// |      Reason Phrase (variable)                                ..
/// ```
fn encode_error_code(bytes: &mut Vec<u8>, error_code: &ErrorCode) {
    let reason = error_code.reason();
    let mut end = reason.len().min(MAX_REASON_SIZE);
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    let reason = &reason.as_bytes()[..end];

    bytes.extend_from_slice(&AttributeType::ErrorCode.as_u16().to_be_bytes());
    bytes.extend_from_slice(&((ERROR_CODE_FIXED_SIZE + reason.len()) as u16).to_be_bytes());
    bytes.extend_from_slice(&[0, 0, error_code.class(), error_code.number()]);
    bytes.extend_from_slice(reason);
}
