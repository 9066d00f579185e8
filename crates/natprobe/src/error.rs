//! Error types for STUN message handling and NAT classification.

use crate::attribute::AttributeType;
use thiserror::Error;

/// Top-level error for every fallible natprobe operation
#[derive(Debug, Error)]
pub enum StunError {
    /// Malformed datagram on the decode path
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    /// Response could not be correlated with the outstanding request
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Classification reached a step it cannot continue from
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Address resolution or socket setup failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Codec errors raised while building or decoding a STUN message
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Fewer than 20 bytes available
    #[error("header truncated: expected at least 20 bytes, got {actual}")]
    HeaderTruncated {
        /// Bytes actually available
        actual: usize,
    },

    /// Message type is not one of the six defined codes
    #[error("unknown message type: 0x{0:04X}")]
    UnknownMessageType(u16),

    /// Attribute header or value runs past the end of the buffer
    #[error("attribute truncated at offset {offset}")]
    AttributeTruncated {
        /// Offset of the attribute header
        offset: usize,
    },

    /// ERROR-CODE value whose class does not fit in three bits
    #[error("error code {0} out of range (max 799)")]
    ErrorCodeOutOfRange(u16),

    /// Address family byte other than IPv4
    #[error("unsupported address family: 0x{0:02X}")]
    UnsupportedAddressFamily(u8),

    /// Declared attribute length too short for its fixed layout
    #[error("{attr_type} value too short: need {expected} bytes, got {actual}")]
    AttributeTooShort {
        /// Attribute being decoded
        attr_type: AttributeType,
        /// Minimum value length for this attribute
        expected: usize,
        /// Declared value length
        actual: usize,
    },
}

/// Transaction-level errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Response carried a transaction ID other than the request's
    #[error("transaction id mismatch: expected {}, received {}", hex::encode(.expected), hex::encode(.received))]
    TransactionIdMismatch {
        /// Transaction ID of the outstanding request
        expected: [u8; 12],
        /// Transaction ID found in the response
        received: [u8; 12],
    },
}

/// Classification errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The CHANGED-ADDRESS probe went unanswered, NAT type undetermined
    #[error("no response to repeated Test I")]
    NoResponseToRepeatedTest,

    /// A response lacked an attribute the discovery flowchart depends on
    #[error("response is missing the {0} attribute")]
    MissingAttribute(AttributeType),
}

/// Result alias used throughout the crate
pub type StunResult<T> = Result<T, StunError>;
