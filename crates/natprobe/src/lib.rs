//! # natprobe
//!
//! Client-side STUN (RFC 3489 with the RFC 5389 header layout) for
//! classifying the NAT between this host and the Internet.
//!
//! This crate provides:
//! - A STUN message codec for the attributes NAT discovery needs
//! - A request/response transaction engine with bounded retries
//! - The RFC 3489 discovery flowchart producing a [`NatType`]
//!
//! ## Example
//!
//! ```rust,no_run
//! # async fn run() -> natprobe::StunResult<()> {
//! let result = natprobe::query("stun.example.org:3478", "0.0.0.0:0").await?;
//! println!("{} {:?}", result.nat_type(), result.public_ip());
//! # Ok(())
//! # }
//! ```
//!
//! Only IPv4 is supported. Classification is strictly sequential: every
//! probe waits for its own response or deadline before the next is sent.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attribute;
pub mod classify;
pub mod error;
pub mod message;
pub mod query;
pub mod socket;
pub mod transaction;
pub mod types;

// Re-export commonly used types
pub use attribute::{AttributeType, ChangeRequest, ErrorCode};
pub use classify::{NatClassifier, ProbeConfig, classify};
pub use error::{FormatError, ProtocolError, StunError, StunResult, TransportError};
pub use message::{MAGIC_COOKIE, Message, MessageType, TransactionId};
pub use query::{query, query_with, query_with_socket, resolve_ipv4};
pub use socket::StunSocket;
pub use types::{DiscoveryResult, NatType};

/// Encode a message to its wire form. See [`Message::encode`].
#[must_use]
pub fn encode(message: &Message) -> Vec<u8> {
    message.encode()
}

/// Decode a message from its wire form. See [`Message::decode`].
///
/// # Errors
///
/// Returns `FormatError` when `bytes` is not a well-formed STUN message.
pub fn decode(bytes: &[u8]) -> Result<Message, FormatError> {
    Message::decode(bytes)
}
