//! Test fixtures
//!
//! - [`SimulatedNat`]: an in-memory socket that behaves like a client behind a
//!   configurable NAT talking to a two-address STUN server
//! - [`StunResponder`]: a real UDP STUN responder on loopback

mod simulated_nat;
mod stun_responder;

pub use simulated_nat::{Filtering, Mapping, SERVER_ALTERNATE, SERVER_PRIMARY, SimulatedNat};
pub use stun_responder::{ResponderOptions, StunResponder};

use natprobe::message::append_address_attribute;
use natprobe::{AttributeType, Message, MessageType};
use std::net::SocketAddrV4;

/// Encode a Binding Response for `request` carrying MAPPED-ADDRESS, and
/// CHANGED-ADDRESS when given
pub fn binding_response(
    request: &Message,
    mapped: SocketAddrV4,
    changed: Option<SocketAddrV4>,
) -> Vec<u8> {
    let mut response =
        Message::with_transaction_id(MessageType::BindingResponse, request.transaction_id);
    response.mapped_address = Some(mapped);
    let mut bytes = response.encode();
    if let Some(changed) = changed {
        append_address_attribute(&mut bytes, AttributeType::ChangedAddress, changed)
            .expect("encoded response has a header");
    }
    bytes
}
