//! Fuzz target for STUN message encoding
//!
//! Builds messages from arbitrary field values and checks that every encoded
//! message decodes again within the size limit.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use natprobe::message::MAX_MESSAGE_SIZE;
use natprobe::{ChangeRequest, ErrorCode, Message, MessageType};
use std::net::{Ipv4Addr, SocketAddrV4};

#[derive(Debug, Arbitrary)]
struct MessageInput {
    message_type: u8,
    transaction_id: [u8; 12],
    mapped: Option<([u8; 4], u16)>,
    change: Option<(bool, bool)>,
    error: Option<(u16, String)>,
}

fuzz_target!(|input: MessageInput| {
    let message_type = match input.message_type % 6 {
        0 => MessageType::BindingRequest,
        1 => MessageType::BindingResponse,
        2 => MessageType::BindingErrorResponse,
        3 => MessageType::SharedSecretRequest,
        4 => MessageType::SharedSecretResponse,
        _ => MessageType::SharedSecretErrorResponse,
    };

    let mut message = Message::with_transaction_id(message_type, input.transaction_id);
    message.mapped_address = input
        .mapped
        .map(|(ip, port)| SocketAddrV4::new(Ipv4Addr::from(ip), port));
    message.change_request = input
        .change
        .map(|(change_ip, change_port)| ChangeRequest::new(change_ip, change_port));
    message.error_code = match input.error {
        Some((code, reason)) => match ErrorCode::new(code, reason) {
            Ok(error_code) => Some(error_code),
            Err(_) => {
                assert!(code > ErrorCode::MAX_CODE);
                None
            }
        },
        None => None,
    };

    let encoded = message.encode();
    assert!(encoded.len() <= MAX_MESSAGE_SIZE);

    let decoded = Message::decode(&encoded).expect("encoded message must decode");
    assert_eq!(decoded.transaction_id, message.transaction_id);
    assert_eq!(decoded.message_type, message.message_type);
    if let Some(error_code) = &message.error_code {
        assert_eq!(decoded.error_code.as_ref().map(ErrorCode::code), Some(error_code.code()));
    }
});
