//! Minimal STUN server on a real loopback UDP socket

use super::binding_response;
use natprobe::{MAGIC_COOKIE, Message, MessageType};
use std::io;
use std::net::{SocketAddr, SocketAddrV4};
use std::sync::{Arc, Mutex};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::debug;

/// Responder behavior
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponderOptions {
    /// Answer requests carrying CHANGE-REQUEST flags. The responder has a
    /// single address, so it answers from it either way.
    pub honor_change_requests: bool,
    /// Advertised CHANGED-ADDRESS
    pub changed_address: Option<SocketAddrV4>,
    /// Never answer anything
    pub silent: bool,
}

/// STUN responder task bound to 127.0.0.1, stopped on drop
pub struct StunResponder {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Message>>>,
    task: JoinHandle<()>,
}

impl StunResponder {
    /// Bind an ephemeral loopback port and start answering
    pub async fn spawn(options: ResponderOptions) -> io::Result<Self> {
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        let addr = socket.local_addr()?;
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&requests);
        let task = tokio::spawn(async move {
            let mut buf = [0u8; 1500];
            loop {
                let Ok((len, from)) = socket.recv_from(&mut buf).await else {
                    break;
                };
                let Ok(request) = Message::decode(&buf[..len]) else {
                    continue;
                };
                seen.lock().unwrap().push(request.clone());

                if options.silent || request.message_type != MessageType::BindingRequest {
                    continue;
                }
                let wants_change = request
                    .change_request
                    .is_some_and(|c| c.change_ip() || c.change_port());
                if wants_change && !options.honor_change_requests {
                    debug!(%from, "ignoring change request");
                    continue;
                }

                let SocketAddr::V4(mapped) = from else {
                    continue;
                };
                let reply = binding_response(&request, mapped, options.changed_address);
                let _ = socket.send_to(&reply, from).await;
            }
        });

        Ok(Self {
            addr,
            requests,
            task,
        })
    }

    /// Address clients should send to
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<Message> {
        self.requests.lock().unwrap().clone()
    }

    /// Whether every received request carried the RFC 5389 magic cookie
    pub fn all_requests_carry_cookie(&self) -> bool {
        self.requests()
            .iter()
            .all(|request| request.magic_cookie == MAGIC_COOKIE)
    }
}

impl Drop for StunResponder {
    fn drop(&mut self) {
        self.task.abort();
    }
}
