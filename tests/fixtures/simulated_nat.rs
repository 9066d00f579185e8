//! In-memory NAT and STUN server model
//!
//! The server listens on [`SERVER_PRIMARY`] and [`SERVER_ALTERNATE`] and
//! honors CHANGE-REQUEST by answering from the other IP and/or port. The NAT
//! between client and server rewrites the client's address according to
//! [`Mapping`] and drops inbound datagrams according to [`Filtering`].

use super::binding_response;
use async_trait::async_trait;
use natprobe::{Message, StunSocket};
use std::collections::{HashSet, VecDeque};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Mutex;
use tracing::trace;

/// Primary STUN server address
pub const SERVER_PRIMARY: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(192, 0, 2, 10), 3478);

/// Alternate STUN server address, advertised as CHANGED-ADDRESS
pub const SERVER_ALTERNATE: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(192, 0, 2, 11), 3479);

/// How the NAT picks the public address for an outbound flow
#[derive(Debug, Clone, Copy)]
pub enum Mapping {
    /// No translation: the server sees the client's own address
    Direct,
    /// One public address for every destination
    EndpointIndependent(SocketAddrV4),
    /// Public IP depends on the destination IP; the port is preserved
    PerDestinationIp {
        /// Used towards the primary server IP
        primary: SocketAddrV4,
        /// IP used towards any other destination
        other_ip: Ipv4Addr,
    },
}

/// Which inbound datagrams the NAT or firewall lets through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filtering {
    /// Everything is admitted
    Open,
    /// Only sources whose IP the client has sent to
    AddressDependent,
    /// Only exact sources the client has sent to
    AddressAndPortDependent,
}

/// Client socket behind a simulated NAT
pub struct SimulatedNat {
    local: SocketAddrV4,
    mapping: Mapping,
    filtering: Filtering,
    blocked: bool,
    hairpin: bool,
    alternate_down: bool,
    contacted: Mutex<HashSet<SocketAddrV4>>,
    inbox: Mutex<VecDeque<Vec<u8>>>,
    sent: Mutex<Vec<(Message, SocketAddr)>>,
}

impl SimulatedNat {
    /// Client at `local` behind the given mapping and filtering
    pub fn new(local: SocketAddrV4, mapping: Mapping, filtering: Filtering) -> Self {
        Self {
            local,
            mapping,
            filtering,
            blocked: false,
            hairpin: false,
            alternate_down: false,
            contacted: Mutex::new(HashSet::new()),
            inbox: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Drop all UDP traffic
    pub fn blocked(mut self) -> Self {
        self.blocked = true;
        self
    }

    /// Loop datagrams addressed to the client's own public address back to it
    pub fn with_hairpin(mut self) -> Self {
        self.hairpin = true;
        self
    }

    /// Take the alternate server offline while it is still advertised
    pub fn without_alternate_server(mut self) -> Self {
        self.alternate_down = true;
        self
    }

    /// Client's own bound address
    pub fn local_addr(&self) -> SocketAddr {
        SocketAddr::V4(self.local)
    }

    /// Every request the client sent, with its destination
    pub fn sent(&self) -> Vec<(Message, SocketAddr)> {
        self.sent.lock().unwrap().clone()
    }

    fn public_for(&self, destination: SocketAddrV4) -> SocketAddrV4 {
        match self.mapping {
            Mapping::Direct => self.local,
            Mapping::EndpointIndependent(public) => public,
            Mapping::PerDestinationIp { primary, other_ip } => {
                if destination.ip() == SERVER_PRIMARY.ip() {
                    primary
                } else {
                    SocketAddrV4::new(other_ip, primary.port())
                }
            }
        }
    }

    fn owns_public(&self, addr: SocketAddrV4) -> bool {
        [SERVER_PRIMARY, SERVER_ALTERNATE]
            .iter()
            .any(|server| self.public_for(*server) == addr)
    }

    fn admits(&self, source: SocketAddrV4) -> bool {
        let contacted = self.contacted.lock().unwrap();
        match self.filtering {
            Filtering::Open => true,
            Filtering::AddressDependent => contacted.iter().any(|c| c.ip() == source.ip()),
            Filtering::AddressAndPortDependent => contacted.contains(&source),
        }
    }

    /// Server-side handling of a request that reached `server`
    fn serve(&self, request: &Message, server: SocketAddrV4) -> (SocketAddrV4, Vec<u8>) {
        let other = if server == SERVER_PRIMARY {
            SERVER_ALTERNATE
        } else {
            SERVER_PRIMARY
        };
        let change = request.change_request.unwrap_or_default();
        let source_ip = if change.change_ip() {
            *other.ip()
        } else {
            *server.ip()
        };
        let source_port = if change.change_port() {
            other.port()
        } else {
            server.port()
        };

        let mapped = self.public_for(server);
        let reply = binding_response(request, mapped, Some(SERVER_ALTERNATE));
        (SocketAddrV4::new(source_ip, source_port), reply)
    }
}

#[async_trait]
impl StunSocket for SimulatedNat {
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        let request = Message::decode(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.sent.lock().unwrap().push((request.clone(), target));

        if self.blocked {
            return Ok(buf.len());
        }

        let SocketAddr::V4(target) = target else {
            return Err(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "simulated network is IPv4 only",
            ));
        };
        self.contacted.lock().unwrap().insert(target);

        let server_up =
            target == SERVER_PRIMARY || (target == SERVER_ALTERNATE && !self.alternate_down);
        let delivery = if server_up {
            Some(self.serve(&request, target))
        } else if self.hairpin && self.owns_public(target) {
            Some((target, buf.to_vec()))
        } else {
            None
        };

        match delivery {
            Some((source, datagram)) if self.admits(source) => {
                self.inbox.lock().unwrap().push_back(datagram);
            }
            Some((source, _)) => trace!(%source, "filtered inbound datagram"),
            None => trace!(%target, "nothing listening"),
        }

        Ok(buf.len())
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let next = self.inbox.lock().unwrap().pop_front();
        match next {
            Some(datagram) => {
                let len = datagram.len().min(buf.len());
                buf[..len].copy_from_slice(&datagram[..len]);
                Ok((len, SocketAddr::V4(SERVER_PRIMARY)))
            }
            None => std::future::pending().await,
        }
    }
}
