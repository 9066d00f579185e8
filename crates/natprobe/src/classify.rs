//! NAT type classification (RFC 3489 Section 10.1 discovery procedure)
//!
//! Test I sends a plain Binding Request. Test II asks the server to answer
//! from a different IP and port. Test III asks for a different port only.
//!
//! ```text
//! Test I ── no response ──────────────────────────────────────▶ UdpBlocked
//!   │
//!   ├─ mapped IP == local IP ─▶ Test II ── response ──────────▶ OpenInternet
//!   │                                  └── no response ───────▶ SymmetricUdpFirewall
//!   │
//!   └─ mapped IP != local IP ─▶ Test II ── response ──────────▶ FullCone
//!                                      └── no response
//!                                            │
//!                           Test I to CHANGED-ADDRESS ── no response ─▶ error
//!                                            │
//!                   IP differs, same port ───┼──────────────────▶ Symmetric
//!                                            │
//!                                       Test III ── response ─▶ RestrictedCone
//!                                                └─ no response ─▶ PortRestrictedCone
//! ```

use crate::attribute::AttributeType;
use crate::error::{ProtocolError, StunResult};
use crate::message::Message;
use crate::socket::StunSocket;
use crate::transaction::{MAX_ATTEMPTS, execute_with_attempts};
use crate::types::{DiscoveryResult, NatType};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Deadline for the first Test I probe
pub const INITIAL_TIMEOUT: Duration = Duration::from_millis(100);

/// Deadline for every later transaction
pub const TRANSACTION_TIMEOUT: Duration = Duration::from_millis(1000);

/// Timing knobs for a classification run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Per-attempt deadline for the first Test I
    pub initial_timeout: Duration,
    /// Per-attempt deadline for Tests II, III and the repeated Test I
    pub transaction_timeout: Duration,
    /// Attempts per transaction
    pub max_attempts: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            initial_timeout: INITIAL_TIMEOUT,
            transaction_timeout: TRANSACTION_TIMEOUT,
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

impl ProbeConfig {
    /// Upper bound on the wall-clock cost of one run: at most four
    /// transactions, each send and receive bounded by its deadline
    #[must_use]
    pub fn worst_case_duration(&self) -> Duration {
        let per_attempt_first = self.initial_timeout * 2;
        let per_attempt_rest = self.transaction_timeout * 2;
        (per_attempt_first + per_attempt_rest * 3) * self.max_attempts
    }
}

/// Runs the discovery flowchart against one STUN server
#[derive(Debug, Clone, Default)]
pub struct NatClassifier {
    config: ProbeConfig,
}

impl NatClassifier {
    /// Create a classifier with default timings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a classifier with custom timings
    #[must_use]
    pub fn with_config(config: ProbeConfig) -> Self {
        Self { config }
    }

    /// Timings in use
    #[must_use]
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Classify the NAT between `socket` and `server`.
    ///
    /// `local` is the address `socket` is bound to; only its IP is compared
    /// against the mapped address to decide whether a NAT is present.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::NoResponseToRepeatedTest` when the probe to the
    ///   server's CHANGED-ADDRESS goes unanswered.
    /// - `ProtocolError::MissingAttribute` when a response lacks the
    ///   MAPPED-ADDRESS or CHANGED-ADDRESS the next step needs.
    ///
    /// Transaction failures are otherwise treated as "no response".
    ///
    /// Every test uses a fresh transaction ID and a mismatched reply ends a
    /// transaction at once. A duplicate answer to an earlier Test I
    /// retransmission that arrives during a later test therefore reads as
    /// "no response" to that test. Expect this on paths whose round trip
    /// exceeds the initial timeout.
    pub async fn classify<S: StunSocket + ?Sized>(
        &self,
        server: SocketAddr,
        socket: &S,
        local: SocketAddr,
    ) -> StunResult<DiscoveryResult> {
        let Some(test1) = self
            .probe(
                "Test I",
                Message::binding_request(),
                socket,
                server,
                self.config.initial_timeout,
            )
            .await
        else {
            return Ok(Self::finish(NatType::UdpBlocked, None));
        };

        let mapped = required(test1.mapped_address, AttributeType::MappedAddress)?;
        let public_ip = Some(*mapped.ip());
        let behind_nat = local.ip() != IpAddr::V4(*mapped.ip());
        debug!(%local, %mapped, behind_nat, "Test I answered");

        let test2 = self
            .probe(
                "Test II",
                Message::binding_request_with_change(true, true),
                socket,
                server,
                self.config.transaction_timeout,
            )
            .await;

        if !behind_nat {
            let nat_type = if test2.is_some() {
                NatType::OpenInternet
            } else {
                NatType::SymmetricUdpFirewall
            };
            return Ok(Self::finish(nat_type, public_ip));
        }

        if test2.is_some() {
            return Ok(Self::finish(NatType::FullCone, public_ip));
        }

        let changed = required(test1.changed_address, AttributeType::ChangedAddress)?;
        let Some(repeated) = self
            .probe(
                "Test I (changed address)",
                Message::binding_request(),
                socket,
                SocketAddr::V4(changed),
                self.config.transaction_timeout,
            )
            .await
        else {
            warn!(%changed, "repeated Test I got no response");
            return Err(ProtocolError::NoResponseToRepeatedTest.into());
        };

        let remapped = required(repeated.mapped_address, AttributeType::MappedAddress)?;
        debug!(%mapped, %remapped, "repeated Test I answered");
        if remapped.ip() != mapped.ip() && remapped.port() == mapped.port() {
            return Ok(Self::finish(NatType::Symmetric, public_ip));
        }

        let test3 = self
            .probe(
                "Test III",
                Message::binding_request_with_change(false, true),
                socket,
                SocketAddr::V4(mapped),
                self.config.transaction_timeout,
            )
            .await;

        let nat_type = if test3.is_some() {
            NatType::RestrictedCone
        } else {
            NatType::PortRestrictedCone
        };
        Ok(Self::finish(nat_type, public_ip))
    }

    async fn probe<S: StunSocket + ?Sized>(
        &self,
        step: &'static str,
        request: Message,
        socket: &S,
        target: SocketAddr,
        deadline: Duration,
    ) -> Option<Message> {
        debug!(step, %target, change_request = ?request.change_request, "sending probe");
        match execute_with_attempts(&request, socket, target, deadline, self.config.max_attempts)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(step, %target, error = %e, "transaction failed, treating as no response");
                None
            }
        }
    }

    fn finish(nat_type: NatType, public_ip: Option<Ipv4Addr>) -> DiscoveryResult {
        let result = DiscoveryResult::new(nat_type, public_ip);
        info!(nat_type = %nat_type, public_ip = ?public_ip, "NAT classification complete");
        result
    }
}

fn required(addr: Option<SocketAddrV4>, attr: AttributeType) -> Result<SocketAddrV4, ProtocolError> {
    addr.ok_or(ProtocolError::MissingAttribute(attr))
}

/// Classify with default timings. See [`NatClassifier::classify`].
///
/// # Errors
///
/// See [`NatClassifier::classify`].
pub async fn classify<S: StunSocket + ?Sized>(
    server: SocketAddr,
    socket: &S,
    local: SocketAddr,
) -> StunResult<DiscoveryResult> {
    NatClassifier::new().classify(server, socket, local).await
}
