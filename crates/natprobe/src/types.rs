//! NAT classification outcome types

use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;

/// NAT type classification (RFC 3489 Section 10.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum NatType {
    /// UDP is blocked
    UdpBlocked,
    /// No NAT, public IP, no firewall
    OpenInternet,
    /// No NAT, public IP, but a symmetric UDP firewall
    SymmetricUdpFirewall,
    /// Any external host can send to the mapped address
    FullCone,
    /// Only hosts the client has sent to (by IP) can send back
    RestrictedCone,
    /// Only hosts the client has sent to (by IP and port) can send back
    PortRestrictedCone,
    /// Different mapping per destination
    Symmetric,
    /// Classification not performed
    #[default]
    Unknown,
}

impl NatType {
    /// All variants in display-table order
    pub const ALL: [Self; 8] = [
        Self::UdpBlocked,
        Self::OpenInternet,
        Self::SymmetricUdpFirewall,
        Self::FullCone,
        Self::RestrictedCone,
        Self::PortRestrictedCone,
        Self::Symmetric,
        Self::Unknown,
    ];

    /// Short display name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UdpBlocked => "UdpBlocked",
            Self::OpenInternet => "OpenInternet",
            Self::SymmetricUdpFirewall => "SymmetricUdpFirewall",
            Self::FullCone => "FullCone",
            Self::RestrictedCone => "RestrictedCone",
            Self::PortRestrictedCone => "PortRestrictedCone",
            Self::Symmetric => "Symmetric",
            Self::Unknown => "Unknown",
        }
    }

    /// One-line description of the mapping and filtering behavior
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UdpBlocked => "UDP traffic to the STUN server is blocked",
            Self::OpenInternet => "public address, no NAT and no firewall",
            Self::SymmetricUdpFirewall => {
                "public address behind a firewall that only admits replies from contacted endpoints"
            }
            Self::FullCone => "any external host can reach the mapped address",
            Self::RestrictedCone => "external hosts can reach the mapped address once contacted by IP",
            Self::PortRestrictedCone => {
                "external hosts can reach the mapped address once contacted by IP and port"
            }
            Self::Symmetric => "each destination gets its own mapping",
            Self::Unknown => "NAT behavior could not be determined",
        }
    }

    /// Whether a NAT device rewrites the client's address
    #[must_use]
    pub const fn is_behind_nat(self) -> bool {
        matches!(
            self,
            Self::FullCone | Self::RestrictedCone | Self::PortRestrictedCone | Self::Symmetric
        )
    }
}

impl fmt::Display for NatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Final output of a classification run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiscoveryResult {
    nat_type: NatType,
    public_ip: Option<Ipv4Addr>,
}

impl DiscoveryResult {
    /// Create a new result
    #[must_use]
    pub const fn new(nat_type: NatType, public_ip: Option<Ipv4Addr>) -> Self {
        Self { nat_type, public_ip }
    }

    /// Detected NAT type
    #[must_use]
    pub const fn nat_type(&self) -> NatType {
        self.nat_type
    }

    /// Externally visible IPv4 address, absent when UDP is blocked
    #[must_use]
    pub const fn public_ip(&self) -> Option<Ipv4Addr> {
        self.public_ip
    }
}

impl fmt::Display for DiscoveryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.public_ip {
            Some(ip) => write!(f, "{} ({ip})", self.nat_type),
            None => write!(f, "{}", self.nat_type),
        }
    }
}
