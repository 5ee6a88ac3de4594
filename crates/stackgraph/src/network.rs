//! Ingress rules scoped to the operator's address

use crate::error::{Error, Result};
use crate::graph::ResourceGraph;
use crate::types::{PropertyValue, ResourceKind, ResourceRef, properties};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Logical name of the rule set resource
pub const SECURITY_GROUP: &str = "SecurityGroup";

/// Default SSH control port
pub const SSH_PORT: u16 = 22;

/// A single resolved host address
///
/// Always rendered as the narrowest block containing it: `/32` for IPv4,
/// `/128` for IPv6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkAddress(IpAddr);

impl NetworkAddress {
    pub fn new(address: IpAddr) -> Self {
        Self(address)
    }

    pub fn address(&self) -> IpAddr {
        self.0
    }

    pub fn is_ipv6(&self) -> bool {
        self.0.is_ipv6()
    }

    /// Prefix length of a single-host block
    pub fn prefix_length(&self) -> u8 {
        match self.0 {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        }
    }

    /// Single-host CIDR block, e.g. `203.0.113.7/32`
    pub fn cidr(&self) -> String {
        format!("{}/{}", self.0, self.prefix_length())
    }
}

impl From<IpAddr> for NetworkAddress {
    fn from(address: IpAddr) -> Self {
        Self(address)
    }
}

impl FromStr for NetworkAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        IpAddr::from_str(trimmed)
            .map(Self)
            .map_err(|_| Error::resolution(format!("not an IP address: {trimmed:?}")))
    }
}

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One TCP ingress rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRule {
    pub protocol: String,
    pub from_port: u16,
    pub to_port: u16,
    pub source: NetworkAddress,
}

impl IngressRule {
    /// TCP access on a single port
    pub fn tcp(port: u16, source: NetworkAddress) -> Self {
        Self {
            protocol: "tcp".to_string(),
            from_port: port,
            to_port: port,
            source,
        }
    }

    fn to_property(&self) -> PropertyValue {
        let cidr_key = if self.source.is_ipv6() {
            "CidrIpv6"
        } else {
            "CidrIp"
        };
        PropertyValue::map([
            ("IpProtocol", PropertyValue::from(self.protocol.as_str())),
            ("FromPort", PropertyValue::from(self.from_port)),
            ("ToPort", PropertyValue::from(self.to_port)),
            (cidr_key, PropertyValue::from(self.source.cidr())),
        ])
    }
}

/// Rule set admitting SSH and application traffic from one address
#[derive(Debug, Clone)]
pub struct NetworkPolicy {
    pub application_port: u16,
    pub source: NetworkAddress,
}

impl NetworkPolicy {
    pub fn new(source: NetworkAddress, application_port: u16) -> Self {
        Self {
            application_port,
            source,
        }
    }

    /// SSH rule first, then the application rule
    pub fn rules(&self) -> Vec<IngressRule> {
        vec![
            IngressRule::tcp(SSH_PORT, self.source),
            IngressRule::tcp(self.application_port, self.source),
        ]
    }

    pub fn description(&self) -> String {
        format!("Allow SSH and TCP/{} access", self.application_port)
    }

    /// Register the rule set resource
    pub fn declare(&self, graph: &mut ResourceGraph) -> Result<ResourceRef> {
        log::info!("restricting ingress to {}", self.source.cidr());
        let rules = self.rules().iter().map(IngressRule::to_property).collect();
        graph.declare_resource(
            ResourceKind::Ec2SecurityGroup,
            SECURITY_GROUP,
            properties([
                ("GroupDescription", PropertyValue::from(self.description())),
                ("SecurityGroupIngress", PropertyValue::List(rules)),
            ]),
        )
    }
}
