use std::fmt;
use std::net::{IpAddr, SocketAddr};

use super::{OnionAddr, OnionVersion, WsAddr};
use crate::error::CodecError;

/// Leading tag byte of a persisted address record.
///
/// Tag values are part of the storage format: they are permanently assigned
/// and never reordered or reused, so records written by any release stay
/// decodable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AddressType {
    /// IPv4 TCP endpoint.
    Tcp4 = 0,
    /// IPv6 TCP endpoint.
    Tcp6 = 1,
    /// Tor v2 onion service (deprecated by Tor, still decodable).
    OnionV2 = 2,
    /// Tor v3 onion service.
    OnionV3 = 3,
    /// Browser-reachable WebSocket URL.
    WebSocket = 4,
}

impl AddressType {
    /// Wire tag value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Width of the record body following the tag, or `None` when the
    /// record is variable-width.
    pub fn body_len(self) -> Option<usize> {
        match self {
            Self::Tcp4 => Some(4 + 2),
            Self::Tcp6 => Some(16 + 2),
            Self::OnionV2 => Some(super::V2_DECODED_LEN + 2),
            Self::OnionV3 => Some(super::V3_KEY_LEN + 2),
            Self::WebSocket => None,
        }
    }

    /// Short human-readable name, used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Tcp4 => "tcp4",
            Self::Tcp6 => "tcp6",
            Self::OnionV2 => "onion v2",
            Self::OnionV3 => "onion v3",
            Self::WebSocket => "websocket",
        }
    }
}

impl TryFrom<u8> for AddressType {
    type Error = CodecError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::Tcp4),
            1 => Ok(Self::Tcp6),
            2 => Ok(Self::OnionV2),
            3 => Ok(Self::OnionV3),
            4 => Ok(Self::WebSocket),
            other => Err(CodecError::UnknownAddressType(other)),
        }
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A peer network endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NetAddress {
    /// Plain TCP endpoint, IPv4 or IPv6.
    Tcp(SocketAddr),
    /// Tor onion service endpoint.
    Onion(OnionAddr),
    /// WebSocket endpoint dialed through the host runtime.
    WebSocket(WsAddr),
    /// One end of an in-process pipe. Has no persisted form.
    Pipe,
}

impl NetAddress {
    /// Network name, in the style of `net.Addr::Network`.
    pub fn network(&self) -> &'static str {
        match self {
            Self::Tcp(_) => "tcp",
            Self::Onion(_) => "onion",
            Self::WebSocket(ws) => ws.scheme().as_str(),
            Self::Pipe => "pipe",
        }
    }

    /// Tag this address is persisted under, if it has a persisted form.
    ///
    /// IPv4-mapped IPv6 endpoints persist in their 4-byte form. Onion names
    /// of unrecognized length have no tag.
    pub fn address_type(&self) -> Option<AddressType> {
        match self {
            Self::Tcp(sock) => Some(match sock.ip() {
                IpAddr::V4(_) => AddressType::Tcp4,
                IpAddr::V6(v6) if v6.to_ipv4_mapped().is_some() => AddressType::Tcp4,
                IpAddr::V6(_) => AddressType::Tcp6,
            }),
            Self::Onion(onion) => onion.version().map(|v| match v {
                OnionVersion::V2 => AddressType::OnionV2,
                OnionVersion::V3 => AddressType::OnionV3,
            }),
            Self::WebSocket(_) => Some(AddressType::WebSocket),
            Self::Pipe => None,
        }
    }

    /// Port component, when the address has one.
    pub fn port(&self) -> Option<u16> {
        match self {
            Self::Tcp(sock) => Some(sock.port()),
            Self::Onion(onion) => Some(onion.port()),
            Self::WebSocket(_) | Self::Pipe => None,
        }
    }
}

impl From<SocketAddr> for NetAddress {
    fn from(addr: SocketAddr) -> Self {
        Self::Tcp(addr)
    }
}

impl From<OnionAddr> for NetAddress {
    fn from(addr: OnionAddr) -> Self {
        Self::Onion(addr)
    }
}

impl From<WsAddr> for NetAddress {
    fn from(addr: WsAddr) -> Self {
        Self::WebSocket(addr)
    }
}

impl fmt::Display for NetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(sock) => write!(f, "{sock}"),
            Self::Onion(onion) => write!(f, "{onion}"),
            Self::WebSocket(ws) => write!(f, "{ws}"),
            Self::Pipe => f.write_str("pipe"),
        }
    }
}
