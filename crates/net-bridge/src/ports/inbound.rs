//! # Driving Ports (Inbound API)
//!
//! Blocking stream contracts exposed to the rest of the node. Every
//! transport, whether a real socket or a bridged message channel, is
//! consumed through these traits.

use std::io::{Read, Write};
use std::net::SocketAddr;
use std::time::Duration;

use net_addr::NetAddress;

use crate::error::NetError;

/// A blocking, bidirectional byte stream.
///
/// `close` takes `&self` so it can be called from another thread while a
/// read or write is blocked; closing unblocks both.
pub trait Connection: Read + Write + Send {
    fn local_addr(&self) -> NetAddress;

    fn remote_addr(&self) -> NetAddress;

    /// Closes the stream. Calling it more than once is a no-op.
    fn close(&self) -> Result<(), NetError>;
}

impl Connection for Box<dyn Connection> {
    fn local_addr(&self) -> NetAddress {
        (**self).local_addr()
    }

    fn remote_addr(&self) -> NetAddress {
        (**self).remote_addr()
    }

    fn close(&self) -> Result<(), NetError> {
        (**self).close()
    }
}

/// A blocking connection acceptor.
pub trait Listener: Send + Sync {
    type Conn: Connection;

    /// Blocks until a connection arrives or the listener is closed.
    ///
    /// # Errors
    ///
    /// [`NetError::ListenerClosed`] once the listener has been closed.
    fn accept(&self) -> Result<Self::Conn, NetError>;

    /// Closes the listener, waking any blocked `accept`. Idempotent.
    fn close(&self) -> Result<(), NetError>;

    /// Address the listener reports. May be a placeholder.
    fn addr(&self) -> NetAddress;
}

/// One service location record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvRecord {
    pub target: String,
    pub port: u16,
    pub priority: u16,
    pub weight: u16,
}

/// The four network operations upstream connection management needs.
///
/// Implemented by the direct-socket adapter and by the message-channel
/// adapter; the node picks one at startup.
pub trait NetworkCapability: Send + Sync {
    /// Connects to `address` on `network`. A zero `timeout` means the
    /// adapter's configured default.
    fn dial(
        &self,
        network: &str,
        address: &str,
        timeout: Duration,
    ) -> Result<Box<dyn Connection>, NetError>;

    /// Resolves `host` to one or more textual IP addresses.
    fn lookup_host(&self, host: &str) -> Result<Vec<String>, NetError>;

    /// Looks up `_service._proto.name`. Returns the canonical name and the
    /// records found.
    fn lookup_srv(
        &self,
        service: &str,
        proto: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<(String, Vec<SrvRecord>), NetError>;

    /// Resolves `address` (`host:port`) on a TCP `network`.
    fn resolve_tcp_addr(&self, network: &str, address: &str) -> Result<SocketAddr, NetError>;
}

/// Whether `network` names a TCP flavour.
pub(crate) fn is_tcp_network(network: &str) -> bool {
    matches!(network, "tcp" | "tcp4" | "tcp6")
}
