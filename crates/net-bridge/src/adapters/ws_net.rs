use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use net_addr::{NetAddress, WsAddr, WsScheme};

use crate::config::NetConfig;
use crate::error::NetError;
use crate::ports::inbound::is_tcp_network;
use crate::ports::{Connection, DialOptions, MessageTransport, NetworkCapability, SrvRecord};

// ============================================================================
// Synthetic lookups
// ============================================================================

/// Placeholder IPv4 strings handed out by `lookup_host`, mapped back to the
/// hostnames they stand for at dial time.
///
/// Every lookup takes the next counter value, so repeated lookups of one
/// hostname yield distinct placeholders that all map back to it. Entries
/// are never evicted. The counter does not wrap: once it reaches
/// `255.255.255.255` further lookups fail with
/// [`NetError::LookupSpaceExhausted`].
#[derive(Debug)]
struct LookupTable {
    counter: u32,
    by_placeholder: HashMap<String, String>,
}

impl LookupTable {
    fn new(base: Ipv4Addr) -> Self {
        Self {
            counter: u32::from(base),
            by_placeholder: HashMap::new(),
        }
    }

    fn allocate(&mut self, host: &str) -> Result<String, NetError> {
        let next = self
            .counter
            .checked_add(1)
            .ok_or(NetError::LookupSpaceExhausted)?;
        self.counter = next;

        let placeholder = Ipv4Addr::from(next).to_string();
        self.by_placeholder
            .insert(placeholder.clone(), host.to_string());
        Ok(placeholder)
    }

    fn resolve(&self, placeholder: &str) -> Option<&str> {
        self.by_placeholder.get(placeholder).map(String::as_str)
    }
}

/// Splits `host[:port]`, accepting bracketed IPv6 hosts. A bare IPv6
/// literal is treated as a host without a port.
fn split_host_port(address: &str) -> Result<(&str, Option<u16>), NetError> {
    let (host, port) = if let Some(rest) = address.strip_prefix('[') {
        let (host, after) = rest
            .split_once(']')
            .ok_or_else(|| NetError::invalid_address(address, "unterminated ipv6 bracket"))?;
        match after.strip_prefix(':') {
            Some(port) => (host, Some(port)),
            None if after.is_empty() => (host, None),
            None => return Err(NetError::invalid_address(address, "garbage after ipv6 host")),
        }
    } else {
        match address.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => (host, Some(port)),
            _ => (address, None),
        }
    };

    if host.is_empty() {
        return Err(NetError::invalid_address(address, "missing host"));
    }
    let port = port
        .map(|p| p.parse::<u16>())
        .transpose()
        .map_err(|_| NetError::invalid_address(address, "invalid port"))?;
    Ok((host, port))
}

// ============================================================================
// WsNet
// ============================================================================

/// Network capability for runtimes without OS sockets.
///
/// The only real primitive is an outbound message transport; host lookups
/// return synthetic loopback-range placeholders so callers that resolve
/// before dialing keep working, and `dial` maps them back.
pub struct WsNet<T> {
    transport: T,
    lookups: Mutex<LookupTable>,
    config: NetConfig,
}

impl<T: MessageTransport> WsNet<T> {
    pub fn new(transport: T, config: NetConfig) -> Self {
        Self {
            transport,
            lookups: Mutex::new(LookupTable::new(config.lookup_base)),
            config,
        }
    }

    /// Hostname a placeholder from `lookup_host` stands for.
    pub fn resolve_placeholder(&self, placeholder: &str) -> Option<String> {
        self.lookups.lock().resolve(placeholder).map(str::to_owned)
    }

    /// URL `dial` would open for `address`.
    pub fn dial_target(&self, address: &str) -> Result<WsAddr, NetError> {
        let (host, port) = split_host_port(address)?;
        let scheme = WsScheme::for_port(port);
        let port = port.unwrap_or_else(|| scheme.default_port());
        let target = self
            .resolve_placeholder(host)
            .unwrap_or_else(|| host.to_string());
        Ok(WsAddr::from_host_port(scheme, &target, port))
    }
}

impl<T: MessageTransport> NetworkCapability for WsNet<T> {
    fn dial(
        &self,
        network: &str,
        address: &str,
        timeout: Duration,
    ) -> Result<Box<dyn Connection>, NetError> {
        let target = self.dial_target(address)?;
        let options = DialOptions {
            timeout: self.config.effective_timeout(timeout),
            max_message_size: self.config.max_message_size,
        };
        debug!(network, address, url = %target, "dialing websocket");

        let conn = self
            .transport
            .open(&target, &options)
            .inspect_err(|e| warn!(url = %target, error = %e, "websocket dial failed"))?;
        Ok(Box::new(WsConn::new(conn, target)))
    }

    fn lookup_host(&self, host: &str) -> Result<Vec<String>, NetError> {
        let placeholder = self.lookups.lock().allocate(host)?;
        debug!(host, %placeholder, "synthesized lookup");
        Ok(vec![placeholder])
    }

    fn lookup_srv(
        &self,
        service: &str,
        proto: &str,
        name: &str,
        _timeout: Duration,
    ) -> Result<(String, Vec<SrvRecord>), NetError> {
        warn!(service, proto, name, "srv lookup over websocket transport");
        Err(NetError::Unsupported {
            operation: "lookup_srv",
            transport: "websocket",
        })
    }

    fn resolve_tcp_addr(&self, network: &str, address: &str) -> Result<SocketAddr, NetError> {
        if !is_tcp_network(network) {
            return Err(NetError::invalid_address(network, "not a tcp network"));
        }
        let (host, port) = split_host_port(address)?;
        let port = port.ok_or_else(|| NetError::invalid_address(address, "missing port"))?;

        let ip = match host.parse::<IpAddr>() {
            Ok(ip) => ip,
            Err(_) => {
                let placeholder = self.lookups.lock().allocate(host)?;
                placeholder
                    .parse::<IpAddr>()
                    .map_err(|_| NetError::invalid_address(&placeholder, "bad placeholder"))?
            }
        };
        Ok(SocketAddr::new(ip, port))
    }
}

impl<T> std::fmt::Debug for WsNet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsNet")
            .field("lookups", &self.lookups.lock().by_placeholder.len())
            .field("config", &self.config)
            .finish()
    }
}

// ============================================================================
// WsConn
// ============================================================================

/// A transport connection that reports the dialed WebSocket URL as its
/// remote address; no real peer IP exists at this layer.
pub struct WsConn {
    inner: Box<dyn Connection>,
    addr: WsAddr,
}

impl WsConn {
    pub fn new(inner: Box<dyn Connection>, addr: WsAddr) -> Self {
        Self { inner, addr }
    }
}

impl Read for WsConn {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for WsConn {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Connection for WsConn {
    fn local_addr(&self) -> NetAddress {
        self.inner.local_addr()
    }

    fn remote_addr(&self) -> NetAddress {
        NetAddress::WebSocket(self.addr.clone())
    }

    fn close(&self) -> Result<(), NetError> {
        self.inner.close()
    }
}

impl std::fmt::Debug for WsConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsConn").field("addr", &self.addr).finish()
    }
}
