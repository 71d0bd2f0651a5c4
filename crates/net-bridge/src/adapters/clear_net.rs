use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, trace};

use net_addr::NetAddress;

use crate::config::NetConfig;
use crate::error::NetError;
use crate::ports::inbound::is_tcp_network;
use crate::ports::{Connection, NetworkCapability, SrvRecord};

/// Network capability backed by OS sockets and the system resolver.
#[derive(Debug, Clone, Default)]
pub struct ClearNet {
    config: NetConfig,
}

impl ClearNet {
    pub fn new(config: NetConfig) -> Self {
        Self { config }
    }
}

impl NetworkCapability for ClearNet {
    fn dial(
        &self,
        network: &str,
        address: &str,
        timeout: Duration,
    ) -> Result<Box<dyn Connection>, NetError> {
        if !is_tcp_network(network) {
            return Err(NetError::Unsupported {
                operation: "dial",
                transport: "clearnet",
            });
        }
        let timeout = self.config.effective_timeout(timeout);
        let dial_failed = |source: io::Error| NetError::DialFailed {
            url: address.to_string(),
            source,
        };

        let mut last_err = None;
        for addr in address.to_socket_addrs().map_err(dial_failed)? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    debug!(%addr, "tcp connected");
                    return Ok(Box::new(ClearConn::new(stream).map_err(dial_failed)?));
                }
                Err(e) => {
                    trace!(%addr, error = %e, "connect attempt failed");
                    last_err = Some(e);
                }
            }
        }
        Err(dial_failed(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "address resolved to nothing")
        })))
    }

    fn lookup_host(&self, host: &str) -> Result<Vec<String>, NetError> {
        let ips = (host, 0)
            .to_socket_addrs()?
            .map(|addr| addr.ip().to_string())
            .collect();
        Ok(ips)
    }

    fn lookup_srv(
        &self,
        _service: &str,
        _proto: &str,
        _name: &str,
        _timeout: Duration,
    ) -> Result<(String, Vec<SrvRecord>), NetError> {
        Err(NetError::Unsupported {
            operation: "lookup_srv",
            transport: "clearnet",
        })
    }

    fn resolve_tcp_addr(&self, network: &str, address: &str) -> Result<SocketAddr, NetError> {
        if !is_tcp_network(network) {
            return Err(NetError::invalid_address(network, "not a tcp network"));
        }
        address
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| NetError::invalid_address(address, "no addresses found"))
    }
}

/// A TCP stream with its endpoints captured at connect time.
#[derive(Debug)]
pub struct ClearConn {
    stream: TcpStream,
    local: SocketAddr,
    peer: SocketAddr,
}

impl ClearConn {
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        Ok(Self {
            local: stream.local_addr()?,
            peer: stream.peer_addr()?,
            stream,
        })
    }
}

impl Read for ClearConn {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for ClearConn {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl Connection for ClearConn {
    fn local_addr(&self) -> NetAddress {
        NetAddress::Tcp(self.local)
    }

    fn remote_addr(&self) -> NetAddress {
        NetAddress::Tcp(self.peer)
    }

    fn close(&self) -> Result<(), NetError> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(NetError::Io(e)),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_dial_and_exchange() {
        let server = TcpListener::bind("127.0.0.1:0").unwrap();
        let server_addr = server.local_addr().unwrap();
        let echo = thread::spawn(move || {
            let (mut stream, _) = server.accept().unwrap();
            let mut buf = [0u8; 4];
            stream.read_exact(&mut buf).unwrap();
            stream.write_all(&buf).unwrap();
        });

        let net = ClearNet::default();
        let mut conn = net
            .dial("tcp", &server_addr.to_string(), Duration::ZERO)
            .unwrap();
        assert_eq!(conn.remote_addr(), NetAddress::Tcp(server_addr));

        conn.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        conn.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");
        conn.close().unwrap();
        conn.close().unwrap();
        echo.join().unwrap();
    }

    #[test]
    fn test_non_tcp_network_rejected() {
        let net = ClearNet::default();
        assert!(matches!(
            net.dial("udp", "127.0.0.1:1", Duration::ZERO),
            Err(NetError::Unsupported { .. })
        ));
        assert!(matches!(
            net.resolve_tcp_addr("udp", "127.0.0.1:1"),
            Err(NetError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_resolve_literal() {
        let net = ClearNet::default();
        let addr = net.resolve_tcp_addr("tcp", "127.0.0.1:9735").unwrap();
        assert_eq!(addr, "127.0.0.1:9735".parse().unwrap());
        assert_eq!(net.lookup_host("127.0.0.1").unwrap(), vec!["127.0.0.1"]);
    }

    #[test]
    fn test_lookup_srv_unsupported() {
        let net = ClearNet::default();
        assert!(matches!(
            net.lookup_srv("lnd", "tcp", "example.com", Duration::ZERO),
            Err(NetError::Unsupported { .. })
        ));
    }
}
