//! Blocking WebSocket transport.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

use tracing::{debug, trace};
use tungstenite::client::IntoClientRequest;
use tungstenite::handshake::HandshakeError;
use tungstenite::protocol::WebSocketConfig;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use net_addr::{NetAddress, WsAddr};

use crate::error::NetError;
use crate::ports::{Connection, DialOptions, MessageTransport};

/// Opens binary-message WebSocket connections with `tungstenite`.
///
/// `wss` URLs negotiate TLS against the bundled web PKI roots.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteTransport;

impl TungsteniteTransport {
    pub fn new() -> Self {
        Self
    }
}

fn ws_io_error(err: tungstenite::Error) -> io::Error {
    match err {
        tungstenite::Error::Io(e) => e,
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            io::Error::new(io::ErrorKind::BrokenPipe, "websocket closed")
        }
        other => io::Error::other(other),
    }
}

fn connect(host: &str, port: u16, options: &DialOptions) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, options.timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                trace!(%addr, error = %e, "connect attempt failed");
                last_err = Some(e);
            }
        }
    }
    Err(last_err
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")))
}

impl MessageTransport for TungsteniteTransport {
    fn open(&self, addr: &WsAddr, options: &DialOptions) -> Result<Box<dyn Connection>, NetError> {
        let url = addr.url();
        let dial_failed = |source: io::Error| NetError::DialFailed {
            url: url.to_string(),
            source,
        };

        let request = url
            .into_client_request()
            .map_err(|e| dial_failed(ws_io_error(e)))?;
        let host = request
            .uri()
            .host()
            .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
            .ok_or_else(|| NetError::InvalidAddress {
                address: url.to_string(),
                reason: "websocket url has no host",
            })?;
        let port = request
            .uri()
            .port_u16()
            .unwrap_or_else(|| addr.scheme().default_port());

        let stream = connect(&host, port, options).map_err(dial_failed)?;
        // Bound the handshake; cleared once connected.
        stream
            .set_read_timeout(Some(options.timeout))
            .and_then(|()| stream.set_write_timeout(Some(options.timeout)))
            .map_err(dial_failed)?;
        let raw = stream.try_clone().map_err(dial_failed)?;
        let local = raw.local_addr().map_err(dial_failed)?;
        let peer = raw.peer_addr().map_err(dial_failed)?;

        let mut config = WebSocketConfig::default();
        config.max_message_size = Some(options.max_message_size);

        let (socket, _response) =
            tungstenite::client_tls_with_config(request, stream, Some(config), None).map_err(
                |e| match e {
                    HandshakeError::Failure(err) => dial_failed(ws_io_error(err)),
                    HandshakeError::Interrupted(_) => dial_failed(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "websocket handshake interrupted",
                    )),
                },
            )?;

        raw.set_read_timeout(None)
            .and_then(|()| raw.set_write_timeout(None))
            .map_err(dial_failed)?;

        debug!(url, %peer, "websocket connected");
        Ok(Box::new(TungsteniteConn {
            socket,
            raw,
            local,
            peer,
            pending: Vec::new(),
            consumed: 0,
        }))
    }
}

/// A WebSocket connection exposed as a byte stream. Each write is sent as
/// one binary message; reads drain binary messages in order.
pub struct TungsteniteConn {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
    /// Clone of the underlying socket, used to unblock I/O on close.
    raw: TcpStream,
    local: SocketAddr,
    peer: SocketAddr,
    pending: Vec<u8>,
    consumed: usize,
}

impl Read for TungsteniteConn {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.consumed == self.pending.len() {
            match self.socket.read() {
                Ok(Message::Binary(data)) => {
                    self.pending.clear();
                    self.pending.extend_from_slice(&data);
                    self.consumed = 0;
                }
                Ok(Message::Close(_)) => return Ok(0),
                Ok(Message::Text(_)) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "unexpected text message",
                    ))
                }
                Ok(_) => continue,
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    return Ok(0)
                }
                Err(e) => return Err(ws_io_error(e)),
            }
        }
        let available = &self.pending[self.consumed..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consumed += n;
        Ok(n)
    }
}

impl Write for TungsteniteConn {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.socket
            .send(Message::binary(buf.to_vec()))
            .map_err(ws_io_error)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.socket.flush().map_err(ws_io_error)
    }
}

impl Connection for TungsteniteConn {
    fn local_addr(&self) -> NetAddress {
        NetAddress::Tcp(self.local)
    }

    fn remote_addr(&self) -> NetAddress {
        NetAddress::Tcp(self.peer)
    }

    fn close(&self) -> Result<(), NetError> {
        match self.raw.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(NetError::Io(e)),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for TungsteniteConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TungsteniteConn")
            .field("local", &self.local)
            .field("peer", &self.peer)
            .finish()
    }
}
