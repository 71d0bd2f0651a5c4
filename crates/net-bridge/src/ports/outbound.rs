//! # Driven Ports (Outbound SPI)
//!
//! Primitives the host runtime provides in place of OS sockets.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use net_addr::WsAddr;

use super::inbound::Connection;
use crate::error::NetError;

/// One event carried by a message channel.
pub enum ChannelMessage {
    /// Binary payload.
    Data(Vec<u8>),
    /// Transferred channel endpoints. The first is an inbound connection
    /// offer when posted to a listener.
    Ports(Vec<Box<dyn MessagePort>>),
    /// Control signal: the sender is closing the connection.
    Close,
}

impl fmt::Debug for ChannelMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(bytes) => f.debug_tuple("Data").field(&bytes.len()).finish(),
            Self::Ports(ports) => f.debug_tuple("Ports").field(&ports.len()).finish(),
            Self::Close => f.write_str("Close"),
        }
    }
}

/// Callback invoked for each inbound message, in arrival order.
pub type MessageHandler = Arc<dyn Fn(ChannelMessage) + Send + Sync>;

/// An asynchronous, callback-driven channel endpoint.
///
/// # Thread Safety
///
/// All methods may be called from any thread, including from inside the
/// installed handler.
pub trait MessagePort: Send + Sync {
    /// Queues `message` for the entangled peer. Never blocks.
    ///
    /// # Errors
    ///
    /// [`NetError::ChannelClosed`] if either side has closed.
    fn post_message(&self, message: ChannelMessage) -> Result<(), NetError>;

    /// Installs the inbound handler, replacing any previous one.
    fn set_handler(&self, handler: MessageHandler);

    /// Removes the inbound handler. Messages arriving afterwards are dropped.
    fn clear_handler(&self);

    /// Disentangles the port. Idempotent.
    fn close(&self);
}

/// Parameters for opening an outbound message transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialOptions {
    pub timeout: Duration,
    /// Largest inbound message the transport accepts.
    pub max_message_size: usize,
}

/// Opens outbound message-oriented connections (a WebSocket client, or
/// whatever the host runtime offers in its place).
pub trait MessageTransport: Send + Sync {
    fn open(&self, addr: &WsAddr, options: &DialOptions) -> Result<Box<dyn Connection>, NetError>;
}

impl MessageTransport for Box<dyn MessageTransport> {
    fn open(&self, addr: &WsAddr, options: &DialOptions) -> Result<Box<dyn Connection>, NetError> {
        (**self).open(addr, options)
    }
}
