//! # Ports Layer
//!
//! - **Driving Ports (Inbound):** the stream, listener and capability
//!   contracts the node's networking stack programs against
//! - **Driven Ports (Outbound):** the message-channel and message-transport
//!   primitives a host runtime must provide

pub mod inbound;
pub mod outbound;

pub use inbound::{Connection, Listener, NetworkCapability, SrvRecord};
pub use outbound::{ChannelMessage, DialOptions, MessageHandler, MessagePort, MessageTransport};
