//! # Network Bridge
//!
//! Lets a node's networking stack run where OS sockets are unavailable, by
//! presenting message-passing primitives as ordinary byte streams.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Ports Layer:** [`Connection`], [`Listener`] and [`NetworkCapability`]
//!   on the driving side; [`MessagePort`] and [`MessageTransport`] on the
//!   driven side
//! - **Bridges:** [`McConn`] and [`McListener`] turn a message port into a
//!   stream or a listener; [`PipeListener`] serves in-process dials
//! - **Adapters Layer:** [`ClearNet`] (OS sockets) and [`WsNet`] (message
//!   transport with synthetic lookups)
//!
//! ## Features
//!
//! - `websocket` - tungstenite-backed [`MessageTransport`] (targets with sockets)
//! - `config` - TOML loading for [`NetConfig`]
//!
//! ## Example
//!
//! ```rust
//! use std::io::{Read, Write};
//! use std::sync::Arc;
//! use net_bridge::{McConn, MessageChannel, NetConfig};
//!
//! let (a, b) = MessageChannel::new().into_ports();
//! let config = NetConfig::default();
//! let mut left = McConn::new(Arc::new(a), &config).unwrap();
//! let mut right = McConn::new(Arc::new(b), &config).unwrap();
//!
//! left.write_all(b"ping").unwrap();
//! let mut buf = [0u8; 4];
//! right.read_exact(&mut buf).unwrap();
//! assert_eq!(&buf, b"ping");
//! ```

#![warn(missing_debug_implementations)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod bridge;
pub mod cancel;
pub mod channel;
pub mod config;
pub mod error;
pub mod pipe;
pub mod ports;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use adapters::{platform_net, ClearConn, ClearNet, WsConn, WsNet};
pub use bridge::{McConn, McListener, PipeListener};
pub use cancel::CancelToken;
pub use channel::{LocalPort, MessageChannel};
pub use config::{NetConfig, DEFAULT_MAX_CHUNK_SIZE, DEFAULT_MAX_MESSAGE_SIZE};
pub use error::{ConfigError, NetError};
pub use pipe::{pipe, PipeEnd};
pub use ports::{
    ChannelMessage, Connection, DialOptions, Listener, MessageHandler, MessagePort,
    MessageTransport, NetworkCapability, SrvRecord,
};

#[cfg(all(feature = "websocket", not(target_arch = "wasm32")))]
pub use adapters::{TungsteniteConn, TungsteniteTransport};

pub use net_addr::NetAddress;
