//! # Peer Network Addresses
//!
//! Value types for the endpoints a node can reach, and the compact binary
//! form they are persisted in.
//!
//! ## Address Families
//!
//! - **TCP** - IPv4 and IPv6 socket addresses
//! - **Onion** - Tor v2 (16-char) and v3 (56-char) onion services
//! - **WebSocket** - `ws://` / `wss://` URLs dialed from browser runtimes
//! - **Pipe** - in-process pipe ends; never persisted
//!
//! ## Persisted Form
//!
//! Every record starts with a one-byte [`AddressType`] tag. See [`codec`] for
//! the full layout.
//!
//! ## Example
//!
//! ```rust
//! use net_addr::{decode, encode, NetAddress, WsAddr, WsScheme};
//!
//! let addr = NetAddress::WebSocket(WsAddr::new(WsScheme::Secure, "wss://relay.example:443"));
//! let bytes = encode(&addr).unwrap();
//! assert_eq!(&bytes[..4], &[0x04, b's', 0x00, 0x17]);
//!
//! let decoded = decode(&mut bytes.as_slice()).unwrap();
//! assert_eq!(decoded, addr);
//! ```

#![warn(missing_debug_implementations)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod codec;
pub mod domain;
pub mod error;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use codec::{decode, encode, encode_to};
pub use domain::{
    AddressType, NetAddress, OnionAddr, OnionVersion, WsAddr, WsScheme, ONION_SUFFIX,
    ONION_SUFFIX_LEN, V2_DECODED_LEN, V2_LEN, V3_DECODED_LEN, V3_KEY_LEN, V3_LEN,
};
pub use error::{AddrParseError, CodecError};
