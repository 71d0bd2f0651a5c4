//! Address value types.
//!
//! Values are immutable once constructed. Validation of onion service names
//! happens at encode time, so a `NetAddress` can hold anything a peer
//! announced and still be rejected before it reaches storage.

mod address;
mod onion;
mod parse;
mod websocket;

pub use address::{AddressType, NetAddress};
pub use onion::{
    OnionAddr, OnionVersion, ONION_SUFFIX, ONION_SUFFIX_LEN, V2_DECODED_LEN, V2_LEN,
    V3_DECODED_LEN, V3_KEY_LEN, V3_LEN,
};
pub use websocket::{WsAddr, WsScheme};

pub(crate) use onion::OnionKey;
