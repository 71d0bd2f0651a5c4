//! Error types for the address codec

use std::io;
use thiserror::Error;

/// Errors raised while encoding or decoding a persisted address.
///
/// Codec failures are always surfaced: a corrupted record must never decode
/// into a different or default address.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Leading tag byte is not an assigned address type.
    #[error("unknown address type: {0}")]
    UnknownAddressType(u8),

    /// The address has no persisted form (e.g. an in-process pipe end).
    #[error("unsupported address type: {0}")]
    UnsupportedAddressType(&'static str),

    /// Fewer bytes remained than the record declares.
    #[error("truncated {record} record: needed {expected} bytes")]
    TruncatedInput {
        /// Record (or record field) being read.
        record: &'static str,
        /// Bytes the record required at the point of failure.
        expected: usize,
    },

    /// Onion service name does not end in `.onion`.
    #[error("invalid onion suffix {0:?}")]
    InvalidOnionSuffix(String),

    /// Onion service name (or its decoded form) has an unrecognized length.
    #[error("unknown onion service length: {0}")]
    InvalidOnionLength(usize),

    /// Onion label is not lowercase base32.
    #[error("onion service {0:?} is not valid base32")]
    InvalidOnionEncoding(String),

    /// Onion v3 label carries a wrong version byte or checksum.
    #[error("onion service {0:?} has a bad checksum or version")]
    InvalidOnionChecksum(String),

    /// WebSocket record carries a scheme marker other than `w` or `s`.
    #[error("invalid websocket scheme marker: {0:#04x}")]
    InvalidWebSocketScheme(u8),

    /// WebSocket URL does not fit the 16-bit length prefix.
    #[error("websocket address too long: {0} bytes")]
    WebSocketAddressTooLong(usize),

    /// WebSocket record body is not UTF-8.
    #[error("websocket address is not valid UTF-8")]
    InvalidUtf8,

    /// Underlying reader or writer failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Error returned when a textual address cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address {input:?}: {reason}")]
pub struct AddrParseError {
    input: String,
    reason: &'static str,
}

impl AddrParseError {
    pub(crate) fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }

    /// The rejected input.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Why the input was rejected.
    pub fn reason(&self) -> &'static str {
        self.reason
    }
}
