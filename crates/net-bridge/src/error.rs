//! Error types for the transport bridge

use std::io;
use thiserror::Error;

/// Errors raised by capability adapters, bridges and listeners.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("listener has been closed")]
    ListenerClosed,

    #[error("dial {url} failed: {source}")]
    DialFailed {
        url: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress {
        address: String,
        reason: &'static str,
    },

    #[error("{operation} is not supported by the {transport} transport")]
    Unsupported {
        operation: &'static str,
        transport: &'static str,
    },

    #[error("synthetic address space exhausted")]
    LookupSpaceExhausted,

    #[error("message channel closed")]
    ChannelClosed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl NetError {
    pub(crate) fn invalid_address(address: &str, reason: &'static str) -> Self {
        Self::InvalidAddress {
            address: address.to_string(),
            reason,
        }
    }

    /// The endpoint is gone for good; reconnecting through the same
    /// listener or channel will not succeed.
    pub fn is_closed(&self) -> bool {
        match self {
            Self::ListenerClosed | Self::ChannelClosed => true,
            Self::Io(e) => is_closed_kind(e.kind()),
            _ => false,
        }
    }

    /// The failure is transient and the operation may be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::DialFailed { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::TimedOut
                    | io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::Interrupted
                    | io::ErrorKind::WouldBlock
            ),
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }
}

fn is_closed_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected | io::ErrorKind::UnexpectedEof
    )
}

impl From<NetError> for io::Error {
    fn from(err: NetError) -> Self {
        match err {
            NetError::Io(e) => e,
            NetError::ListenerClosed | NetError::ChannelClosed => {
                io::Error::new(io::ErrorKind::BrokenPipe, err)
            }
            other => io::Error::other(other),
        }
    }
}

/// Errors that can occur while loading [`NetConfig`](crate::NetConfig).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read {path}: {error}")]
    Io {
        /// Path of the file that failed to load.
        path: String,
        /// Error message from the I/O operation.
        error: String,
    },

    /// TOML parsing error.
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// A value parsed but is out of range.
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_vs_retryable() {
        assert!(NetError::ListenerClosed.is_closed());
        assert!(!NetError::ListenerClosed.is_retryable());

        let refused = NetError::DialFailed {
            url: "wss://relay.example:443".into(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert!(refused.is_retryable());
        assert!(!refused.is_closed());

        let broken = NetError::Io(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(broken.is_closed());
        assert!(!NetError::LookupSpaceExhausted.is_retryable());
    }

    #[test]
    fn test_into_io_error_keeps_kind() {
        let e: io::Error = NetError::ChannelClosed.into();
        assert_eq!(e.kind(), io::ErrorKind::BrokenPipe);

        let e: io::Error = NetError::Io(io::Error::from(io::ErrorKind::TimedOut)).into();
        assert_eq!(e.kind(), io::ErrorKind::TimedOut);
    }
}
