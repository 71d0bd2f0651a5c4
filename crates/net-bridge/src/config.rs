//! Transport configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::ConfigError;

/// Default WebSocket read limit, in bytes.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4_500_000;
/// Default bound on one forwarded outbound chunk, in bytes.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// Limits and placeholders shared by the capability adapters and bridges.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default, deny_unknown_fields))]
pub struct NetConfig {
    /// Largest message a WebSocket connection will accept.
    pub max_message_size: usize,
    /// Largest payload one outbound bridge message carries.
    pub max_chunk_size: usize,
    /// Synthetic lookup counter seed; the first placeholder is `base + 1`.
    pub lookup_base: Ipv4Addr,
    /// Address reported by message-channel listeners.
    pub listener_addr: SocketAddr,
    /// Dial timeout used when a caller passes a zero timeout.
    pub dial_timeout_secs: u64,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            lookup_base: Ipv4Addr::new(127, 0, 0, 0),
            listener_addr: SocketAddr::from(([127, 0, 0, 1], 443)),
            dial_timeout_secs: 30,
        }
    }
}

impl NetConfig {
    /// Small limits so tests exercise chunking and timeouts quickly.
    pub fn for_testing() -> Self {
        Self {
            max_message_size: 64 * 1024,
            max_chunk_size: 16,
            dial_timeout_secs: 1,
            ..Self::default()
        }
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    /// `timeout`, or the configured default when it is zero.
    pub(crate) fn effective_timeout(&self, timeout: Duration) -> Duration {
        if timeout.is_zero() {
            self.dial_timeout()
        } else {
            timeout
        }
    }

    /// Rejects values no transport can operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_message_size == 0 {
            return Err(ConfigError::Invalid("max_message_size must be non-zero"));
        }
        if self.max_chunk_size == 0 {
            return Err(ConfigError::Invalid("max_chunk_size must be non-zero"));
        }
        if self.dial_timeout_secs == 0 {
            return Err(ConfigError::Invalid("dial_timeout_secs must be non-zero"));
        }
        Ok(())
    }
}

// ============================================================================
// TOML loading (requires "config" feature)
// ============================================================================

#[cfg(feature = "config")]
mod toml_config {
    use super::*;
    use serde::Deserialize;
    use std::fs;
    use std::path::Path;

    /// Configuration file structure.
    #[derive(Debug, Deserialize)]
    struct ConfigFile {
        #[serde(default)]
        net: NetConfig,
    }

    impl NetConfig {
        /// Load configuration from a TOML file.
        ///
        /// # Config File Format
        ///
        /// ```toml
        /// [net]
        /// max_message_size = 4500000
        /// max_chunk_size = 1048576
        /// lookup_base = "127.0.0.0"
        /// listener_addr = "127.0.0.1:443"
        /// dial_timeout_secs = 30
        /// ```
        ///
        /// # Errors
        ///
        /// Returns error if the file cannot be read, parsed or validated.
        pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
            let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
                path: path.as_ref().display().to_string(),
                error: e.to_string(),
            })?;

            Self::parse(&content)
        }

        /// Parse configuration from a TOML string. Missing keys take their
        /// defaults.
        pub fn parse(content: &str) -> Result<Self, ConfigError> {
            let file: ConfigFile =
                toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
            file.net.validate()?;
            Ok(file.net)
        }
    }
}
