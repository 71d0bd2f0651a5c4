use std::fmt;

/// WebSocket URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WsScheme {
    /// `ws://`
    Plain,
    /// `wss://`
    Secure,
}

impl WsScheme {
    /// Persisted marker byte for `ws`.
    pub const PLAIN_MARKER: u8 = b'w';
    /// Persisted marker byte for `wss`.
    pub const SECURE_MARKER: u8 = b's';

    /// URL scheme name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "ws",
            Self::Secure => "wss",
        }
    }

    /// Persisted marker byte.
    pub fn marker(self) -> u8 {
        match self {
            Self::Plain => Self::PLAIN_MARKER,
            Self::Secure => Self::SECURE_MARKER,
        }
    }

    /// Inverse of [`WsScheme::marker`].
    pub fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            Self::PLAIN_MARKER => Some(Self::Plain),
            Self::SECURE_MARKER => Some(Self::Secure),
            _ => None,
        }
    }

    /// Scheme a dial to `port` should use: 443 is secure, everything else
    /// (including no port at all) is plain.
    pub fn for_port(port: Option<u16>) -> Self {
        match port {
            Some(443) => Self::Secure,
            _ => Self::Plain,
        }
    }

    /// Port implied when a URL names none.
    pub fn default_port(self) -> u16 {
        match self {
            Self::Plain => 80,
            Self::Secure => 443,
        }
    }
}

impl fmt::Display for WsScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A WebSocket endpoint, stored as the full URL it was dialed with.
///
/// The URL already carries scheme, host and port; the separate scheme is
/// what the address reports as its network.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WsAddr {
    scheme: WsScheme,
    url: String,
}

impl WsAddr {
    pub fn new(scheme: WsScheme, url: impl Into<String>) -> Self {
        Self {
            scheme,
            url: url.into(),
        }
    }

    /// Builds `scheme://host:port`, bracketing IPv6 literals.
    pub fn from_host_port(scheme: WsScheme, host: &str, port: u16) -> Self {
        let url = if host.contains(':') && !host.starts_with('[') {
            format!("{scheme}://[{host}]:{port}")
        } else {
            format!("{scheme}://{host}:{port}")
        };
        Self::new(scheme, url)
    }

    pub fn scheme(&self) -> WsScheme {
        self.scheme
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for WsAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_for_port() {
        assert_eq!(WsScheme::for_port(Some(443)), WsScheme::Secure);
        assert_eq!(WsScheme::for_port(Some(80)), WsScheme::Plain);
        assert_eq!(WsScheme::for_port(Some(9735)), WsScheme::Plain);
        assert_eq!(WsScheme::for_port(None), WsScheme::Plain);
    }

    #[test]
    fn test_marker_round_trip() {
        for scheme in [WsScheme::Plain, WsScheme::Secure] {
            assert_eq!(WsScheme::from_marker(scheme.marker()), Some(scheme));
        }
        assert_eq!(WsScheme::from_marker(b'x'), None);
    }

    #[test]
    fn test_from_host_port() {
        let addr = WsAddr::from_host_port(WsScheme::Secure, "relay.example", 443);
        assert_eq!(addr.url(), "wss://relay.example:443");

        let v6 = WsAddr::from_host_port(WsScheme::Plain, "::1", 8080);
        assert_eq!(v6.url(), "ws://[::1]:8080");
    }
}
