use std::net::SocketAddr;
use std::str::FromStr;

use super::{NetAddress, OnionAddr, WsAddr, WsScheme, ONION_SUFFIX};
use crate::error::AddrParseError;

/// Parses the textual forms a peer address is announced in:
///
/// - `ws://…` / `wss://…` URLs
/// - `<label>.onion:<port>`
/// - literal `ip:port` (IPv6 in brackets)
///
/// Hostnames that would need resolution are rejected; resolution happens at
/// dial time, not here.
impl FromStr for NetAddress {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for scheme in [WsScheme::Secure, WsScheme::Plain] {
            if let Some(rest) = s.strip_prefix(scheme.as_str()).and_then(|r| r.strip_prefix("://")) {
                if rest.is_empty() {
                    return Err(AddrParseError::new(s, "websocket url has no host"));
                }
                return Ok(Self::WebSocket(WsAddr::new(scheme, s)));
            }
        }

        if let Ok(sock) = s.parse::<SocketAddr>() {
            return Ok(Self::Tcp(sock));
        }

        let Some((host, port)) = s.rsplit_once(':') else {
            return Err(AddrParseError::new(s, "missing port"));
        };
        if !host.ends_with(ONION_SUFFIX) {
            return Err(AddrParseError::new(
                s,
                "not a literal ip:port, onion service or websocket url",
            ));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| AddrParseError::new(s, "invalid port"))?;
        let onion = OnionAddr::new(host, port);
        if onion.version().is_none() {
            return Err(AddrParseError::new(s, "unrecognized onion service length"));
        }
        Ok(Self::Onion(onion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_websocket_urls() {
        let addr: NetAddress = "wss://relay.example:443".parse().unwrap();
        assert_eq!(
            addr,
            NetAddress::WebSocket(WsAddr::new(WsScheme::Secure, "wss://relay.example:443"))
        );

        let plain: NetAddress = "ws://127.0.0.1:8080".parse().unwrap();
        assert_eq!(plain.network(), "ws");
    }

    #[test]
    fn test_parse_literal_socket_addrs() {
        let v4: NetAddress = "203.0.113.7:9735".parse().unwrap();
        assert_eq!(v4, NetAddress::Tcp("203.0.113.7:9735".parse().unwrap()));

        let v6: NetAddress = "[2001:db8::1]:9735".parse().unwrap();
        assert_eq!(v6.port(), Some(9735));
    }

    #[test]
    fn test_parse_onion() {
        let addr: NetAddress = "expyuzz4wqqyqhjn.onion:9735".parse().unwrap();
        assert_eq!(addr, NetAddress::Onion(OnionAddr::new("expyuzz4wqqyqhjn.onion", 9735)));
    }

    #[test]
    fn test_parse_rejects_hostnames_and_garbage() {
        assert!("relay.example:443".parse::<NetAddress>().is_err());
        assert!("nonsense".parse::<NetAddress>().is_err());
        assert!("wss://".parse::<NetAddress>().is_err());
        assert!("abc.onion:443".parse::<NetAddress>().is_err());

        let err = "expyuzz4wqqyqhjn.onion:http".parse::<NetAddress>().unwrap_err();
        assert_eq!(err.reason(), "invalid port");
    }
}
