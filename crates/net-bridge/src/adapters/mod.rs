//! # Adapters
//!
//! Concrete [`NetworkCapability`] implementations:
//!
//! - [`ClearNet`] - OS sockets and the system resolver
//! - [`WsNet`] - an outbound message transport plus synthetic lookups, for
//!   runtimes without socket access
//!
//! On targets with sockets, the `websocket` feature adds
//! [`TungsteniteTransport`], a transport `WsNet` can dial through.
//! Socketless hosts supply their own [`MessageTransport`].

mod clear_net;
mod ws_net;

#[cfg(all(feature = "websocket", not(target_arch = "wasm32")))]
mod ws_client;

pub use clear_net::{ClearConn, ClearNet};
pub use ws_net::{WsConn, WsNet};

#[cfg(all(feature = "websocket", not(target_arch = "wasm32")))]
pub use ws_client::{TungsteniteConn, TungsteniteTransport};

use tracing::debug;

use crate::config::NetConfig;
use crate::error::NetError;
use crate::ports::{MessageTransport, NetworkCapability};

/// The capability this runtime should use.
///
/// A transport provided by the host selects [`WsNet`] over it. Without
/// one, targets with sockets get [`ClearNet`]; `wasm32` has no fallback.
///
/// # Errors
///
/// [`NetError::Unsupported`] on `wasm32` when `host_transport` is `None`.
pub fn platform_net(
    config: NetConfig,
    host_transport: Option<Box<dyn MessageTransport>>,
) -> Result<Box<dyn NetworkCapability>, NetError> {
    if let Some(transport) = host_transport {
        debug!("selected message transport network capability");
        return Ok(Box::new(WsNet::new(transport, config)));
    }
    if cfg!(target_arch = "wasm32") {
        return Err(NetError::Unsupported {
            operation: "socket access",
            transport: "wasm32",
        });
    }
    debug!("selected clearnet network capability");
    Ok(Box::new(ClearNet::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use net_addr::WsAddr;

    use crate::pipe::pipe;
    use crate::ports::{Connection, DialOptions};

    #[derive(Debug)]
    struct HostTransport;

    impl MessageTransport for HostTransport {
        fn open(&self, _addr: &WsAddr, _options: &DialOptions) -> Result<Box<dyn Connection>, NetError> {
            let (near, _far) = pipe();
            Ok(Box::new(near))
        }
    }

    #[test]
    fn test_host_transport_selects_ws_net() {
        let net = platform_net(NetConfig::for_testing(), Some(Box::new(HostTransport))).unwrap();
        // Synthetic lookups only come from the message-transport adapter.
        assert_eq!(net.lookup_host("relay.example").unwrap(), ["127.0.0.1"]);
        assert!(net.dial("tcp", "127.0.0.1:443", Duration::ZERO).is_ok());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_no_transport_falls_back_to_sockets() {
        let net = platform_net(NetConfig::for_testing(), None).unwrap();
        assert!(matches!(
            net.lookup_srv("nodes", "tcp", "seed.example", Duration::ZERO),
            Err(NetError::Unsupported { transport: "clearnet", .. })
        ));
    }

    #[cfg(target_arch = "wasm32")]
    #[test]
    fn test_wasm_requires_host_transport() {
        assert!(matches!(
            platform_net(NetConfig::for_testing(), None),
            Err(NetError::Unsupported { .. })
        ));
    }
}
