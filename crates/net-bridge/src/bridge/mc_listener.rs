use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam::channel::{bounded, select, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, trace};

use net_addr::NetAddress;

use super::McConn;
use crate::config::NetConfig;
use crate::error::NetError;
use crate::ports::{ChannelMessage, Listener, MessagePort};

/// Accepts connections offered as transferred ports on a message channel.
///
/// Each message carrying ports offers its first port as a new connection;
/// other messages are ignored. At most one offer waits for `accept` at a
/// time; further offers hold the port's dispatcher until it is taken or the
/// listener closes.
pub struct McListener {
    port: Arc<dyn MessagePort>,
    arrivals: Receiver<Box<dyn MessagePort>>,
    /// Dropped on close; wakes `accept` and a blocked offer.
    done: Mutex<Option<Sender<()>>>,
    done_rx: Receiver<()>,
    closed: AtomicBool,
    config: NetConfig,
}

impl McListener {
    pub fn new(port: Arc<dyn MessagePort>, config: NetConfig) -> Self {
        let (arrival_tx, arrivals) = bounded::<Box<dyn MessagePort>>(1);
        let (done, done_rx) = bounded::<()>(0);

        let stop = done_rx.clone();
        port.set_handler(Arc::new(move |message: ChannelMessage| {
            let ports = match message {
                ChannelMessage::Ports(ports) => ports,
                other => {
                    trace!(message = ?other, "listener ignoring non-offer message");
                    return;
                }
            };
            let Some(offer) = ports.into_iter().next() else {
                trace!("listener ignoring empty port transfer");
                return;
            };
            select! {
                send(arrival_tx, offer) -> res => {
                    if res.is_err() {
                        trace!("listener gone, dropping offer");
                    }
                }
                recv(stop) -> _ => debug!("listener closed, dropping offer"),
            }
        }));

        debug!(addr = %config.listener_addr, "message channel listener opened");
        Self {
            port,
            arrivals,
            done: Mutex::new(Some(done)),
            done_rx,
            closed: AtomicBool::new(false),
            config,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Listener for McListener {
    type Conn = McConn;

    fn accept(&self) -> Result<McConn, NetError> {
        if self.is_closed() {
            return Err(NetError::ListenerClosed);
        }
        select! {
            recv(self.arrivals) -> offer => match offer {
                Ok(port) => {
                    debug!("accepted message channel connection");
                    McConn::new(Arc::from(port), &self.config)
                }
                Err(_) => Err(NetError::ListenerClosed),
            },
            recv(self.done_rx) -> _ => Err(NetError::ListenerClosed),
        }
    }

    fn close(&self) -> Result<(), NetError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.done.lock().take();
        self.port.clear_handler();
        self.port.close();
        debug!("message channel listener closed");
        Ok(())
    }

    fn addr(&self) -> NetAddress {
        NetAddress::Tcp(self.config.listener_addr)
    }
}

impl Drop for McListener {
    fn drop(&mut self) {
        let _ = Listener::close(self);
    }
}

impl std::fmt::Debug for McListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McListener")
            .field("closed", &self.is_closed())
            .field("addr", &self.config.listener_addr)
            .finish()
    }
}
