use std::net::SocketAddr;

use crossbeam::channel::{bounded, select, Receiver, Select, Sender};
use parking_lot::Mutex;
use tracing::debug;

use net_addr::NetAddress;

use crate::cancel::CancelToken;
use crate::config::NetConfig;
use crate::error::NetError;
use crate::pipe::{pipe, PipeEnd};
use crate::ports::Listener;

/// In-process listener that co-located components dial without a socket.
///
/// `close` cancels the current cycle, failing any pending `accept` or
/// `dial` with [`NetError::ListenerClosed`], and immediately starts a new
/// one derived from the parent token. Once the parent token is cancelled
/// the listener stays closed.
///
/// `addr` reports the same placeholder as a message-channel listener,
/// `127.0.0.1:443` unless overridden.
pub struct PipeListener {
    parent: CancelToken,
    addr: SocketAddr,
    cycle: Mutex<CancelToken>,
    dials: Sender<PipeEnd>,
    incoming: Receiver<PipeEnd>,
}

impl PipeListener {
    pub fn new(parent: CancelToken) -> Self {
        // Rendezvous: a dial completes only when an accept takes it.
        let (dials, incoming) = bounded(0);
        Self {
            cycle: Mutex::new(parent.child_token()),
            parent,
            addr: NetConfig::default().listener_addr,
            dials,
            incoming,
        }
    }

    /// Overrides the placeholder address reported by `addr`.
    pub fn with_listener_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    fn current_cycle(&self) -> CancelToken {
        self.cycle.lock().clone()
    }

    /// Hands a fresh pipe to a waiting `accept` and returns the dialer's
    /// end.
    ///
    /// # Errors
    ///
    /// [`NetError::ListenerClosed`] if `cancel` or the listener's cycle is
    /// cancelled first. Both pipe halves are closed in that case; a pipe is
    /// never both delivered and reported cancelled.
    pub fn dial(&self, cancel: &CancelToken, addr: &str) -> Result<PipeEnd, NetError> {
        let (ours, theirs) = pipe();
        let cycle = self.current_cycle();

        let mut sel = Select::new();
        let caller_cancelled = sel.recv(cancel.cancelled());
        let listener_closed = sel.recv(cycle.cancelled());
        let handoff = sel.send(&self.dials);

        let oper = sel.select();
        match oper.index() {
            i if i == handoff => match oper.send(&self.dials, theirs) {
                Ok(()) => {
                    debug!(addr, "pipe dial accepted");
                    Ok(ours)
                }
                Err(returned) => {
                    returned.into_inner().close();
                    ours.close();
                    Err(NetError::ListenerClosed)
                }
            },
            i if i == caller_cancelled => {
                let _ = oper.recv(cancel.cancelled());
                ours.close();
                theirs.close();
                debug!(addr, "pipe dial cancelled by caller");
                Err(NetError::ListenerClosed)
            }
            i => {
                debug_assert_eq!(i, listener_closed);
                let _ = oper.recv(cycle.cancelled());
                ours.close();
                theirs.close();
                debug!(addr, "pipe dial aborted, listener closed");
                Err(NetError::ListenerClosed)
            }
        }
    }
}

impl Listener for PipeListener {
    type Conn = PipeEnd;

    fn accept(&self) -> Result<PipeEnd, NetError> {
        let cycle = self.current_cycle();
        select! {
            recv(cycle.cancelled()) -> _ => Err(NetError::ListenerClosed),
            recv(self.incoming) -> conn => conn.map_err(|_| NetError::ListenerClosed),
        }
    }

    fn close(&self) -> Result<(), NetError> {
        let mut cycle = self.cycle.lock();
        cycle.cancel();
        *cycle = self.parent.child_token();
        debug!(reopened = !cycle.is_cancelled(), "pipe listener closed");
        Ok(())
    }

    fn addr(&self) -> NetAddress {
        NetAddress::Tcp(self.addr)
    }
}

impl std::fmt::Debug for PipeListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeListener")
            .field("addr", &self.addr)
            .field("parent", &self.parent)
            .field("cycle", &*self.cycle.lock())
            .finish()
    }
}
