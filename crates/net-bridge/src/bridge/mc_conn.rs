use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use net_addr::NetAddress;

use crate::config::NetConfig;
use crate::error::NetError;
use crate::pipe::{pipe, PipeEnd};
use crate::ports::{ChannelMessage, Connection, MessageHandler, MessagePort};

/// A blocking byte stream over one message port.
///
/// Inbound `Data` payloads are written into an internal pipe and become
/// readable here in arrival order. The write blocks until the caller reads,
/// so a slow reader stalls the port's dispatcher instead of buffering.
/// Outbound bytes are forwarded by a dedicated worker, at most
/// `max_chunk_size` bytes per posted message.
pub struct McConn {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    port: Arc<dyn MessagePort>,
    /// Caller-facing end.
    local: PipeEnd,
    /// Driven by the port handler (writes) and the worker (reads).
    driving: PipeEnd,
    closed: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl McConn {
    /// Takes over `port`, replacing its handler.
    pub fn new(port: Arc<dyn MessagePort>, config: &NetConfig) -> Result<Self, NetError> {
        let (local, driving) = pipe();
        let inner = Arc::new(BridgeInner {
            port,
            local,
            driving,
            closed: AtomicBool::new(false),
            worker: Mutex::new(None),
        });

        inner.port.set_handler(inbound_handler(Arc::downgrade(&inner)));

        let chunk = config.max_chunk_size.max(1);
        let spawned = {
            let inner = Arc::clone(&inner);
            thread::Builder::new()
                .name("mc-conn-out".into())
                .spawn(move || forward_outbound(&inner, chunk))
        };
        match spawned {
            Ok(handle) => *inner.worker.lock() = Some(handle),
            Err(e) => {
                inner.shutdown(false);
                return Err(NetError::Io(e));
            }
        }

        debug!(max_chunk_size = chunk, "message channel bridge opened");
        Ok(Self { inner })
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) {
        self.inner.local.set_read_timeout(timeout);
    }

    pub fn set_write_timeout(&self, timeout: Option<Duration>) {
        self.inner.local.set_write_timeout(timeout);
    }
}

fn inbound_handler(bridge: Weak<BridgeInner>) -> MessageHandler {
    Arc::new(move |message: ChannelMessage| {
        let Some(inner) = bridge.upgrade() else {
            return;
        };
        match message {
            ChannelMessage::Data(bytes) if bytes.is_empty() => {
                trace!("ignoring empty inbound payload");
            }
            ChannelMessage::Data(bytes) => {
                if let Err(e) = (&inner.driving).write_all(&bytes) {
                    debug!(error = %e, "inbound write failed, closing bridge");
                    inner.shutdown(false);
                }
            }
            ChannelMessage::Ports(ports) => {
                debug!(count = ports.len(), "ignoring port transfer on established connection");
            }
            ChannelMessage::Close => {
                debug!("peer closed message channel");
                inner.shutdown(false);
            }
        }
    })
}

fn forward_outbound(inner: &BridgeInner, chunk: usize) {
    let mut buf = vec![0u8; chunk];
    loop {
        match (&inner.driving).read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if let Err(e) = inner.port.post_message(ChannelMessage::Data(buf[..n].to_vec())) {
                    debug!(error = %e, "outbound post failed, closing bridge");
                    inner.shutdown(false);
                    break;
                }
            }
            Err(e) => {
                trace!(error = %e, "outbound read ended");
                break;
            }
        }
    }
    debug!("outbound worker exited");
}

impl BridgeInner {
    /// Tears the bridge down once.
    ///
    /// A local close (`notify_peer`) closes the caller's end, waits for the
    /// outbound worker to post every chunk it already read, then posts
    /// `Close` so the remote bridge follows. A remote-initiated teardown
    /// leaves the caller's end open so pending reads see EOF.
    fn shutdown(&self, notify_peer: bool) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if notify_peer {
            // The worker sees EOF only after its last read was posted.
            self.local.close();
            self.join_worker();
            if let Err(e) = self.port.post_message(ChannelMessage::Close) {
                trace!(error = %e, "close signal not delivered");
            }
        }

        // The driving end goes before the port: this unblocks a handler
        // stuck in an inbound write, which the port close waits for.
        self.driving.close();
        self.port.clear_handler();
        self.port.close();
        self.join_worker();
        debug!(notify_peer, "message channel bridge closed");
    }

    fn join_worker(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

impl Read for McConn {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.inner.local).read(buf)
    }
}

impl Read for &McConn {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.inner.local).read(buf)
    }
}

impl Write for McConn {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&self.inner.local).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Write for &McConn {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&self.inner.local).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Connection for McConn {
    fn local_addr(&self) -> NetAddress {
        NetAddress::Pipe
    }

    fn remote_addr(&self) -> NetAddress {
        NetAddress::Pipe
    }

    fn close(&self) -> Result<(), NetError> {
        self.inner.shutdown(true);
        self.inner.local.close();
        Ok(())
    }
}

impl Drop for McConn {
    fn drop(&mut self) {
        let _ = Connection::close(self);
    }
}

impl std::fmt::Debug for McConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McConn")
            .field("closed", &self.is_closed())
            .finish()
    }
}
