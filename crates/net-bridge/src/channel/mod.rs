//! In-process message channel.
//!
//! [`MessageChannel`] models a host runtime's entangled port pair. Each
//! [`LocalPort`] queues inbound messages until a handler is installed, then
//! delivers them in order on a single dispatcher thread owned by the port.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, select, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::error::NetError;
use crate::ports::{ChannelMessage, MessageHandler, MessagePort};

/// Two entangled ports: whatever one posts, the other receives.
#[derive(Debug)]
pub struct MessageChannel {
    pub port1: LocalPort,
    pub port2: LocalPort,
}

impl MessageChannel {
    pub fn new() -> Self {
        let (to_port1, port1_inbox) = unbounded();
        let (to_port2, port2_inbox) = unbounded();
        Self {
            port1: LocalPort::new(to_port2, port1_inbox),
            port2: LocalPort::new(to_port1, port2_inbox),
        }
    }

    pub fn into_ports(self) -> (LocalPort, LocalPort) {
        (self.port1, self.port2)
    }
}

impl Default for MessageChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// One end of a [`MessageChannel`].
pub struct LocalPort {
    outbox: Mutex<Option<Sender<ChannelMessage>>>,
    inbox: Mutex<Option<Receiver<ChannelMessage>>>,
    handler: Arc<Mutex<Option<MessageHandler>>>,
    dispatcher: Mutex<Option<Dispatcher>>,
}

struct Dispatcher {
    /// Dropped to stop the thread.
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

impl LocalPort {
    fn new(outbox: Sender<ChannelMessage>, inbox: Receiver<ChannelMessage>) -> Self {
        Self {
            outbox: Mutex::new(Some(outbox)),
            inbox: Mutex::new(Some(inbox)),
            handler: Arc::new(Mutex::new(None)),
            dispatcher: Mutex::new(None),
        }
    }

    fn start_dispatcher(&self) {
        let mut dispatcher = self.dispatcher.lock();
        if dispatcher.is_some() {
            return;
        }
        let Some(inbox) = self.inbox.lock().clone() else {
            return;
        };
        let (stop, stopped) = bounded::<()>(0);
        let handler = Arc::clone(&self.handler);

        let spawned = thread::Builder::new()
            .name("port-dispatch".into())
            .spawn(move || dispatch(&inbox, &stopped, &handler));
        match spawned {
            Ok(thread) => *dispatcher = Some(Dispatcher { stop, thread }),
            Err(e) => warn!(error = %e, "failed to start port dispatcher"),
        }
    }
}

fn dispatch(
    inbox: &Receiver<ChannelMessage>,
    stopped: &Receiver<()>,
    handler: &Mutex<Option<MessageHandler>>,
) {
    loop {
        select! {
            recv(inbox) -> message => {
                let Ok(message) = message else {
                    trace!("peer port disentangled, dispatcher exiting");
                    return;
                };
                let current = handler.lock().clone();
                match current {
                    Some(handle) => handle(message),
                    None => trace!(?message, "no handler installed, dropping message"),
                }
            }
            recv(stopped) -> _ => return,
        }
    }
}

impl MessagePort for LocalPort {
    fn post_message(&self, message: ChannelMessage) -> Result<(), NetError> {
        let outbox = self.outbox.lock();
        let sender = outbox.as_ref().ok_or(NetError::ChannelClosed)?;
        sender.send(message).map_err(|_| NetError::ChannelClosed)
    }

    fn set_handler(&self, handler: MessageHandler) {
        *self.handler.lock() = Some(handler);
        self.start_dispatcher();
    }

    fn clear_handler(&self) {
        self.handler.lock().take();
    }

    fn close(&self) {
        self.outbox.lock().take();
        self.inbox.lock().take();
        self.handler.lock().take();

        let Some(Dispatcher { stop, thread }) = self.dispatcher.lock().take() else {
            return;
        };
        drop(stop);
        // Closing from inside a handler runs on the dispatcher itself.
        if thread.thread().id() != thread::current().id() {
            let _ = thread.join();
        }
    }
}

impl Drop for LocalPort {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for LocalPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalPort")
            .field("open", &self.outbox.lock().is_some())
            .field("dispatching", &self.dispatcher.lock().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests;
