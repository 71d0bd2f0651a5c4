//! Blocking cancellation tokens.
//!
//! A token is cancelled by dropping the only sender of an internal channel,
//! so the receiver returned by [`CancelToken::cancelled`] becomes ready and
//! stays ready. That makes cancellation usable as one arm of a crossbeam
//! `select!`.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

/// A cloneable cancellation signal. Clones observe the same state.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

struct Inner {
    /// `None` once cancelled.
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
    children: Mutex<Vec<Weak<Inner>>>,
}

impl Inner {
    fn cancel(&self) {
        let Some(trigger) = self.trigger.lock().take() else {
            return;
        };
        drop(trigger);

        let children = std::mem::take(&mut *self.children.lock());
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (trigger, signal) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                trigger: Mutex::new(Some(trigger)),
                signal,
                children: Mutex::new(Vec::new()),
            }),
        }
    }

    /// A token cancelled when `self` is, or on its own.
    pub fn child_token(&self) -> Self {
        let child = Self::new();
        let trigger = self.inner.trigger.lock();
        if trigger.is_none() {
            child.cancel();
        } else {
            let mut children = self.inner.children.lock();
            children.retain(|c| c.strong_count() > 0);
            children.push(Arc::downgrade(&child.inner));
        }
        child
    }

    /// Cancels this token and every token derived from it. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.trigger.lock().is_none()
    }

    /// Blocks until cancelled.
    pub fn wait(&self) {
        let _ = self.inner.signal.recv();
    }

    /// Blocks until cancelled or `timeout` elapses. Returns whether the
    /// token was cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        matches!(
            self.inner.signal.recv_timeout(timeout),
            Err(RecvTimeoutError::Disconnected)
        )
    }

    /// Receiver that becomes permanently ready on cancellation. Never
    /// yields a message; a `recv` on it returns `Err` once cancelled.
    pub fn cancelled(&self) -> &Receiver<()> {
        &self.inner.signal
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
