//! Synchronous in-memory duplex pipe.
//!
//! Both ends are unbuffered: a write returns only once the peer has read
//! every byte of it, or one side has closed. A read may consume part of a
//! pending write; the writer stays blocked until the rest is taken.
//!
//! After a local `close`, operations on that end fail with
//! [`io::ErrorKind::BrokenPipe`]. After the peer closes, reads return EOF
//! and writes fail with `BrokenPipe`.

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use net_addr::NetAddress;

use crate::error::NetError;
use crate::ports::Connection;

/// Creates a connected pair of pipe ends.
pub fn pipe() -> (PipeEnd, PipeEnd) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State::default()),
        cond: Condvar::new(),
    });
    (
        PipeEnd {
            shared: Arc::clone(&shared),
            side: 0,
        },
        PipeEnd { shared, side: 1 },
    )
}

/// One end of a [`pipe`].
#[derive(Debug)]
pub struct PipeEnd {
    shared: Arc<Shared>,
    side: usize,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<State>,
    cond: Condvar,
}

#[derive(Debug, Default)]
struct State {
    /// Indexed by the writing side.
    flows: [Flow; 2],
    closed: [bool; 2],
    read_timeout: [Option<Duration>; 2],
    write_timeout: [Option<Duration>; 2],
}

/// Bytes in flight from one side to the other.
#[derive(Debug, Default)]
struct Flow {
    data: Vec<u8>,
    consumed: usize,
    /// A writer owns the flow until its data is fully consumed.
    busy: bool,
}

impl Flow {
    fn pending(&self) -> &[u8] {
        &self.data[self.consumed..]
    }
}

fn closed_pipe() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "io on closed pipe")
}

fn timed_out() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "pipe deadline exceeded")
}

impl PipeEnd {
    fn peer(&self) -> usize {
        1 - self.side
    }

    /// Blocks on the shared condvar until notified or `deadline` passes.
    /// Returns `false` on timeout.
    fn wait(&self, state: &mut MutexGuard<'_, State>, deadline: Option<Instant>) -> bool {
        match deadline {
            Some(deadline) => !self.shared.cond.wait_until(state, deadline).timed_out(),
            None => {
                self.shared.cond.wait(state);
                true
            }
        }
    }

    fn read_bytes(&self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut state = self.shared.state.lock();
        let deadline = state.read_timeout[self.side].map(|t| Instant::now() + t);
        loop {
            if state.closed[self.side] {
                return Err(closed_pipe());
            }
            if state.closed[self.peer()] {
                return Ok(0);
            }
            let flow = &mut state.flows[self.peer()];
            if !flow.pending().is_empty() {
                let n = flow.pending().len().min(buf.len());
                buf[..n].copy_from_slice(&flow.pending()[..n]);
                flow.consumed += n;
                self.shared.cond.notify_all();
                return Ok(n);
            }
            if !self.wait(&mut state, deadline) {
                return Err(timed_out());
            }
        }
    }

    fn write_bytes(&self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.shared.state.lock();
        let deadline = state.write_timeout[self.side].map(|t| Instant::now() + t);

        // Serialise writers on this side.
        loop {
            if state.closed[self.side] || state.closed[self.peer()] {
                return Err(closed_pipe());
            }
            if !state.flows[self.side].busy {
                break;
            }
            if !self.wait(&mut state, deadline) {
                return Err(timed_out());
            }
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let flow = &mut state.flows[self.side];
        flow.busy = true;
        flow.data.clear();
        flow.data.extend_from_slice(buf);
        flow.consumed = 0;
        self.shared.cond.notify_all();

        let outcome = loop {
            let flow = &state.flows[self.side];
            if flow.consumed == flow.data.len() {
                break Ok(buf.len());
            }
            if state.closed[self.side] || state.closed[self.peer()] {
                break Err(closed_pipe());
            }
            if !self.wait(&mut state, deadline) {
                break Err(timed_out());
            }
        };

        let flow = &mut state.flows[self.side];
        let consumed = flow.consumed;
        flow.busy = false;
        flow.data.clear();
        flow.consumed = 0;
        self.shared.cond.notify_all();

        match outcome {
            Err(_) if consumed > 0 => Ok(consumed),
            other => other,
        }
    }

    /// Closes this end. Blocked operations on either end wake up.
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        if !state.closed[self.side] {
            state.closed[self.side] = true;
            self.shared.cond.notify_all();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed[self.side]
    }

    /// Bounds each subsequent read. `None` blocks indefinitely.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) {
        self.shared.state.lock().read_timeout[self.side] = timeout;
    }

    /// Bounds each subsequent write. `None` blocks indefinitely.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) {
        self.shared.state.lock().write_timeout[self.side] = timeout;
    }
}

impl Read for PipeEnd {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_bytes(buf)
    }
}

impl Read for &PipeEnd {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_bytes(buf)
    }
}

impl Write for PipeEnd {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Write for &PipeEnd {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Connection for PipeEnd {
    fn local_addr(&self) -> NetAddress {
        NetAddress::Pipe
    }

    fn remote_addr(&self) -> NetAddress {
        NetAddress::Pipe
    }

    fn close(&self) -> Result<(), NetError> {
        PipeEnd::close(self);
        Ok(())
    }
}

impl Drop for PipeEnd {
    fn drop(&mut self) {
        PipeEnd::close(self);
    }
}
