//! # Bridges
//!
//! Blocking [`Listener`](crate::ports::Listener) and
//! [`Connection`](crate::ports::Connection) implementations over
//! non-socket transports:
//!
//! - [`McListener`] / [`McConn`] - connections offered and carried over an
//!   asynchronous message channel
//! - [`PipeListener`] - cancellable in-process dialing over [`pipe`](crate::pipe::pipe)

mod mc_conn;
mod mc_listener;
mod pipe_listener;

pub use mc_conn::McConn;
pub use mc_listener::McListener;
pub use pipe_listener::PipeListener;

#[cfg(test)]
mod tests;
