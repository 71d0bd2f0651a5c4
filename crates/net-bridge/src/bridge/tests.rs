//! Tests for the message-channel and pipe bridges

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver};

use super::*;
use crate::cancel::CancelToken;
use crate::channel::{LocalPort, MessageChannel};
use crate::config::NetConfig;
use crate::error::NetError;
use crate::ports::{ChannelMessage, Connection, Listener, MessagePort};
use net_addr::NetAddress;

const WAIT: Duration = Duration::from_secs(5);

/// Everything the far side of a bridge receives.
#[derive(Debug, PartialEq, Eq)]
enum Seen {
    Data(Vec<u8>),
    Close,
}

fn observe(port: &LocalPort) -> Receiver<Seen> {
    let (tx, rx) = unbounded();
    port.set_handler(Arc::new(move |message: ChannelMessage| {
        let seen = match message {
            ChannelMessage::Data(bytes) => Seen::Data(bytes),
            ChannelMessage::Close => Seen::Close,
            ChannelMessage::Ports(_) => return,
        };
        let _ = tx.send(seen);
    }));
    rx
}

/// A bridge plus the raw port standing in for the remote peer.
fn bridged() -> (McConn, LocalPort) {
    let (near, far) = MessageChannel::new().into_ports();
    let conn = McConn::new(Arc::new(near), &NetConfig::for_testing()).unwrap();
    (conn, far)
}

fn offer(from: &LocalPort) -> LocalPort {
    let (server_side, client_side) = MessageChannel::new().into_ports();
    let server_side: Box<dyn MessagePort> = Box::new(server_side);
    from.post_message(ChannelMessage::Ports(vec![server_side]))
        .unwrap();
    client_side
}

// =============================================================================
// McConn
// =============================================================================

#[test]
fn test_inbound_payloads_read_in_order() {
    let (mut conn, far) = bridged();
    far.post_message(ChannelMessage::Data(b"b1".to_vec())).unwrap();
    far.post_message(ChannelMessage::Data(b"b2".to_vec())).unwrap();

    let mut buf = [0u8; 4];
    conn.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"b1b2");
}

#[test]
fn test_empty_and_port_messages_do_not_tear_down() {
    let (mut conn, far) = bridged();
    far.post_message(ChannelMessage::Data(Vec::new())).unwrap();
    let stray: Box<dyn MessagePort> = Box::new(MessageChannel::new().port1);
    far.post_message(ChannelMessage::Ports(vec![stray])).unwrap();
    far.post_message(ChannelMessage::Data(b"ok".to_vec())).unwrap();

    let mut buf = [0u8; 2];
    conn.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"ok");
    assert!(!conn.is_closed());
}

#[test]
fn test_outbound_is_chunked() {
    let (mut conn, far) = bridged();
    let seen = observe(&far);
    let payload: Vec<u8> = (0..40).collect();
    conn.write_all(&payload).unwrap();

    let mut received = Vec::new();
    while received.len() < payload.len() {
        match seen.recv_timeout(WAIT).unwrap() {
            Seen::Data(chunk) => {
                assert!(chunk.len() <= NetConfig::for_testing().max_chunk_size);
                received.extend(chunk);
            }
            Seen::Close => panic!("unexpected close"),
        }
    }
    assert_eq!(received, payload);
}

#[test]
fn test_local_close_signals_peer() {
    let (conn, far) = bridged();
    let seen = observe(&far);

    conn.close().unwrap();
    conn.close().unwrap();
    assert!(conn.is_closed());
    assert_eq!(seen.recv_timeout(WAIT).unwrap(), Seen::Close);

    let mut buf = [0u8; 1];
    assert!((&conn).read(&mut buf).is_err());
    assert!((&conn).write(b"x").is_err());
}

#[test]
fn test_close_after_write_delivers_everything_first() {
    let config = NetConfig::for_testing();
    for _ in 0..300 {
        let (a, b) = MessageChannel::new().into_ports();
        let left = McConn::new(Arc::new(a), &config).unwrap();
        let right = McConn::new(Arc::new(b), &config).unwrap();

        (&left).write_all(b"hello").unwrap();
        left.close().unwrap();

        let mut received = Vec::new();
        (&right).read_to_end(&mut received).unwrap();
        assert_eq!(received, b"hello");
    }
}

#[test]
fn test_close_after_write_orders_data_before_close() {
    let (conn, far) = bridged();
    let seen = observe(&far);
    let payload: Vec<u8> = (0..40).collect();

    (&conn).write_all(&payload).unwrap();
    conn.close().unwrap();

    let mut received = Vec::new();
    loop {
        match seen.recv_timeout(WAIT).unwrap() {
            Seen::Data(chunk) => received.extend(chunk),
            Seen::Close => break,
        }
    }
    assert_eq!(received, payload);
}

#[test]
fn test_peer_close_gives_eof() {
    let (conn, far) = bridged();
    let seen = observe(&far);
    far.post_message(ChannelMessage::Close).unwrap();

    let mut buf = [0u8; 8];
    assert_eq!((&conn).read(&mut buf).unwrap(), 0);
    assert!(conn.is_closed());
    let err = (&conn).write(b"late").unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

    // Teardown caused by the peer is not echoed back.
    assert!(seen.recv_timeout(Duration::from_millis(50)).is_err());
}

#[test]
fn test_close_unblocks_pending_read() {
    let (conn, _far) = bridged();
    let conn = Arc::new(conn);
    let reader = {
        let conn = Arc::clone(&conn);
        thread::spawn(move || {
            let mut buf = [0u8; 8];
            (&*conn).read(&mut buf)
        })
    };

    thread::sleep(Duration::from_millis(50));
    conn.close().unwrap();
    assert!(reader.join().unwrap().is_err());
}

#[test]
fn test_close_unblocks_stalled_inbound_write() {
    let (conn, far) = bridged();
    // Nobody reads: the handler blocks inside its pipe write.
    far.post_message(ChannelMessage::Data(b"unread".to_vec())).unwrap();
    thread::sleep(Duration::from_millis(50));

    let closer = thread::spawn(move || conn.close().map(|()| conn));
    let conn = closer.join().unwrap().unwrap();
    assert!(conn.is_closed());
}

#[test]
fn test_vanished_peer_tears_down_on_write() {
    let (conn, far) = bridged();
    drop(far);

    let _ = (&conn).write_all(b"into the void");
    let mut buf = [0u8; 4];
    assert_eq!((&conn).read(&mut buf).unwrap(), 0);
    assert!(conn.is_closed());
}

#[test]
fn test_read_timeout() {
    let (conn, _far) = bridged();
    conn.set_read_timeout(Some(Duration::from_millis(20)));
    let mut buf = [0u8; 1];
    let err = (&conn).read(&mut buf).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    assert!(!conn.is_closed());
}

// =============================================================================
// McListener
// =============================================================================

fn listener() -> (McListener, LocalPort) {
    let (listen_port, client) = MessageChannel::new().into_ports();
    (
        McListener::new(Arc::new(listen_port), NetConfig::for_testing()),
        client,
    )
}

#[test]
fn test_accept_offered_port() {
    let (listener, client) = listener();
    let remote = offer(&client);

    let mut conn = listener.accept().unwrap();
    remote
        .post_message(ChannelMessage::Data(b"hi".to_vec()))
        .unwrap();
    let mut buf = [0u8; 2];
    conn.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"hi");
}

#[test]
fn test_listener_ignores_non_offers() {
    let (listener, client) = listener();
    client
        .post_message(ChannelMessage::Data(b"noise".to_vec()))
        .unwrap();
    client.post_message(ChannelMessage::Ports(Vec::new())).unwrap();
    let _remote = offer(&client);

    assert!(listener.accept().is_ok());
}

#[test]
fn test_accept_after_close_fails() {
    let (listener, _client) = listener();
    listener.close().unwrap();
    listener.close().unwrap();
    assert!(matches!(listener.accept(), Err(NetError::ListenerClosed)));
}

#[test]
fn test_close_wakes_blocked_accept() {
    let (listener, _client) = listener();
    let listener = Arc::new(listener);
    let acceptor = {
        let listener = Arc::clone(&listener);
        thread::spawn(move || listener.accept().map(|_| ()))
    };

    thread::sleep(Duration::from_millis(50));
    listener.close().unwrap();
    assert!(matches!(
        acceptor.join().unwrap(),
        Err(NetError::ListenerClosed)
    ));
}

#[test]
fn test_listener_addr_is_placeholder() {
    let (listener, _client) = listener();
    assert_eq!(listener.addr().to_string(), "127.0.0.1:443");
}

// =============================================================================
// PipeListener
// =============================================================================

#[test]
fn test_pipe_dial_and_accept() {
    let listener = Arc::new(PipeListener::new(CancelToken::new()));
    let acceptor = {
        let listener = Arc::clone(&listener);
        thread::spawn(move || {
            let conn = listener.accept().unwrap();
            let mut buf = [0u8; 4];
            (&conn).read_exact(&mut buf).unwrap();
            (&conn).write_all(&buf).unwrap();
        })
    };

    let conn = listener.dial(&CancelToken::new(), "pipe").unwrap();
    (&conn).write_all(b"echo").unwrap();
    let mut buf = [0u8; 4];
    (&conn).read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"echo");
    acceptor.join().unwrap();
}

#[test]
fn test_dial_with_cancelled_token() {
    let listener = PipeListener::new(CancelToken::new());
    let token = CancelToken::new();
    token.cancel();
    assert!(matches!(
        listener.dial(&token, "pipe"),
        Err(NetError::ListenerClosed)
    ));
}

#[test]
fn test_cancel_pending_dial() {
    let listener = Arc::new(PipeListener::new(CancelToken::new()));
    let token = CancelToken::new();
    let dialer = {
        let listener = Arc::clone(&listener);
        let token = token.clone();
        thread::spawn(move || listener.dial(&token, "pipe").map(|_| ()))
    };

    thread::sleep(Duration::from_millis(50));
    token.cancel();
    assert!(matches!(
        dialer.join().unwrap(),
        Err(NetError::ListenerClosed)
    ));
}

#[test]
fn test_close_aborts_pending_accept_and_reopens() {
    let listener = Arc::new(PipeListener::new(CancelToken::new()));
    let acceptor = {
        let listener = Arc::clone(&listener);
        thread::spawn(move || listener.accept().map(|_| ()))
    };

    thread::sleep(Duration::from_millis(50));
    listener.close().unwrap();
    assert!(matches!(
        acceptor.join().unwrap(),
        Err(NetError::ListenerClosed)
    ));

    // Next cycle works.
    let acceptor = {
        let listener = Arc::clone(&listener);
        thread::spawn(move || listener.accept().map(|_| ()))
    };
    listener.dial(&CancelToken::new(), "pipe").unwrap();
    acceptor.join().unwrap().unwrap();
}

#[test]
fn test_accept_after_close_waits_for_next_dial() {
    let listener = Arc::new(PipeListener::new(CancelToken::new()));
    listener.close().unwrap();

    let (done_tx, done) = unbounded();
    {
        let listener = Arc::clone(&listener);
        thread::spawn(move || {
            let _ = done_tx.send(listener.accept().map(|_| ()));
        });
    }

    // The closed cycle is over: accept blocks on the new one.
    assert!(done.recv_timeout(Duration::from_millis(100)).is_err());

    listener.dial(&CancelToken::new(), "pipe").unwrap();
    assert!(done.recv_timeout(WAIT).unwrap().is_ok());
}

#[test]
fn test_pipe_listener_addr_matches_channel_listener() {
    let listener = PipeListener::new(CancelToken::new());
    assert_eq!(listener.addr().to_string(), "127.0.0.1:443");
    assert_eq!(
        listener.addr(),
        NetAddress::Tcp(NetConfig::default().listener_addr)
    );

    let custom = PipeListener::new(CancelToken::new())
        .with_listener_addr("127.0.0.1:9735".parse().unwrap());
    assert_eq!(custom.addr().to_string(), "127.0.0.1:9735");
}

#[test]
fn test_close_aborts_pending_dial() {
    let listener = Arc::new(PipeListener::new(CancelToken::new()));
    let dialer = {
        let listener = Arc::clone(&listener);
        thread::spawn(move || listener.dial(&CancelToken::new(), "pipe").map(|_| ()))
    };

    thread::sleep(Duration::from_millis(50));
    listener.close().unwrap();
    assert!(matches!(
        dialer.join().unwrap(),
        Err(NetError::ListenerClosed)
    ));
}

#[test]
fn test_parent_cancel_closes_for_good() {
    let parent = CancelToken::new();
    let listener = PipeListener::new(parent.clone());
    parent.cancel();

    assert!(matches!(listener.accept(), Err(NetError::ListenerClosed)));
    listener.close().unwrap();
    assert!(matches!(listener.accept(), Err(NetError::ListenerClosed)));
    assert!(matches!(
        listener.dial(&CancelToken::new(), "pipe"),
        Err(NetError::ListenerClosed)
    ));
}
