use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver};

use super::*;

const WAIT: Duration = Duration::from_secs(5);

/// Handler forwarding every data payload into a test channel.
fn collecting_handler() -> (MessageHandler, Receiver<Vec<u8>>) {
    let (tx, rx) = unbounded();
    let handler: MessageHandler = Arc::new(move |message: ChannelMessage| {
        if let ChannelMessage::Data(bytes) = message {
            let _ = tx.send(bytes);
        }
    });
    (handler, rx)
}

#[test]
fn test_messages_delivered_in_order() {
    let (a, b) = MessageChannel::new().into_ports();
    let (handler, received) = collecting_handler();
    b.set_handler(handler);

    for i in 0..100u8 {
        a.post_message(ChannelMessage::Data(vec![i])).unwrap();
    }
    for i in 0..100u8 {
        assert_eq!(received.recv_timeout(WAIT).unwrap(), vec![i]);
    }
}

#[test]
fn test_messages_queue_until_handler_installed() {
    let (a, b) = MessageChannel::new().into_ports();
    a.post_message(ChannelMessage::Data(b"early".to_vec())).unwrap();

    let (handler, received) = collecting_handler();
    b.set_handler(handler);
    assert_eq!(received.recv_timeout(WAIT).unwrap(), b"early");
}

#[test]
fn test_post_after_close_fails() {
    let (a, b) = MessageChannel::new().into_ports();
    a.close();
    assert!(matches!(
        a.post_message(ChannelMessage::Close),
        Err(NetError::ChannelClosed)
    ));
    // The peer is disentangled too.
    assert!(matches!(
        b.post_message(ChannelMessage::Data(vec![1])),
        Err(NetError::ChannelClosed)
    ));
}

#[test]
fn test_close_stops_dispatcher() {
    let (a, b) = MessageChannel::new().into_ports();
    let (handler, received) = collecting_handler();
    b.set_handler(handler);
    b.close();
    b.close();

    assert!(a.post_message(ChannelMessage::Data(vec![1])).is_err());
    assert!(received.recv_timeout(Duration::from_millis(50)).is_err());
}

#[test]
fn test_close_from_inside_handler() {
    let (a, b) = MessageChannel::new().into_ports();
    let b = Arc::new(b);
    let (done_tx, done_rx) = unbounded();

    let weak = Arc::downgrade(&b);
    b.set_handler(Arc::new(move |message: ChannelMessage| {
        if matches!(message, ChannelMessage::Close) {
            if let Some(port) = weak.upgrade() {
                port.close();
            }
            let _ = done_tx.send(());
        }
    }));

    a.post_message(ChannelMessage::Close).unwrap();
    done_rx.recv_timeout(WAIT).unwrap();
    assert!(b.post_message(ChannelMessage::Close).is_err());
}

#[test]
fn test_transfer_port() {
    let (a, b) = MessageChannel::new().into_ports();
    let (offered, kept) = MessageChannel::new().into_ports();

    let (tx, rx) = unbounded();
    b.set_handler(Arc::new(move |message: ChannelMessage| {
        if let ChannelMessage::Ports(mut ports) = message {
            let _ = tx.send(ports.remove(0));
        }
    }));

    let offered: Box<dyn MessagePort> = Box::new(offered);
    a.post_message(ChannelMessage::Ports(vec![offered])).unwrap();
    let transferred = rx.recv_timeout(WAIT).unwrap();

    let (handler, received) = collecting_handler();
    transferred.set_handler(handler);
    kept.post_message(ChannelMessage::Data(b"through".to_vec()))
        .unwrap();
    assert_eq!(received.recv_timeout(WAIT).unwrap(), b"through");
}

#[test]
fn test_cleared_handler_drops_messages() {
    let (a, b) = MessageChannel::new().into_ports();
    let (handler, received) = collecting_handler();
    b.set_handler(handler);
    b.clear_handler();

    a.post_message(ChannelMessage::Data(vec![7])).unwrap();
    assert!(received.recv_timeout(Duration::from_millis(50)).is_err());
}
