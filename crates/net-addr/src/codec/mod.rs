//! Compact persisted form of a [`NetAddress`].
//!
//! Records are tagged and, except for WebSocket URLs, fixed-width, so a
//! peer address book can be loaded without resolving any hostname:
//!
//! ```text
//! tag  body                                       width
//! 0    ipv4 (4)            | port (2, BE)          7
//! 1    ipv6 (16)           | port (2, BE)          19
//! 2    onion v2 hash (10)  | port (2, BE)          13
//! 3    onion v3 key (32)   | port (2, BE)          35
//! 4    marker (1) | len (2, BE) | url (len)        4 + len
//! ```
//!
//! Onion names are stored as raw key bytes, never as base32 text. The v3
//! checksum and version byte are recomputed on decode.

use std::io::{self, Read, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tracing::debug;

use crate::domain::{
    AddressType, NetAddress, OnionAddr, OnionKey, WsAddr, WsScheme, V2_DECODED_LEN, V3_KEY_LEN,
};
use crate::error::CodecError;

/// Encodes `addr` into a fresh buffer.
///
/// # Errors
///
/// Fails with [`CodecError::UnsupportedAddressType`] for addresses with no
/// persisted form, and with an onion or WebSocket validation error when the
/// address cannot be represented faithfully.
pub fn encode(addr: &NetAddress) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::with_capacity(encoded_len_hint(addr));
    encode_to(&mut buf, addr)?;
    Ok(buf)
}

/// Encodes `addr` into `w`.
///
/// Validation happens before anything is written, so a rejected address
/// never leaves a partial record behind.
pub fn encode_to<W: Write>(w: &mut W, addr: &NetAddress) -> Result<(), CodecError> {
    match addr {
        NetAddress::Tcp(sock) => encode_tcp(w, sock),
        NetAddress::Onion(onion) => encode_onion(w, onion),
        NetAddress::WebSocket(ws) => encode_ws(w, ws),
        NetAddress::Pipe => Err(CodecError::UnsupportedAddressType(addr.network())),
    }
}

/// Decodes one record from `r`.
///
/// Reads exactly the width the record declares and nothing past it.
///
/// # Errors
///
/// - [`CodecError::UnknownAddressType`] for an unassigned tag byte
/// - [`CodecError::TruncatedInput`] if the reader runs dry before the
///   record is complete
pub fn decode<R: Read>(r: &mut R) -> Result<NetAddress, CodecError> {
    decode_record(r).inspect_err(|e| debug!(error = %e, "failed to decode persisted address"))
}

fn decode_record<R: Read>(r: &mut R) -> Result<NetAddress, CodecError> {
    let mut tag = [0u8; 1];
    read_field(r, &mut tag, "address")?;
    let address_type = AddressType::try_from(tag[0])?;

    let addr = match address_type {
        AddressType::Tcp4 => {
            let mut body = [0u8; 4 + 2];
            read_field(r, &mut body, address_type.name())?;
            let ip = Ipv4Addr::new(body[0], body[1], body[2], body[3]);
            NetAddress::Tcp(SocketAddr::new(IpAddr::V4(ip), port_at(&body, 4)))
        }
        AddressType::Tcp6 => {
            let mut body = [0u8; 16 + 2];
            read_field(r, &mut body, address_type.name())?;
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&body[..16]);
            let ip = Ipv6Addr::from(octets);
            NetAddress::Tcp(SocketAddr::new(IpAddr::V6(ip), port_at(&body, 16)))
        }
        AddressType::OnionV2 => {
            let mut body = [0u8; V2_DECODED_LEN + 2];
            read_field(r, &mut body, address_type.name())?;
            let mut hash = [0u8; V2_DECODED_LEN];
            hash.copy_from_slice(&body[..V2_DECODED_LEN]);
            let port = port_at(&body, V2_DECODED_LEN);
            NetAddress::Onion(OnionKey::V2(hash).into_addr(port))
        }
        AddressType::OnionV3 => {
            let mut body = [0u8; V3_KEY_LEN + 2];
            read_field(r, &mut body, address_type.name())?;
            let mut key = [0u8; V3_KEY_LEN];
            key.copy_from_slice(&body[..V3_KEY_LEN]);
            let port = port_at(&body, V3_KEY_LEN);
            NetAddress::Onion(OnionKey::V3(key).into_addr(port))
        }
        AddressType::WebSocket => {
            let mut header = [0u8; 1 + 2];
            read_field(r, &mut header, address_type.name())?;
            let scheme = WsScheme::from_marker(header[0])
                .ok_or(CodecError::InvalidWebSocketScheme(header[0]))?;
            let len = usize::from(u16::from_be_bytes([header[1], header[2]]));
            let mut url = vec![0u8; len];
            read_field(r, &mut url, address_type.name())?;
            let url = String::from_utf8(url).map_err(|_| CodecError::InvalidUtf8)?;
            NetAddress::WebSocket(WsAddr::new(scheme, url))
        }
    };

    Ok(addr)
}

fn encode_tcp<W: Write>(w: &mut W, sock: &SocketAddr) -> Result<(), CodecError> {
    let port = sock.port().to_be_bytes();
    match sock.ip() {
        IpAddr::V4(v4) => write_record(w, AddressType::Tcp4, &[&v4.octets()[..], &port[..]]),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => write_record(w, AddressType::Tcp4, &[&v4.octets()[..], &port[..]]),
            None => write_record(w, AddressType::Tcp6, &[&v6.octets()[..], &port[..]]),
        },
    }
}

fn encode_onion<W: Write>(w: &mut W, onion: &OnionAddr) -> Result<(), CodecError> {
    let port = onion.port().to_be_bytes();
    match onion.key()? {
        OnionKey::V2(hash) => write_record(w, AddressType::OnionV2, &[&hash[..], &port[..]]),
        OnionKey::V3(key) => write_record(w, AddressType::OnionV3, &[&key[..], &port[..]]),
    }
}

fn encode_ws<W: Write>(w: &mut W, ws: &WsAddr) -> Result<(), CodecError> {
    let url = ws.url().as_bytes();
    let len = u16::try_from(url.len()).map_err(|_| CodecError::WebSocketAddressTooLong(url.len()))?;
    write_record(
        w,
        AddressType::WebSocket,
        &[&[ws.scheme().marker()][..], &len.to_be_bytes()[..], url],
    )
}

fn write_record<W: Write>(
    w: &mut W,
    address_type: AddressType,
    fields: &[&[u8]],
) -> Result<(), CodecError> {
    w.write_all(&[address_type.as_u8()])?;
    for field in fields {
        w.write_all(field)?;
    }
    Ok(())
}

fn read_field<R: Read>(r: &mut R, buf: &mut [u8], record: &'static str) -> Result<(), CodecError> {
    let expected = buf.len();
    r.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => CodecError::TruncatedInput { record, expected },
        _ => CodecError::Io(e),
    })
}

fn port_at(body: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([body[offset], body[offset + 1]])
}

fn encoded_len_hint(addr: &NetAddress) -> usize {
    match addr {
        NetAddress::WebSocket(ws) => 4 + ws.url().len(),
        other => other
            .address_type()
            .and_then(AddressType::body_len)
            .map_or(0, |len| 1 + len),
    }
}
