use std::fmt;

use data_encoding::BASE32_NOPAD;
use sha3::{Digest, Sha3_256};

use crate::error::CodecError;

/// Suffix every onion service name carries.
pub const ONION_SUFFIX: &str = ".onion";
/// Length of [`ONION_SUFFIX`].
pub const ONION_SUFFIX_LEN: usize = 6;

/// Literal length of a v2 service name, suffix included.
pub const V2_LEN: usize = 16 + ONION_SUFFIX_LEN;
/// Literal length of a v3 service name, suffix included.
pub const V3_LEN: usize = 56 + ONION_SUFFIX_LEN;

/// Decoded length of a v2 label: the truncated service key hash.
pub const V2_DECODED_LEN: usize = 10;
/// Decoded length of a v3 label: public key, checksum and version byte.
pub const V3_DECODED_LEN: usize = V3_KEY_LEN + 2 + 1;
/// Length of the ed25519 public key embedded in a v3 label.
pub const V3_KEY_LEN: usize = 32;

const V3_VERSION: u8 = 0x03;
const V3_CHECKSUM_PREFIX: &[u8] = b".onion checksum";

/// Onion service protocol version, determined by name length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnionVersion {
    /// 16-character label.
    V2,
    /// 56-character label.
    V3,
}

/// A Tor onion service endpoint, e.g. `abc…xyz.onion:9735`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OnionAddr {
    service: String,
    port: u16,
}

/// Key material an onion name persists as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OnionKey {
    V2([u8; V2_DECODED_LEN]),
    V3([u8; V3_KEY_LEN]),
}

impl OnionAddr {
    /// Wraps a service name as announced. Not validated until encoded.
    pub fn new(service: impl Into<String>, port: u16) -> Self {
        Self {
            service: service.into(),
            port,
        }
    }

    /// Builds the canonical v2 name for a 10-byte service hash.
    pub fn from_v2_hash(hash: &[u8; V2_DECODED_LEN], port: u16) -> Self {
        Self::new(format!("{}{ONION_SUFFIX}", encode_label(hash)), port)
    }

    /// Builds the canonical v3 name for an ed25519 service public key.
    pub fn from_v3_public_key(key: &[u8; V3_KEY_LEN], port: u16) -> Self {
        let mut raw = [0u8; V3_DECODED_LEN];
        raw[..V3_KEY_LEN].copy_from_slice(key);
        raw[V3_KEY_LEN..V3_KEY_LEN + 2].copy_from_slice(&v3_checksum(key));
        raw[V3_DECODED_LEN - 1] = V3_VERSION;
        Self::new(format!("{}{ONION_SUFFIX}", encode_label(&raw)), port)
    }

    /// Service name including the `.onion` suffix.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Virtual port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Version implied by the literal name length, if recognized.
    pub fn version(&self) -> Option<OnionVersion> {
        match self.service.len() {
            V2_LEN => Some(OnionVersion::V2),
            V3_LEN => Some(OnionVersion::V3),
            _ => None,
        }
    }

    /// Validates the service name and extracts the key material it encodes.
    pub(crate) fn key(&self) -> Result<OnionKey, CodecError> {
        let version = self
            .version()
            .ok_or(CodecError::InvalidOnionLength(self.service.len()))?;

        let suffix_index = self.service.len() - ONION_SUFFIX_LEN;
        let (label, suffix) = match (
            self.service.get(..suffix_index),
            self.service.get(suffix_index..),
        ) {
            (Some(label), Some(suffix)) => (label, suffix),
            _ => return Err(CodecError::InvalidOnionSuffix(self.service.clone())),
        };
        if suffix != ONION_SUFFIX {
            return Err(CodecError::InvalidOnionSuffix(suffix.to_string()));
        }

        let decoded = decode_label(label)
            .ok_or_else(|| CodecError::InvalidOnionEncoding(self.service.clone()))?;

        match version {
            OnionVersion::V2 => {
                let hash: [u8; V2_DECODED_LEN] = decoded
                    .as_slice()
                    .try_into()
                    .map_err(|_| CodecError::InvalidOnionLength(decoded.len()))?;
                Ok(OnionKey::V2(hash))
            }
            OnionVersion::V3 => {
                if decoded.len() != V3_DECODED_LEN {
                    return Err(CodecError::InvalidOnionLength(decoded.len()));
                }
                let mut key = [0u8; V3_KEY_LEN];
                key.copy_from_slice(&decoded[..V3_KEY_LEN]);
                let checksum = &decoded[V3_KEY_LEN..V3_KEY_LEN + 2];
                if decoded[V3_DECODED_LEN - 1] != V3_VERSION || checksum != v3_checksum(&key) {
                    return Err(CodecError::InvalidOnionChecksum(self.service.clone()));
                }
                Ok(OnionKey::V3(key))
            }
        }
    }
}

impl OnionKey {
    pub(crate) fn into_addr(self, port: u16) -> OnionAddr {
        match self {
            Self::V2(hash) => OnionAddr::from_v2_hash(&hash, port),
            Self::V3(key) => OnionAddr::from_v3_public_key(&key, port),
        }
    }
}

impl fmt::Display for OnionAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.service, self.port)
    }
}

fn v3_checksum(key: &[u8; V3_KEY_LEN]) -> [u8; 2] {
    let mut hasher = Sha3_256::new();
    hasher.update(V3_CHECKSUM_PREFIX);
    hasher.update(key);
    hasher.update([V3_VERSION]);
    let digest = hasher.finalize();
    [digest[0], digest[1]]
}

fn encode_label(bytes: &[u8]) -> String {
    BASE32_NOPAD.encode(bytes).to_ascii_lowercase()
}

// Onion labels are lowercase only; uppercase input would not survive a
// decode/encode round-trip.
fn decode_label(label: &str) -> Option<Vec<u8>> {
    let lowercase_base32 = label
        .bytes()
        .all(|b| matches!(b, b'a'..=b'z' | b'2'..=b'7'));
    if !lowercase_base32 {
        return None;
    }
    BASE32_NOPAD
        .decode(label.to_ascii_uppercase().as_bytes())
        .ok()
}
