// Network configuration: the app key shared out-of-band by every peer of one
// logical network.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{HandshakeError, Result};

/// Length of an app key in bytes.
pub const APP_KEY_LEN: usize = 32;

/// 32-byte network identifier.
///
/// Not a confidentiality secret: it partitions networks so that peers holding
/// different app keys never get past the first handshake message.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AppKey([u8; APP_KEY_LEN]);

impl AppKey {
    pub const fn from_bytes(bytes: [u8; APP_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a standard-alphabet base64 string (the usual config encoding).
    pub fn from_base64(s: &str) -> Result<Self> {
        let raw = STANDARD
            .decode(s.trim())
            .map_err(|e| HandshakeError::InvalidKey(format!("app key base64: {e}")))?;
        Self::from_slice(&raw)
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let raw = hex::decode(s.trim())
            .map_err(|e| HandshakeError::InvalidKey(format!("app key hex: {e}")))?;
        Self::from_slice(&raw)
    }

    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        let bytes: [u8; APP_KEY_LEN] = raw.try_into().map_err(|_| {
            HandshakeError::InvalidKey(format!(
                "app key must be {APP_KEY_LEN} bytes, got {}",
                raw.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; APP_KEY_LEN] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl FromStr for AppKey {
    type Err = HandshakeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_base64(s)
    }
}

impl From<[u8; APP_KEY_LEN]> for AppKey {
    fn from(bytes: [u8; APP_KEY_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for AppKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AppKey({})", self.to_base64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_B64: &str = "IhrX11txvFiVzm+NurzHLCqUUe3xZXkPfODnp7WlMpk=";

    #[test]
    fn base64_roundtrip() {
        let key: AppKey = KEY_B64.parse().unwrap();
        assert_eq!(key.to_base64(), KEY_B64);
        assert_eq!(key.as_bytes()[0], 0x22);
    }

    #[test]
    fn hex_matches_base64() {
        let key = AppKey::from_base64(KEY_B64).unwrap();
        let hexed = hex::encode(key.as_bytes());
        assert_eq!(AppKey::from_hex(&hexed).unwrap(), key);
    }

    #[test]
    fn wrong_length_rejected() {
        assert!(matches!(
            AppKey::from_base64("AAAA"),
            Err(HandshakeError::InvalidKey(_))
        ));
        assert!(AppKey::from_hex("zz").is_err());
    }
}
