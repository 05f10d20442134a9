// Wire messages exchanged during the four-step secret handshake.
//
//   Initiator                         Responder
//     |--- Challenge (64) ------->|
//     |<-- Challenge (64) --------|
//     |--- ClientAuth (112) ----->|
//     |<-- ServerAccept (80) -----|
//     |==== box-stream ===========|

use crate::crypto::hash::MAC_LEN;
use crate::crypto::keys::{PUBLIC_KEY_LEN, SIGNATURE_LEN};
use crate::crypto::secretbox::TAG_LEN;

/// Challenge: app MAC || ephemeral public key.
pub const CHALLENGE_LEN: usize = MAC_LEN + 32;
/// Plaintext of ClientAuth: signature || initiator identity public key.
pub const HELLO_LEN: usize = SIGNATURE_LEN + PUBLIC_KEY_LEN;
/// ClientAuth: secretbox tag || sealed hello.
pub const CLIENT_AUTH_LEN: usize = TAG_LEN + HELLO_LEN;
/// ServerAccept: secretbox tag || sealed signature.
pub const SERVER_ACCEPT_LEN: usize = TAG_LEN + SIGNATURE_LEN;

/// The all-zero nonce used for both handshake boxes. Each box is sealed under
/// a key used exactly once, so nonce reuse across boxes cannot occur.
pub(crate) const ZERO_NONCE: [u8; 24] = [0u8; 24];

/// Message 1 and 2: sent by both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge {
    /// HMAC of `ephemeral_public` under the app key.
    pub mac: [u8; MAC_LEN],
    /// Sender's ephemeral X25519 public key.
    pub ephemeral_public: [u8; 32],
}

impl Challenge {
    pub fn to_bytes(&self) -> [u8; CHALLENGE_LEN] {
        let mut out = [0u8; CHALLENGE_LEN];
        out[..MAC_LEN].copy_from_slice(&self.mac);
        out[MAC_LEN..].copy_from_slice(&self.ephemeral_public);
        out
    }

    pub fn from_bytes(bytes: &[u8; CHALLENGE_LEN]) -> Self {
        let mut mac = [0u8; MAC_LEN];
        let mut ephemeral_public = [0u8; 32];
        mac.copy_from_slice(&bytes[..MAC_LEN]);
        ephemeral_public.copy_from_slice(&bytes[MAC_LEN..]);
        Self {
            mac,
            ephemeral_public,
        }
    }
}

/// Concatenate transcript parts for signing.
pub(crate) fn transcript(parts: &[&[u8]]) -> Vec<u8> {
    let len = parts.iter().map(|p| p.len()).sum();
    let mut out = Vec::with_capacity(len);
    for part in parts {
        out.extend_from_slice(part);
    }
    out
}
