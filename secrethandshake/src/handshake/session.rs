// Handshake output: the retained session secret and the two box-stream key
// pairs derived from it.
//
//   final     = SHA256(secret3)
//   send key  = SHA256(final || remote_public),  send nonce = remote_app_mac[..24]
//   recv key  = SHA256(final || local_public),   recv nonce = local_app_mac[..24]
//
// What one side sends with is exactly what the other side receives with.

use std::fmt;

use zeroize::Zeroizing;

use crate::crypto::hash::{hash_concat, MAC_LEN};
use crate::crypto::keys::PUBLIC_KEY_LEN;
use crate::crypto::secretbox::{KEY_LEN, NONCE_LEN};

/// One direction's box-stream key and starting nonce.
#[derive(Clone)]
pub struct BoxKeys {
    key: Zeroizing<[u8; KEY_LEN]>,
    nonce: [u8; NONCE_LEN],
}

impl BoxKeys {
    pub fn new(key: [u8; KEY_LEN], nonce: [u8; NONCE_LEN]) -> Self {
        Self {
            key: Zeroizing::new(key),
            nonce,
        }
    }

    pub fn key(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    /// Starting value of the nonce counter.
    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }
}

impl fmt::Debug for BoxKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxKeys").finish_non_exhaustive()
    }
}

/// Both directions plus the authenticated peer identity.
#[derive(Debug)]
pub struct SessionKeys {
    pub send: BoxKeys,
    pub recv: BoxKeys,
    pub remote_public: [u8; PUBLIC_KEY_LEN],
    pub local_public: [u8; PUBLIC_KEY_LEN],
}

/// A completed handshake. Every intermediate secret has been wiped; only the
/// hash of secret3 remains, and it is wiped when this value drops.
pub struct Accepted {
    secret: Zeroizing<[u8; 32]>,
    local_public: [u8; PUBLIC_KEY_LEN],
    remote_public: [u8; PUBLIC_KEY_LEN],
    local_app_mac: [u8; MAC_LEN],
    remote_app_mac: [u8; MAC_LEN],
}

impl Accepted {
    pub(crate) fn new(
        secret3: &[u8; 32],
        local_public: [u8; PUBLIC_KEY_LEN],
        remote_public: [u8; PUBLIC_KEY_LEN],
        local_app_mac: [u8; MAC_LEN],
        remote_app_mac: [u8; MAC_LEN],
    ) -> Self {
        Self {
            secret: hash_concat(&[secret3.as_slice()]),
            local_public,
            remote_public,
            local_app_mac,
            remote_app_mac,
        }
    }

    /// The peer's long-term public key, proven during the handshake.
    pub fn remote_public(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.remote_public
    }

    pub fn local_public(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.local_public
    }

    /// The retained session secret, identical on both sides.
    pub fn session_secret(&self) -> &[u8; 32] {
        &self.secret
    }

    /// Keys for the sending direction.
    pub fn encrypt_keys(&self) -> BoxKeys {
        derive(&self.secret, &self.remote_public, &self.remote_app_mac)
    }

    /// Keys for the receiving direction.
    pub fn decrypt_keys(&self) -> BoxKeys {
        derive(&self.secret, &self.local_public, &self.local_app_mac)
    }

    pub fn into_session_keys(self) -> SessionKeys {
        SessionKeys {
            send: self.encrypt_keys(),
            recv: self.decrypt_keys(),
            remote_public: self.remote_public,
            local_public: self.local_public,
        }
    }
}

impl fmt::Debug for Accepted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accepted")
            .field("remote_public", &hex::encode(self.remote_public))
            .finish_non_exhaustive()
    }
}

fn derive(secret: &[u8; 32], public: &[u8; PUBLIC_KEY_LEN], app_mac: &[u8; MAC_LEN]) -> BoxKeys {
    let key = hash_concat(&[secret.as_slice(), public.as_slice()]);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&app_mac[..NONCE_LEN]);
    BoxKeys::new(*key, nonce)
}
