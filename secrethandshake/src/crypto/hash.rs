// Hashing and message authentication: SHA-256 and HMAC-SHA-512/256.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use zeroize::Zeroizing;

type HmacSha512 = Hmac<Sha512>;

/// Length of an app MAC (HMAC-SHA-512 truncated to 256 bits).
pub const MAC_LEN: usize = 32;

/// SHA-256 hash of `data`, returning a 32-byte digest.
pub fn hash_sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// SHA-256 over the concatenation of `parts`, kept in zeroizing storage since
/// every caller hashes secret material.
pub fn hash_concat(parts: &[&[u8]]) -> Zeroizing<[u8; 32]> {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    Zeroizing::new(hasher.finalize().into())
}

/// HMAC-SHA-512/256 of `data` under `key` (NaCl `crypto_auth`).
pub fn auth(key: &[u8; 32], data: &[u8]) -> [u8; MAC_LEN] {
    let mut mac = new_mac(key);
    mac.update(data);
    let full = mac.finalize().into_bytes();
    let mut out = [0u8; MAC_LEN];
    out.copy_from_slice(&full[..MAC_LEN]);
    out
}

/// Constant-time check of a truncated HMAC-SHA-512/256 tag.
pub fn auth_verify(key: &[u8; 32], data: &[u8], tag: &[u8; MAC_LEN]) -> bool {
    let mut mac = new_mac(key);
    mac.update(data);
    mac.verify_truncated_left(tag).is_ok()
}

fn new_mac(key: &[u8; 32]) -> HmacSha512 {
    // HMAC accepts keys of any length.
    <HmacSha512 as Mac>::new_from_slice(key).unwrap_or_else(|_| unreachable!())
}
