// Conversion of Ed25519 identity keys into their X25519 counterparts, and the
// low-order point checks guarding every Diffie-Hellman input.

use ed25519_dalek::{SigningKey, VerifyingKey};
use sha2::{Digest, Sha512};
use zeroize::Zeroizing;

/// Montgomery u-coordinates of small order (and their non-canonical
/// encodings), with the top bit cleared. A scalar multiplication by any of
/// these lands in a set of at most eight points, so the resulting "shared"
/// secret is predictable.
const LOW_ORDER_POINTS: [[u8; 32]; 7] = [
    // 0 (order 4)
    [0; 32],
    // 1 (order 1)
    [
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
    ],
    // order 8
    [
        0xe0, 0xeb, 0x7a, 0x7c, 0x3b, 0x41, 0xb8, 0xae, 0x16, 0x56, 0xe3, 0xfa, 0xf1, 0x9f, 0xc4,
        0x6a, 0xda, 0x09, 0x8d, 0xeb, 0x9c, 0x32, 0xb1, 0xfd, 0x86, 0x62, 0x05, 0x16, 0x5f, 0x49,
        0xb8, 0x00,
    ],
    // order 8
    [
        0x5f, 0x9c, 0x95, 0xbc, 0xa3, 0x50, 0x8c, 0x24, 0xb1, 0xd0, 0xb1, 0x55, 0x9c, 0x83, 0xef,
        0x5b, 0x04, 0x44, 0x5c, 0xc4, 0x58, 0x1c, 0x8e, 0x86, 0xd8, 0x22, 0x4e, 0xdd, 0xd0, 0x9f,
        0x11, 0x57,
    ],
    // p - 1 (order 2)
    [
        0xec, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0x7f,
    ],
    // p (= 0)
    [
        0xed, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0x7f,
    ],
    // p + 1 (= 1)
    [
        0xee, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0x7f,
    ],
];

/// Returns true if `u` encodes a low-order Montgomery point.
///
/// The scan touches every blacklist entry regardless of where a match is
/// found.
pub fn is_low_order(u: &[u8; 32]) -> bool {
    let mut found = 0u8;
    for candidate in LOW_ORDER_POINTS.iter() {
        let mut diff = 0u8;
        for i in 0..31 {
            diff |= u[i] ^ candidate[i];
        }
        diff |= (u[31] & 0x7f) ^ candidate[31];
        found |= (diff == 0) as u8;
    }
    found != 0
}

/// Map an Ed25519 signing key to the X25519 scalar of the same identity:
/// SHA-512 of the seed, lower half, clamped.
pub fn identity_secret_to_exchange_secret(signing_key: &SigningKey) -> Zeroizing<[u8; 32]> {
    let seed = Zeroizing::new(signing_key.to_bytes());
    let digest = Zeroizing::new(Sha512::digest(seed.as_slice()));

    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(&digest[..32]);
    out[0] &= 248;
    out[31] &= 127;
    out[31] |= 64;
    out
}

/// Map an Ed25519 public key to its X25519 form, u = (1 + y) / (1 - y).
///
/// Returns `None` if the key does not decode to a curve point or if it (or
/// its Montgomery image) has small order.
pub fn identity_public_to_exchange_public(public: &[u8; 32]) -> Option<[u8; 32]> {
    let vk = VerifyingKey::from_bytes(public).ok()?;
    if vk.is_weak() {
        return None;
    }
    let u = vk.to_montgomery().to_bytes();
    if is_low_order(&u) {
        return None;
    }
    Some(u)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::IdentityKeyPair;
    use x25519_dalek::{PublicKey, StaticSecret};

    #[test]
    fn converted_pair_is_consistent() {
        let kp = IdentityKeyPair::generate();
        let secret = identity_secret_to_exchange_secret(kp.signing_key());
        let public = identity_public_to_exchange_public(&kp.public_key_bytes()).unwrap();

        let derived = PublicKey::from(&StaticSecret::from(*secret));
        assert_eq!(derived.as_bytes(), &public);
    }

    #[test]
    fn converted_keys_agree_on_dh() {
        let alice = IdentityKeyPair::generate();
        let bob = IdentityKeyPair::generate();

        let a_sec = StaticSecret::from(*identity_secret_to_exchange_secret(alice.signing_key()));
        let b_sec = StaticSecret::from(*identity_secret_to_exchange_secret(bob.signing_key()));
        let a_pub = identity_public_to_exchange_public(&alice.public_key_bytes()).unwrap();
        let b_pub = identity_public_to_exchange_public(&bob.public_key_bytes()).unwrap();

        let ab = a_sec.diffie_hellman(&PublicKey::from(b_pub));
        let ba = b_sec.diffie_hellman(&PublicKey::from(a_pub));
        assert_eq!(ab.as_bytes(), ba.as_bytes());
    }

    #[test]
    fn secret_is_clamped() {
        let kp = IdentityKeyPair::from_seed(&[3u8; 32]);
        let secret = identity_secret_to_exchange_secret(kp.signing_key());
        assert_eq!(secret[0] & 7, 0);
        assert_eq!(secret[31] & 0x80, 0);
        assert_eq!(secret[31] & 0x40, 0x40);
    }

    #[test]
    fn edwards_identity_rejected() {
        // y = 1 encodes the neutral element.
        let mut identity = [0u8; 32];
        identity[0] = 1;
        assert!(identity_public_to_exchange_public(&identity).is_none());
    }

    #[test]
    fn edwards_order_two_rejected() {
        // y = -1, the point of order 2.
        let mut minus_one = [0xffu8; 32];
        minus_one[0] = 0xec;
        minus_one[31] = 0x7f;
        assert!(identity_public_to_exchange_public(&minus_one).is_none());
    }

    #[test]
    fn montgomery_blacklist() {
        for point in LOW_ORDER_POINTS.iter() {
            assert!(is_low_order(point));
            let mut high = *point;
            high[31] |= 0x80;
            assert!(is_low_order(&high), "top bit must be ignored");
        }
        let kp = crate::crypto::keys::EphemeralKeyPair::generate();
        assert!(!is_low_order(&kp.public_key_bytes()));
    }

    #[test]
    fn low_order_dh_output_is_degenerate() {
        // Demonstrates why the check exists: DH against u = 0 yields all zeros.
        let secret = StaticSecret::from([0x42u8; 32]);
        let shared = secret.diffie_hellman(&PublicKey::from([0u8; 32]));
        assert_eq!(shared.as_bytes(), &[0u8; 32]);
    }
}
