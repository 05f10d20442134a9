// Ed25519 identity keypairs and X25519 ephemeral keypairs.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{HandshakeError, Result};

/// Length of an ed25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;
/// Length of an ed25519 signature.
pub const SIGNATURE_LEN: usize = 64;

/// A long-term Ed25519 identity keypair.
///
/// The signing key is zeroized when the pair is dropped.
#[derive(Debug)]
pub struct IdentityKeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl IdentityKeyPair {
    /// Generate a fresh random Ed25519 keypair.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Reconstruct from a 32-byte secret seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(seed))
    }

    /// Reconstruct from the 64-byte `seed || public` form used by NaCl and
    /// on-disk secret files. The public half must match the seed.
    pub fn from_keypair_bytes(bytes: &[u8; 64]) -> Result<Self> {
        let signing_key = SigningKey::from_keypair_bytes(bytes)
            .map_err(|e| HandshakeError::InvalidKey(format!("{e}")))?;
        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// The 32-byte Ed25519 public key.
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.verifying_key.to_bytes()
    }

    /// Access the raw verifying (public) key.
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Access the raw signing (private) key.
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// Sign arbitrary data.
    pub fn sign(&self, data: &[u8]) -> [u8; SIGNATURE_LEN] {
        let sig: Signature = self.signing_key.sign(data);
        sig.to_bytes()
    }

    /// Verify a signature against the public key.
    pub fn verify(&self, data: &[u8], signature: &[u8; SIGNATURE_LEN]) -> Result<()> {
        let sig = Signature::from_bytes(signature);
        self.verifying_key
            .verify(data, &sig)
            .map_err(|_| HandshakeError::Authentication)
    }
}

/// Verify a signature given raw public key bytes, message, and signature bytes.
///
/// Every failure, including an undecodable key, maps to `Authentication`.
pub fn verify_signature(
    pubkey_bytes: &[u8; PUBLIC_KEY_LEN],
    message: &[u8],
    signature: &[u8; SIGNATURE_LEN],
) -> Result<()> {
    let vk =
        VerifyingKey::from_bytes(pubkey_bytes).map_err(|_| HandshakeError::Authentication)?;
    let sig = Signature::from_bytes(signature);
    vk.verify(message, &sig)
        .map_err(|_| HandshakeError::Authentication)
}

/// An X25519 keypair generated for exactly one handshake attempt.
///
/// `StaticSecret` zeroizes itself on drop, so the secret half never outlives
/// the handshake stage that owns it.
pub struct EphemeralKeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl EphemeralKeyPair {
    /// Generate a new random ephemeral keypair.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Create from existing secret bytes (used in deterministic tests).
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// The 32-byte public key.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        *self.public.as_bytes()
    }

    /// Diffie-Hellman with a Montgomery-form public key.
    ///
    /// Callers must have rejected low-order points before getting here.
    pub fn diffie_hellman(&self, peer_public: &[u8; 32]) -> Zeroizing<[u8; 32]> {
        let shared = self.secret.diffie_hellman(&PublicKey::from(*peer_public));
        Zeroizing::new(shared.to_bytes())
    }

    #[cfg(test)]
    pub(crate) fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }
}

impl Zeroize for EphemeralKeyPair {
    fn zeroize(&mut self) {
        self.secret.zeroize();
    }
}

/// X25519 scalar multiplication of a raw scalar with a Montgomery-form
/// public key. The scalar copy is wiped when the temporary secret drops.
pub fn scalar_mult(secret: &[u8; 32], public: &[u8; 32]) -> Zeroizing<[u8; 32]> {
    let secret = StaticSecret::from(*secret);
    Zeroizing::new(secret.diffie_hellman(&PublicKey::from(*public)).to_bytes())
}
