// NaCl secretbox: XSalsa20-Poly1305 with a 24-byte nonce and a 16-byte tag
// placed in front of the ciphertext.

use crypto_secretbox::aead::{AeadInPlace, KeyInit, Nonce, Tag};
use crypto_secretbox::XSalsa20Poly1305;
use zeroize::Zeroizing;

use crate::error::{HandshakeError, Result};

/// Length of the Poly1305 authentication tag.
pub const TAG_LEN: usize = 16;
/// Length of a secretbox nonce.
pub const NONCE_LEN: usize = 24;
/// Length of a secretbox key.
pub const KEY_LEN: usize = 32;

/// Secretbox keyed by one 32-byte symmetric key.
pub struct SecretBox {
    cipher: XSalsa20Poly1305,
}

impl SecretBox {
    /// Create a secretbox from a 32-byte key.
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self {
            cipher: XSalsa20Poly1305::new(key.into()),
        }
    }

    /// Seal `plaintext`, returning `tag || ciphertext`.
    pub fn seal(&self, nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut out = vec![0u8; TAG_LEN + plaintext.len()];
        out[TAG_LEN..].copy_from_slice(plaintext);
        let tag = self.seal_detached(nonce, &mut out[TAG_LEN..])?;
        out[..TAG_LEN].copy_from_slice(&tag);
        Ok(out)
    }

    /// Open a `tag || ciphertext` box. Any failure is reported as
    /// `Authentication` without further detail.
    pub fn open(&self, nonce: &[u8; NONCE_LEN], boxed: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if boxed.len() < TAG_LEN {
            return Err(HandshakeError::Authentication);
        }
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&boxed[..TAG_LEN]);
        let mut plain = Zeroizing::new(boxed[TAG_LEN..].to_vec());
        self.open_detached(nonce, &mut plain, &tag)?;
        Ok(plain)
    }

    /// Encrypt `buffer` in place and return the detached tag.
    pub fn seal_detached(
        &self,
        nonce: &[u8; NONCE_LEN],
        buffer: &mut [u8],
    ) -> Result<[u8; TAG_LEN]> {
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::<XSalsa20Poly1305>::from_slice(nonce), b"", buffer)
            .map_err(|e| HandshakeError::Encryption(format!("{e}")))?;
        let mut out = [0u8; TAG_LEN];
        out.copy_from_slice(&tag);
        Ok(out)
    }

    /// Verify `tag` and decrypt `buffer` in place. On failure the buffer
    /// content is unspecified and must be discarded.
    pub fn open_detached(
        &self,
        nonce: &[u8; NONCE_LEN],
        buffer: &mut [u8],
        tag: &[u8; TAG_LEN],
    ) -> Result<()> {
        self.cipher
            .decrypt_in_place_detached(
                Nonce::<XSalsa20Poly1305>::from_slice(nonce),
                b"",
                buffer,
                Tag::<XSalsa20Poly1305>::from_slice(tag),
            )
            .map_err(|_| HandshakeError::Authentication)
    }
}
