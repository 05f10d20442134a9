//! 24-byte big-endian nonce counter shared by the boxer and unboxer.

use std::fmt;

use secrethandshake::crypto::secretbox::NONCE_LEN;

/// Big-endian counter over the full 24-byte nonce, wrapping to zero.
///
/// Each framed message consumes two values (header, then body) and the
/// goodbye message consumes one. Owned by exactly one boxer or unboxer.
#[derive(Clone, PartialEq, Eq)]
pub struct NonceCounter([u8; NONCE_LEN]);

impl NonceCounter {
    pub fn new(seed: [u8; NONCE_LEN]) -> Self {
        Self(seed)
    }

    /// Current value, without advancing.
    pub fn snapshot(&self) -> [u8; NONCE_LEN] {
        self.0
    }

    /// Add one, carrying from the last byte towards the first.
    pub fn increment(&mut self) {
        for byte in self.0.iter_mut().rev() {
            if *byte == 0xff {
                *byte = 0;
            } else {
                *byte += 1;
                return;
            }
        }
    }

    /// Current value, then advance.
    pub fn next(&mut self) -> [u8; NONCE_LEN] {
        let nonce = self.snapshot();
        self.increment();
        nonce
    }
}

impl fmt::Debug for NonceCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NonceCounter(")?;
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        write!(f, ")")
    }
}
