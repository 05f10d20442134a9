//! Box-stream framing constants and the header plaintext codec.
//!
//! One framed message on the wire:
//!
//! ```text
//! +-------------------- 34 bytes --------------------+--- len bytes ---+
//! | header tag (16) | sealed( len u16 BE | body tag ) | body ciphertext  |
//! +--------------------------------------------------+-----------------+
//! ```
//!
//! The goodbye message is a header whose plaintext is 18 zero bytes, with no
//! body after it.

use bytes::{Buf, BufMut};

use secrethandshake::crypto::secretbox::TAG_LEN;

/// Largest plaintext carried by one message.
pub const MAX_SEGMENT_SIZE: usize = 4096;
/// Plaintext length of a header: body length plus body tag.
pub const HEADER_PLAIN_LEN: usize = 2 + TAG_LEN;
/// Sealed header length on the wire.
pub const HEADER_LEN: usize = TAG_LEN + HEADER_PLAIN_LEN;
/// Header plaintext of the goodbye message.
pub const GOODBYE: [u8; HEADER_PLAIN_LEN] = [0u8; HEADER_PLAIN_LEN];

/// Decoded header plaintext of a data message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub body_len: u16,
    pub body_tag: [u8; TAG_LEN],
}

impl Header {
    pub fn encode(&self) -> [u8; HEADER_PLAIN_LEN] {
        let mut out = [0u8; HEADER_PLAIN_LEN];
        let mut buf = &mut out[..];
        buf.put_u16(self.body_len);
        buf.put_slice(&self.body_tag);
        out
    }

    /// Decode a header plaintext; `None` is the goodbye marker.
    pub fn decode(plain: &[u8; HEADER_PLAIN_LEN]) -> Option<Self> {
        if is_goodbye(plain) {
            return None;
        }
        let mut buf = &plain[..];
        let body_len = buf.get_u16();
        let mut body_tag = [0u8; TAG_LEN];
        buf.copy_to_slice(&mut body_tag);
        Some(Self { body_len, body_tag })
    }

    pub fn body_len(&self) -> usize {
        self.body_len as usize
    }
}

/// True if `plain` is the 18-byte all-zero goodbye block.
pub fn is_goodbye(plain: &[u8; HEADER_PLAIN_LEN]) -> bool {
    plain.iter().fold(0u8, |acc, &b| acc | b) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(HEADER_PLAIN_LEN, 18);
        assert_eq!(HEADER_LEN, 34);
    }

    #[test]
    fn header_layout_is_big_endian() {
        let h = Header {
            body_len: 0x1000,
            body_tag: [0x7e; 16],
        };
        let plain = h.encode();
        assert_eq!(&plain[..2], &[0x10, 0x00]);
        assert!(plain[2..].iter().all(|&b| b == 0x7e));
        assert_eq!(Header::decode(&plain), Some(h));
    }

    #[test]
    fn goodbye_decodes_to_none() {
        assert_eq!(Header::decode(&GOODBYE), None);
        let mut almost = GOODBYE;
        almost[17] = 1;
        assert!(Header::decode(&almost).is_some());
    }
}
