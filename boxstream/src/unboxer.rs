//! Decrypting side of a box-stream.
//!
//! [`Unboxer`] opens headers and bodies in nonce order without doing I/O.
//! [`BoxReader`] drives an unboxer over a tokio `AsyncRead` source.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace, warn};

use secrethandshake::crypto::secretbox::{SecretBox, TAG_LEN};
use secrethandshake::BoxKeys;

use crate::error::{BoxStreamError, Result};
use crate::frame::{Header, HEADER_LEN, HEADER_PLAIN_LEN};
use crate::nonce::NonceCounter;

/// Opens messages under one receive key and a live nonce counter.
pub struct Unboxer {
    cipher: SecretBox,
    nonce: NonceCounter,
}

impl Unboxer {
    pub fn new(keys: BoxKeys) -> Self {
        Self {
            cipher: SecretBox::new(keys.key()),
            nonce: NonceCounter::new(*keys.nonce()),
        }
    }

    /// Open a sealed header. `Ok(None)` is the goodbye message.
    pub fn open_header(&mut self, sealed: &[u8; HEADER_LEN]) -> Result<Option<Header>> {
        let nonce = self.nonce.next();
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&sealed[..TAG_LEN]);
        let mut plain = [0u8; HEADER_PLAIN_LEN];
        plain.copy_from_slice(&sealed[TAG_LEN..]);

        self.cipher
            .open_detached(&nonce, &mut plain, &tag)
            .map_err(|_| BoxStreamError::Integrity)?;
        Ok(Header::decode(&plain))
    }

    /// Decrypt `body` in place using the tag carried by `header`.
    pub fn open_body(&mut self, header: &Header, body: &mut [u8]) -> Result<()> {
        if body.len() != header.body_len() {
            return Err(BoxStreamError::Integrity);
        }
        let nonce = self.nonce.next();
        self.cipher
            .open_detached(&nonce, body, &header.body_tag)
            .map_err(|_| BoxStreamError::Integrity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadState {
    Open,
    /// Goodbye received or the source closed between messages.
    Ended,
    /// A fatal error was already returned.
    Broken,
}

/// Decrypting source over an `AsyncRead`.
///
/// `recv` is not cancel safe: dropping its future part way through a message
/// loses the bytes read so far and leaves the nonce counter ahead.
pub struct BoxReader<R> {
    inner: R,
    unboxer: Unboxer,
    pending: Bytes,
    state: ReadState,
}

impl<R: AsyncRead + Unpin> BoxReader<R> {
    pub fn new(inner: R, keys: BoxKeys) -> Self {
        Self {
            inner,
            unboxer: Unboxer::new(keys),
            pending: Bytes::new(),
            state: ReadState::Open,
        }
    }

    /// Next decrypted message, or `None` once the stream has ended cleanly.
    ///
    /// Plaintext left over from a partial [`BoxReader::read`] is returned
    /// first.
    pub async fn recv(&mut self) -> Result<Option<Bytes>> {
        if !self.pending.is_empty() {
            return Ok(Some(std::mem::take(&mut self.pending)));
        }
        match self.state {
            ReadState::Open => {}
            ReadState::Ended => return Ok(None),
            ReadState::Broken => return Err(BoxStreamError::Broken),
        }

        match self.next_message().await {
            Ok(Some(msg)) => Ok(Some(msg)),
            Ok(None) => {
                self.state = ReadState::Ended;
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "box-stream read failed");
                self.state = ReadState::Broken;
                Err(e)
            }
        }
    }

    /// Copy decrypted bytes into `buf`. Returns 0 at the end of the stream.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pending.is_empty() {
            match self.recv().await? {
                Some(msg) => self.pending = msg,
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending.split_to(n));
        Ok(n)
    }

    pub fn is_ended(&self) -> bool {
        self.state == ReadState::Ended && self.pending.is_empty()
    }

    /// Give back the source. Buffered plaintext is discarded.
    pub fn into_inner(self) -> R {
        self.inner
    }

    async fn next_message(&mut self) -> Result<Option<Bytes>> {
        let mut sealed = [0u8; HEADER_LEN];
        if !read_header(&mut self.inner, &mut sealed).await? {
            debug!("source closed at a message boundary");
            return Ok(None);
        }

        let header = match self.unboxer.open_header(&sealed)? {
            Some(header) => header,
            None => {
                debug!("goodbye received");
                return Ok(None);
            }
        };

        let mut body = BytesMut::zeroed(header.body_len());
        self.inner
            .read_exact(&mut body)
            .await
            .map_err(BoxStreamError::from_read)?;
        self.unboxer.open_body(&header, &mut body)?;

        trace!(len = body.len(), "segment received");
        Ok(Some(body.freeze()))
    }
}

/// Fill `buf` with one header. `Ok(false)` means the source was already at
/// end of stream before any header byte arrived.
async fn read_header<R: AsyncRead + Unpin>(
    source: &mut R,
    buf: &mut [u8; HEADER_LEN],
) -> Result<bool> {
    let mut filled = 0;
    while filled < HEADER_LEN {
        let n = source.read(&mut buf[filled..]).await?;
        if n == 0 {
            return if filled == 0 {
                Ok(false)
            } else {
                Err(BoxStreamError::UnexpectedEof)
            };
        }
        filled += n;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxer::Boxer;

    fn keys() -> BoxKeys {
        BoxKeys::new([0x42; 32], [0; 24])
    }

    fn sealed(chunks: &[&[u8]], goodbye: bool) -> Vec<u8> {
        let mut boxer = Boxer::new(keys());
        let mut out = BytesMut::new();
        for chunk in chunks {
            boxer.seal_segment(chunk, &mut out).unwrap();
        }
        if goodbye {
            boxer.seal_goodbye(&mut out).unwrap();
        }
        out.to_vec()
    }

    #[test]
    fn sans_io_open() {
        let wire = sealed(&[&b"abc"[..]], true);
        let mut unboxer = Unboxer::new(keys());

        let header_bytes: [u8; HEADER_LEN] = wire[..HEADER_LEN].try_into().unwrap();
        let header = unboxer.open_header(&header_bytes).unwrap().unwrap();
        assert_eq!(header.body_len(), 3);

        let mut body = wire[HEADER_LEN..HEADER_LEN + 3].to_vec();
        unboxer.open_body(&header, &mut body).unwrap();
        assert_eq!(body, b"abc");

        let goodbye: [u8; HEADER_LEN] = wire[HEADER_LEN + 3..].try_into().unwrap();
        assert!(unboxer.open_header(&goodbye).unwrap().is_none());
    }

    #[test]
    fn wrong_nonce_order_fails() {
        let wire = sealed(&[&b"abc"[..]], false);
        let mut unboxer = Unboxer::new(BoxKeys::new([0x42; 32], [1; 24]));
        let header_bytes: [u8; HEADER_LEN] = wire[..HEADER_LEN].try_into().unwrap();
        assert!(matches!(
            unboxer.open_header(&header_bytes),
            Err(BoxStreamError::Integrity)
        ));
    }

    #[tokio::test]
    async fn read_drains_in_small_pieces() {
        let wire = sealed(&[&b"hello "[..], &b"world"[..]], true);
        let mut reader = BoxReader::new(&wire[..], keys());

        let mut out = Vec::new();
        let mut buf = [0u8; 4];
        loop {
            let n = reader.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, b"hello world");
        assert!(reader.is_ended());
    }

    #[tokio::test]
    async fn empty_source_is_clean_end() {
        let mut reader = BoxReader::new(&b""[..], keys());
        assert!(reader.recv().await.unwrap().is_none());
        assert!(reader.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn partial_header_is_unexpected_eof() {
        let wire = sealed(&[&b"abc"[..]], false);
        let mut reader = BoxReader::new(&wire[..10], keys());
        assert!(matches!(
            reader.recv().await,
            Err(BoxStreamError::UnexpectedEof)
        ));
        assert!(matches!(reader.recv().await, Err(BoxStreamError::Broken)));
    }

    #[tokio::test]
    async fn partial_body_is_unexpected_eof() {
        let wire = sealed(&[&b"abcdef"[..]], false);
        let mut reader = BoxReader::new(&wire[..HEADER_LEN + 2], keys());
        assert!(matches!(
            reader.recv().await,
            Err(BoxStreamError::UnexpectedEof)
        ));
    }

    #[tokio::test]
    async fn tampered_body_breaks_reader() {
        let mut wire = sealed(&[&b"abcdef"[..], &b"ghi"[..]], true);
        wire[HEADER_LEN] ^= 0x01;
        let mut reader = BoxReader::new(&wire[..], keys());
        assert!(matches!(reader.recv().await, Err(BoxStreamError::Integrity)));
        assert!(matches!(reader.recv().await, Err(BoxStreamError::Broken)));
    }
}
