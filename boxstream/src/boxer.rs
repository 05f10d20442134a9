//! Encrypting side of a box-stream.
//!
//! [`Boxer`] turns plaintext segments into framed messages without touching
//! any I/O. [`BoxWriter`] drives a boxer over a tokio `AsyncWrite` sink.

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use secrethandshake::crypto::secretbox::{SecretBox, TAG_LEN};
use secrethandshake::BoxKeys;

use crate::error::{BoxStreamError, Result};
use crate::frame::{Header, GOODBYE, HEADER_LEN, MAX_SEGMENT_SIZE};
use crate::nonce::NonceCounter;

/// Seals segments under one send key and a live nonce counter.
pub struct Boxer {
    cipher: SecretBox,
    nonce: NonceCounter,
}

impl Boxer {
    pub fn new(keys: BoxKeys) -> Self {
        Self {
            cipher: SecretBox::new(keys.key()),
            nonce: NonceCounter::new(*keys.nonce()),
        }
    }

    /// Append one framed message carrying `chunk` to `out`.
    ///
    /// The header nonce is taken first, then the body nonce.
    pub fn seal_segment(&mut self, chunk: &[u8], out: &mut BytesMut) -> Result<()> {
        if chunk.len() > MAX_SEGMENT_SIZE {
            return Err(BoxStreamError::SegmentTooLarge {
                size: chunk.len(),
                max: MAX_SEGMENT_SIZE,
            });
        }
        let header_nonce = self.nonce.next();
        let body_nonce = self.nonce.next();

        let start = out.len();
        out.reserve(HEADER_LEN + chunk.len());
        out.put_bytes(0, HEADER_LEN);
        out.put_slice(chunk);

        let body_tag = self
            .cipher
            .seal_detached(&body_nonce, &mut out[start + HEADER_LEN..])?;
        let mut header = Header {
            body_len: chunk.len() as u16,
            body_tag,
        }
        .encode();
        let header_tag = self.cipher.seal_detached(&header_nonce, &mut header)?;

        out[start..start + TAG_LEN].copy_from_slice(&header_tag);
        out[start + TAG_LEN..start + HEADER_LEN].copy_from_slice(&header);
        Ok(())
    }

    /// Append the goodbye message: a sealed all-zero header, no body.
    pub fn seal_goodbye(&mut self, out: &mut BytesMut) -> Result<()> {
        let nonce = self.nonce.next();
        let mut plain = GOODBYE;
        let tag = self.cipher.seal_detached(&nonce, &mut plain)?;
        out.put_slice(&tag);
        out.put_slice(&plain);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn nonce(&self) -> &NonceCounter {
        &self.nonce
    }
}

/// Encrypting sink over an `AsyncWrite`.
///
/// Methods take `&mut self`, so at most one write is in flight per writer.
/// Callers that share a writer between tasks wrap it in their own mutex.
///
/// Dropping a `write` future before it completes breaks the writer: later
/// calls return [`BoxStreamError::Broken`] instead of sending out of step.
pub struct BoxWriter<W> {
    inner: W,
    boxer: Boxer,
    buf: BytesMut,
    broken: bool,
}

impl<W: AsyncWrite + Unpin> BoxWriter<W> {
    pub fn new(inner: W, keys: BoxKeys) -> Self {
        Self {
            inner,
            boxer: Boxer::new(keys),
            buf: BytesMut::with_capacity(HEADER_LEN + MAX_SEGMENT_SIZE),
            broken: false,
        }
    }

    /// Encrypt and send `data`, split into segments of at most
    /// [`MAX_SEGMENT_SIZE`] bytes. Empty input sends nothing.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.broken {
            return Err(BoxStreamError::Broken);
        }
        for chunk in data.chunks(MAX_SEGMENT_SIZE) {
            self.buf.clear();
            self.boxer.seal_segment(chunk, &mut self.buf)?;
            self.send_buf().await?;
            trace!(len = chunk.len(), "segment sent");
        }
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        if self.broken {
            return Err(BoxStreamError::Broken);
        }
        self.inner.flush().await?;
        Ok(())
    }

    /// Send the goodbye message, flush, and shut the sink down.
    pub async fn close(mut self) -> Result<()> {
        if self.broken {
            return Err(BoxStreamError::Broken);
        }
        self.buf.clear();
        self.boxer.seal_goodbye(&mut self.buf)?;
        self.send_buf().await?;
        self.inner.flush().await?;
        self.inner.shutdown().await?;
        debug!("box-stream closed");
        Ok(())
    }

    /// Give back the sink without sending goodbye.
    pub fn into_inner(self) -> W {
        self.inner
    }

    async fn send_buf(&mut self) -> Result<()> {
        // Stays set if the write fails or its future is dropped part way: a
        // partially written message leaves the peer out of step.
        self.broken = true;
        self.inner.write_all(&self.buf).await?;
        self.broken = false;
        Ok(())
    }
}
