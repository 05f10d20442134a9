use secrethandshake::HandshakeError;
use thiserror::Error;

/// All errors produced by the box-stream transport.
#[derive(Debug, Error)]
pub enum BoxStreamError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The source closed in the middle of a header or body.
    #[error("stream truncated inside a message")]
    UnexpectedEof,

    /// A header or body failed to open; the channel cannot be resynchronized.
    #[error("box-stream integrity check failed")]
    Integrity,

    /// An earlier error left this end of the channel unusable.
    #[error("box-stream is broken by an earlier error")]
    Broken,

    #[error("segment too large: {size} bytes exceeds maximum {max}")]
    SegmentTooLarge { size: usize, max: usize },

    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),
}

impl BoxStreamError {
    /// True for errors that mean the peer (or an attacker) sent bad data,
    /// as opposed to the transport failing.
    pub fn is_integrity(&self) -> bool {
        matches!(self, BoxStreamError::Integrity)
    }

    pub(crate) fn from_read(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            BoxStreamError::UnexpectedEof
        } else {
            BoxStreamError::Io(e)
        }
    }
}

pub type Result<T> = std::result::Result<T, BoxStreamError>;
