// Secret handshake error types

use thiserror::Error;

use crate::handshake::state::HandshakeStage;

/// Top-level error type for the secrethandshake crate.
#[derive(Debug, Error)]
pub enum HandshakeError {
    // ── Transport ───────────────────────────────────────────────────────
    #[error("transport error during {stage}: {source}")]
    Io {
        stage: HandshakeStage,
        #[source]
        source: std::io::Error,
    },

    // ── Protocol ────────────────────────────────────────────────────────
    #[error("wrong app key or protocol version")]
    Protocol,

    #[error("peer not authenticated")]
    Authentication,

    #[error("low-order public key rejected")]
    LowOrderKey,

    // ── Local key material ──────────────────────────────────────────────
    #[error("remote identity key required for the client role")]
    MissingRemoteKey,

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("key file error: {0}")]
    KeyFile(String),

    #[error("secretbox encryption failed: {0}")]
    Encryption(String),
}

impl HandshakeError {
    /// True if the underlying stream failed rather than the peer.
    pub fn is_transport(&self) -> bool {
        matches!(self, HandshakeError::Io { .. })
    }

    /// True if the peer failed to prove its identity or sent a degenerate key.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            HandshakeError::Authentication | HandshakeError::LowOrderKey
        )
    }

    pub(crate) fn io(stage: HandshakeStage) -> impl FnOnce(std::io::Error) -> Self {
        move |source| HandshakeError::Io { stage, source }
    }
}

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, HandshakeError>;
