// Secret handshake: mutually authenticated key agreement between two
// long-term ed25519 identities sharing an app key.
//
// Crate root: module declarations and public re-exports.

pub mod config;
pub mod crypto;
pub mod error;
pub mod handshake;
pub mod keyfile;

// Re-export key types at crate root for convenience.
pub use config::AppKey;
pub use crypto::keys::IdentityKeyPair;
pub use crypto::secretbox::SecretBox;
pub use error::{HandshakeError, Result};
pub use handshake::driver::{client, server};
pub use handshake::session::{Accepted, BoxKeys, SessionKeys};
pub use handshake::state::{Handshake, HandshakeStage};
