// Loading long-term identities from JSON secret files.
//
//   {
//     "curve": "ed25519",
//     "id": "@<base64 public>.ed25519",
//     "private": "<base64 seed || public>.ed25519",
//     "public": "<base64 public>.ed25519"
//   }
//
// Lines starting with `#` are comments and are skipped before parsing.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto::keys::{IdentityKeyPair, PUBLIC_KEY_LEN};
use crate::error::{HandshakeError, Result};

const CURVE: &str = "ed25519";
const SUFFIX: &str = ".ed25519";

#[derive(Debug, Serialize, Deserialize)]
struct SecretFile {
    curve: String,
    id: String,
    private: String,
    public: String,
}

/// Read and parse a secret file from disk.
pub fn load_secret_file(path: impl AsRef<Path>) -> Result<IdentityKeyPair> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| HandshakeError::KeyFile(format!("{}: {e}", path.display())))?;
    let keypair = parse_secret(&text)?;
    debug!(path = %path.display(), "identity loaded");
    Ok(keypair)
}

/// Parse the contents of a secret file.
pub fn parse_secret(text: &str) -> Result<IdentityKeyPair> {
    let json: String = text
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");
    let file: SecretFile = serde_json::from_str(&json)
        .map_err(|e| HandshakeError::KeyFile(format!("json: {e}")))?;

    if file.curve != CURVE {
        return Err(HandshakeError::KeyFile(format!(
            "unsupported curve {:?}",
            file.curve
        )));
    }

    let raw = Zeroizing::new(decode_part("private", &file.private)?);
    if raw.len() != 64 {
        return Err(HandshakeError::KeyFile(format!(
            "private part must be 64 bytes, got {}",
            raw.len()
        )));
    }
    let mut private = Zeroizing::new([0u8; 64]);
    private.copy_from_slice(&raw);
    let public = decode_part("public", &file.public)?;

    let keypair = IdentityKeyPair::from_keypair_bytes(&private)
        .map_err(|e| HandshakeError::KeyFile(e.to_string()))?;
    if public.as_slice() != keypair.public_key_bytes().as_slice() {
        return Err(HandshakeError::KeyFile(
            "public part does not match private key".into(),
        ));
    }
    Ok(keypair)
}

/// Serialize a keypair into the secret file format.
pub fn format_secret(keypair: &IdentityKeyPair) -> String {
    let public = encode_part(&keypair.public_key_bytes());
    let file = SecretFile {
        curve: CURVE.into(),
        id: format!("@{public}"),
        private: encode_part(&keypair.signing_key().to_keypair_bytes()),
        public,
    };
    // Serializing a struct of strings cannot fail.
    serde_json::to_string_pretty(&file).unwrap_or_default()
}

/// The `@<base64>.ed25519` feed id of a public key.
pub fn feed_id(public: &[u8; PUBLIC_KEY_LEN]) -> String {
    format!("@{}", encode_part(public))
}

fn encode_part(raw: &[u8]) -> String {
    format!("{}{SUFFIX}", STANDARD.encode(raw))
}

fn decode_part(field: &str, value: &str) -> Result<Vec<u8>> {
    let b64 = value.strip_suffix(SUFFIX).unwrap_or(value);
    STANDARD
        .decode(b64)
        .map_err(|e| HandshakeError::KeyFile(format!("{field} base64: {e}")))
}
