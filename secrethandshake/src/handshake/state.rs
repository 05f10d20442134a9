// Handshake state, one type per stage.
//
// Each protocol step consumes its stage by value and returns the next one, so
// a step can only run once its inputs exist. A failed step drops the stage;
// every secret-bearing field wipes itself on drop.

use std::fmt;

use zeroize::{Zeroize, Zeroizing};

use crate::config::AppKey;
use crate::crypto::convert::identity_public_to_exchange_public;
use crate::crypto::hash::{auth, MAC_LEN};
use crate::crypto::keys::{EphemeralKeyPair, IdentityKeyPair, PUBLIC_KEY_LEN};
use crate::error::{HandshakeError, Result};
use crate::handshake::messages::HELLO_LEN;

/// Progress label of a handshake, used in logs and transport errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStage {
    /// State constructed, nothing sent.
    Init,
    /// Local challenge sent, waiting for the peer's.
    ChallengeSent,
    /// Both challenges exchanged and the ephemeral secret agreed.
    ChallengeVerified,
    /// ClientAuth sent (initiator) or verified (responder).
    AuthExchanged,
    /// Both identities proven; transport keys available.
    Accepted,
    /// Any step failed; no keys were produced.
    Failed,
}

impl HandshakeStage {
    /// Human-readable label for the stage.
    pub fn label(&self) -> &'static str {
        match self {
            HandshakeStage::Init => "Init",
            HandshakeStage::ChallengeSent => "ChallengeSent",
            HandshakeStage::ChallengeVerified => "ChallengeVerified",
            HandshakeStage::AuthExchanged => "AuthExchanged",
            HandshakeStage::Accepted => "Accepted",
            HandshakeStage::Failed => "Failed",
        }
    }
}

impl fmt::Display for HandshakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
thread_local! {
    /// Secret fields of the last stage dropped by a failed step, read back
    /// after wiping.
    pub(crate) static LAST_ABORTED: std::cell::RefCell<Option<Vec<u8>>> =
        const { std::cell::RefCell::new(None) };
}

/// Wiping hook shared by every stage a failed step can drop.
pub(crate) trait Abort: Zeroize {
    /// Copy of every secret field, for checking the wipe in tests.
    #[cfg(test)]
    fn secret_bytes(&self) -> Vec<u8>;

    /// Wipe the stage and hand back `err` for the caller to return.
    fn abort(&mut self, err: HandshakeError) -> HandshakeError {
        self.zeroize();
        #[cfg(test)]
        LAST_ABORTED.with(|last| *last.borrow_mut() = Some(self.secret_bytes()));
        err
    }
}

/// The remote long-term key as known to the initiator ahead of time.
#[derive(Clone, Copy)]
pub(crate) struct RemoteIdentity {
    pub(crate) public: [u8; PUBLIC_KEY_LEN],
    pub(crate) exchange_public: [u8; 32],
}

impl RemoteIdentity {
    pub(crate) fn new(public: [u8; PUBLIC_KEY_LEN]) -> Result<Self> {
        let exchange_public =
            identity_public_to_exchange_public(&public).ok_or(HandshakeError::LowOrderKey)?;
        Ok(Self {
            public,
            exchange_public,
        })
    }
}

/// Initial stage: identities known, fresh ephemeral key generated.
pub struct Handshake<'a> {
    pub(crate) app_key: AppKey,
    pub(crate) local: &'a IdentityKeyPair,
    pub(crate) ephemeral: EphemeralKeyPair,
    pub(crate) local_app_mac: [u8; MAC_LEN],
    /// `Some` for the initiator, `None` for the responder.
    pub(crate) remote: Option<RemoteIdentity>,
}

impl<'a> Handshake<'a> {
    /// Initiator state. The responder's long-term public key must be known in
    /// advance; a degenerate key is rejected here, before anything is sent.
    pub fn client(
        app_key: AppKey,
        local: &'a IdentityKeyPair,
        remote_public: [u8; PUBLIC_KEY_LEN],
    ) -> Result<Self> {
        let remote = RemoteIdentity::new(remote_public)?;
        Ok(Self::new(app_key, local, Some(remote), EphemeralKeyPair::generate()))
    }

    /// Responder state. The initiator's identity is learned from ClientAuth.
    pub fn server(app_key: AppKey, local: &'a IdentityKeyPair) -> Self {
        Self::new(app_key, local, None, EphemeralKeyPair::generate())
    }

    /// Replace the random ephemeral key with a caller-chosen one. Only
    /// meaningful for reproducing fixed transcripts in tests.
    pub fn with_ephemeral(self, ephemeral: EphemeralKeyPair) -> Self {
        let Handshake {
            app_key,
            local,
            remote,
            ..
        } = self;
        Self::new(app_key, local, remote, ephemeral)
    }

    fn new(
        app_key: AppKey,
        local: &'a IdentityKeyPair,
        remote: Option<RemoteIdentity>,
        ephemeral: EphemeralKeyPair,
    ) -> Self {
        let local_app_mac = auth(app_key.as_bytes(), &ephemeral.public_key_bytes());
        Self {
            app_key,
            local,
            ephemeral,
            local_app_mac,
            remote,
        }
    }

    /// True if this state was built with [`Handshake::client`].
    pub fn is_client(&self) -> bool {
        self.remote.is_some()
    }

    pub fn stage(&self) -> HandshakeStage {
        HandshakeStage::Init
    }
}

impl Zeroize for Handshake<'_> {
    fn zeroize(&mut self) {
        self.ephemeral.zeroize();
    }
}

impl Abort for Handshake<'_> {
    #[cfg(test)]
    fn secret_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.ephemeral.secret_bytes());
        out
    }
}

/// Both challenges exchanged: `shared_secret` (secret one) and its hash exist.
pub struct ChallengeVerified<'a> {
    pub(crate) app_key: AppKey,
    pub(crate) local: &'a IdentityKeyPair,
    pub(crate) ephemeral: EphemeralKeyPair,
    pub(crate) local_app_mac: [u8; MAC_LEN],
    pub(crate) remote: Option<RemoteIdentity>,
    pub(crate) remote_app_mac: [u8; MAC_LEN],
    pub(crate) remote_ephemeral: [u8; 32],
    pub(crate) shared_secret: Zeroizing<[u8; 32]>,
    pub(crate) secret_hash: Zeroizing<[u8; 32]>,
}

impl ChallengeVerified<'_> {
    pub fn stage(&self) -> HandshakeStage {
        HandshakeStage::ChallengeVerified
    }
}

impl Zeroize for ChallengeVerified<'_> {
    fn zeroize(&mut self) {
        self.ephemeral.zeroize();
        self.shared_secret.zeroize();
        self.secret_hash.zeroize();
    }
}

impl Abort for ChallengeVerified<'_> {
    #[cfg(test)]
    fn secret_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.ephemeral.secret_bytes());
        out.extend_from_slice(self.shared_secret.as_slice());
        out.extend_from_slice(self.secret_hash.as_slice());
        out
    }
}

/// Initiator after sending ClientAuth. The ephemeral secret is no longer
/// needed on this side and has already been dropped.
pub struct ClientAuthSent<'a> {
    pub(crate) app_key: AppKey,
    pub(crate) local: &'a IdentityKeyPair,
    pub(crate) local_app_mac: [u8; MAC_LEN],
    pub(crate) remote: RemoteIdentity,
    pub(crate) remote_app_mac: [u8; MAC_LEN],
    pub(crate) remote_ephemeral: [u8; 32],
    pub(crate) shared_secret: Zeroizing<[u8; 32]>,
    pub(crate) secret_hash: Zeroizing<[u8; 32]>,
    pub(crate) mixed_secret_a: Zeroizing<[u8; 32]>,
    /// The hello we sent; the ServerAccept signature covers it.
    pub(crate) hello: Zeroizing<[u8; HELLO_LEN]>,
}

impl ClientAuthSent<'_> {
    pub fn stage(&self) -> HandshakeStage {
        HandshakeStage::AuthExchanged
    }
}

impl Zeroize for ClientAuthSent<'_> {
    fn zeroize(&mut self) {
        self.shared_secret.zeroize();
        self.secret_hash.zeroize();
        self.mixed_secret_a.zeroize();
        self.hello.zeroize();
    }
}

impl Abort for ClientAuthSent<'_> {
    #[cfg(test)]
    fn secret_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(self.shared_secret.as_slice());
        out.extend_from_slice(self.secret_hash.as_slice());
        out.extend_from_slice(self.mixed_secret_a.as_slice());
        out.extend_from_slice(self.hello.as_slice());
        out
    }
}

/// Responder after verifying ClientAuth: the initiator's identity is known.
pub struct ClientAuthVerified<'a> {
    pub(crate) app_key: AppKey,
    pub(crate) local: &'a IdentityKeyPair,
    pub(crate) ephemeral: EphemeralKeyPair,
    pub(crate) local_app_mac: [u8; MAC_LEN],
    pub(crate) remote: RemoteIdentity,
    pub(crate) remote_app_mac: [u8; MAC_LEN],
    pub(crate) shared_secret: Zeroizing<[u8; 32]>,
    pub(crate) secret_hash: Zeroizing<[u8; 32]>,
    pub(crate) mixed_secret_a: Zeroizing<[u8; 32]>,
    /// The peer's hello, signed over by ServerAccept.
    pub(crate) peer_hello: Zeroizing<[u8; HELLO_LEN]>,
}

impl ClientAuthVerified<'_> {
    pub fn stage(&self) -> HandshakeStage {
        HandshakeStage::AuthExchanged
    }

    /// The initiator's long-term public key, proven by its signature.
    pub fn remote_public(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.remote.public
    }
}

impl Zeroize for ClientAuthVerified<'_> {
    fn zeroize(&mut self) {
        self.ephemeral.zeroize();
        self.shared_secret.zeroize();
        self.secret_hash.zeroize();
        self.mixed_secret_a.zeroize();
        self.peer_hello.zeroize();
    }
}

impl Abort for ClientAuthVerified<'_> {
    #[cfg(test)]
    fn secret_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.ephemeral.secret_bytes());
        out.extend_from_slice(self.shared_secret.as_slice());
        out.extend_from_slice(self.secret_hash.as_slice());
        out.extend_from_slice(self.mixed_secret_a.as_slice());
        out.extend_from_slice(self.peer_hello.as_slice());
        out
    }
}
