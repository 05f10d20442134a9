// Secret handshake protocol steps: pure functions from one stage to the next.
//
//   secret        = DH(eph_a, eph_b)
//   secret_hash   = SHA256(secret)
//   a_bob         = DH(eph_a, B)            (initiator eph x responder identity)
//   b_alice       = DH(A, eph_b)            (initiator identity x responder eph)
//   secret2       = SHA256(app_key || secret || a_bob)
//   secret3       = SHA256(app_key || secret || a_bob || b_alice)
//
// None of these functions touch the network; see `driver` for that.

use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::convert::{
    identity_public_to_exchange_public, identity_secret_to_exchange_secret, is_low_order,
};
use crate::crypto::hash::{auth_verify, hash_concat, hash_sha256};
use crate::crypto::keys::{scalar_mult, verify_signature, PUBLIC_KEY_LEN, SIGNATURE_LEN};
use crate::crypto::secretbox::SecretBox;
use crate::error::{HandshakeError, Result};
use crate::handshake::messages::{
    transcript, Challenge, CHALLENGE_LEN, CLIENT_AUTH_LEN, HELLO_LEN, SERVER_ACCEPT_LEN,
    ZERO_NONCE,
};
use crate::handshake::session::Accepted;
use crate::handshake::state::{
    Abort, ChallengeVerified, ClientAuthSent, ClientAuthVerified, Handshake, RemoteIdentity,
};

// ── Challenge (both roles) ───────────────────────────────────────────────

impl<'a> Handshake<'a> {
    /// Step 1 / 2: `HMAC(app_key, eph_pub) || eph_pub`.
    pub fn challenge(&self) -> [u8; CHALLENGE_LEN] {
        Challenge {
            mac: self.local_app_mac,
            ephemeral_public: self.ephemeral.public_key_bytes(),
        }
        .to_bytes()
    }

    /// Verify the peer's challenge and agree on the ephemeral shared secret.
    ///
    /// A MAC mismatch means the peer uses another app key or protocol
    /// version and yields `Protocol`.
    pub fn verify_challenge(
        mut self,
        msg: &[u8; CHALLENGE_LEN],
    ) -> Result<ChallengeVerified<'a>> {
        let peer = Challenge::from_bytes(msg);

        if !auth_verify(self.app_key.as_bytes(), &peer.ephemeral_public, &peer.mac) {
            return Err(self.abort(HandshakeError::Protocol));
        }
        if is_low_order(&peer.ephemeral_public) {
            return Err(self.abort(HandshakeError::LowOrderKey));
        }

        let shared_secret = self.ephemeral.diffie_hellman(&peer.ephemeral_public);
        let secret_hash = Zeroizing::new(hash_sha256(shared_secret.as_slice()));

        let Handshake {
            app_key,
            local,
            ephemeral,
            local_app_mac,
            remote,
        } = self;

        Ok(ChallengeVerified {
            app_key,
            local,
            ephemeral,
            local_app_mac,
            remote,
            remote_app_mac: peer.mac,
            remote_ephemeral: peer.ephemeral_public,
            shared_secret,
            secret_hash,
        })
    }
}

impl<'a> ChallengeVerified<'a> {
    /// The responder's own challenge, sent after verifying the initiator's.
    pub fn challenge(&self) -> [u8; CHALLENGE_LEN] {
        Challenge {
            mac: self.local_app_mac,
            ephemeral_public: self.ephemeral.public_key_bytes(),
        }
        .to_bytes()
    }

    // ── ClientAuth (initiator) ───────────────────────────────────────────

    /// Step 3: seal `sig(app_key || B || secret_hash) || A` under secret2.
    pub fn client_auth(mut self) -> Result<(ClientAuthSent<'a>, [u8; CLIENT_AUTH_LEN])> {
        let remote = match self.remote {
            Some(remote) => remote,
            None => {
                return Err(self.abort(HandshakeError::MissingRemoteKey));
            }
        };

        let mixed_secret_a = self.ephemeral.diffie_hellman(&remote.exchange_public);
        let secret2 = hash_concat(&[
            self.app_key.as_bytes(),
            self.shared_secret.as_slice(),
            mixed_secret_a.as_slice(),
        ]);

        let signed = transcript(&[
            self.app_key.as_bytes(),
            &remote.public,
            self.secret_hash.as_slice(),
        ]);
        let sig = self.local.sign(&signed);

        let mut hello = Zeroizing::new([0u8; HELLO_LEN]);
        hello[..SIGNATURE_LEN].copy_from_slice(&sig);
        hello[SIGNATURE_LEN..].copy_from_slice(&self.local.public_key_bytes());

        let mut msg = [0u8; CLIENT_AUTH_LEN];
        let boxed = SecretBox::new(&secret2).seal(&ZERO_NONCE, hello.as_slice())?;
        msg.copy_from_slice(&boxed);

        debug!(stage = %self.stage(), "client auth sealed");

        // The initiator's ephemeral secret is dropped (and wiped) here.
        let ChallengeVerified {
            app_key,
            local,
            local_app_mac,
            remote_app_mac,
            remote_ephemeral,
            shared_secret,
            secret_hash,
            ..
        } = self;

        Ok((
            ClientAuthSent {
                app_key,
                local,
                local_app_mac,
                remote,
                remote_app_mac,
                remote_ephemeral,
                shared_secret,
                secret_hash,
                mixed_secret_a,
                hello,
            },
            msg,
        ))
    }

    // ── ClientAuth (responder) ───────────────────────────────────────────

    /// Step 3, responder side: open ClientAuth and check the initiator's
    /// signature.
    ///
    /// An unopenable box and a bad signature take the same path and produce
    /// the same `Authentication` error.
    pub fn verify_client_auth(
        mut self,
        msg: &[u8; CLIENT_AUTH_LEN],
    ) -> Result<ClientAuthVerified<'a>> {
        let local_exchange = identity_secret_to_exchange_secret(self.local.signing_key());
        let mixed_secret_a = scalar_mult(&local_exchange, &self.remote_ephemeral);
        let secret2 = hash_concat(&[
            self.app_key.as_bytes(),
            self.shared_secret.as_slice(),
            mixed_secret_a.as_slice(),
        ]);

        let mut hello = Zeroizing::new([0u8; HELLO_LEN]);
        let opened = match SecretBox::new(&secret2).open(&ZERO_NONCE, msg) {
            Ok(plain) => {
                hello.copy_from_slice(&plain);
                true
            }
            Err(_) => false,
        };

        let mut sig = [0u8; SIGNATURE_LEN];
        let mut claimed = [0u8; PUBLIC_KEY_LEN];
        sig.copy_from_slice(&hello[..SIGNATURE_LEN]);
        claimed.copy_from_slice(&hello[SIGNATURE_LEN..]);

        let signed = transcript(&[
            self.app_key.as_bytes(),
            &self.local.public_key_bytes(),
            self.secret_hash.as_slice(),
        ]);
        let verified = verify_signature(&claimed, &signed, &sig).is_ok();

        if !(opened & verified) {
            return Err(self.abort(HandshakeError::Authentication));
        }

        let remote = match RemoteIdentity::new(claimed) {
            Ok(remote) => remote,
            Err(e) => return Err(self.abort(e)),
        };

        debug!(remote = %hex::encode(remote.public), "client authenticated");

        let ChallengeVerified {
            app_key,
            local,
            ephemeral,
            local_app_mac,
            remote_app_mac,
            shared_secret,
            secret_hash,
            ..
        } = self;

        Ok(ClientAuthVerified {
            app_key,
            local,
            ephemeral,
            local_app_mac,
            remote,
            remote_app_mac,
            shared_secret,
            secret_hash,
            mixed_secret_a,
            peer_hello: hello,
        })
    }
}

// ── ServerAccept (responder) ─────────────────────────────────────────────

impl ClientAuthVerified<'_> {
    /// Step 4: seal `sig(app_key || peer_hello || secret_hash)` under secret3
    /// and finish the handshake.
    pub fn server_accept(mut self) -> Result<([u8; SERVER_ACCEPT_LEN], Accepted)> {
        let mixed_secret_b = self.ephemeral.diffie_hellman(&self.remote.exchange_public);
        let secret3 = hash_concat(&[
            self.app_key.as_bytes(),
            self.shared_secret.as_slice(),
            self.mixed_secret_a.as_slice(),
            mixed_secret_b.as_slice(),
        ]);

        let signed = transcript(&[
            self.app_key.as_bytes(),
            self.peer_hello.as_slice(),
            self.secret_hash.as_slice(),
        ]);
        let sig = self.local.sign(&signed);

        let boxed = match SecretBox::new(&secret3).seal(&ZERO_NONCE, &sig) {
            Ok(boxed) => boxed,
            Err(e) => return Err(self.abort(e)),
        };
        let mut msg = [0u8; SERVER_ACCEPT_LEN];
        msg.copy_from_slice(&boxed);

        let accepted = Accepted::new(
            &secret3,
            self.local.public_key_bytes(),
            self.remote.public,
            self.local_app_mac,
            self.remote_app_mac,
        );
        self.zeroize();
        Ok((msg, accepted))
    }
}

// ── ServerAccept (initiator) ─────────────────────────────────────────────

impl ClientAuthSent<'_> {
    /// Step 4, initiator side: open ServerAccept and check that the
    /// responder signed our hello.
    pub fn verify_server_accept(mut self, msg: &[u8; SERVER_ACCEPT_LEN]) -> Result<Accepted> {
        let local_exchange = identity_secret_to_exchange_secret(self.local.signing_key());
        let mixed_secret_b = scalar_mult(&local_exchange, &self.remote_ephemeral);
        let secret3 = hash_concat(&[
            self.app_key.as_bytes(),
            self.shared_secret.as_slice(),
            self.mixed_secret_a.as_slice(),
            mixed_secret_b.as_slice(),
        ]);

        let mut sig = [0u8; SIGNATURE_LEN];
        let opened = match SecretBox::new(&secret3).open(&ZERO_NONCE, msg) {
            Ok(plain) => {
                sig.copy_from_slice(&plain);
                true
            }
            Err(_) => false,
        };

        let signed = transcript(&[
            self.app_key.as_bytes(),
            self.hello.as_slice(),
            self.secret_hash.as_slice(),
        ]);
        let verified = verify_signature(&self.remote.public, &signed, &sig).is_ok();

        if !(opened & verified) {
            return Err(self.abort(HandshakeError::Authentication));
        }

        let accepted = Accepted::new(
            &secret3,
            self.local.public_key_bytes(),
            self.remote.public,
            self.local_app_mac,
            self.remote_app_mac,
        );
        self.zeroize();
        Ok(accepted)
    }
}

/// Exchange-form public key of an identity, for callers that want to check a
/// key before handing it to [`Handshake::client`].
pub fn exchange_public(identity_public: &[u8; PUBLIC_KEY_LEN]) -> Result<[u8; 32]> {
    identity_public_to_exchange_public(identity_public).ok_or(HandshakeError::LowOrderKey)
}
