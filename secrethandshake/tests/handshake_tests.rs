// Integration tests for the secret handshake over in-memory streams.

use secrethandshake::{client, server, AppKey, Handshake, HandshakeError, IdentityKeyPair};
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

fn app_key() -> AppKey {
    "IhrX11txvFiVzm+NurzHLCqUUe3xZXkPfODnp7WlMpk=".parse().unwrap()
}

// ── Success ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn handshake_succeeds_and_keys_mirror() {
    let alice = IdentityKeyPair::generate();
    let bob = IdentityKeyPair::generate();
    let (mut a, mut b) = duplex(1024);

    let c_state = Handshake::client(app_key(), &alice, bob.public_key_bytes()).unwrap();
    let s_state = Handshake::server(app_key(), &bob);
    let (c, s) = tokio::join!(client(&mut a, c_state), server(&mut b, s_state));
    let (c, s) = (c.unwrap(), s.unwrap());

    assert_eq!(c.remote_public(), bob.public_key_bytes());
    assert_eq!(s.remote_public(), alice.public_key_bytes());
    assert_eq!(c.session_secret(), s.session_secret());

    let c_keys = c.into_session_keys();
    let s_keys = s.into_session_keys();
    assert_eq!(c_keys.send.key(), s_keys.recv.key());
    assert_eq!(c_keys.send.nonce(), s_keys.recv.nonce());
    assert_eq!(s_keys.send.key(), c_keys.recv.key());
    assert_eq!(s_keys.send.nonce(), c_keys.recv.nonce());
}

#[tokio::test]
async fn wire_message_sizes() {
    // Drive the client against a hand-rolled peer that records sizes.
    let alice = IdentityKeyPair::generate();
    let bob = IdentityKeyPair::generate();
    let (mut a, mut b) = duplex(1024);

    let c_state = Handshake::client(app_key(), &alice, bob.public_key_bytes()).unwrap();
    let client_task = async move { client(&mut a, c_state).await };

    let peer = async move {
        let state = Handshake::server(app_key(), &bob);
        let mut challenge = [0u8; 64];
        b.read_exact(&mut challenge).await.unwrap();
        let state = state.verify_challenge(&challenge).unwrap();
        b.write_all(&state.challenge()).await.unwrap();
        let mut auth = [0u8; 112];
        b.read_exact(&mut auth).await.unwrap();
        let state = state.verify_client_auth(&auth).unwrap();
        let (accept, _) = state.server_accept().unwrap();
        assert_eq!(accept.len(), 80);
        b.write_all(&accept).await.unwrap();

        // Nothing beyond the four messages.
        let mut rest = Vec::new();
        b.read_to_end(&mut rest).await.unwrap();
        rest.len()
    };

    let (c, extra) = tokio::join!(client_task, peer);
    c.unwrap();
    assert_eq!(extra, 0);
}

// ── Failures ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn wrong_app_key_fails_with_protocol_error() {
    let alice = IdentityKeyPair::generate();
    let bob = IdentityKeyPair::generate();
    let (mut a, mut b) = duplex(1024);

    let mut other = *app_key().as_bytes();
    other[0] ^= 0x01;

    let c_state = Handshake::client(app_key(), &alice, bob.public_key_bytes()).unwrap();
    let s_state = Handshake::server(AppKey::from_bytes(other), &bob);

    let server_side = async move {
        let res = server(&mut b, s_state).await;
        drop(b);
        res
    };
    let (c, s) = tokio::join!(client(&mut a, c_state), server_side);

    assert!(matches!(s, Err(HandshakeError::Protocol)));
    // The client sees the server hang up while waiting for its challenge.
    assert!(c.unwrap_err().is_transport());
}

#[tokio::test]
async fn client_expecting_other_key_is_rejected_by_server() {
    let alice = IdentityKeyPair::generate();
    let bob = IdentityKeyPair::generate();
    let carol = IdentityKeyPair::generate();
    let (mut a, mut b) = duplex(1024);

    let c_state = Handshake::client(app_key(), &alice, carol.public_key_bytes()).unwrap();
    let s_state = Handshake::server(app_key(), &bob);
    let server_side = async move {
        let res = server(&mut b, s_state).await;
        drop(b);
        res
    };
    let (c, s) = tokio::join!(client(&mut a, c_state), server_side);

    let err = s.unwrap_err();
    assert!(err.is_authentication());
    assert!(c.is_err());
}

#[tokio::test]
async fn flipped_client_auth_bit_fails() {
    let alice = IdentityKeyPair::generate();
    let bob = IdentityKeyPair::generate();

    let c_state = Handshake::client(app_key(), &alice, bob.public_key_bytes()).unwrap();
    let s_state = Handshake::server(app_key(), &bob);

    let s_state = s_state.verify_challenge(&c_state.challenge()).unwrap();
    let c_state = c_state.verify_challenge(&s_state.challenge()).unwrap();
    let (_, mut auth) = c_state.client_auth().unwrap();
    auth[0] ^= 0x01;

    assert!(matches!(
        s_state.verify_client_auth(&auth),
        Err(HandshakeError::Authentication)
    ));
}

#[tokio::test]
async fn truncated_challenge_is_transport_error() {
    let bob = IdentityKeyPair::generate();
    let (mut a, mut b) = duplex(1024);

    a.write_all(&[0u8; 40]).await.unwrap();
    drop(a);

    let err = server(&mut b, Handshake::server(app_key(), &bob))
        .await
        .unwrap_err();
    assert!(err.is_transport());
    assert!(err.to_string().contains("Init"));
}
