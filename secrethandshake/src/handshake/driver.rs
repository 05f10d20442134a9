// Async drivers: run the handshake steps over any tokio byte stream.
//
// Each message is read with `read_exact`, so a short read or a closed peer
// surfaces as `HandshakeError::Io` tagged with the stage that was waiting.
// Every outgoing message is flushed before the next read.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{HandshakeError, Result};
use crate::handshake::messages::{CHALLENGE_LEN, CLIENT_AUTH_LEN, SERVER_ACCEPT_LEN};
use crate::handshake::session::Accepted;
use crate::handshake::state::{Handshake, HandshakeStage};

/// Run the initiator side of the handshake.
///
/// `state` must come from [`Handshake::client`]. On success the returned
/// [`Accepted`] proves that the peer holds the expected identity key.
pub async fn client<S>(stream: &mut S, state: Handshake<'_>) -> Result<Accepted>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if !state.is_client() {
        return Err(HandshakeError::MissingRemoteKey);
    }
    finish("client", run_client(stream, state).await)
}

/// Run the responder side of the handshake.
///
/// The initiator's identity is whatever key it proves in ClientAuth; read it
/// from [`Accepted::remote_public`] and apply any access policy there.
pub async fn server<S>(stream: &mut S, state: Handshake<'_>) -> Result<Accepted>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    finish("server", run_server(stream, state).await)
}

async fn run_client<S>(stream: &mut S, state: Handshake<'_>) -> Result<Accepted>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    send(stream, &state.challenge(), HandshakeStage::Init).await?;

    let mut challenge = [0u8; CHALLENGE_LEN];
    recv(stream, &mut challenge, HandshakeStage::ChallengeSent).await?;
    let state = state.verify_challenge(&challenge)?;

    let (state, auth) = state.client_auth()?;
    send(stream, &auth, HandshakeStage::ChallengeVerified).await?;

    let mut accept = [0u8; SERVER_ACCEPT_LEN];
    recv(stream, &mut accept, HandshakeStage::AuthExchanged).await?;
    state.verify_server_accept(&accept)
}

async fn run_server<S>(stream: &mut S, state: Handshake<'_>) -> Result<Accepted>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut challenge = [0u8; CHALLENGE_LEN];
    recv(stream, &mut challenge, HandshakeStage::Init).await?;
    let state = state.verify_challenge(&challenge)?;

    send(stream, &state.challenge(), HandshakeStage::ChallengeVerified).await?;

    let mut auth = [0u8; CLIENT_AUTH_LEN];
    recv(stream, &mut auth, HandshakeStage::ChallengeVerified).await?;
    let state = state.verify_client_auth(&auth)?;

    let (accept, accepted) = state.server_accept()?;
    send(stream, &accept, HandshakeStage::AuthExchanged).await?;
    Ok(accepted)
}

fn finish(role: &'static str, result: Result<Accepted>) -> Result<Accepted> {
    match &result {
        Ok(accepted) => debug!(
            role,
            stage = %HandshakeStage::Accepted,
            remote = %hex::encode(accepted.remote_public()),
            "handshake complete"
        ),
        Err(e) => debug!(role, stage = %HandshakeStage::Failed, error = %e, "handshake aborted"),
    }
    result
}

async fn send<S>(stream: &mut S, msg: &[u8], stage: HandshakeStage) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(msg).await.map_err(HandshakeError::io(stage))?;
    stream.flush().await.map_err(HandshakeError::io(stage))?;
    debug!(%stage, len = msg.len(), "handshake message sent");
    Ok(())
}

async fn recv<S>(stream: &mut S, buf: &mut [u8], stage: HandshakeStage) -> Result<()>
where
    S: AsyncRead + Unpin,
{
    stream
        .read_exact(buf)
        .await
        .map_err(HandshakeError::io(stage))?;
    Ok(())
}
