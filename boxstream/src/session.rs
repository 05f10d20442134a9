//! Handshake-then-box convenience: turn a raw duplex stream into an
//! authenticated, encrypted one.

use bytes::Bytes;
use tokio::io::{split, AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tracing::info;

use secrethandshake::crypto::keys::PUBLIC_KEY_LEN;
use secrethandshake::keyfile::feed_id;
use secrethandshake::{AppKey, Handshake, IdentityKeyPair, SessionKeys};

use crate::boxer::BoxWriter;
use crate::error::Result;
use crate::pipe::{spawn_reader, BoxReceiver, ReaderConfig};
use crate::unboxer::BoxReader;

/// An encrypted duplex channel with an authenticated peer.
pub struct SecretStream<S> {
    writer: BoxWriter<WriteHalf<S>>,
    reader: BoxReader<ReadHalf<S>>,
    local_public: [u8; PUBLIC_KEY_LEN],
    remote_public: [u8; PUBLIC_KEY_LEN],
}

/// Dial side: run the initiator handshake on `stream`, expecting the peer to
/// hold `remote_public`, then wrap the stream.
pub async fn client<S>(
    mut stream: S,
    app_key: AppKey,
    identity: &IdentityKeyPair,
    remote_public: [u8; PUBLIC_KEY_LEN],
) -> Result<SecretStream<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let state = Handshake::client(app_key, identity, remote_public)?;
    let accepted = secrethandshake::client(&mut stream, state).await?;
    info!(remote = %feed_id(&accepted.remote_public()), "secret stream established (client)");
    Ok(box_stream(stream, accepted.into_session_keys()))
}

/// Accept side: run the responder handshake on `stream` and wrap it. The
/// peer's proven identity is available from [`SecretStream::remote_public`].
pub async fn server<S>(
    mut stream: S,
    app_key: AppKey,
    identity: &IdentityKeyPair,
) -> Result<SecretStream<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let state = Handshake::server(app_key, identity);
    let accepted = secrethandshake::server(&mut stream, state).await?;
    info!(remote = %feed_id(&accepted.remote_public()), "secret stream established (server)");
    Ok(box_stream(stream, accepted.into_session_keys()))
}

/// Wrap a stream whose handshake has already completed.
pub fn box_stream<S>(stream: S, keys: SessionKeys) -> SecretStream<S>
where
    S: AsyncRead + AsyncWrite,
{
    let SessionKeys {
        send,
        recv,
        remote_public,
        local_public,
    } = keys;
    let (read_half, write_half) = split(stream);
    SecretStream {
        writer: BoxWriter::new(write_half, send),
        reader: BoxReader::new(read_half, recv),
        local_public,
        remote_public,
    }
}

impl<S: AsyncRead + AsyncWrite> SecretStream<S> {
    pub fn local_public(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.local_public
    }

    /// The peer's long-term public key, proven during the handshake.
    pub fn remote_public(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.remote_public
    }

    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write(data).await
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await
    }

    pub async fn recv(&mut self) -> Result<Option<Bytes>> {
        self.reader.recv().await
    }

    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.reader.read(buf).await
    }

    /// Separate the two directions so they can run on different tasks.
    pub fn split(self) -> (BoxWriter<WriteHalf<S>>, BoxReader<ReadHalf<S>>) {
        (self.writer, self.reader)
    }

    /// Split, moving the read side onto a background decrypt task.
    pub fn spawn_reader(self, config: ReaderConfig) -> (BoxWriter<WriteHalf<S>>, BoxReceiver)
    where
        S: Send + 'static,
    {
        let (writer, reader) = self.split();
        (writer, spawn_reader(reader, config))
    }

    /// Send goodbye and shut the write side down. The read side is dropped.
    pub async fn close(self) -> Result<()> {
        self.writer.close().await
    }
}
