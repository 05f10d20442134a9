//! Background decrypt loop.
//!
//! [`spawn_reader`] moves a [`BoxReader`] onto its own tokio task, which feeds
//! decrypted messages into a bounded channel. A slow consumer fills the
//! channel and the loop stops reading from the source until it drains.

use bytes::Bytes;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{BoxStreamError, Result};
use crate::unboxer::{BoxReader, ReadState};

/// Default number of decrypted messages buffered between the loop and the
/// consumer.
pub const DEFAULT_CAPACITY: usize = 16;

/// Settings for [`spawn_reader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Channel depth in messages. Zero is treated as one.
    pub capacity: usize,
}

impl ReaderConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity }
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Consumer end of a spawned decrypt loop.
///
/// Dropping it closes the channel; the loop notices, stops, and drops the
/// reader together with its source.
pub struct BoxReceiver {
    rx: mpsc::Receiver<Result<Bytes>>,
    pending: Bytes,
    state: ReadState,
    task: JoinHandle<()>,
}

/// Run `reader` on a new task. Must be called within a tokio runtime.
pub fn spawn_reader<R>(mut reader: BoxReader<R>, config: ReaderConfig) -> BoxReceiver
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(config.capacity.max(1));

    let task = tokio::spawn(async move {
        loop {
            let item = tokio::select! {
                _ = tx.closed() => {
                    debug!("receiver dropped, stopping decrypt loop");
                    return;
                }
                item = reader.recv() => item,
            };
            match item {
                Ok(Some(msg)) => {
                    if tx.send(Ok(msg)).await.is_err() {
                        debug!("receiver dropped, stopping decrypt loop");
                        return;
                    }
                }
                Ok(None) => return,
                Err(e) => {
                    // The first error is the last item the consumer sees.
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            }
        }
    });

    BoxReceiver {
        rx,
        pending: Bytes::new(),
        state: ReadState::Open,
        task,
    }
}

impl BoxReceiver {
    /// Next decrypted message; `None` after a clean end.
    pub async fn recv(&mut self) -> Result<Option<Bytes>> {
        if !self.pending.is_empty() {
            return Ok(Some(std::mem::take(&mut self.pending)));
        }
        match self.state {
            ReadState::Open => {}
            ReadState::Ended => return Ok(None),
            ReadState::Broken => return Err(BoxStreamError::Broken),
        }
        match self.rx.recv().await {
            Some(Ok(msg)) => Ok(Some(msg)),
            Some(Err(e)) => {
                self.state = ReadState::Broken;
                Err(e)
            }
            None => {
                self.state = ReadState::Ended;
                Ok(None)
            }
        }
    }

    /// Copy decrypted bytes into `buf`. Returns 0 at the end of the stream.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pending.is_empty() {
            match self.recv().await? {
                Some(msg) => self.pending = msg,
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending.split_to(n));
        Ok(n)
    }

    /// Stop the loop and wait until it has released the source.
    pub async fn close(self) {
        let BoxReceiver { rx, task, .. } = self;
        drop(rx);
        let _ = task.await;
    }
}
