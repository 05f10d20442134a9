// Box-stream: length-framed secretbox transport over any tokio byte stream,
// keyed by a completed secret handshake.
//
// Crate root: module declarations and public re-exports.

pub mod boxer;
pub mod error;
pub mod frame;
pub mod nonce;
pub mod pipe;
pub mod session;
pub mod unboxer;

pub use boxer::{BoxWriter, Boxer};
pub use error::{BoxStreamError, Result};
pub use frame::{Header, HEADER_LEN, MAX_SEGMENT_SIZE};
pub use nonce::NonceCounter;
pub use pipe::{spawn_reader, BoxReceiver, ReaderConfig};
pub use session::{box_stream, client, server, SecretStream};
pub use unboxer::{BoxReader, Unboxer};
