// Secret handshake: wire messages, per-stage state, pure protocol steps, and
// the async driver that runs them over a byte stream.

pub mod driver;
pub mod messages;
pub mod protocol;
pub mod session;
pub mod state;
