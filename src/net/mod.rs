//! Transport-facing types: wire messages and the input mailbox bank

pub mod channel;
pub mod protocol;

pub use channel::{InputBank, TakenInput};
pub use protocol::{AvatarSnapshot, ClientMsg, ServerMsg};
