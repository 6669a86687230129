//! Message envelope and command set.
//!
//! - [`Message`] immutable envelope (sender path, receiver path, command, payload)
//! - [`Command`] closed set of intents with an [`Command::Other`] fallback
//! - [`Payload`] structured data (`serde_json::Value`)

mod command;
mod envelope;
#[allow(clippy::module_inception)]
mod message;

pub use command::Command;
pub(crate) use envelope::Envelope;
pub use message::{Message, Payload};
