//! # Message envelope.
//!
//! A [`Message`] is the only thing that travels between the supervisor, workers and
//! outlets. It is immutable once built: routing and fan-out produce new envelopes
//! ([`Message::readdressed`]) instead of mutating the original.
//!
//! ## Wire shape
//! ```text
//! { "sender": ["manager"], "receiver": ["A"], "command": "THREAD_START", "package": null }
//! ```
//!
//! ## Rules
//! - `sender` and `receiver` are never empty (checked on construction and on deserialize).
//! - Paths are ordered outermost first.
//! - Equality is structural.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MessageError;
use crate::message::Command;

/// Structured data carried by a message.
pub type Payload = serde_json::Value;

/// Immutable envelope routed between workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMessage")]
pub struct Message {
    sender: Vec<String>,
    receiver: Vec<String>,
    command: Command,
    #[serde(rename = "package")]
    payload: Option<Payload>,
}

/// Unchecked wire form, validated into [`Message`].
#[derive(Deserialize)]
struct RawMessage {
    sender: Vec<String>,
    receiver: Vec<String>,
    command: Command,
    #[serde(default)]
    package: Option<Payload>,
}

impl TryFrom<RawMessage> for Message {
    type Error = MessageError;

    fn try_from(raw: RawMessage) -> Result<Self, Self::Error> {
        Message::new(raw.sender, raw.receiver, raw.command, raw.package)
    }
}

impl Message {
    /// Creates a message.
    ///
    /// Fails with [`MessageError`] when either path is empty.
    ///
    /// # Example
    /// ```
    /// use threadvisor::{Command, Message};
    ///
    /// let msg = Message::new(["manager"], ["A"], Command::ThreadStart, None).unwrap();
    /// assert_eq!(msg.sender(), ["manager"]);
    /// assert_eq!(msg.receiver(), ["A"]);
    /// assert!(msg.payload().is_none());
    /// ```
    pub fn new<S, R>(
        sender: S,
        receiver: R,
        command: impl Into<Command>,
        payload: Option<Payload>,
    ) -> Result<Self, MessageError>
    where
        S: IntoIterator,
        S::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        let sender: Vec<String> = sender.into_iter().map(Into::into).collect();
        let receiver: Vec<String> = receiver.into_iter().map(Into::into).collect();
        if sender.is_empty() {
            return Err(MessageError::EmptySender);
        }
        if receiver.is_empty() {
            return Err(MessageError::EmptyReceiver);
        }
        Ok(Self {
            sender,
            receiver,
            command: command.into(),
            payload,
        })
    }

    /// Path of the originator, outermost first.
    pub fn sender(&self) -> &[String] {
        &self.sender
    }

    /// Destination path, outermost first.
    pub fn receiver(&self) -> &[String] {
        &self.receiver
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Direct sender: the last segment of the sender path.
    pub fn origin(&self) -> &str {
        // non-empty by construction
        self.sender.last().map(String::as_str).unwrap_or_default()
    }

    /// First receiver segment, used for routing.
    pub fn destination(&self) -> &str {
        self.receiver.first().map(String::as_str).unwrap_or_default()
    }

    /// Returns a copy addressed to `receiver`, everything else unchanged.
    pub fn readdressed<R>(&self, receiver: R) -> Result<Self, MessageError>
    where
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Message::new(
            self.sender.clone(),
            receiver,
            self.command.clone(),
            self.payload.clone(),
        )
    }

    /// Returns a copy with the first receiver segment removed.
    ///
    /// `None` if that would leave the receiver empty.
    pub fn strip_receiver(&self) -> Option<Self> {
        if self.receiver.len() < 2 {
            return None;
        }
        Some(Self {
            sender: self.sender.clone(),
            receiver: self.receiver[1..].to_vec(),
            command: self.command.clone(),
            payload: self.payload.clone(),
        })
    }

    /// Consumes the message, returning its payload.
    pub fn into_payload(self) -> Option<Payload> {
        self.payload
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sender: {:?}, Receiver: {:?}, Command: {}, Package: ",
            self.sender, self.receiver, self.command
        )?;
        match &self.payload {
            Some(p) => write!(f, "{p}"),
            None => f.write_str("None"),
        }
    }
}
