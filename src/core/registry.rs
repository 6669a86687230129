//! # Destination registry: resolves receiver paths to input queues.
//!
//! The supervisor owns one [`Registry`] holding every worker input and every
//! outlet. Names share a single namespace and are fixed before `run()`.
//!
//! ## Resolution
//! ```text
//! receiver = [manager, manager, A, x]
//!              │
//!              ├─ strip leading supervisor segments while more remain
//!              ▼
//!           [A, x] ──► first segment "A" ──► Worker input / Outlet
//!
//! receiver = [manager]         ──► Target::Supervisor
//! receiver = [ghost, ...]      ──► Target::Unknown
//! ```
//!
//! ## Rules
//! - Delivery to a closed input (worker already exited, outlet dropped) is not
//!   an error: the message is dropped and reported by the caller
//! - A worker slot is closed, not removed, when its thread exits

use std::collections::BTreeMap;

use tokio::sync::mpsc;

use crate::message::Message;

/// Where a message goes.
#[derive(Debug)]
pub enum Target {
    /// Addressed to the supervisor itself (receiver already stripped).
    Supervisor(Message),
    /// Addressed to a registered worker or outlet.
    Deliver(Message),
    /// The first segment matches nothing.
    Unknown(Message),
}

/// Kind of registered destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Worker,
    Outlet,
}

#[derive(Debug)]
struct Slot {
    kind: Kind,
    input: Option<mpsc::UnboundedSender<Message>>,
}

/// Outcome of [`Registry::deliver`].
#[derive(Debug, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// The destination is known but no longer accepts messages.
    Closed,
    /// The destination is not registered.
    Unknown,
}

/// Address book of workers and outlets.
#[derive(Debug)]
pub struct Registry {
    supervisor: String,
    slots: BTreeMap<String, Slot>,
}

impl Registry {
    pub fn new(supervisor: impl Into<String>) -> Self {
        Self {
            supervisor: supervisor.into(),
            slots: BTreeMap::new(),
        }
    }

    /// Registers a destination. Returns `false` if the name is taken.
    pub fn insert(&mut self, name: &str, kind: Kind, input: mpsc::UnboundedSender<Message>) -> bool {
        if self.slots.contains_key(name) {
            return false;
        }
        self.slots.insert(
            name.to_string(),
            Slot {
                kind,
                input: Some(input),
            },
        );
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn kind(&self, name: &str) -> Option<Kind> {
        self.slots.get(name).map(|s| s.kind)
    }

    /// Names of registered workers, sorted.
    pub fn workers(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter(|(_, s)| s.kind == Kind::Worker)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Closes the input of `name`; later deliveries report [`Delivery::Closed`].
    pub fn close(&mut self, name: &str) {
        if let Some(slot) = self.slots.get_mut(name) {
            slot.input = None;
        }
    }

    /// Resolves the receiver of `msg`.
    pub fn resolve(&self, mut msg: Message) -> Target {
        while msg.receiver().len() > 1 && msg.destination() == self.supervisor {
            match msg.strip_receiver() {
                Some(stripped) => msg = stripped,
                None => break,
            }
        }

        let destination = msg.destination();
        if destination == self.supervisor {
            Target::Supervisor(msg)
        } else if self.slots.contains_key(destination) {
            Target::Deliver(msg)
        } else {
            Target::Unknown(msg)
        }
    }

    /// Pushes `msg` into the input of `name`.
    pub fn deliver(&self, name: &str, msg: Message) -> Delivery {
        match self.slots.get(name) {
            None => Delivery::Unknown,
            Some(Slot { input: None, .. }) => Delivery::Closed,
            Some(Slot {
                input: Some(tx), ..
            }) => match tx.send(msg) {
                Ok(()) => Delivery::Sent,
                Err(_) => Delivery::Closed,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Command;

    fn msg(receiver: &[&str]) -> Message {
        Message::new(["X"], receiver.iter().copied(), Command::Data, None).unwrap()
    }

    #[test]
    fn test_nested_supervisor_segments_are_stripped() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut reg = Registry::new("manager");
        assert!(reg.insert("A", Kind::Worker, tx));

        match reg.resolve(msg(&["manager", "manager", "A"])) {
            Target::Deliver(m) => assert_eq!(m.receiver(), ["A"]),
            other => panic!("unexpected target: {other:?}"),
        }
        match reg.resolve(msg(&["manager"])) {
            Target::Supervisor(m) => assert_eq!(m.receiver(), ["manager"]),
            other => panic!("unexpected target: {other:?}"),
        }
        assert!(matches!(reg.resolve(msg(&["ghost"])), Target::Unknown(_)));
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut reg = Registry::new("manager");
        assert!(reg.insert("A", Kind::Worker, tx.clone()));
        assert!(!reg.insert("A", Kind::Outlet, tx));
        assert_eq!(reg.kind("A"), Some(Kind::Worker));
        assert_eq!(reg.workers(), vec!["A".to_string()]);
    }

    #[test]
    fn test_delivery_outcomes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut reg = Registry::new("manager");
        reg.insert("A", Kind::Worker, tx);

        assert_eq!(reg.deliver("A", msg(&["A"])), Delivery::Sent);
        assert_eq!(rx.try_recv().unwrap().receiver(), ["A"]);
        assert_eq!(reg.deliver("ghost", msg(&["ghost"])), Delivery::Unknown);

        reg.close("A");
        assert_eq!(reg.deliver("A", msg(&["A"])), Delivery::Closed);
        assert!(reg.contains("A"));
    }
}
