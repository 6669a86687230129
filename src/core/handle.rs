//! # AppHandle: inject messages from outside the application.
//!
//! A cloneable sender into the supervisor inbox, for GUI callbacks, tests and
//! signal bridges. Convenience commands are sent with the supervisor as sender,
//! so lifecycle commands are always authorized.
//!
//! ```text
//! GUI / test ──► AppHandle::start("A") ──► inbox ──► Supervisor::route ──► A
//! window close ──► AppHandle::shutdown() ──► THREAD_END to the supervisor
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::endpoints::Subscription;
use crate::error::HandleError;
use crate::message::{Command, Envelope, Message, Payload};

/// Cloneable handle to a (possibly running) application.
#[derive(Clone, Debug)]
pub struct AppHandle {
    inbox: mpsc::UnboundedSender<Envelope>,
    supervisor: Arc<str>,
}

impl AppHandle {
    pub(crate) fn new(inbox: mpsc::UnboundedSender<Envelope>, supervisor: Arc<str>) -> Self {
        Self { inbox, supervisor }
    }

    /// Address of the supervisor.
    pub fn supervisor(&self) -> &str {
        &self.supervisor
    }

    /// Routes `message` as if a worker had sent it.
    pub fn send(&self, message: Message) -> Result<(), HandleError> {
        self.inbox
            .send(Envelope::Route(message))
            .map_err(|_| HandleError::Closed)
    }

    /// Sends `command` from the supervisor to `worker`.
    pub fn command(
        &self,
        worker: &str,
        command: impl Into<Command>,
        payload: Option<Payload>,
    ) -> Result<(), HandleError> {
        let msg = Message::new([&*self.supervisor], [worker], command, payload)?;
        self.send(msg)
    }

    pub fn start(&self, worker: &str) -> Result<(), HandleError> {
        self.command(worker, Command::ThreadStart, None)
    }

    pub fn stop(&self, worker: &str) -> Result<(), HandleError> {
        self.command(worker, Command::ThreadStop, None)
    }

    pub fn end(&self, worker: &str) -> Result<(), HandleError> {
        self.command(worker, Command::ThreadEnd, None)
    }

    /// Stages parameter updates on `worker` (`THREAD_UPDATE`).
    pub fn update(&self, worker: &str, params: Payload) -> Result<(), HandleError> {
        self.command(worker, Command::ThreadUpdate, Some(params))
    }

    /// Requests a normal shutdown: END to every worker.
    pub fn shutdown(&self) -> Result<(), HandleError> {
        let msg = Message::new([&*self.supervisor], [&*self.supervisor], Command::ThreadEnd, None)?;
        self.send(msg)
    }

    /// Subscribes `subscriber` to `owner`'s `endpoint`.
    pub fn subscribe(&self, owner: &str, endpoint: &str, subscriber: &str) -> Result<(), HandleError> {
        self.subscription(Command::ThreadSubscribe, Subscription::new(owner, endpoint, subscriber))
    }

    pub fn unsubscribe(&self, owner: &str, endpoint: &str, subscriber: &str) -> Result<(), HandleError> {
        self.subscription(Command::ThreadUnsubscribe, Subscription::new(owner, endpoint, subscriber))
    }

    /// Asks the supervisor for `{name: state}` of every worker; the reply goes to
    /// `reply_to` (an outlet or worker).
    pub fn active_threads(&self, reply_to: &str) -> Result<(), HandleError> {
        let msg = Message::new([reply_to], [&*self.supervisor], Command::ActiveThreads, None)?;
        self.send(msg)
    }

    fn subscription(&self, command: Command, sub: Subscription) -> Result<(), HandleError> {
        let msg = Message::new(
            [&*self.supervisor],
            [&*self.supervisor],
            command,
            Some(sub.to_payload()),
        )?;
        self.send(msg)
    }
}
