//! # Worker context.
//!
//! [`Context`] is what a unit of work sees of the outside world: its own name and
//! owner, its declared parameters, and the outbox to the supervisor.
//!
//! ## Outputs
//! ```text
//! ctx.publish("data", payload)   ─► supervisor ─► every subscriber of (self, "data")
//! ctx.send(["C"], cmd, payload)  ─► supervisor ─► route by receiver
//! ctx.reply(&msg, cmd, payload)  ─► supervisor ─► route to msg.sender()
//! ctx.subscribe(..)              ─► supervisor (THREAD_SUBSCRIBE)
//! ```
//!
//! Publications reach subscribers with `sender = [worker, endpoint]` and
//! `command = DATA`.
//!
//! Sends never fail because the supervisor has stopped listening; such messages
//! are dropped with a `debug` log, since that only happens during shutdown.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::endpoints::Subscription;
use crate::error::MessageError;
use crate::message::{Command, Envelope, Message, Payload};

/// Declared worker parameters.
pub type Params = serde_json::Map<String, Value>;

/// Execution context handed to [`Work`](crate::Work) methods.
#[derive(Debug)]
pub struct Context {
    name: Arc<str>,
    owner: Arc<str>,
    supervisor: Arc<str>,
    params: Params,
    executions: u64,
    outbox: mpsc::UnboundedSender<Envelope>,
}

impl Context {
    pub(crate) fn new(
        name: Arc<str>,
        owner: Arc<str>,
        supervisor: Arc<str>,
        params: Params,
        outbox: mpsc::UnboundedSender<Envelope>,
    ) -> Self {
        Self {
            name,
            owner,
            supervisor,
            params,
            executions: 0,
            outbox,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Address of the supervisor.
    pub fn supervisor(&self) -> &str {
        &self.supervisor
    }

    /// Number of executions started so far, including the current one.
    pub fn executions(&self) -> u64 {
        self.executions
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Publishes `payload` on `endpoint` to all of its current subscribers.
    pub fn publish(&self, endpoint: &str, payload: impl Into<Payload>) {
        let message = match Message::new(
            [self.name(), endpoint],
            [self.supervisor()],
            Command::Data,
            Some(payload.into()),
        ) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(worker = %self.name, endpoint, error = %e, "publish dropped");
                return;
            }
        };
        self.push(Envelope::Publish {
            owner: self.name.to_string(),
            endpoint: endpoint.to_string(),
            message,
        });
    }

    /// Sends a message from this worker to `receiver`.
    pub fn send<R>(
        &self,
        receiver: R,
        command: impl Into<Command>,
        payload: Option<Payload>,
    ) -> Result<(), MessageError>
    where
        R: IntoIterator,
        R::Item: Into<String>,
    {
        let message = Message::new([self.name()], receiver, command, payload)?;
        self.push(Envelope::Route(message));
        Ok(())
    }

    /// Sends a message back to the sender of `to`.
    pub fn reply(
        &self,
        to: &Message,
        command: impl Into<Command>,
        payload: Option<Payload>,
    ) -> Result<(), MessageError> {
        self.send(to.sender().iter().cloned(), command, payload)
    }

    /// Asks the supervisor to attach `subscriber` to `owner`'s `endpoint`.
    pub fn subscribe(&self, owner: &str, endpoint: &str, subscriber: &str) {
        self.request_subscription(Command::ThreadSubscribe, owner, endpoint, subscriber);
    }

    /// Asks the supervisor to detach `subscriber` from `owner`'s `endpoint`.
    pub fn unsubscribe(&self, owner: &str, endpoint: &str, subscriber: &str) {
        self.request_subscription(Command::ThreadUnsubscribe, owner, endpoint, subscriber);
    }

    fn request_subscription(&self, command: Command, owner: &str, endpoint: &str, subscriber: &str) {
        let body = Subscription::new(owner, endpoint, subscriber).to_payload();
        let supervisor = self.supervisor.to_string();
        if let Err(e) = self.send([supervisor], command, Some(body)) {
            tracing::warn!(worker = %self.name, error = %e, "subscription request dropped");
        }
    }

    fn push(&self, envelope: Envelope) {
        if self.outbox.send(envelope).is_err() {
            tracing::debug!(worker = %self.name, "supervisor inbox closed; message dropped");
        }
    }

    pub(crate) fn begin_execution(&mut self) {
        self.executions += 1;
    }

    pub(crate) fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> (Context, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut params = Params::new();
        params.insert("loop_timer".into(), json!(0.5));
        let ctx = Context::new("A".into(), "manager".into(), "manager".into(), params, tx);
        (ctx, rx)
    }

    #[test]
    fn test_publish_tags_endpoint() {
        let (ctx, mut rx) = context();
        ctx.publish("data", json!({"count": 3}));

        match rx.try_recv().unwrap() {
            Envelope::Publish {
                owner,
                endpoint,
                message,
            } => {
                assert_eq!(owner, "A");
                assert_eq!(endpoint, "data");
                assert_eq!(message.sender(), ["A", "data"]);
                assert_eq!(message.command(), &Command::Data);
                assert_eq!(message.payload(), Some(&json!({"count": 3})));
            }
            other => panic!("unexpected envelope: {other:?}"),
        }
    }

    #[test]
    fn test_reply_goes_to_sender_path() {
        let (ctx, mut rx) = context();
        let request = Message::new(["manager", "ui"], ["A"], Command::ThreadHandle, None).unwrap();
        ctx.reply(&request, Command::Data, Some(json!(1))).unwrap();

        match rx.try_recv().unwrap() {
            Envelope::Route(message) => {
                assert_eq!(message.sender(), ["A"]);
                assert_eq!(message.receiver(), ["manager", "ui"]);
            }
            other => panic!("unexpected envelope: {other:?}"),
        }
    }

    #[test]
    fn test_subscribe_request_targets_supervisor() {
        let (ctx, mut rx) = context();
        ctx.subscribe("A", "data", "C");

        match rx.try_recv().unwrap() {
            Envelope::Route(message) => {
                assert_eq!(message.receiver(), ["manager"]);
                assert_eq!(message.command(), &Command::ThreadSubscribe);
                assert_eq!(
                    Subscription::from_payload(message.payload()),
                    Some(Subscription::new("A", "data", "C"))
                );
            }
            other => panic!("unexpected envelope: {other:?}"),
        }
    }

    #[test]
    fn test_send_after_supervisor_gone_is_silent() {
        let (ctx, rx) = context();
        drop(rx);
        ctx.publish("data", json!(1));
        assert!(ctx.send(["C"], Command::Data, None).is_ok());
    }

    #[test]
    fn test_params_visible() {
        let (ctx, _rx) = context();
        assert_eq!(ctx.param("loop_timer"), Some(&json!(0.5)));
        assert_eq!(ctx.param("missing"), None);
        assert_eq!(ctx.executions(), 0);
    }
}
