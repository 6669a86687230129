use crate::message::Message;

/// Item on the supervisor inbox.
///
/// Workers, outlets and [`AppHandle`](crate::AppHandle)s all write here; only the
/// supervisor reads.
#[derive(Debug)]
pub(crate) enum Envelope {
    /// Route by `message.receiver`.
    Route(Message),
    /// Fan out to the subscribers of `owner`'s `endpoint`.
    Publish {
        owner: String,
        endpoint: String,
        message: Message,
    },
}
