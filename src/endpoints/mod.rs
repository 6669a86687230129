//! Endpoint subscriptions and fan-out.
//!
//! - [`EndpointRegistry`] maps `(owner, endpoint)` to subscriber destinations
//! - [`Subscription`] payload of `THREAD_SUBSCRIBE` / `THREAD_UNSUBSCRIBE`

mod registry;
mod subscription;

pub use registry::EndpointRegistry;
pub use subscription::Subscription;
