//! Message bus gateway interface.
//!
//! Every publish uses at-least-once delivery. Inbound command payloads are
//! not part of this trait: a gateway hands them to the command queue it was
//! connected with (see [`CommandSender`](crate::command::CommandSender)).

use async_trait::async_trait;

use crate::error::BusResult;

/// Outbound side of the message bus.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish a payload with at-least-once delivery.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> BusResult<()>;

    /// Subscribe to a topic; matching messages are fed to the command queue.
    async fn subscribe(&self, topic: &str) -> BusResult<()>;

    /// End the session with the broker.
    async fn disconnect(&self) -> BusResult<()>;
}
