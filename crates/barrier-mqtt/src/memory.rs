//! In-memory message bus (for testing).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use barrier_core::{BusError, BusResult, CommandSender, MessageBus};
use tokio::sync::Mutex;

/// A message captured by [`MemoryBus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl PublishedMessage {
    /// Payload as text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Payload parsed as JSON, `Null` if it is not JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.payload).unwrap_or(serde_json::Value::Null)
    }
}

/// Bus that records every publish and lets tests inject inbound messages.
#[derive(Debug, Clone)]
pub struct MemoryBus {
    commands: CommandSender,
    messages: Arc<Mutex<Vec<PublishedMessage>>>,
    subscriptions: Arc<Mutex<Vec<String>>>,
    failing: Arc<AtomicBool>,
    disconnected: Arc<AtomicBool>,
}

impl MemoryBus {
    pub fn new(commands: CommandSender) -> Self {
        Self {
            commands,
            messages: Arc::new(Mutex::new(Vec::new())),
            subscriptions: Arc::new(Mutex::new(Vec::new())),
            failing: Arc::new(AtomicBool::new(false)),
            disconnected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every subsequent publish and subscribe fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Simulate a message arriving from the broker.
    ///
    /// Returns whether it reached the command queue; messages on topics
    /// nobody subscribed to are dropped.
    pub async fn deliver(&self, topic: &str, payload: &[u8]) -> bool {
        if !self.subscriptions.lock().await.iter().any(|t| t == topic) {
            return false;
        }
        self.commands.enqueue(payload)
    }

    pub async fn get_messages(&self) -> Vec<PublishedMessage> {
        self.messages.lock().await.clone()
    }

    /// Messages published on exactly `topic`.
    pub async fn messages_on(&self, topic: &str) -> Vec<PublishedMessage> {
        self.messages
            .lock()
            .await
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    pub async fn count(&self) -> usize {
        self.messages.lock().await.len()
    }

    pub async fn clear(&self) {
        self.messages.lock().await.clear();
    }

    pub async fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().await.clone()
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> BusResult<()> {
        if self.is_disconnected() {
            return Err(BusError::Disconnected);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(BusError::Publish {
                topic: topic.to_string(),
                reason: "simulated failure".to_string(),
            });
        }
        self.messages.lock().await.push(PublishedMessage {
            topic: topic.to_string(),
            payload,
        });
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> BusResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BusError::Subscribe {
                topic: topic.to_string(),
                reason: "simulated failure".to_string(),
            });
        }
        let mut subscriptions = self.subscriptions.lock().await;
        if !subscriptions.iter().any(|t| t == topic) {
            subscriptions.push(topic.to_string());
        }
        Ok(())
    }

    async fn disconnect(&self) -> BusResult<()> {
        self.disconnected.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barrier_core::command_queue;

    #[tokio::test]
    async fn test_publish_is_recorded() {
        let (sender, _queue) = command_queue();
        let bus = MemoryBus::new(sender);

        bus.publish("barrier/north", b"{}".to_vec()).await.unwrap();
        bus.publish("barrier/north/ip", b"1.2.3.4".to_vec()).await.unwrap();

        assert_eq!(bus.count().await, 2);
        let ip = bus.messages_on("barrier/north/ip").await;
        assert_eq!(ip.len(), 1);
        assert_eq!(ip[0].text(), "1.2.3.4");

        bus.clear().await;
        assert_eq!(bus.count().await, 0);
    }

    #[tokio::test]
    async fn test_deliver_requires_subscription() {
        let (sender, mut queue) = command_queue();
        let bus = MemoryBus::new(sender);

        assert!(!bus.deliver("barrier/commands/north", b"open").await);
        bus.subscribe("barrier/commands/north").await.unwrap();
        bus.subscribe("barrier/commands/north").await.unwrap();
        assert_eq!(bus.subscriptions().await.len(), 1);

        assert!(bus.deliver("barrier/commands/north", b"open").await);
        assert_eq!(queue.try_next().as_deref(), Some("open"));
    }

    #[tokio::test]
    async fn test_failing_and_disconnected() {
        let (sender, _queue) = command_queue();
        let bus = MemoryBus::new(sender);

        bus.set_failing(true);
        assert!(bus.publish("t", vec![]).await.is_err());
        assert!(bus.subscribe("t").await.is_err());
        assert!(bus.subscriptions().await.is_empty());
        bus.set_failing(false);
        assert!(bus.publish("t", vec![]).await.is_ok());

        bus.disconnect().await.unwrap();
        assert!(bus.is_disconnected());
        assert!(matches!(
            bus.publish("t", vec![]).await,
            Err(BusError::Disconnected)
        ));
    }
}
