//! Message bus gateways for the barrier bridge.
//!
//! ## Features
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `mqtt` | ✅ | MQTT broker connection via `rumqttc` |
//!
//! [`MemoryBus`] is always available and records publishes for tests.

#[cfg(feature = "mqtt")]
pub mod client;
pub mod memory;

#[cfg(feature = "mqtt")]
pub use client::MqttBus;
pub use memory::{MemoryBus, PublishedMessage};
