//! Status telemetry publisher.

use std::sync::Arc;

use barrier_core::config::topics;
use barrier_core::{Barrier, MessageBus, Result, Timestamp};
use tokio::sync::Mutex;
use tracing::debug;

/// Publishes the barrier's [`Status`](barrier_core::Status) on `barrier/{name}`.
pub struct TelemetryPublisher {
    barrier: Arc<Barrier>,
    bus: Arc<dyn MessageBus>,
    /// Held across stamp-serialize-publish so status messages leave in the
    /// order their snapshots were taken.
    publish_lock: Mutex<()>,
}

impl TelemetryPublisher {
    pub fn new(barrier: Arc<Barrier>, bus: Arc<dyn MessageBus>) -> Self {
        Self {
            barrier,
            bus,
            publish_lock: Mutex::new(()),
        }
    }

    /// Stamp `last_update`, serialize the status and publish it once.
    pub async fn publish_status(&self) -> Result<()> {
        let _guard = self.publish_lock.lock().await;

        let topic = topics::status(&self.barrier.name().await);
        let payload = {
            let mut status = self.barrier.status_lock().write().await;
            status.last_update = Timestamp::now();
            status.to_payload()?
        };

        self.bus.publish(&topic, payload).await?;
        debug!("Published status on {}", topic);
        Ok(())
    }
}
