//! Periodic status and metadata publishing.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::metadata::MetadataPublisher;
use crate::telemetry::TelemetryPublisher;

/// Publish status every `period`, starting immediately.
pub async fn run_status_heartbeat(
    telemetry: Arc<TelemetryPublisher>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Status heartbeat started, interval {:?}", period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = telemetry.publish_status().await {
                    warn!("Periodic status publish failed: {}", e);
                }
            }
        }
    }
}

/// Publish metadata every `period`, starting immediately.
pub async fn run_metadata_heartbeat(
    metadata: Arc<MetadataPublisher>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Metadata heartbeat started, interval {:?}", period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = metadata.publish_info().await {
                    warn!("Periodic metadata publish failed: {}", e);
                }
            }
        }
    }
}
