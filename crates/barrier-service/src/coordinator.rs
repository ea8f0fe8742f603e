//! The coordinating loop.
//!
//! Once per period: reconcile metadata with the record store (republishing on
//! drift), then take at most one command off the queue and apply it.

use std::sync::Arc;
use std::time::Duration;

use barrier_core::CommandQueue;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::commands::{CommandOutcome, CommandProcessor};
use crate::metadata::MetadataPublisher;

/// What a single iteration did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Drift was found and metadata republished.
    pub drifted: bool,
    /// The command processed this tick, if one was queued.
    pub command: Option<CommandOutcome>,
}

pub struct Coordinator {
    metadata: Arc<MetadataPublisher>,
    commands: CommandProcessor,
    queue: CommandQueue,
    period: Duration,
}

impl Coordinator {
    pub fn new(
        metadata: Arc<MetadataPublisher>,
        commands: CommandProcessor,
        queue: CommandQueue,
        period: Duration,
    ) -> Self {
        Self {
            metadata,
            commands,
            queue,
            period,
        }
    }

    /// Run one iteration. Store and bus failures are logged and absorbed.
    pub async fn tick(&mut self) -> TickReport {
        let drifted = match self.metadata.reconcile_and_publish().await {
            Ok(drifted) => drifted,
            Err(e) => {
                warn!("Metadata reconciliation failed: {}", e);
                false
            }
        };

        let command = match self.queue.try_next() {
            Some(raw) => {
                debug!("Processing command {:?}", raw);
                Some(self.commands.process(&raw).await)
            }
            None => None,
        };

        TickReport { drifted, command }
    }

    /// Tick every period until cancelled. The first tick runs immediately.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Coordinating loop started, period {:?}", self.period);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
        info!("Coordinating loop stopped");
    }
}
