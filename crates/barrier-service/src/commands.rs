//! Command processing.

use std::sync::Arc;

use barrier_core::{Barrier, Command, Position};
use tracing::{info, warn};

use crate::telemetry::TelemetryPublisher;

/// What processing a single command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The barrier moved and the new status was published.
    Moved(Position),
    /// The barrier already stood in the requested position.
    Unchanged(Position),
    /// The command was not `open` or `close`.
    Unrecognized(String),
}

/// Applies `open`/`close` commands to the barrier.
pub struct CommandProcessor {
    barrier: Arc<Barrier>,
    telemetry: Arc<TelemetryPublisher>,
}

impl CommandProcessor {
    pub fn new(barrier: Arc<Barrier>, telemetry: Arc<TelemetryPublisher>) -> Self {
        Self { barrier, telemetry }
    }

    /// Process one raw command. Never fails: publish errors are logged.
    pub async fn process(&self, raw: &str) -> CommandOutcome {
        match Command::parse(raw) {
            Command::Open => self.move_to(Position::Opened).await,
            Command::Close => self.move_to(Position::Closed).await,
            Command::Unknown(other) => {
                info!(
                    "Command {} is not defined, defined commands are open or close",
                    other
                );
                CommandOutcome::Unrecognized(other)
            }
        }
    }

    async fn move_to(&self, target: Position) -> CommandOutcome {
        let moved = match target {
            Position::Opened => self.barrier.open().await,
            Position::Closed => self.barrier.close().await,
        };
        if !moved {
            return CommandOutcome::Unchanged(target);
        }

        if let Err(e) = self.telemetry.publish_status().await {
            warn!("Failed to publish status after {}: {}", target, e);
        }
        CommandOutcome::Moved(target)
    }
}
