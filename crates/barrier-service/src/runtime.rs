//! Supervised runtime.
//!
//! Runs the coordinating loop and both heartbeats as sibling tasks under one
//! cancellation token. When shutdown is requested, or any task exits on its
//! own, every task is cancelled and awaited (bounded by the shutdown grace),
//! then the bus is disconnected and the record store closed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use barrier_core::config::{intervals, topics};
use barrier_core::{
    Barrier, BusResult, CommandQueue, MessageBus, MetadataSource, RecordStore, Schedule,
};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::commands::CommandProcessor;
use crate::coordinator::Coordinator;
use crate::heartbeat::{run_metadata_heartbeat, run_status_heartbeat};
use crate::metadata::MetadataPublisher;
use crate::telemetry::TelemetryPublisher;

/// Why [`BarrierService::run_until`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The shutdown future resolved or the token was cancelled.
    Requested,
    /// A supervised task ended without being asked to.
    TaskExited(String),
}

pub struct BarrierService {
    barrier: Arc<Barrier>,
    store: Arc<dyn RecordStore>,
    bus: Arc<dyn MessageBus>,
    telemetry: Arc<TelemetryPublisher>,
    metadata: Arc<MetadataPublisher>,
    queue: CommandQueue,
    schedule: Schedule,
    shutdown_grace: Duration,
    cancel: CancellationToken,
}

impl BarrierService {
    pub fn new(
        barrier: Arc<Barrier>,
        store: Arc<dyn RecordStore>,
        bus: Arc<dyn MessageBus>,
        queue: CommandQueue,
        source: MetadataSource,
        schedule: Schedule,
    ) -> Self {
        let telemetry = Arc::new(TelemetryPublisher::new(barrier.clone(), bus.clone()));
        let metadata = Arc::new(MetadataPublisher::new(
            barrier.clone(),
            bus.clone(),
            store.clone(),
            source,
        ));

        Self {
            barrier,
            store,
            bus,
            telemetry,
            metadata,
            queue,
            schedule,
            shutdown_grace: intervals::SHUTDOWN_GRACE,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the service when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Subscribe to `barrier/commands/{name}`.
    pub async fn subscribe_commands(&self) -> BusResult<()> {
        let topic = topics::commands(&self.barrier.name().await);
        self.bus.subscribe(&topic).await
    }

    /// Disconnect the bus and close the record store.
    ///
    /// For startup paths that give up before [`run_until`](Self::run_until).
    pub async fn close(&self) {
        release(self.bus.as_ref(), self.store.as_ref()).await;
    }

    /// Run until `shutdown` resolves, the token is cancelled or a task exits.
    pub async fn run_until<F>(self, shutdown: F) -> ShutdownReason
    where
        F: Future<Output = ()> + Send,
    {
        let Self {
            barrier,
            store,
            bus,
            telemetry,
            metadata,
            queue,
            schedule,
            shutdown_grace,
            cancel,
        } = self;

        let commands = CommandProcessor::new(barrier.clone(), telemetry.clone());
        let coordinator =
            Coordinator::new(metadata.clone(), commands, queue, schedule.loop_period);

        let mut tasks = JoinSet::new();
        tasks.spawn({
            let cancel = cancel.clone();
            async move {
                coordinator.run(cancel).await;
                "coordinating loop"
            }
        });
        tasks.spawn({
            let cancel = cancel.clone();
            let period = schedule.status_interval;
            async move {
                run_status_heartbeat(telemetry, period, cancel).await;
                "status heartbeat"
            }
        });
        tasks.spawn({
            let cancel = cancel.clone();
            let period = schedule.metadata_interval;
            async move {
                run_metadata_heartbeat(metadata, period, cancel).await;
                "metadata heartbeat"
            }
        });

        info!("Barrier {} running", barrier.name().await);

        let reason = tokio::select! {
            _ = shutdown => {
                info!("Received shutdown signal");
                ShutdownReason::Requested
            }
            _ = cancel.cancelled() => ShutdownReason::Requested,
            Some(joined) = tasks.join_next() => {
                let detail = match joined {
                    Ok(task) => format!("{} exited", task),
                    Err(e) => format!("task failed: {}", e),
                };
                error!("Supervised {}", detail);
                ShutdownReason::TaskExited(detail)
            }
        };

        cancel.cancel();
        let drained = tokio::time::timeout(shutdown_grace, async {
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    warn!("Task ended abnormally during shutdown: {}", e);
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!("Tasks did not stop within {:?}, aborting", shutdown_grace);
            tasks.abort_all();
        }

        release(bus.as_ref(), store.as_ref()).await;

        info!("Barrier service stopped");
        reason
    }
}

async fn release(bus: &dyn MessageBus, store: &dyn RecordStore) {
    if let Err(e) = bus.disconnect().await {
        warn!("Failed to disconnect from message bus: {}", e);
    }
    store.close().await;
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error setting up signal handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Error setting up SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
