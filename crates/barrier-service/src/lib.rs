//! Barrier service: the device entity's runtime behaviour.
//!
//! | Component | Role |
//! |-----------|------|
//! | [`TelemetryPublisher`] | Status on `barrier/{name}` |
//! | [`MetadataPublisher`] | One message per Info attribute, drift republish |
//! | [`CommandProcessor`] | `open` / `close` handling |
//! | [`Coordinator`] | Reconcile, then one command, every loop period |
//! | [`BarrierService`] | Supervises the loop and both heartbeats |

pub mod commands;
pub mod coordinator;
pub mod heartbeat;
pub mod metadata;
pub mod runtime;
pub mod telemetry;

pub use commands::{CommandOutcome, CommandProcessor};
pub use coordinator::{Coordinator, TickReport};
pub use metadata::MetadataPublisher;
pub use runtime::{shutdown_signal, BarrierService, ShutdownReason};
pub use telemetry::TelemetryPublisher;

use barrier_core::{Barrier, Readings, RecordStore, StoreResult};
use tracing::info;

/// Build the barrier from its stored record and the configured readings.
pub async fn init_barrier(
    store: &dyn RecordStore,
    name: &str,
    readings: Readings,
) -> StoreResult<Barrier> {
    let record = store.lookup_by_name(name).await?;
    info!(
        "Loaded barrier {} (id {}) from record store",
        record.name, record.barrier_id
    );
    Ok(Barrier::from_record(record, readings))
}
