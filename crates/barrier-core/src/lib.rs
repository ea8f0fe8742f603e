//! Barrier Bridge core.
//!
//! Domain model and gateway interfaces for a single access barrier that
//! mirrors its configuration from a relational record store and talks to the
//! outside world over MQTT.
//!
//! ## Architecture
//!
//! - **Barrier**: the device entity, one [`Info`] and one [`Status`], each behind a lock
//! - **RecordStore**: lookup of the persisted barrier row
//! - **MessageBus**: at-least-once publish and topic subscription
//! - **Reconciliation**: drift detection that lets the record store win
//! - **CommandQueue**: FIFO between the bus event loop and the coordinating loop

pub mod bus;
pub mod command;
pub mod config;
pub mod device;
pub mod error;
pub mod reconcile;
pub mod record;
pub mod timestamp;

pub use bus::MessageBus;
pub use command::{command_queue, Command, CommandQueue, CommandSender};
pub use config::{BarrierConfig, DatabaseConfig, MetadataSource, MqttSettings, Schedule};
pub use device::{Barrier, Info, Position, Readings, Status};
pub use error::{BusError, BusResult, ConfigError, Error, Result, StoreError, StoreResult};
pub use reconcile::{apply_record, detect_and_apply_drift, log_changes, FieldChange};
pub use record::{BarrierRecord, RecordStore};
pub use timestamp::Timestamp;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
