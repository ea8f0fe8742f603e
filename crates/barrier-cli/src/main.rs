//! `barrierd`: bridges one barrier's database record to the MQTT broker.
//!
//! Configuration comes from the environment (a `.env` file in the working
//! directory is loaded first). Set `BARRIER_LOG_JSON=true` for JSON logs and
//! `RUST_LOG` to override the default `barrier=info` filter.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use barrier_core::config::env_vars;
use barrier_core::{command_queue, BarrierConfig, RecordStore};
use barrier_mqtt::MqttBus;
use barrier_service::{init_barrier, shutdown_signal, BarrierService, ShutdownReason};
use barrier_storage::MySqlRecordStore;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    init_logging();
    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let config = BarrierConfig::from_env().context("Invalid configuration")?;
    info!(
        "Starting barrierd {} for barrier {}",
        barrier_core::VERSION,
        config.name
    );

    let store = MySqlRecordStore::connect(&config.database)
        .await
        .map_err(|e| {
            error!("Error connecting to MariaDB platform: {}", e);
            e
        })?;

    let barrier = match init_barrier(&store, &config.name, config.readings.clone()).await {
        Ok(barrier) => barrier,
        Err(e) => {
            error!("Failed to load barrier {}: {}", config.name, e);
            store.close().await;
            return Err(e.into());
        }
    };

    let (commands, queue) = command_queue();
    let bus = match MqttBus::connect(&config.mqtt, commands).await {
        Ok(bus) => bus,
        Err(e) => {
            error!("Failed to connect to MQTT broker {}: {}", config.mqtt.broker_addr(), e);
            store.close().await;
            return Err(e.into());
        }
    };

    let service = BarrierService::new(
        Arc::new(barrier),
        Arc::new(store),
        Arc::new(bus),
        queue,
        config.metadata_source,
        config.schedule,
    );
    if let Err(e) = service.subscribe_commands().await {
        error!("Failed to subscribe to commands: {}", e);
        service.close().await;
        return Err(e.into());
    }

    match service.run_until(shutdown_signal()).await {
        ShutdownReason::Requested => Ok(()),
        ShutdownReason::TaskExited(detail) => Err(anyhow!("barrier service stopped: {}", detail)),
    }
}

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER));

    if json_logging(std::env::var(env_vars::LOG_JSON).ok()) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .compact()
            .init();
    }
}

/// Matches every `barrier*` target by prefix.
const DEFAULT_FILTER: &str = "barrier=info";

/// `true`/`false` as written by `bool::from_str`; anything else means off.
fn json_logging(value: Option<String>) -> bool {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(false)
}
