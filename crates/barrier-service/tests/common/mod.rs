#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use barrier_core::{
    command_queue, Barrier, BarrierRecord, CommandQueue, CommandSender, MessageBus,
    MetadataSource, Position, Readings, RecordStore, StoreError, StoreResult,
};
use barrier_mqtt::MemoryBus;
use barrier_service::{init_barrier, CommandProcessor, MetadataPublisher, TelemetryPublisher};
use barrier_storage::MemoryRecordStore;

pub const NAME: &str = "north-gate";
pub const ID: &str = "7";

pub fn record() -> BarrierRecord {
    BarrierRecord::from_row(
        [
            ID,
            NAME,
            "48.1371",
            "11.5754",
            "0.9",
            "2.3.1",
            "LTE-M",
            "10.0.0.7",
            "north-gate.example.net",
        ]
        .map(String::from),
    )
}

pub fn readings(position: Position) -> Readings {
    Readings {
        position,
        temperature: "21.5".to_string(),
        signal: "-67".to_string(),
    }
}

/// A barrier wired to in-memory collaborators.
pub struct Fixture {
    pub store: MemoryRecordStore,
    pub bus: MemoryBus,
    pub sender: CommandSender,
    pub queue: Option<CommandQueue>,
    pub barrier: Arc<Barrier>,
}

impl Fixture {
    pub async fn new(position: Position) -> Self {
        let store = MemoryRecordStore::with_record(record()).await;
        let (sender, queue) = command_queue();
        let bus = MemoryBus::new(sender.clone());
        let barrier = init_barrier(&store, NAME, readings(position))
            .await
            .expect("record exists");

        Self {
            store,
            bus,
            sender,
            queue: Some(queue),
            barrier: Arc::new(barrier),
        }
    }

    pub fn store_handle(&self) -> Arc<dyn RecordStore> {
        Arc::new(self.store.clone())
    }

    pub fn bus_handle(&self) -> Arc<dyn MessageBus> {
        Arc::new(self.bus.clone())
    }

    pub fn telemetry(&self) -> Arc<TelemetryPublisher> {
        Arc::new(TelemetryPublisher::new(self.barrier.clone(), self.bus_handle()))
    }

    pub fn metadata(&self, source: MetadataSource) -> Arc<MetadataPublisher> {
        Arc::new(MetadataPublisher::new(
            self.barrier.clone(),
            self.bus_handle(),
            self.store_handle(),
            source,
        ))
    }

    pub fn metadata_with_store(
        &self,
        source: MetadataSource,
        store: Arc<dyn RecordStore>,
    ) -> Arc<MetadataPublisher> {
        Arc::new(MetadataPublisher::new(
            self.barrier.clone(),
            self.bus_handle(),
            store,
            source,
        ))
    }

    pub fn commands(&self) -> CommandProcessor {
        CommandProcessor::new(self.barrier.clone(), self.telemetry())
    }

    pub fn status_topic(&self) -> String {
        format!("barrier/{}", NAME)
    }

    pub fn attribute_topic(&self, attribute: &str) -> String {
        format!("barrier/{}/{}", NAME, attribute)
    }
}

/// Wraps a [`MemoryRecordStore`] with a slow id lookup or a failing name lookup.
#[derive(Clone)]
pub struct ScriptedStore {
    inner: MemoryRecordStore,
    id_delay: Duration,
    fail_by_name: bool,
}

impl ScriptedStore {
    pub fn new(inner: MemoryRecordStore) -> Self {
        Self {
            inner,
            id_delay: Duration::ZERO,
            fail_by_name: false,
        }
    }

    pub fn with_id_delay(mut self, delay: Duration) -> Self {
        self.id_delay = delay;
        self
    }

    pub fn failing_by_name(mut self) -> Self {
        self.fail_by_name = true;
        self
    }
}

#[async_trait]
impl RecordStore for ScriptedStore {
    async fn lookup_by_name(&self, name: &str) -> StoreResult<BarrierRecord> {
        if self.fail_by_name {
            return Err(StoreError::Connection("connection reset".to_string()));
        }
        self.inner.lookup_by_name(name).await
    }

    async fn lookup_by_id(&self, id: &str) -> StoreResult<BarrierRecord> {
        tokio::time::sleep(self.id_delay).await;
        self.inner.lookup_by_id(id).await
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}
