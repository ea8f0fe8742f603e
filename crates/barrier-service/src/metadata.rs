//! Metadata publisher and drift-triggered republish.
//!
//! Each Info attribute goes to its own topic, `barrier/{name}/{attribute}`.
//! A publish lock serializes every metadata publish, including the
//! reconcile-then-publish done by the coordinating loop, so readers never see
//! a snapshot older than one already on the bus.

use std::sync::Arc;

use barrier_core::config::topics;
use barrier_core::{
    apply_record, log_changes, Barrier, Info, MessageBus, MetadataSource, RecordStore, Result,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct MetadataPublisher {
    barrier: Arc<Barrier>,
    bus: Arc<dyn MessageBus>,
    store: Arc<dyn RecordStore>,
    source: MetadataSource,
    publish_lock: Mutex<()>,
}

impl MetadataPublisher {
    pub fn new(
        barrier: Arc<Barrier>,
        bus: Arc<dyn MessageBus>,
        store: Arc<dyn RecordStore>,
        source: MetadataSource,
    ) -> Self {
        Self {
            barrier,
            bus,
            store,
            source,
            publish_lock: Mutex::new(()),
        }
    }

    /// Publish every Info attribute. Returns how many messages were accepted
    /// by the bus.
    pub async fn publish_info(&self) -> Result<usize> {
        let _guard = self.publish_lock.lock().await;
        let info = match self.source {
            MetadataSource::Entity => self.barrier.info().await,
            MetadataSource::Store => self.fetch_fresh().await?,
        };
        Ok(self.publish_snapshot(&info).await)
    }

    /// Reconcile the in-memory Info with the record store and, on drift,
    /// stamp `last_update` once and republish.
    ///
    /// The store is read with no Info lock held; the write lock covers only
    /// the field update and the snapshot. Returns whether drift was found.
    pub async fn reconcile_and_publish(&self) -> Result<bool> {
        let _guard = self.publish_lock.lock().await;

        let barrier_id = self.barrier.info_lock().read().await.barrier_id.clone();
        let record = self.store.lookup_by_id(&barrier_id).await?;

        let reconciled = {
            let mut info = self.barrier.info_lock().write().await;
            let changes = apply_record(&mut info, &record);
            if changes.is_empty() {
                return Ok(false);
            }
            log_changes(&changes);
            info.touch();
            info.clone()
        };

        info!("Barrier {} configuration drifted, republishing", reconciled.name);
        let snapshot = match self.source {
            MetadataSource::Entity => reconciled,
            MetadataSource::Store => match self.fetch_fresh().await {
                Ok(fresh) => fresh,
                Err(e) => {
                    warn!(
                        "Re-fetching barrier {} failed, publishing reconciled values: {}",
                        reconciled.name, e
                    );
                    reconciled
                }
            },
        };
        self.publish_snapshot(&snapshot).await;
        Ok(true)
    }

    /// Re-derive Info from the store, keyed by the current name.
    async fn fetch_fresh(&self) -> Result<Info> {
        let name = self.barrier.name().await;
        let record = self.store.lookup_by_name(&name).await?;
        Ok(Info::from_record(record))
    }

    async fn publish_snapshot(&self, info: &Info) -> usize {
        let mut published = 0;
        for (attribute, value) in info.attributes() {
            let topic = topics::attribute(&info.name, attribute);
            match self.bus.publish(&topic, value.into_bytes()).await {
                Ok(()) => published += 1,
                Err(e) => warn!("Failed to publish {}: {}", topic, e),
            }
        }
        debug!("Published {} metadata attributes for {}", published, info.name);
        published
    }
}
