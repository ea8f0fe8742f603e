//! Record store gateway interface.
//!
//! The record store holds the authoritative configuration of every barrier.
//! A row has exactly nine columns in a fixed order, all rendered as text so
//! they compare exactly against the in-memory [`Info`](crate::Info).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

/// One row of the `barrier` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrierRecord {
    pub barrier_id: String,
    pub name: String,
    pub latitude: String,
    pub longitude: String,
    pub firmware: String,
    pub software: String,
    pub modem: String,
    pub ip: String,
    pub fqdn: String,
}

impl BarrierRecord {
    /// Build a record from its nine columns, in table order.
    pub fn from_row(row: [String; 9]) -> Self {
        let [barrier_id, name, latitude, longitude, firmware, software, modem, ip, fqdn] = row;
        Self {
            barrier_id,
            name,
            latitude,
            longitude,
            firmware,
            software,
            modem,
            ip,
            fqdn,
        }
    }

    /// The nine columns, in table order.
    pub fn into_row(self) -> [String; 9] {
        [
            self.barrier_id,
            self.name,
            self.latitude,
            self.longitude,
            self.firmware,
            self.software,
            self.modem,
            self.ip,
            self.fqdn,
        ]
    }
}

/// Read access to persisted barrier records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the record whose `name` column matches.
    async fn lookup_by_name(&self, name: &str) -> StoreResult<BarrierRecord>;

    /// Fetch the record whose `id` column matches.
    async fn lookup_by_id(&self, id: &str) -> StoreResult<BarrierRecord>;

    /// Release the underlying connection(s).
    async fn close(&self);
}
