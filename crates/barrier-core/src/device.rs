//! The barrier device entity.
//!
//! A [`Barrier`] aggregates one [`Info`] (configuration mirrored from the
//! record store) and one [`Status`] (operational telemetry). Each half sits
//! behind its own lock so the reconciliation loop, the heartbeats and the
//! command processor can share one `Arc<Barrier>`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::ConfigError;
use crate::record::BarrierRecord;
use crate::timestamp::Timestamp;

/// Physical position of the barrier arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Opened,
    Closed,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opened" => Ok(Self::Opened),
            "closed" => Ok(Self::Closed),
            other => Err(ConfigError::Invalid {
                var: "position",
                value: other.to_string(),
            }),
        }
    }
}

/// Device identity and configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    pub barrier_id: String,
    pub name: String,
    pub latitude: String,
    pub longitude: String,
    pub firmware: String,
    pub software: String,
    pub modem: String,
    pub ip: String,
    pub fqdn: String,
    pub last_update: Timestamp,
}

impl Info {
    /// Names of the fields compared against the record store, in order.
    pub const COMPARABLE_FIELDS: [&'static str; 8] = [
        "name",
        "latitude",
        "longitude",
        "firmware",
        "software",
        "modem",
        "ip",
        "fqdn",
    ];

    pub fn from_record(record: BarrierRecord) -> Self {
        Self {
            barrier_id: record.barrier_id,
            name: record.name,
            latitude: record.latitude,
            longitude: record.longitude,
            firmware: record.firmware,
            software: record.software,
            modem: record.modem,
            ip: record.ip,
            fqdn: record.fqdn,
            last_update: Timestamp::now(),
        }
    }

    /// Mutable access to the comparable fields, in [`Self::COMPARABLE_FIELDS`] order.
    pub fn comparable_fields_mut(&mut self) -> [(&'static str, &mut String); 8] {
        [
            ("name", &mut self.name),
            ("latitude", &mut self.latitude),
            ("longitude", &mut self.longitude),
            ("firmware", &mut self.firmware),
            ("software", &mut self.software),
            ("modem", &mut self.modem),
            ("ip", &mut self.ip),
            ("fqdn", &mut self.fqdn),
        ]
    }

    /// Attribute name and rendered value for every published attribute:
    /// the comparable fields followed by `last_update`.
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("latitude", self.latitude.clone()),
            ("longitude", self.longitude.clone()),
            ("firmware", self.firmware.clone()),
            ("software", self.software.clone()),
            ("modem", self.modem.clone()),
            ("ip", self.ip.clone()),
            ("fqdn", self.fqdn.clone()),
            ("last_update", self.last_update.to_string()),
        ]
    }

    /// Record that the configuration changed.
    pub fn touch(&mut self) {
        self.last_update = Timestamp::now();
    }
}

/// Operational readings supplied at process start. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readings {
    pub position: Position,
    pub temperature: String,
    pub signal: String,
}

/// Operational telemetry. Serializes to the status wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub position: Position,
    pub temperature: String,
    pub signal: String,
    pub last_update: Timestamp,
}

impl Status {
    pub fn from_readings(readings: Readings) -> Self {
        Self {
            position: readings.position,
            temperature: readings.temperature,
            signal: readings.signal,
            last_update: Timestamp::now(),
        }
    }

    /// Move to `target`. Returns false if already there.
    pub fn move_to(&mut self, target: Position) -> bool {
        if self.position == target {
            return false;
        }
        self.position = target;
        self.last_update = Timestamp::now();
        true
    }

    /// JSON object with exactly `position`, `temperature`, `signal`, `last_update`.
    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// One barrier, shared by every activity of the process.
#[derive(Debug)]
pub struct Barrier {
    info: RwLock<Info>,
    status: RwLock<Status>,
}

impl Barrier {
    pub fn new(info: Info, status: Status) -> Self {
        Self {
            info: RwLock::new(info),
            status: RwLock::new(status),
        }
    }

    /// Build the entity from a persisted record and the startup readings.
    pub fn from_record(record: BarrierRecord, readings: Readings) -> Self {
        Self::new(Info::from_record(record), Status::from_readings(readings))
    }

    /// Lock guarding the configuration half.
    pub fn info_lock(&self) -> &RwLock<Info> {
        &self.info
    }

    /// Lock guarding the telemetry half.
    pub fn status_lock(&self) -> &RwLock<Status> {
        &self.status
    }

    pub async fn info(&self) -> Info {
        self.info.read().await.clone()
    }

    pub async fn status(&self) -> Status {
        self.status.read().await.clone()
    }

    pub async fn name(&self) -> String {
        self.info.read().await.name.clone()
    }

    pub async fn position(&self) -> Position {
        self.status.read().await.position
    }

    /// Open the barrier. Returns whether the position changed.
    pub async fn open(&self) -> bool {
        self.transition(Position::Opened).await
    }

    /// Close the barrier. Returns whether the position changed.
    pub async fn close(&self) -> bool {
        self.transition(Position::Closed).await
    }

    async fn transition(&self, target: Position) -> bool {
        let changed = self.status.write().await.move_to(target);
        if !changed {
            info!("{} is already {}", self.name().await, target);
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> BarrierRecord {
        BarrierRecord::from_row(
            ["1", "north", "10", "20", "1.0", "2.0", "m1", "1.2.3.4", "n.example"]
                .map(String::from),
        )
    }

    fn readings(position: Position) -> Readings {
        Readings {
            position,
            temperature: "21".to_string(),
            signal: "-70".to_string(),
        }
    }

    #[test]
    fn test_position_parse() {
        assert_eq!("opened".parse::<Position>().unwrap(), Position::Opened);
        assert_eq!("closed".parse::<Position>().unwrap(), Position::Closed);
        assert!("Closed".parse::<Position>().is_err());
        assert!("".parse::<Position>().is_err());
    }

    #[test]
    fn test_status_payload_has_four_keys() {
        let status = Status::from_readings(readings(Position::Closed));
        let payload = status.to_payload().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 4);
        assert_eq!(object["position"], "closed");
        assert_eq!(object["temperature"], "21");
        assert_eq!(object["signal"], "-70");
        assert_eq!(object["last_update"], status.last_update.to_string());
    }

    #[test]
    fn test_attributes_order() {
        let info = Info::from_record(record());
        let names: Vec<_> = info.attributes().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names.len(), 9);
        assert_eq!(&names[..8], &Info::COMPARABLE_FIELDS[..]);
        assert_eq!(names[8], "last_update");
    }

    #[tokio::test]
    async fn test_open_close() {
        let barrier = Barrier::from_record(record(), readings(Position::Closed));

        assert!(barrier.open().await);
        assert_eq!(barrier.position().await, Position::Opened);

        // Redundant open is a no-op.
        assert!(!barrier.open().await);
        assert_eq!(barrier.position().await, Position::Opened);

        assert!(barrier.close().await);
        assert!(!barrier.close().await);
        assert_eq!(barrier.position().await, Position::Closed);
    }

    #[tokio::test]
    async fn test_redundant_transition_keeps_last_update() {
        let barrier = Barrier::from_record(record(), readings(Position::Opened));
        let before = barrier.status().await.last_update;
        assert!(!barrier.open().await);
        assert_eq!(barrier.status().await.last_update, before);
    }

    #[tokio::test]
    async fn test_sequences_collapse_duplicates() {
        let sequences: [&[Position]; 5] = [
            &[],
            &[Position::Opened, Position::Opened, Position::Opened],
            &[Position::Closed, Position::Opened, Position::Opened, Position::Closed],
            &[Position::Opened, Position::Closed, Position::Closed, Position::Opened],
            &[Position::Closed, Position::Closed],
        ];

        for start in [Position::Opened, Position::Closed] {
            for seq in sequences {
                let barrier = Barrier::from_record(record(), readings(start));
                let mut changes = 0;
                for target in seq {
                    let changed = match target {
                        Position::Opened => barrier.open().await,
                        Position::Closed => barrier.close().await,
                    };
                    if changed {
                        changes += 1;
                    }
                }

                let mut collapsed: Vec<Position> = vec![start];
                for target in seq {
                    if collapsed.last() != Some(target) {
                        collapsed.push(*target);
                    }
                }

                assert_eq!(barrier.position().await, *collapsed.last().unwrap());
                assert_eq!(changes, collapsed.len() - 1);
            }
        }
    }
}
