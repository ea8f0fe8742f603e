//! MySQL / MariaDB record store.
//!
//! Every column is cast to text in SQL so the in-memory [`Info`] and the
//! stored row are rendered by the same formatter and compare exactly.
//!
//! [`Info`]: barrier_core::Info

use async_trait::async_trait;
use barrier_core::config::intervals;
use barrier_core::{BarrierRecord, DatabaseConfig, RecordStore, StoreError, StoreResult};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use tracing::{debug, info};

const SELECT_BY_NAME: &str = r#"
    SELECT CAST(id AS CHAR) AS barrier_id, CAST(name AS CHAR) AS name,
           CAST(latitude AS CHAR) AS latitude, CAST(longitude AS CHAR) AS longitude,
           CAST(firmware AS CHAR) AS firmware, CAST(software AS CHAR) AS software,
           CAST(modem AS CHAR) AS modem, CAST(ip AS CHAR) AS ip, CAST(fqdn AS CHAR) AS fqdn
    FROM barrier
    WHERE name = ?
    LIMIT 1
"#;

const SELECT_BY_ID: &str = r#"
    SELECT CAST(id AS CHAR) AS barrier_id, CAST(name AS CHAR) AS name,
           CAST(latitude AS CHAR) AS latitude, CAST(longitude AS CHAR) AS longitude,
           CAST(firmware AS CHAR) AS firmware, CAST(software AS CHAR) AS software,
           CAST(modem AS CHAR) AS modem, CAST(ip AS CHAR) AS ip, CAST(fqdn AS CHAR) AS fqdn
    FROM barrier
    WHERE id = ?
    LIMIT 1
"#;

/// Database row for `barrier`. NULL columns read as empty strings.
#[derive(Debug, sqlx::FromRow)]
struct BarrierRow {
    barrier_id: Option<String>,
    name: Option<String>,
    latitude: Option<String>,
    longitude: Option<String>,
    firmware: Option<String>,
    software: Option<String>,
    modem: Option<String>,
    ip: Option<String>,
    fqdn: Option<String>,
}

impl From<BarrierRow> for BarrierRecord {
    fn from(r: BarrierRow) -> Self {
        BarrierRecord {
            barrier_id: r.barrier_id.unwrap_or_default(),
            name: r.name.unwrap_or_default(),
            latitude: r.latitude.unwrap_or_default(),
            longitude: r.longitude.unwrap_or_default(),
            firmware: r.firmware.unwrap_or_default(),
            software: r.software.unwrap_or_default(),
            modem: r.modem.unwrap_or_default(),
            ip: r.ip.unwrap_or_default(),
            fqdn: r.fqdn.unwrap_or_default(),
        }
    }
}

/// Build connection options from the configured parameters.
fn connect_options(config: &DatabaseConfig) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database)
}

fn map_err(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolClosed => StoreError::Closed,
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
            StoreError::Connection(e.to_string())
        }
        other => StoreError::Query(other.to_string()),
    }
}

/// Record store backed by a small connection pool.
#[derive(Debug, Clone)]
pub struct MySqlRecordStore {
    pool: MySqlPool,
}

impl MySqlRecordStore {
    /// Open the pool and verify the database is reachable.
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(intervals::DB_ACQUIRE_TIMEOUT)
            .connect_with(connect_options(config))
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!(
            "Connected to record store {}@{}:{}/{}",
            config.user, config.host, config.port, config.database
        );
        Ok(Self { pool })
    }

    async fn fetch(&self, sql: &'static str, key: &str) -> StoreResult<BarrierRecord> {
        let row: Option<BarrierRow> = sqlx::query_as(sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;

        row.map(BarrierRecord::from)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}

#[async_trait]
impl RecordStore for MySqlRecordStore {
    async fn lookup_by_name(&self, name: &str) -> StoreResult<BarrierRecord> {
        debug!("Looking up barrier by name {}", name);
        self.fetch(SELECT_BY_NAME, name).await
    }

    async fn lookup_by_id(&self, id: &str) -> StoreResult<BarrierRecord> {
        debug!("Looking up barrier by id {}", id);
        self.fetch(SELECT_BY_ID, id).await
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Record store closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_conversion() {
        let row = BarrierRow {
            barrier_id: Some("1".to_string()),
            name: Some("north".to_string()),
            latitude: Some("10".to_string()),
            longitude: Some("20".to_string()),
            firmware: Some("1.0".to_string()),
            software: Some("2.0".to_string()),
            modem: None,
            ip: Some("1.2.3.4".to_string()),
            fqdn: Some("n.example".to_string()),
        };
        let record = BarrierRecord::from(row);
        assert_eq!(record.barrier_id, "1");
        assert_eq!(record.modem, "");
        assert_eq!(record.fqdn, "n.example");
    }

    #[test]
    fn test_queries_select_nine_columns() {
        for sql in [SELECT_BY_NAME, SELECT_BY_ID] {
            assert_eq!(sql.matches(") AS ").count(), 9);
            assert!(sql.contains("FROM barrier"));
        }
        assert!(SELECT_BY_NAME.contains("WHERE name = ?"));
        assert!(SELECT_BY_ID.contains("WHERE id = ?"));
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(map_err(sqlx::Error::PoolClosed), StoreError::Closed));
        assert!(matches!(
            map_err(sqlx::Error::PoolTimedOut),
            StoreError::Connection(_)
        ));
        assert!(matches!(
            map_err(sqlx::Error::RowNotFound),
            StoreError::Query(_)
        ));
    }
}
