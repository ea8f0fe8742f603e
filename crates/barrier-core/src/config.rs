//! Process configuration.
//!
//! Everything is read from the environment. Loading goes through a lookup
//! function so tests can supply a map instead of mutating the process env.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::device::{Position, Readings};
use crate::error::ConfigError;

/// Environment variable names.
pub mod env_vars {
    pub const NAME: &str = "name";
    pub const POSITION: &str = "position";
    pub const TEMPERATURE: &str = "temperature";
    pub const SIGNAL: &str = "signal";

    pub const DB_USER: &str = "db_user";
    pub const DB_PASSWORD: &str = "db_password";
    pub const DB_HOST: &str = "db_host";
    pub const DB_PORT: &str = "db_port";
    pub const DB_NAME: &str = "db_name";
    /// Misspelled name used by older deployments.
    pub const LEGACY_DB_NAME: &str = "bd_name";

    pub const MQTT_HOST: &str = "mqtt_host";
    pub const MQTT_CLIENT_ID: &str = "mqtt_client_id";

    /// `entity` (default) or `store`.
    pub const METADATA_SOURCE: &str = "metadata_source";

    /// `true` switches log output to JSON lines.
    pub const LOG_JSON: &str = "BARRIER_LOG_JSON";
}

/// Fixed cadences.
pub mod intervals {
    use std::time::Duration;

    pub const LOOP: Duration = Duration::from_secs(1);
    pub const STATUS: Duration = Duration::from_secs(60);
    pub const METADATA: Duration = Duration::from_secs(900);
    pub const MQTT_KEEP_ALIVE: Duration = Duration::from_secs(60);
    pub const MQTT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    /// Longest a publish may wait for room in the client's request queue.
    pub const MQTT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DB_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);
    pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);
}

/// Topic layout.
pub mod topics {
    /// Status telemetry: `barrier/{name}`.
    pub fn status(name: &str) -> String {
        format!("barrier/{}", name)
    }

    /// One Info attribute: `barrier/{name}/{attribute}`.
    pub fn attribute(name: &str, attribute: &str) -> String {
        format!("barrier/{}/{}", name, attribute)
    }

    /// Inbound commands: `barrier/commands/{name}`.
    pub fn commands(name: &str) -> String {
        format!("barrier/commands/{}", name)
    }
}

pub const MQTT_PORT: u16 = 1883;
pub const DEFAULT_DB_PORT: u16 = 3306;

/// Connection parameters for the record store.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}

/// Connection parameters for the MQTT broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
    pub publish_timeout: Duration,
}

impl MqttSettings {
    pub fn new(host: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: MQTT_PORT,
            client_id: client_id.into(),
            keep_alive: intervals::MQTT_KEEP_ALIVE,
            connect_timeout: intervals::MQTT_CONNECT_TIMEOUT,
            publish_timeout: intervals::MQTT_PUBLISH_TIMEOUT,
        }
    }

    pub fn broker_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where the metadata publisher takes its snapshot from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataSource {
    /// The reconciled in-memory Info.
    #[default]
    Entity,
    /// A fresh record fetched from the store on every publish.
    Store,
}

impl FromStr for MetadataSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "entity" => Ok(Self::Entity),
            "store" => Ok(Self::Store),
            _ => Err(ConfigError::Invalid {
                var: env_vars::METADATA_SOURCE,
                value: s.to_string(),
            }),
        }
    }
}

/// Cadence of the three activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub loop_period: Duration,
    pub status_interval: Duration,
    pub metadata_interval: Duration,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            loop_period: intervals::LOOP,
            status_interval: intervals::STATUS,
            metadata_interval: intervals::METADATA,
        }
    }
}

/// Complete process configuration.
#[derive(Debug, Clone)]
pub struct BarrierConfig {
    /// Device name, used to find the record and build topics.
    pub name: String,
    pub readings: Readings,
    pub database: DatabaseConfig,
    pub mqtt: MqttSettings,
    pub metadata_source: MetadataSource,
    pub schedule: Schedule,
}

impl BarrierConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` to resolve variable names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let require = |var: &'static str| get(var).ok_or(ConfigError::Missing(var));

        let name = require(env_vars::NAME)?;

        let readings = Readings {
            position: require(env_vars::POSITION)?.parse::<Position>()?,
            temperature: require(env_vars::TEMPERATURE)?,
            signal: require(env_vars::SIGNAL)?,
        };

        let database_name = match get(env_vars::DB_NAME) {
            Some(db) => db,
            None => {
                let legacy = get(env_vars::LEGACY_DB_NAME)
                    .ok_or(ConfigError::Missing(env_vars::DB_NAME))?;
                warn!(
                    "{} is deprecated, set {} instead",
                    env_vars::LEGACY_DB_NAME,
                    env_vars::DB_NAME
                );
                legacy
            }
        };

        let port = match get(env_vars::DB_PORT) {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                var: env_vars::DB_PORT,
                value: raw,
            })?,
            None => DEFAULT_DB_PORT,
        };

        let database = DatabaseConfig {
            user: require(env_vars::DB_USER)?,
            password: get(env_vars::DB_PASSWORD).unwrap_or_default(),
            host: require(env_vars::DB_HOST)?,
            port,
            database: database_name,
        };

        let client_id = get(env_vars::MQTT_CLIENT_ID)
            .unwrap_or_else(|| format!("barrier-{}-{}", name, uuid::Uuid::new_v4()));
        let mqtt = MqttSettings::new(require(env_vars::MQTT_HOST)?, client_id);

        let metadata_source = match get(env_vars::METADATA_SOURCE) {
            Some(raw) => raw.parse()?,
            None => MetadataSource::default(),
        };

        Ok(Self {
            name,
            readings,
            database,
            mqtt,
            metadata_source,
            schedule: Schedule::default(),
        })
    }
}
