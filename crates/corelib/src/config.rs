//! Ring and store configuration.
//!
//! Durations are (de)serialized as whole milliseconds so that config files
//! stay plain JSON numbers.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::DEFAULT_ID_BITS;

/// Port a node listens on when none is given.
pub const DEFAULT_PORT: u16 = 4300;
/// Period of the stabilize / fix-fingers / check-predecessor cycle.
pub const DEFAULT_STABILIZE_INTERVAL: Duration = Duration::from_millis(250);
/// How long a node holds a received object before dropping it.
pub const DEFAULT_OBJECT_TTL: Duration = Duration::from_secs(60);
/// Upper bound on a single remote call.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_GET_RETRIES: usize = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Settings of a single ring node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    /// Identifier width N; the ring has 2^N positions.
    pub id_bits: usize,
    #[serde(with = "millis")]
    pub stabilize_interval: Duration,
    /// TTL of objects held in the received-object store.
    #[serde(with = "millis")]
    pub object_ttl: Duration,
    #[serde(with = "millis")]
    pub rpc_timeout: Duration,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            id_bits: DEFAULT_ID_BITS,
            stabilize_interval: DEFAULT_STABILIZE_INTERVAL,
            object_ttl: DEFAULT_OBJECT_TTL,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
        }
    }
}

impl RingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.id_bits == 0 || self.id_bits > 256 {
            return Err(Error::InvalidConfig(format!(
                "id_bits must be in 1..=256, got {}",
                self.id_bits
            )));
        }
        if self.stabilize_interval.is_zero() {
            return Err(Error::InvalidConfig("stabilize_interval must be non-zero".into()));
        }
        if self.object_ttl.is_zero() {
            return Err(Error::InvalidConfig("object_ttl must be non-zero".into()));
        }
        if self.rpc_timeout.is_zero() {
            return Err(Error::InvalidConfig("rpc_timeout must be non-zero".into()));
        }
        Ok(())
    }
}

/// Settings of the application-facing data store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Number of salted placements written per key.
    pub redundancy: usize,
    /// Attempts made by `get` before reporting not-found.
    pub retries: usize,
    #[serde(with = "millis")]
    pub retry_delay: Duration,
    /// TTL the ring applies to stored objects. The local refresh cache uses a
    /// third of it, so every copy is re-pushed before it can expire.
    #[serde(with = "millis")]
    pub remote_ttl: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redundancy: 1,
            retries: DEFAULT_GET_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            remote_ttl: DEFAULT_OBJECT_TTL,
        }
    }
}

impl StoreConfig {
    pub fn cache_ttl(&self) -> Duration {
        self.remote_ttl / 3
    }

    pub fn validate(&self) -> Result<()> {
        if self.redundancy == 0 {
            return Err(Error::InvalidConfig("redundancy must be at least 1".into()));
        }
        if self.cache_ttl().is_zero() {
            return Err(Error::InvalidConfig("remote_ttl is too short to refresh".into()));
        }
        Ok(())
    }
}

/// Everything a process reads from its config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ring: RingConfig,
    pub store: StoreConfig,
}

impl Config {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigLoad(format!("{}: {}", path.display(), e)))?;
        let config: Config = serde_json::from_str(&raw)
            .map_err(|e| Error::ConfigLoad(format!("{}: {}", path.display(), e)))?;
        config.ring.validate()?;
        config.store.validate()?;
        Ok(config)
    }
}
