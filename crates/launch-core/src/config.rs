//! Launch configuration types
//!
//! Configuration comes from the environment (cluster coordinates,
//! credentials, registry, storage root) with code-level defaults for
//! polling and retry behaviour.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable naming the cluster HTTP endpoint
pub const ENV_HOST: &str = "GANTRY_HOST";
/// Environment variable naming the cluster login user
pub const ENV_USERNAME: &str = "GANTRY_USERNAME";
/// Environment variable naming the cluster login password
pub const ENV_PASSWORD: &str = "GANTRY_PASSWORD";
/// Environment variable naming the cluster namespace for runs
pub const ENV_NAMESPACE: &str = "GANTRY_NAMESPACE";
/// Environment variable naming the container registry repo for canary tags
pub const ENV_CONTAINER_REPO: &str = "GANTRY_CONTAINER_REPO";
/// Environment variable naming the cloud storage root for pipeline data
pub const ENV_STORAGE: &str = "GANTRY_STORAGE";

/// Read a required environment variable
///
/// An unset or empty variable aborts with the distinct `MissingEnv` error
/// kind so callers can tell configuration gaps from runtime failures.
pub fn required_env(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::MissingEnv {
            var: var.to_string(),
        }),
    }
}

/// Main launch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LaunchConfig {
    /// Run polling settings
    pub poll: PollConfig,

    /// Transient-failure retry settings
    pub retry: RetryConfig,

    /// Storage settings
    pub storage: StorageConfig,
}

/// Pipeline-execution cluster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Cluster HTTP URL without any path
    pub host: String,

    /// Login user name
    pub username: String,

    /// Login password
    pub password: String,

    /// Namespace runs are created in
    pub namespace: String,
}

impl ClusterConfig {
    /// Load the cluster configuration from the environment
    ///
    /// Every field is required; the first missing variable aborts.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: required_env(ENV_HOST)?,
            username: required_env(ENV_USERNAME)?,
            password: required_env(ENV_PASSWORD)?,
            namespace: required_env(ENV_NAMESPACE)?,
        })
    }
}

/// Container registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Repository canary tags are pushed to (e.g. `ghcr.io/acme/gantry`)
    pub repo: String,
}

impl RegistryConfig {
    /// Load the registry configuration from the environment
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            repo: required_env(ENV_CONTAINER_REPO)?,
        })
    }
}

/// Storage configuration for pipeline data paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root path pipelines read and write under (per-build subdirectories)
    pub root: String,
}

impl StorageConfig {
    /// Load the storage configuration from the environment
    ///
    /// Unlike the cluster variables this one has a local default, so the
    /// build-only path works on a laptop with nothing exported.
    pub fn from_env() -> Self {
        Self {
            root: std::env::var(ENV_STORAGE)
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "/tmp/gantry-storage".to_string()),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: "/tmp/gantry-storage".to_string(),
        }
    }
}

/// Run polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between status polls
    #[serde(with = "duration_ms")]
    pub interval: Duration,

    /// Hard deadline for one run to reach a terminal state
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(60 * 60),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries
    pub max_retries: u32,

    /// Initial delay before first retry
    #[serde(with = "duration_ms")]
    pub initial_delay: Duration,

    /// Maximum delay between retries
    #[serde(with = "duration_ms")]
    pub max_delay: Duration,

    /// Exponential backoff multiplier
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Backoff delay for the given zero-based attempt, capped at `max_delay`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let millis =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

/// Duration serialization helper (milliseconds on the wire)
mod duration_ms {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
