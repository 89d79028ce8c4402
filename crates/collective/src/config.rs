//! Process group configuration
//!
//! Defaults come from the caller; the standard rendezvous environment
//! variables (`RANK`, `WORLD_SIZE`, `MASTER_ADDR`, `MASTER_PORT`) override
//! them, matching how cluster steps are wired.

use std::str::FromStr;
use std::time::Duration;

use launch_core::{Error, Result, RetryConfig};

use crate::endpoint::rendezvous_endpoint;

/// Environment variable carrying this participant's rank
pub const ENV_RANK: &str = "RANK";
/// Environment variable carrying the group size
pub const ENV_WORLD_SIZE: &str = "WORLD_SIZE";
/// Environment variable carrying the rendezvous master host
pub const ENV_MASTER_ADDR: &str = "MASTER_ADDR";
/// Environment variable carrying the rendezvous master port
pub const ENV_MASTER_PORT: &str = "MASTER_PORT";

/// Configuration for one process-group participant
#[derive(Debug, Clone)]
pub struct GroupConfig {
    /// This participant's rank (rank 0 hosts the rendezvous)
    pub rank: u32,

    /// Expected number of participants
    pub world_size: u32,

    /// Rendezvous master host
    pub master_addr: String,

    /// Rendezvous master port
    pub master_port: u16,

    /// Deadline for the whole group to assemble
    pub join_timeout: Duration,

    /// Deadline for one all-reduce round
    pub reduce_timeout: Duration,

    /// Connect retry policy for peers racing the master startup
    pub retry: RetryConfig,
}

impl GroupConfig {
    /// Create a config with local defaults for the given rank and size
    pub fn new(rank: u32, world_size: u32) -> Self {
        Self {
            rank,
            world_size,
            master_addr: "127.0.0.1".to_string(),
            master_port: 29500,
            join_timeout: Duration::from_secs(60),
            reduce_timeout: Duration::from_secs(30),
            // Peers usually start before the master listens; retry long
            // enough to ride out container scheduling skew.
            retry: RetryConfig {
                max_retries: 30,
                initial_delay: Duration::from_millis(100),
                max_delay: Duration::from_secs(2),
                backoff_multiplier: 2.0,
            },
        }
    }

    /// Apply environment overrides on top of `defaults`
    ///
    /// Unset variables keep the default; present-but-malformed values are
    /// configuration errors, not silent fallbacks.
    pub fn from_env_or(defaults: GroupConfig) -> Result<Self> {
        let mut config = defaults;
        config.rank = env_parsed(ENV_RANK, config.rank)?;
        config.world_size = env_parsed(ENV_WORLD_SIZE, config.world_size)?;
        if let Ok(addr) = std::env::var(ENV_MASTER_ADDR) {
            if !addr.is_empty() {
                config.master_addr = addr;
            }
        }
        config.master_port = env_parsed(ENV_MASTER_PORT, config.master_port)?;
        config.validate()?;
        Ok(config)
    }

    /// Check rank/world-size consistency
    pub fn validate(&self) -> Result<()> {
        if self.world_size == 0 {
            return Err(Error::InvalidConfig {
                message: "world_size must be at least 1".to_string(),
            });
        }
        if self.rank >= self.world_size {
            return Err(Error::InvalidConfig {
                message: format!(
                    "rank {} out of range for world_size {}",
                    self.rank, self.world_size
                ),
            });
        }
        Ok(())
    }

    /// Connectable endpoint of the rendezvous master
    pub fn master_endpoint(&self) -> String {
        rendezvous_endpoint(&self.master_addr, self.master_port)
    }
}

/// Parse an env override, keeping `default` when the variable is unset
fn env_parsed<T>(var: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) if !raw.is_empty() => raw.parse().map_err(|e| Error::InvalidConfig {
            message: format!("invalid {}={}: {}", var, raw, e),
        }),
        _ => Ok(default),
    }
}
