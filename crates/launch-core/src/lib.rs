//! Launch Core - Foundation for the Gantry launch toolkit
//!
//! Provides the shared types, environment-driven configuration, and error
//! handling used by the image builder, pipeline generator, cluster client,
//! and collective helper.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    required_env, ClusterConfig, LaunchConfig, PollConfig, RegistryConfig, RetryConfig,
    StorageConfig,
};
pub use error::{Error, Result};
pub use types::*;
