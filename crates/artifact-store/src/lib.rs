//! Artifact Store - Persistence for generated launch artifacts
//!
//! The launcher persists a build descriptor and the generated pipeline
//! files so later invocations can reuse a build (`--load`) and the
//! external cluster can consume the specs. Backends:
//! - Local filesystem (default feature)
//! - S3-compatible mirror for the integration storage root (`s3` feature)
//!
//! # Example
//!
//! ```no_run
//! use artifact_store::{ArtifactStore, LocalArtifacts};
//! use bytes::Bytes;
//!
//! # async fn example() -> launch_core::Result<()> {
//! let store = LocalArtifacts::new("/tmp/gantry-out");
//! store.write("intro_pipeline.yaml", Bytes::from("steps: []")).await?;
//! let yaml = store.read("intro_pipeline.yaml").await?;
//! # Ok(())
//! # }
//! ```

mod json;
mod local;
mod store;

#[cfg(feature = "s3")]
mod s3;

pub use json::{read_json, write_json};
pub use local::LocalArtifacts;
pub use store::ArtifactStore;

#[cfg(feature = "s3")]
pub use s3::{S3Artifacts, S3ArtifactsConfig};
