//! Artifact store trait definition

use async_trait::async_trait;
use bytes::Bytes;
use launch_core::Result;

/// Async interface over the place generated artifacts land
///
/// Implementors hold small files (a build descriptor, rendered pipeline
/// specs), so there is no streaming surface; whole-value reads and writes
/// are fine.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Read the artifact at `path`
    ///
    /// # Errors
    /// `ArtifactNotFound` if nothing was ever written there, `Artifact`
    /// for backend failures.
    async fn read(&self, path: &str) -> Result<Bytes>;

    /// Write an artifact, creating parent directories as needed
    ///
    /// Writes are atomic where the backend allows it (temp file + rename)
    /// so a crashed run never leaves a half-written descriptor behind.
    /// Returns the number of bytes written.
    async fn write(&self, path: &str, data: Bytes) -> Result<u64>;

    /// Check whether an artifact exists at `path`
    async fn exists(&self, path: &str) -> Result<bool>;

    /// List artifact paths under a prefix, sorted
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}
