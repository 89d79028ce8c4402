//! Local filesystem artifact store
//!
//! Backs the launcher output directory. Writes go through a uniquely-named
//! temp file followed by a rename so readers never observe partial data.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use launch_core::{Error, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::ArtifactStore;

/// Artifact store rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalArtifacts {
    /// Directory all artifact paths resolve under
    root: PathBuf,
}

impl LocalArtifacts {
    /// Create a store rooted at `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory of this store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    fn temp_sibling(&self, path: &str) -> PathBuf {
        let resolved = self.resolve(path);
        let name = format!(
            ".{}.{}.tmp",
            resolved.file_name().unwrap_or_default().to_string_lossy(),
            Uuid::new_v4()
        );
        resolved.with_file_name(name)
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifacts {
    #[instrument(skip(self), fields(backend = "local"))]
    async fn read(&self, path: &str) -> Result<Bytes> {
        let resolved = self.resolve(path);

        match fs::read(&resolved).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::ArtifactNotFound {
                path: path.to_string(),
            }),
            Err(e) => Err(Error::Artifact {
                message: format!("failed to read {}: {}", path, e),
            }),
        }
    }

    #[instrument(skip(self, data), fields(backend = "local", size = data.len()))]
    async fn write(&self, path: &str, data: Bytes) -> Result<u64> {
        let resolved = self.resolve(path);
        let temp = self.temp_sibling(path);
        let size = data.len() as u64;

        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Artifact {
                    message: format!("failed to create directory {:?}: {}", parent, e),
                })?;
        }

        let mut file = fs::File::create(&temp).await.map_err(|e| Error::Artifact {
            message: format!("failed to create temp file {:?}: {}", temp, e),
        })?;

        file.write_all(&data).await.map_err(|e| Error::Artifact {
            message: format!("failed to write {}: {}", path, e),
        })?;

        file.sync_all().await.map_err(|e| Error::Artifact {
            message: format!("failed to sync {}: {}", path, e),
        })?;

        fs::rename(&temp, &resolved)
            .await
            .map_err(|e| Error::Artifact {
                message: format!("failed to rename {:?} to {:?}: {}", temp, resolved, e),
            })?;

        debug!(?resolved, size, "artifact written");
        Ok(size)
    }

    #[instrument(skip(self), fields(backend = "local"))]
    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(fs::metadata(self.resolve(path)).await.is_ok())
    }

    #[instrument(skip(self), fields(backend = "local"))]
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut results = Vec::new();
        let mut stack = vec![self.root.clone()];

        while let Some(dir) = stack.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(_) => continue,
            };

            while let Ok(Some(entry)) = entries.next_entry().await {
                let entry_path = entry.path();
                let file_type = match entry.file_type().await {
                    Ok(t) => t,
                    Err(_) => continue,
                };

                if file_type.is_dir() {
                    stack.push(entry_path);
                } else if file_type.is_file() {
                    if let Ok(relative) = entry_path.strip_prefix(&self.root) {
                        let relative = relative.to_string_lossy().to_string();
                        if relative.starts_with(prefix) && !relative.ends_with(".tmp") {
                            results.push(relative);
                        }
                    }
                }
            }
        }

        results.sort();
        debug!(count = results.len(), prefix, "artifacts listed");
        Ok(results)
    }
}
