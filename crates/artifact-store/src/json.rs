//! JSON helpers for typed artifacts
//!
//! The build descriptor is a flat JSON object; these helpers keep the
//! serde round trip next to the store instead of in every caller.

use bytes::Bytes;
use launch_core::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::ArtifactStore;

/// Serialize `value` as pretty JSON and write it to `path`
pub async fn write_json<T, S>(store: &S, path: &str, value: &T) -> Result<u64>
where
    T: Serialize + Sync,
    S: ArtifactStore + ?Sized,
{
    let data = serde_json::to_vec_pretty(value)?;
    store.write(path, Bytes::from(data)).await
}

/// Read the artifact at `path` and deserialize it from JSON
pub async fn read_json<T, S>(store: &S, path: &str) -> Result<T>
where
    T: DeserializeOwned,
    S: ArtifactStore + ?Sized,
{
    let data = store.read(path).await?;
    Ok(serde_json::from_slice(&data)?)
}
