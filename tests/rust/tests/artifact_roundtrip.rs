//! Artifact persistence round trips
//!
//! The save/load contract of the launcher: a descriptor and rendered
//! pipeline files written by one invocation are readable by the next.

use anyhow::Result;
use artifact_store::{read_json, write_json, ArtifactStore, LocalArtifacts};
use bytes::Bytes;
use launch_core::{BuildDescriptor, BUILD_META_FILE};
use pipeline_spec::{intro_pipeline, parse_yaml, render_yaml, INTRO_PIPELINE_FILE};

#[tokio::test]
async fn test_descriptor_save_then_load() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = LocalArtifacts::new(dir.path());

    let build = BuildDescriptor::new("repo:canary_u_9_launcher", "repo:canary_u_9_examples");
    write_json(&store, BUILD_META_FILE, &build).await?;

    let loaded: BuildDescriptor = read_json(&store, BUILD_META_FILE).await?;
    assert_eq!(loaded, build);
    Ok(())
}

#[tokio::test]
async fn test_descriptor_is_flat_json() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = LocalArtifacts::new(dir.path());

    let build = BuildDescriptor::new("launcher-img", "examples-img");
    write_json(&store, BUILD_META_FILE, &build).await?;

    let raw = store.read(BUILD_META_FILE).await?;
    let value: serde_json::Value = serde_json::from_slice(&raw)?;
    let object = value.as_object().unwrap();
    assert!(object.contains_key("id"));
    assert!(object.contains_key("launcher_image"));
    assert!(object.contains_key("examples_image"));
    // Flat key-value data: no nested objects
    assert!(object.values().all(|v| !v.is_object() && !v.is_array()));
    Ok(())
}

#[tokio::test]
async fn test_rendered_pipeline_roundtrip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = LocalArtifacts::new(dir.path());

    let build = BuildDescriptor::new("launcher-img", "examples-img");
    let spec = intro_pipeline(&build);
    let yaml = render_yaml(&spec)?;
    store
        .write(INTRO_PIPELINE_FILE, Bytes::from(yaml.clone()))
        .await?;

    let stored = store.read(INTRO_PIPELINE_FILE).await?;
    let parsed = parse_yaml(std::str::from_utf8(&stored)?)?;
    assert_eq!(parsed, spec);

    let listed = store.list("").await?;
    assert_eq!(listed, vec![INTRO_PIPELINE_FILE.to_string()]);
    Ok(())
}
