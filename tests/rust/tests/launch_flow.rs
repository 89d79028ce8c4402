//! End-to-end launch flow tests
//!
//! Runs the launcher flow in `--load` mode against a previously persisted
//! build descriptor and a mock cluster, so no container runtime is needed.

mod common;

use anyhow::Result;
use artifact_store::{write_json, LocalArtifacts};
use launch_core::{BuildDescriptor, BUILD_META_FILE};
use launcher::LaunchArgs;

use common::MockCluster;

fn export_cluster_env(base_url: &str) {
    std::env::set_var("GANTRY_HOST", base_url);
    std::env::set_var("GANTRY_USERNAME", "tester");
    std::env::set_var("GANTRY_PASSWORD", "secret");
    std::env::set_var("GANTRY_NAMESPACE", "integration");
    std::env::set_var("GANTRY_STORAGE", "s3://bucket/integration");
}

async fn persist_build(dir: &std::path::Path) -> Result<BuildDescriptor> {
    let store = LocalArtifacts::new(dir);
    let build = BuildDescriptor::new(
        "repo:canary_ci_1_launcher",
        "repo:canary_ci_1_examples",
    );
    write_json(&store, BUILD_META_FILE, &build).await?;
    Ok(build)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_load_generate_submit_wait() -> Result<()> {
    let mock = MockCluster::spawn().await?;
    let dir = tempfile::tempdir()?;
    let build = persist_build(dir.path()).await?;
    export_cluster_env(&mock.base_url);

    let args = LaunchArgs {
        path: Some(dir.path().to_path_buf()),
        load: true,
        save: false,
        world_size: 3,
    };
    launcher::run(&args).await?;

    // All three pipelines were submitted, run names embed the build id
    let submitted = mock.submitted();
    assert_eq!(submitted.len(), 3);
    for body in &submitted {
        let name = body["name"].as_str().unwrap();
        assert!(name.contains(&build.id), "run name: {}", name);
        assert_eq!(body["namespace"], "integration");
    }

    // Pipeline files were persisted next to the descriptor
    for file in [
        "intro_pipeline.yaml",
        "dist_pipeline.yaml",
        "advanced_pipeline.yaml",
    ] {
        assert!(dir.path().join(file).exists(), "missing {}", file);
    }

    // The dist pipeline carries the requested world size
    let dist =
        pipeline_spec::parse_yaml(&std::fs::read_to_string(dir.path().join("dist_pipeline.yaml"))?)?;
    assert_eq!(dist.steps.len(), 3);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_load_with_save_skips_submission() -> Result<()> {
    // Save mode exits before login, so no cluster (or cluster env) is needed
    let dir = tempfile::tempdir()?;
    persist_build(dir.path()).await?;

    let args = LaunchArgs {
        path: Some(dir.path().to_path_buf()),
        load: true,
        save: true,
        world_size: 2,
    };
    launcher::run(&args).await?;

    assert!(dir.path().join("advanced_pipeline.yaml").exists());
    assert!(dir.path().join(BUILD_META_FILE).exists());
    Ok(())
}

#[tokio::test]
async fn test_load_without_descriptor_fails() -> Result<()> {
    let dir = tempfile::tempdir()?;

    let args = LaunchArgs {
        path: Some(dir.path().to_path_buf()),
        load: true,
        save: true,
        world_size: 2,
    };
    let result = launcher::run(&args).await;

    assert!(matches!(
        result,
        Err(launch_core::Error::ArtifactNotFound { .. })
    ));
    Ok(())
}
