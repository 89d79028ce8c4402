//! The launch flow: build → push → generate → persist → submit → wait

use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::Utc;
use tempfile::TempDir;
use tracing::{info, warn};

use artifact_store::{read_json, write_json, ArtifactStore, LocalArtifacts};
use cluster_client::ClusterClient;
use image_builder::ImageBuilder;
use launch_core::{
    BuildDescriptor, ClusterConfig, Error, LaunchConfig, RegistryConfig, Result, RunRecord,
    StorageConfig, BUILD_META_FILE,
};
use pipeline_spec::{
    advanced_pipeline, dist_pipeline, intro_pipeline, render_yaml, ADVANCED_PIPELINE_FILE,
    DIST_PIPELINE_FILE, INTRO_PIPELINE_FILE,
};

use crate::cli::LaunchArgs;

/// Experiment grouping submitted runs land under in the cluster UI
const EXPERIMENT: &str = "integration-tests";

/// Output directory: user-provided, or a temp dir kept alive for the run
enum OutputDir {
    Provided(PathBuf),
    Temp(TempDir),
}

impl OutputDir {
    fn resolve(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) => {
                std::fs::create_dir_all(&path)?;
                Ok(OutputDir::Provided(path))
            }
            None => Ok(OutputDir::Temp(TempDir::new()?)),
        }
    }

    fn path(&self) -> &Path {
        match self {
            OutputDir::Provided(path) => path,
            OutputDir::Temp(dir) => dir.path(),
        }
    }
}

/// Run the full launch flow
///
/// Missing registry configuration downgrades the run to build-only: the
/// images stay local, the pipeline files are still generated and
/// persisted, and nothing is submitted.
pub async fn run(args: &LaunchArgs) -> Result<()> {
    let output = OutputDir::resolve(args.path.clone())?;
    let store = LocalArtifacts::new(output.path());
    info!(path = %output.path().display(), "using output directory");

    let builder = ImageBuilder::new();
    let mut submit_enabled = true;

    let build = if args.load {
        let build: BuildDescriptor = read_json(&store, BUILD_META_FILE).await?;
        info!(build_id = %build.id, "loaded persisted build");
        build
    } else {
        let mut build = builder.build_canaries().await?;
        match RegistryConfig::from_env() {
            Ok(registry) => builder.push(&registry, &mut build).await?,
            Err(Error::MissingEnv { var }) => {
                warn!(missing = %var, "registry not configured, building only");
                submit_enabled = false;
            }
            Err(e) => return Err(e),
        }
        build
    };

    let config = LaunchConfig {
        storage: StorageConfig::from_env(),
        ..Default::default()
    };

    // Pipeline files and the descriptor are persisted even in build-only
    // mode, matching the save-on-the-way-out contract of the flow.
    let pipelines = [
        (INTRO_PIPELINE_FILE, intro_pipeline(&build)),
        (DIST_PIPELINE_FILE, dist_pipeline(&build, args.world_size)),
        (
            ADVANCED_PIPELINE_FILE,
            advanced_pipeline(&build, &config.storage.root),
        ),
    ];

    let mut rendered = Vec::new();
    for (file, spec) in &pipelines {
        let yaml = render_yaml(spec)?;
        store.write(file, Bytes::from(yaml.clone())).await?;
        rendered.push((*file, yaml));
    }
    write_json(&store, BUILD_META_FILE, &build).await?;
    info!(count = rendered.len(), "pipeline files generated");

    if args.save {
        info!(build_id = %build.id, "build saved, skipping submission");
        return Ok(());
    }
    if !submit_enabled {
        return Ok(());
    }

    let cluster = ClusterConfig::from_env()?;
    let client = ClusterClient::login(&cluster, config.poll, config.retry).await?;

    let mut records: Vec<RunRecord> = Vec::new();
    for (file, yaml) in &rendered {
        let run_name = format!("integration {} - {}", build.id, file);
        records.push(client.submit(file, yaml, &run_name, EXPERIMENT).await?);
    }

    for record in &mut records {
        record.status = client.wait(&record.run_id).await?;
        record.finished_at = Some(Utc::now());
    }

    info!(runs = records.len(), build_id = %build.id, "all runs succeeded");
    Ok(())
}
