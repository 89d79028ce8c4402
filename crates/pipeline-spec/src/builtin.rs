//! Built-in example pipelines
//!
//! The launcher generates three pipelines per build: a single-step intro,
//! a multi-rank world-size check, and an advanced data-prep/train/serve
//! chain parameterized by the integration storage root.

use launch_core::BuildDescriptor;
use tracing::debug;

use crate::{PipelineSpec, StepSpec};

/// Output file name of the intro pipeline
pub const INTRO_PIPELINE_FILE: &str = "intro_pipeline.yaml";
/// Output file name of the dist pipeline
pub const DIST_PIPELINE_FILE: &str = "dist_pipeline.yaml";
/// Output file name of the advanced pipeline
pub const ADVANCED_PIPELINE_FILE: &str = "advanced_pipeline.yaml";

/// Rendezvous port used by the dist pipeline steps
const RENDEZVOUS_PORT: u16 = 29500;

/// Single-step smoke-test pipeline on the examples image
pub fn intro_pipeline(build: &BuildDescriptor) -> PipelineSpec {
    debug!(build_id = %build.id, "generating intro pipeline");

    PipelineSpec::new("intro")
        .description("Single-step smoke test for the examples image")
        .step(
            StepSpec::new("greet", &build.examples_image)
                .command(["sh", "-c"])
                .args([format!("echo intro pipeline for build {}", build.id)]),
        )
}

/// Multi-rank world-size verification pipeline
///
/// Spawns `world_size` concurrent `world-check` steps; rank 0 hosts the
/// rendezvous and every rank verifies the computed world size, so the
/// steps deliberately carry no dependencies between each other.
pub fn dist_pipeline(build: &BuildDescriptor, world_size: u32) -> PipelineSpec {
    debug!(build_id = %build.id, world_size, "generating dist pipeline");

    let master_host = "world-check-0";
    let mut spec = PipelineSpec::new("dist")
        .description("World-size verification across a rendezvous group")
        .parameter("world_size", world_size.to_string());

    for rank in 0..world_size {
        spec = spec.step(
            StepSpec::new(format!("world-check-{}", rank), &build.launcher_image)
                .command(["world-check"])
                .env("RANK", rank.to_string())
                .env("WORLD_SIZE", world_size.to_string())
                .env("MASTER_ADDR", master_host)
                .env("MASTER_PORT", RENDEZVOUS_PORT.to_string()),
        );
    }

    spec
}

/// Data-prep, train, and serve chain over the integration storage root
///
/// Derives per-build `data/`, `output/`, and `logs/` paths under
/// `<storage_root>/<build-id>/` so concurrent launches never collide.
pub fn advanced_pipeline(build: &BuildDescriptor, storage_root: &str) -> PipelineSpec {
    debug!(build_id = %build.id, storage_root, "generating advanced pipeline");

    let root = format!("{}/{}", storage_root.trim_end_matches('/'), build.id);
    let data_path = format!("{}/data", root);
    let output_path = format!("{}/output", root);
    let log_path = format!("{}/logs", root);
    let model_name = format!("tiny-image-net-{}", build.id);

    PipelineSpec::new("advanced")
        .description("Data-prep, train, and serve chain")
        .parameter("data_path", &data_path)
        .parameter("output_path", &output_path)
        .parameter("log_path", &log_path)
        .parameter("model_name", &model_name)
        .step(
            StepSpec::new("data-prep", &build.examples_image)
                .command(["datapreproc"])
                .args(["--output_path".to_string(), data_path.clone()]),
        )
        .step(
            StepSpec::new("train", &build.examples_image)
                .command(["trainer"])
                .args([
                    "--data_path".to_string(),
                    data_path,
                    "--output_path".to_string(),
                    output_path.clone(),
                    "--log_path".to_string(),
                    log_path,
                ])
                .after("data-prep"),
        )
        .step(
            StepSpec::new("serve", &build.launcher_image)
                .command(["serve"])
                .args([
                    "--model_path".to_string(),
                    output_path,
                    "--model_name".to_string(),
                    model_name,
                ])
                .after("train"),
        )
}
