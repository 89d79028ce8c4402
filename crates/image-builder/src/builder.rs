//! Container image build, tag, and push

use std::path::{Path, PathBuf};

use launch_core::{BuildDescriptor, Error, RegistryConfig, Result};
use tokio::process::Command;
use tracing::{debug, info};

use crate::tags::{canary_tag, local_tag, ImageRole};

/// Build contexts for the two canary images
///
/// The launcher image builds from the repository root (its Dockerfile
/// compiles the `gantry` and `world-check` binaries); the examples bundle
/// has its own self-contained context.
#[derive(Debug, Clone)]
pub struct BuildContexts {
    /// Context directory for the launcher image
    pub launcher: PathBuf,

    /// Context directory for the examples image
    pub examples: PathBuf,
}

impl Default for BuildContexts {
    fn default() -> Self {
        Self {
            launcher: PathBuf::from("."),
            examples: PathBuf::from("docker/examples"),
        }
    }
}

/// Canary image builder shelling out to the container CLI
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    /// Container CLI program (`docker` unless overridden)
    runtime: String,

    /// Build context directories
    contexts: BuildContexts,
}

impl Default for ImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBuilder {
    /// Create a builder using `docker` and the default contexts
    pub fn new() -> Self {
        Self {
            runtime: "docker".to_string(),
            contexts: BuildContexts::default(),
        }
    }

    /// Override the container CLI program (e.g. `podman`)
    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = runtime.into();
        self
    }

    /// Override the build context directories
    pub fn with_contexts(mut self, contexts: BuildContexts) -> Self {
        self.contexts = contexts;
        self
    }

    /// Verify the container runtime is available
    ///
    /// Keeps "runtime missing" distinct from build failures so the caller
    /// can report an actionable error before any work starts.
    pub async fn ensure_runtime(&self) -> Result<()> {
        let probe = Command::new(&self.runtime)
            .arg("--version")
            .output()
            .await
            .map_err(|_| Error::RuntimeNotFound {
                runtime: self.runtime.clone(),
            })?;

        if !probe.status.success() {
            return Err(Error::RuntimeNotFound {
                runtime: self.runtime.clone(),
            });
        }

        debug!(runtime = %self.runtime, "container runtime available");
        Ok(())
    }

    /// Build both canary images locally and return their descriptor
    pub async fn build_canaries(&self) -> Result<BuildDescriptor> {
        self.ensure_runtime().await?;

        let examples_tag = local_tag(ImageRole::Examples);
        info!(tag = %examples_tag, "building examples image");
        self.run(&build_args(&examples_tag, &self.contexts.examples))
            .await?;

        let launcher_tag = local_tag(ImageRole::Launcher);
        info!(tag = %launcher_tag, "building launcher image");
        self.run(&build_args(&launcher_tag, &self.contexts.launcher))
            .await?;

        let build = BuildDescriptor::new(launcher_tag, examples_tag);
        info!(build_id = %build.id, "images built");
        Ok(build)
    }

    /// Re-tag both images with registry canary tags and push them
    ///
    /// Updates the descriptor in place so the persisted metadata and the
    /// generated pipelines reference the pushed tags.
    pub async fn push(&self, registry: &RegistryConfig, build: &mut BuildDescriptor) -> Result<()> {
        let examples_tag = canary_tag(&registry.repo, &build.id, ImageRole::Examples);
        self.run(&tag_args(&build.examples_image, &examples_tag))
            .await?;
        build.examples_image = examples_tag;

        let launcher_tag = canary_tag(&registry.repo, &build.id, ImageRole::Launcher);
        self.run(&tag_args(&build.launcher_image, &launcher_tag))
            .await?;
        build.launcher_image = launcher_tag;

        info!(image = %build.examples_image, "pushing examples image");
        self.run(&push_args(&build.examples_image)).await?;

        info!(image = %build.launcher_image, "pushing launcher image");
        self.run(&push_args(&build.launcher_image)).await?;

        Ok(())
    }

    /// Run one container CLI invocation, failing with its stderr
    async fn run(&self, args: &[String]) -> Result<()> {
        let rendered = format!("{} {}", self.runtime, args.join(" "));
        debug!(command = %rendered, "running");

        let output = Command::new(&self.runtime).args(args).output().await?;

        if !output.status.success() {
            return Err(Error::CommandFailed {
                command: rendered,
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

/// Arguments for `docker build`
fn build_args(tag: &str, context: &Path) -> Vec<String> {
    vec![
        "build".to_string(),
        "-t".to_string(),
        tag.to_string(),
        context.to_string_lossy().to_string(),
    ]
}

/// Arguments for `docker tag`
fn tag_args(source: &str, target: &str) -> Vec<String> {
    vec!["tag".to_string(), source.to_string(), target.to_string()]
}

/// Arguments for `docker push`
fn push_args(tag: &str) -> Vec<String> {
    vec!["push".to_string(), tag.to_string()]
}
