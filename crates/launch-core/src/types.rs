//! Core type definitions for the launch toolkit

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier types
pub type BuildId = String;
pub type RunId = String;
pub type PipelineName = String;

/// File name of the persisted build descriptor inside the output directory
pub const BUILD_META_FILE: &str = "meta.json";

/// Descriptor for one canary image build
///
/// Persisted as a flat JSON object so a later invocation can reuse the
/// build (`--load`) instead of rebuilding. Created once per launcher run
/// and read at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDescriptor {
    /// Unique build identifier (`<user>_<hex>`)
    pub id: BuildId,

    /// Launcher runtime image reference
    pub launcher_image: String,

    /// Examples bundle image reference
    pub examples_image: String,

    /// Timestamp when the build was created
    pub created_at: DateTime<Utc>,
}

impl BuildDescriptor {
    /// Create a descriptor for freshly built local images
    pub fn new(launcher_image: impl Into<String>, examples_image: impl Into<String>) -> Self {
        Self {
            id: new_build_id(),
            launcher_image: launcher_image.into(),
            examples_image: examples_image.into(),
            created_at: Utc::now(),
        }
    }
}

/// Generate a build id of the form `<user>_<16 hex chars>`
fn new_build_id() -> BuildId {
    let user = std::env::var("USER")
        .ok()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "ci".to_string());
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}", user, &suffix[..16])
}

/// Status reported by the cluster for a submitted run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RunStatus {
    /// Run accepted but not started
    Pending,

    /// Run is executing
    Running,

    /// Run finished successfully
    Succeeded,

    /// Run finished with a step failure
    Failed,

    /// Run aborted with an infrastructure error
    Error,

    /// Run was skipped by the cluster
    Skipped,
}

impl RunStatus {
    /// Parse a cluster-reported status string; unknown states map to Pending
    pub fn parse(s: &str) -> Self {
        match s {
            "Running" => RunStatus::Running,
            "Succeeded" => RunStatus::Succeeded,
            "Failed" => RunStatus::Failed,
            "Error" => RunStatus::Error,
            "Skipped" => RunStatus::Skipped,
            _ => RunStatus::Pending,
        }
    }

    /// Returns true if the run can no longer change state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Succeeded | RunStatus::Failed | RunStatus::Error | RunStatus::Skipped
        )
    }

    /// Returns true for the one acceptable terminal state
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Succeeded)
    }

    /// Status string as the cluster reports it
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "Pending",
            RunStatus::Running => "Running",
            RunStatus::Succeeded => "Succeeded",
            RunStatus::Failed => "Failed",
            RunStatus::Error => "Error",
            RunStatus::Skipped => "Skipped",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of one submitted pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Cluster-assigned run identifier
    pub run_id: RunId,

    /// Pipeline file the run was created from
    pub pipeline: PipelineName,

    /// Last observed status
    pub status: RunStatus,

    /// Timestamp when the run was submitted
    pub submitted_at: DateTime<Utc>,

    /// Timestamp when a terminal status was observed
    pub finished_at: Option<DateTime<Utc>>,

    /// Cluster UI URL for the run
    pub ui_url: String,
}
