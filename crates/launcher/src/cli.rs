//! Command-line arguments

use clap::Parser;
use std::path::PathBuf;

/// Build, publish, and launch the integration pipelines
#[derive(Parser, Debug, Clone)]
#[command(name = "gantry", version, about)]
pub struct LaunchArgs {
    /// Directory the build descriptor and pipeline files land in
    /// (a temporary directory is used when omitted)
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Reuse the build descriptor persisted at the path instead of building
    #[arg(long)]
    pub load: bool,

    /// Persist the build and generated files, then exit without submitting
    #[arg(long)]
    pub save: bool,

    /// Number of ranks in the dist pipeline
    #[arg(long, default_value_t = 2)]
    pub world_size: u32,
}
