//! Launcher - The Gantry CLI flow
//!
//! Wires the toolkit together: build canary images, push them, generate
//! and persist the pipeline files, submit them to the cluster, and wait
//! for every run to succeed.

pub mod cli;
pub mod flow;

pub use cli::LaunchArgs;
pub use flow::run;
