//! Cluster Client - HTTP access to the pipeline-execution cluster
//!
//! The cluster is an external collaborator: this crate logs in through its
//! form login (capturing the session cookie), submits rendered pipeline
//! definitions as runs, and polls runs until they reach a terminal state.

mod client;

pub use client::{ClusterClient, SESSION_COOKIE};
