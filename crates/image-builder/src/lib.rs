//! Image Builder - Canary container images for the launch toolkit
//!
//! Shells out to the container CLI (`docker` by default) to build the
//! launcher and examples images, re-tag them with per-build canary tags,
//! and push them to the configured registry.

mod builder;
mod tags;

pub use builder::{BuildContexts, ImageBuilder};
pub use tags::{canary_tag, local_tag, ImageRole};
