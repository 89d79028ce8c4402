//! Pipeline Spec - Typed pipeline definitions for the launch toolkit
//!
//! Models the pipeline-definition files the external cluster consumes and
//! generates the three built-in example pipelines (intro, dist, advanced)
//! from a build descriptor. Definitions are rendered to YAML.

mod builtin;
mod model;

pub use builtin::{
    advanced_pipeline, dist_pipeline, intro_pipeline, ADVANCED_PIPELINE_FILE, DIST_PIPELINE_FILE,
    INTRO_PIPELINE_FILE,
};
pub use model::{parse_yaml, render_yaml, PipelineParameter, PipelineSpec, StepSpec};
