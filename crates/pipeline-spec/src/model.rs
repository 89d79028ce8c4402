//! Pipeline-definition model

use launch_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// A pipeline definition as submitted to the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Pipeline name
    pub name: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Pipeline-level parameters, surfaced in the cluster UI
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<PipelineParameter>,

    /// Steps in submission order
    pub steps: Vec<StepSpec>,
}

/// A named pipeline parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineParameter {
    /// Parameter name
    pub name: String,

    /// Rendered value
    pub value: String,
}

/// One containerized step of a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSpec {
    /// Step name, unique within the pipeline
    pub name: String,

    /// Container image reference
    pub image: String,

    /// Entry command
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    /// Command arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Environment variables (sorted for stable rendering)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Names of steps that must complete before this one starts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl StepSpec {
    /// Create a step running `command` on `image`
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            command: Vec::new(),
            args: Vec::new(),
            env: BTreeMap::new(),
            dependencies: Vec::new(),
        }
    }

    /// Set the entry command
    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Set the command arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add one environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Add a dependency on an earlier step
    pub fn after(mut self, step: impl Into<String>) -> Self {
        self.dependencies.push(step.into());
        self
    }
}

impl PipelineSpec {
    /// Create an empty pipeline
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a pipeline parameter
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push(PipelineParameter {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Append a step
    pub fn step(mut self, step: StepSpec) -> Self {
        self.steps.push(step);
        self
    }

    /// Validate step naming and dependency ordering
    ///
    /// Every step name must be unique and every dependency must name a step
    /// that appears earlier in the pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(Error::InvalidConfig {
                message: format!("pipeline {} has no steps", self.name),
            });
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.name.as_str()) {
                return Err(Error::InvalidConfig {
                    message: format!("duplicate step name {} in pipeline {}", step.name, self.name),
                });
            }

            for dep in &step.dependencies {
                // `seen` holds only earlier steps, so this also rejects
                // self-dependencies and forward references.
                if dep == &step.name || !seen.contains(dep.as_str()) {
                    return Err(Error::InvalidConfig {
                        message: format!(
                            "step {} depends on {} which is not an earlier step",
                            step.name, dep
                        ),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Validate and render a pipeline definition to YAML
pub fn render_yaml(spec: &PipelineSpec) -> Result<String> {
    spec.validate()?;
    Ok(serde_yaml::to_string(spec)?)
}

/// Parse a pipeline definition back from YAML
pub fn parse_yaml(yaml: &str) -> Result<PipelineSpec> {
    Ok(serde_yaml::from_str(yaml)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_step_pipeline() -> PipelineSpec {
        PipelineSpec::new("sample")
            .step(StepSpec::new("prep", "img:a").command(["sh", "-c"]).args(["true"]))
            .step(StepSpec::new("train", "img:b").after("prep"))
    }

    #[test]
    fn test_validate_ok() {
        assert!(two_step_pipeline().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty() {
        let spec = PipelineSpec::new("empty");
        assert!(matches!(
            spec.validate(),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let spec = PipelineSpec::new("dup")
            .step(StepSpec::new("a", "img"))
            .step(StepSpec::new("a", "img"));
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_forward_dependency() {
        let spec = PipelineSpec::new("fwd")
            .step(StepSpec::new("a", "img").after("b"))
            .step(StepSpec::new("b", "img"));
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_self_dependency() {
        let spec = PipelineSpec::new("own").step(StepSpec::new("a", "img").after("a"));
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let spec = two_step_pipeline();
        let yaml = render_yaml(&spec).unwrap();
        assert_eq!(parse_yaml(&yaml).unwrap(), spec);
    }

    #[test]
    fn test_yaml_omits_empty_sections() {
        let spec = PipelineSpec::new("lean").step(StepSpec::new("only", "img"));
        let yaml = render_yaml(&spec).unwrap();
        assert!(!yaml.contains("dependencies"));
        assert!(!yaml.contains("parameters"));
        assert!(!yaml.contains("env"));
    }
}
