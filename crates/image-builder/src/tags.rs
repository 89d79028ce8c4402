//! Image tag rendering
//!
//! Pure helpers so tag shapes are testable without a container runtime.

/// The two images every build produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
    /// The launcher runtime image (carries the `world-check` binary)
    Launcher,

    /// The examples bundle image
    Examples,
}

impl ImageRole {
    /// Role name as it appears in tags
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageRole::Launcher => "launcher",
            ImageRole::Examples => "examples",
        }
    }
}

/// Local tag an image gets right after `docker build`
pub fn local_tag(role: ImageRole) -> String {
    format!("gantry_{}_canary", role.as_str())
}

/// Registry tag an image gets before pushing
pub fn canary_tag(repo: &str, build_id: &str, role: ImageRole) -> String {
    format!("{}:canary_{}_{}", repo, build_id, role.as_str())
}
