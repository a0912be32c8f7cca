//! Configuration types deserialized from `vlab.toml`.

use serde::Deserialize;

/// The top-level project configuration parsed from `vlab.toml`.
///
/// Carries project metadata, the root module name, and the elaboration
/// environment flags (§6's environment inputs).
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata (name, version, top module).
    pub project: ProjectMeta,
    /// Elaboration environment flags (§6's environment inputs).
    #[serde(default)]
    pub flags: crate::flags::CompilerFlags,
}

/// Core project metadata required in every `vlab.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// The project version string.
    pub version: String,
    /// A brief description of the project.
    #[serde(default)]
    pub description: String,
    /// List of project authors.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Name of the root module to elaborate.
    pub top: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn parses_minimal_project() {
        let toml = r#"
[project]
name = "counter"
version = "0.1.0"
top = "counter"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.name, "counter");
        assert_eq!(config.project.top, "counter");
    }

    #[test]
    fn authors_default_empty() {
        let toml = r#"
[project]
name = "counter"
version = "0.1.0"
top = "counter"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert!(config.project.authors.is_empty());
    }
}
