//! Loading of toolchain manifests that describe how a language is built and run.
use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

/// Placeholder replaced with the absolute path of the submitted source file.
pub const SOURCE_VAR: &str = "{source}";
/// Placeholder replaced with the absolute path of the build artifact.
pub const ARTIFACT_VAR: &str = "{artifact}";
/// Placeholder replaced with the absolute path of the workspace directory.
pub const WORKSPACE_VAR: &str = "{workspace}";

/// `manifest.yaml` representation
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ToolchainSpec {
    /// Human-readable
    pub title: String,

    /// Machine-readable
    pub name: String,

    /// Fixed filename the submitted source is written under
    pub filename: String,

    /// Name of the build artifact inside the workspace
    #[serde(default = "ToolchainSpec::default_artifact")]
    pub artifact: String,

    /// Build steps, in order. Empty for interpreted toolchains; the compile
    /// stage is skipped then.
    #[serde(rename = "build", default)]
    pub build_commands: Vec<CommandTemplate>,

    /// Command performing one test run
    #[serde(rename = "run")]
    pub run_command: CommandTemplate,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct CommandTemplate {
    pub argv: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl CommandTemplate {
    /// Expands placeholders in every argv element. Each element stays one
    /// discrete argument; the rendered argv is never joined into a shell
    /// string.
    pub fn render_argv(&self, vars: &[(&str, String)]) -> Vec<String> {
        self.argv
            .iter()
            .map(|arg| {
                let mut rendered = arg.clone();
                for (key, value) in vars {
                    rendered = rendered.replace(key, value);
                }
                rendered
            })
            .collect()
    }
}

impl ToolchainSpec {
    fn default_artifact() -> String {
        "Main".to_string()
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure_bare_filename(&self.filename).context("bad `filename` in manifest")?;
        ensure_bare_filename(&self.artifact).context("bad `artifact` in manifest")?;
        anyhow::ensure!(
            !self.run_command.argv.is_empty(),
            "run command has empty argv"
        );
        for (i, command) in self.build_commands.iter().enumerate() {
            anyhow::ensure!(!command.argv.is_empty(), "build command {} has empty argv", i);
        }
        Ok(())
    }
}

fn ensure_bare_filename(name: &str) -> anyhow::Result<()> {
    anyhow::ensure!(
        !name.is_empty() && !name.contains('/') && !name.contains('\\') && !name.starts_with('.'),
        "`{}` is not a bare filename",
        name
    );
    Ok(())
}

/// Toolchain names come straight from the wire, and they are used as a path
/// component, so anything that could traverse out of the toolchains dir is
/// refused up front.
fn validate_name(name: &str) -> anyhow::Result<()> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '+');
    anyhow::ensure!(ok, "invalid toolchain name `{}`", name);
    Ok(())
}

/// Responsible for fetching toolchains
pub struct ToolchainLoader {
    /// Directory containing toolchain definitions
    toolchains_dir: PathBuf,
}

impl ToolchainLoader {
    pub async fn new(toolchains_dir: &Path) -> anyhow::Result<ToolchainLoader> {
        Ok(ToolchainLoader {
            toolchains_dir: toolchains_dir.to_path_buf(),
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, toolchain_name: &str) -> anyhow::Result<ToolchainSpec> {
        validate_name(toolchain_name)?;
        let toolchain_dir_path = self.toolchains_dir.join(toolchain_name);

        let raw_spec = tokio::fs::read(toolchain_dir_path.join("manifest.yaml"))
            .await
            .with_context(|| format!("no manifest.yaml for toolchain `{}`", toolchain_name))?;
        let spec: ToolchainSpec =
            serde_yaml::from_slice(&raw_spec).context("invalid toolchain spec")?;
        spec.validate()
            .with_context(|| format!("bad toolchain spec `{}`", toolchain_name))?;
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
title: GNU C++
name: cpp
filename: main.cpp
build:
  - argv: ["g++", "-O2", "-o", "{artifact}", "{source}"]
run:
  argv: ["{artifact}"]
"#;

    #[test]
    fn render_argv_substitutes_every_placeholder() {
        let command = CommandTemplate {
            argv: vec![
                "g++".to_string(),
                "-o".to_string(),
                "{artifact}".to_string(),
                "{source}".to_string(),
            ],
            env: HashMap::new(),
        };
        let vars = [
            (SOURCE_VAR, "/ws/main.cpp".to_string()),
            (ARTIFACT_VAR, "/ws/Main".to_string()),
            (WORKSPACE_VAR, "/ws".to_string()),
        ];
        assert_eq!(
            command.render_argv(&vars),
            vec!["g++", "-o", "/ws/Main", "/ws/main.cpp"]
        );
    }

    #[test]
    fn manifest_parses_with_defaults() {
        let spec: ToolchainSpec = serde_yaml::from_str(MANIFEST).unwrap();
        assert_eq!(spec.name, "cpp");
        assert_eq!(spec.filename, "main.cpp");
        assert_eq!(spec.artifact, "Main");
        assert_eq!(spec.build_commands.len(), 1);
        assert!(spec.run_command.env.is_empty());
    }

    #[test]
    fn interpreted_manifest_has_no_build_commands() {
        let raw = r#"
title: Python 3
name: python
filename: main.py
run:
  argv: ["python3", "{source}"]
"#;
        let spec: ToolchainSpec = serde_yaml::from_str(raw).unwrap();
        assert!(spec.build_commands.is_empty());
    }

    #[test]
    fn traversal_names_are_refused() {
        assert!(validate_name("../evil").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("").is_err());
        assert!(validate_name("c..d").is_err());
        assert!(validate_name("c p p").is_err());
        assert!(validate_name("cpp").is_ok());
        assert!(validate_name("g++_10").is_ok());
    }

    #[test]
    fn specs_with_traversal_filenames_are_refused() {
        let raw = r#"
title: Evil
name: evil
filename: ../../../etc/passwd
run:
  argv: ["true"]
"#;
        let spec: ToolchainSpec = serde_yaml::from_str(raw).unwrap();
        assert!(spec.validate().is_err());
    }

    #[tokio::test]
    async fn resolve_reads_manifest_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("cpp")).await.unwrap();
        tokio::fs::write(dir.path().join("cpp/manifest.yaml"), MANIFEST)
            .await
            .unwrap();
        let loader = ToolchainLoader::new(dir.path()).await.unwrap();
        let spec = loader.resolve("cpp").await.unwrap();
        assert_eq!(spec.title, "GNU C++");
        assert!(loader.resolve("java").await.is_err());
    }
}
