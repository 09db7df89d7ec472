//! Per-submission workspaces: the only filesystem area a submission touches.
use anyhow::Context;
use std::path::{Path, PathBuf};
use toolchain_loader::ToolchainSpec;
use uuid::Uuid;

/// Ephemeral directory owning one submission's source file and build
/// artifacts. Its uuid name is what keeps concurrent submissions apart; no
/// locking happens across submissions.
pub struct Workspace {
    id: Uuid,
    dir: PathBuf,
    source_path: PathBuf,
    removed: bool,
}

impl Workspace {
    /// Allocates a fresh uniquely-named directory under `root` (creating
    /// `root` if absent) and writes `source` into it as `filename`.
    pub async fn create(root: &Path, filename: &str, source: &str) -> anyhow::Result<Workspace> {
        tokio::fs::create_dir_all(root)
            .await
            .with_context(|| format!("failed to create workspaces root {}", root.display()))?;
        let id = Uuid::new_v4();
        let dir = root.join(id.to_hyphenated().to_string());
        tokio::fs::create_dir(&dir)
            .await
            .with_context(|| format!("failed to create workspace {}", dir.display()))?;
        let source_path = dir.join(filename);
        if let Err(err) = tokio::fs::write(&source_path, source).await {
            // no Workspace value exists yet to remove the directory later
            let _ = tokio::fs::remove_dir_all(&dir).await;
            return Err(err)
                .with_context(|| format!("failed to write source file {}", source_path.display()));
        }
        tracing::debug!(workspace = %id.to_hyphenated(), "created workspace");
        Ok(Workspace {
            id,
            dir,
            source_path,
            removed: false,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Substitution pairs for rendering this workspace's command templates.
    pub fn substitutions(&self, toolchain: &ToolchainSpec) -> Vec<(&'static str, String)> {
        vec![
            (
                toolchain_loader::SOURCE_VAR,
                self.source_path.display().to_string(),
            ),
            (
                toolchain_loader::ARTIFACT_VAR,
                self.dir.join(&toolchain.artifact).display().to_string(),
            ),
            (
                toolchain_loader::WORKSPACE_VAR,
                self.dir.display().to_string(),
            ),
        ]
    }

    /// Recursively removes the directory. A failed removal is logged and
    /// swallowed; a stale directory must never fail the verdict.
    pub async fn destroy(mut self) {
        self.removed = true;
        if let Err(err) = tokio::fs::remove_dir_all(&self.dir).await {
            tracing::warn!(
                workspace = %self.id.to_hyphenated(),
                error = %err,
                "failed to remove workspace directory"
            );
        } else {
            tracing::debug!(workspace = %self.id.to_hyphenated(), "removed workspace");
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        // destroy() is the normal path; this covers futures dropped
        // mid-judging.
        if !self.removed {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }
}
