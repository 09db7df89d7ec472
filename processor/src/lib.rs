//! Processor is the part of the sandbox that turns a single submission into a
//! verdict (and it doesn't care where the submission came from).

mod compile;
mod exec_test;
pub mod fake;
pub mod runner;
pub mod workspace;

use crate::{
    runner::OutcomeKind,
    workspace::Workspace,
};
use anyhow::Context;
use serde::Serialize;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use uuid::Uuid;

/// Single judging request
#[derive(Debug, Clone)]
pub struct Submission {
    /// Toolchain name (will be passed to toolchain loader)
    pub language: String,
    /// Submitted source text
    pub source: String,
    /// Ordered test inputs; the artifact is run once per entry
    pub inputs: Vec<String>,
}

/// Overall classification of a judged submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum Status {
    /// Compiled and every run completed.
    Success,
    /// A build command exited nonzero, emitted diagnostics, or timed out.
    CompileError,
    /// A run exited nonzero, wrote to stderr, or timed out.
    RuntimeError,
    /// The sandbox itself failed: unknown toolchain, spawn refusal,
    /// filesystem trouble. Not the submission's fault.
    SandboxError,
}

/// Aggregate over one submission. This is always produced: judging failures
/// are encoded in `status`, never surfaced as errors.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub status: Status,
    /// Captured stdout per completed run, in input order. Ends before the
    /// failing run when short-circuited.
    pub outputs: Vec<String>,
    /// Diagnostics for non-successful verdicts
    pub message: Option<String>,
    /// Maximum wall time across executed runs
    #[serde(serialize_with = "serialize_millis")]
    pub time: Duration,
}

impl Verdict {
    fn sandbox_error(message: String) -> Verdict {
        Verdict {
            status: Status::SandboxError,
            outputs: Vec::new(),
            message: Some(message),
            time: Duration::ZERO,
        }
    }
}

/// Settings are global rather than come from a request.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Every workspace is a uuid-named subdirectory of this root.
    pub workspaces_root: PathBuf,
    /// Wall-clock budget for one build command.
    pub compile_time_limit: Duration,
    /// Wall-clock budget for one test run.
    pub run_time_limit: Duration,
    /// ${verdict_dump_dir}/${workspace_id}.json will contain the verdict,
    /// for debugging.
    pub verdict_dump_dir: Option<PathBuf>,
}

/// The judging pipeline: resolves the toolchain, sets up a workspace, builds,
/// runs every input, aggregates, and always tears the workspace down.
#[derive(Clone)]
pub struct Pipeline {
    toolchains: Arc<toolchain_loader::ToolchainLoader>,
    settings: Settings,
}

impl Pipeline {
    pub fn new(toolchains: Arc<toolchain_loader::ToolchainLoader>, settings: Settings) -> Pipeline {
        Pipeline {
            toolchains,
            settings,
        }
    }

    /// Judges one submission. Infallible by design: every failure category
    /// maps to a verdict status, and the workspace is removed on every path.
    #[tracing::instrument(skip(self, submission), fields(language = %submission.language))]
    pub async fn judge(&self, submission: &Submission) -> Verdict {
        tracing::info!("loading toolchain");
        let toolchain = match self.toolchains.resolve(&submission.language).await {
            Ok(toolchain) => toolchain,
            Err(err) => {
                tracing::warn!(err = %format_args!("{:#}", err), "failed to find toolchain");
                return Verdict::sandbox_error(format!("{:#}", err));
            }
        };
        let workspace = match Workspace::create(
            &self.settings.workspaces_root,
            &toolchain.filename,
            &submission.source,
        )
        .await
        {
            Ok(workspace) => workspace,
            Err(err) => {
                tracing::warn!(err = %format_args!("{:#}", err), "failed to set up workspace");
                return Verdict::sandbox_error(format!("{:#}", err));
            }
        };
        let workspace_id = workspace.id();
        let verdict = self.run_stages(submission, &toolchain, &workspace).await;
        workspace.destroy().await;
        tracing::info!(status = %verdict.status, "judged");
        if let Some(dir) = &self.settings.verdict_dump_dir {
            if let Err(err) = dump_verdict(dir, workspace_id, &verdict).await {
                tracing::warn!("failed to save debug dump of the verdict: {:#}", err);
            }
        }
        verdict
    }

    async fn run_stages(
        &self,
        submission: &Submission,
        toolchain: &toolchain_loader::ToolchainSpec,
        workspace: &Workspace,
    ) -> Verdict {
        if !toolchain.build_commands.is_empty() {
            tracing::info!("compiling");
            let outcome = compile::compile(toolchain, workspace, &self.settings).await;
            match outcome.kind {
                OutcomeKind::Completed => {}
                OutcomeKind::SpawnFailure => {
                    return Verdict::sandbox_error(outcome.error_message());
                }
                OutcomeKind::NonZeroExit | OutcomeKind::TimedOut => {
                    tracing::info!("compilation failed");
                    return Verdict {
                        status: Status::CompileError,
                        outputs: Vec::new(),
                        message: Some(outcome.error_message()),
                        time: Duration::ZERO,
                    };
                }
            }
        }
        tracing::info!("running tests");
        let mut outputs = Vec::with_capacity(submission.inputs.len());
        let mut judged_time = Duration::ZERO;
        for (test, input) in submission.inputs.iter().enumerate() {
            let outcome = exec_test::exec(toolchain, workspace, input, &self.settings).await;
            judged_time = judged_time.max(outcome.elapsed);
            match outcome.kind {
                OutcomeKind::Completed => outputs.push(trim_output(&outcome.stdout)),
                OutcomeKind::SpawnFailure => {
                    tracing::warn!(test, "runtime could not be spawned");
                    return Verdict {
                        status: Status::SandboxError,
                        outputs,
                        message: Some(outcome.error_message()),
                        time: judged_time,
                    };
                }
                OutcomeKind::NonZeroExit | OutcomeKind::TimedOut => {
                    tracing::info!(test, kind = %outcome.kind, "run failed, skipping remaining tests");
                    return Verdict {
                        status: Status::RuntimeError,
                        outputs,
                        message: Some(outcome.error_message()),
                        time: judged_time,
                    };
                }
            }
        }
        Verdict {
            status: Status::Success,
            outputs,
            message: None,
            time: judged_time,
        }
    }
}

/// Captured stdout is returned without its trailing newline, the way
/// line-oriented tooling produced it.
fn trim_output(stdout: &str) -> String {
    stdout
        .trim_end_matches(|c| c == '\n' || c == '\r')
        .to_string()
}

fn serialize_millis<S>(time: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(time.as_millis() as u64)
}

async fn dump_verdict(dir: &Path, workspace_id: Uuid, verdict: &Verdict) -> anyhow::Result<()> {
    let data = serde_json::to_vec_pretty(verdict).context("failed to serialize verdict")?;
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create dump dir {}", dir.display()))?;
    let dest = dir.join(format!("{}.json", workspace_id.to_hyphenated()));
    tokio::fs::write(&dest, data)
        .await
        .with_context(|| format!("failed to write verdict to {}", dest.display()))?;
    Ok(())
}
