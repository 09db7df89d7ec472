use crate::{
    runner::{self, CommandSpec, Outcome, OutcomeKind},
    workspace::Workspace,
    Settings,
};
use std::time::Duration;
use toolchain_loader::ToolchainSpec;

/// Runs the toolchain's build commands in the workspace, in order. The first
/// step that does not complete aborts the build and becomes the build's
/// outcome; nothing is executed after a failed build.
pub(crate) async fn compile(
    toolchain: &ToolchainSpec,
    workspace: &Workspace,
    settings: &Settings,
) -> Outcome {
    let vars = workspace.substitutions(toolchain);
    let mut last = Outcome {
        kind: OutcomeKind::Completed,
        stdout: String::new(),
        stderr: String::new(),
        exit_code: Some(0),
        elapsed: Duration::ZERO,
    };
    for (step, command) in toolchain.build_commands.iter().enumerate() {
        let mut argv = command.render_argv(&vars).into_iter();
        let program = match argv.next() {
            Some(program) => program,
            None => {
                return Outcome {
                    kind: OutcomeKind::SpawnFailure,
                    stdout: String::new(),
                    stderr: format!("build step {} has an empty command", step),
                    exit_code: None,
                    elapsed: Duration::ZERO,
                }
            }
        };
        let mut spec = CommandSpec::new(program, argv.collect(), settings.compile_time_limit);
        spec.env = command
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        spec.current_dir = Some(workspace.dir().to_path_buf());
        let outcome = runner::run(&spec).await;
        if outcome.kind != OutcomeKind::Completed {
            tracing::info!(step, kind = %outcome.kind, "build step failed");
            return outcome;
        }
        last = outcome;
    }
    last
}
