use crate::{
    runner::{self, CommandSpec, Outcome, OutcomeKind},
    workspace::Workspace,
    Settings,
};
use std::time::Duration;
use toolchain_loader::ToolchainSpec;

/// Runs the built artifact on one test input.
///
/// The input travels as one trailing argv element, never through a shell.
// TODO: let a toolchain opt into receiving the input on stdin instead, for
// interactive runtimes; CommandSpec::stdin is the seam.
pub(crate) async fn exec(
    toolchain: &ToolchainSpec,
    workspace: &Workspace,
    input: &str,
    settings: &Settings,
) -> Outcome {
    let vars = workspace.substitutions(toolchain);
    let mut argv = toolchain.run_command.render_argv(&vars).into_iter();
    let program = match argv.next() {
        Some(program) => program,
        None => {
            return Outcome {
                kind: OutcomeKind::SpawnFailure,
                stdout: String::new(),
                stderr: "run command is empty".to_string(),
                exit_code: None,
                elapsed: Duration::ZERO,
            }
        }
    };
    let mut args: Vec<String> = argv.collect();
    args.push(input.to_string());
    let mut spec = CommandSpec::new(program, args, settings.run_time_limit);
    spec.env = toolchain
        .run_command
        .env
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    spec.current_dir = Some(workspace.dir().to_path_buf());
    runner::run(&spec).await
}
