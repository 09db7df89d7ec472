mod rest;

use anyhow::Context;
use clap::Clap;
use std::{path::PathBuf, sync::Arc, time::Duration};

#[derive(Clap)]
struct Args {
    /// Port that the sandbox should listen
    #[clap(long, default_value = "8080")]
    port: u16,
    /// Directory containing toolchain manifests
    #[clap(long, default_value = "toolchains")]
    toolchains: PathBuf,
    /// Directory that submission workspaces are created under
    #[clap(long, default_value = "/tmp/sandbox-workspaces")]
    workspaces: PathBuf,
    /// Wall-clock limit for one build command, in milliseconds
    #[clap(long, default_value = "10000")]
    compile_time_limit: u64,
    /// Wall-clock limit for one test run, in milliseconds
    #[clap(long, default_value = "5000")]
    run_time_limit: u64,
    /// If set, every verdict is additionally written to this directory as json
    #[clap(long)]
    verdict_dump_dir: Option<PathBuf>,
    /// Generate deterministic fake verdicts instead of running submissions
    #[clap(long)]
    fake: bool,
}

async fn create_judge(args: &Args) -> anyhow::Result<rest::Judge> {
    if args.fake {
        return Ok(rest::Judge::Fake(processor::fake::FakeSettings {}));
    }
    let toolchains = toolchain_loader::ToolchainLoader::new(&args.toolchains)
        .await
        .context("failed to initialize toolchain loader")?;
    let settings = processor::Settings {
        workspaces_root: args.workspaces.clone(),
        compile_time_limit: Duration::from_millis(args.compile_time_limit),
        run_time_limit: Duration::from_millis(args.run_time_limit),
        verdict_dump_dir: args.verdict_dump_dir.clone(),
    };
    Ok(rest::Judge::Native(processor::Pipeline::new(
        Arc::new(toolchains),
        settings,
    )))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let args: Args = Clap::parse();
    let judge = create_judge(&args)
        .await
        .context("failed to initialize judge")?;
    tracing::info!("Running REST API");
    let cfg = rest::RestConfig { port: args.port };
    rest::serve(cfg, judge).await?;
    Ok(())
}
