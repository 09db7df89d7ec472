use std::path::PathBuf;

use anyhow::Context;
use clap::Clap;
use sandbox_apis::{
    rest::{ExecuteRequest, ExecuteResponse},
    status_codes,
};

/// Command-line sandbox client
#[derive(Clap)]
struct Args {
    /// Name of the toolchain to use
    #[clap(long, short = 'l')]
    language: String,
    /// Path to the submission source file
    #[clap(long, short = 's')]
    source: PathBuf,
    /// Test input; may be repeated, the submission is run once per occurrence
    #[clap(long = "input", short = 'i')]
    inputs: Vec<String>,
    /// Sandbox API endpoint, e.g. http://localhost:8080
    #[clap(long, short = 'a')]
    api: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Args = Clap::parse();
    let source = tokio::fs::read_to_string(&args.source)
        .await
        .context("failed to read submission source")?;
    let req = ExecuteRequest {
        language: args.language.clone(),
        source,
        inputs: args.inputs.clone(),
    };
    let client = reqwest::Client::new();
    let resp: ExecuteResponse = client
        .post(format!("{}/executeCode", args.api))
        .json(&req)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    match resp.status {
        status_codes::SUCCESS => println!("Accepted"),
        status_codes::SANDBOX_ERROR => println!("Sandbox error"),
        status_codes::RUNTIME_ERROR => println!("Rejected"),
        other => println!("Unknown status code: {}", other),
    }
    for (test, output) in resp.outputs.iter().enumerate() {
        println!("--- test {} output ---", test + 1);
        println!("{}", output);
    }
    if let Some(message) = resp.message {
        println!("Message: {}", message);
    }
    println!("Time: {} ms", resp.judge_info.time);
    Ok(())
}
