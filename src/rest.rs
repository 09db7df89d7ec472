//! Sandbox REST api

use anyhow::Context;
use futures::future::FutureExt;
use processor::{fake::FakeSettings, Pipeline, Status, Submission, Verdict};
use sandbox_apis::{
    rest::{ExecuteRequest, ExecuteResponse, JudgeInfo},
    status_codes,
};
use std::{convert::Infallible, sync::Arc};
use tracing::Instrument;
use uuid::Uuid;
use warp::Filter;

pub struct RestConfig {
    pub port: u16,
}

/// How submissions get judged: the real pipeline, or the deterministic fake.
pub enum Judge {
    Native(Pipeline),
    Fake(FakeSettings),
}

impl Judge {
    async fn judge(&self, submission: &Submission) -> Verdict {
        match self {
            Judge::Native(pipeline) => pipeline.judge(submission).await,
            Judge::Fake(settings) => processor::fake::judge(submission, settings),
        }
    }
}

struct State {
    judge: Judge,
}

async fn execute_code(state: Arc<State>, req: ExecuteRequest) -> ExecuteResponse {
    let submission_id = Uuid::new_v4();
    let submission = Submission {
        language: req.language,
        source: req.source,
        inputs: req.inputs,
    };
    let verdict = state
        .judge
        .judge(&submission)
        .instrument(tracing::info_span!(
            "submission",
            id = %submission_id.to_hyphenated()
        ))
        .await;
    to_response(verdict)
}

fn to_response(verdict: Verdict) -> ExecuteResponse {
    ExecuteResponse {
        status: wire_status(verdict.status),
        outputs: verdict.outputs,
        message: verdict.message,
        judge_info: JudgeInfo {
            time: verdict.time.as_millis() as u64,
        },
    }
}

fn wire_status(status: Status) -> i32 {
    match status {
        Status::Success => status_codes::SUCCESS,
        Status::SandboxError => status_codes::SANDBOX_ERROR,
        // Compile errors are the submission's fault, same as runtime ones.
        Status::CompileError | Status::RuntimeError => status_codes::RUNTIME_ERROR,
    }
}

fn routes(
    state: Arc<State>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let route_execute_code = warp::post()
        .and(warp::path("executeCode"))
        .and(warp::path::end())
        .and(warp::filters::body::json())
        .and_then(move |req| execute_code(state.clone(), req).map(Result::<_, Infallible>::Ok))
        .map(|resp| warp::reply::json(&resp))
        .boxed();

    let route_health = warp::get()
        .and(warp::path("health"))
        .and(warp::path::end())
        .map(|| "Hello, World!")
        .boxed();

    route_execute_code.or(route_health)
}

/// Serves api
#[tracing::instrument(skip(cfg, judge))]
pub async fn serve(cfg: RestConfig, judge: Judge) -> anyhow::Result<()> {
    let state = Arc::new(State { judge });

    let server = warp::serve(routes(state).with(warp::filters::trace::request()));

    let srv = server
        .try_bind_with_graceful_shutdown(([0, 0, 0, 0], cfg.port), futures::future::pending())
        .context("failed to bind")?
        .1;
    srv.await;
    Ok(())
}
