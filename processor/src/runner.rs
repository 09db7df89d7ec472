//! Process Runner: one external command in, one classified Outcome out.
use std::{
    path::PathBuf,
    process::Stdio,
    time::{Duration, Instant},
};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    task::JoinHandle,
};

/// One command invocation. `args` are always passed as discrete array
/// elements, so untrusted input can ride in an argument without shell
/// quoting concerns.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub current_dir: Option<PathBuf>,
    /// Data delivered on the child's stdin. `None` wires stdin to /dev/null.
    pub stdin: Option<String>,
    /// Wall-clock budget; the whole process group is killed when it runs out.
    pub time_limit: Duration,
}

impl CommandSpec {
    pub fn new(program: String, args: Vec<String>, time_limit: Duration) -> CommandSpec {
        CommandSpec {
            program,
            args,
            env: Vec::new(),
            current_dir: None,
            stdin: None,
            time_limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum OutcomeKind {
    /// Exited zero with a blank stderr.
    Completed,
    /// Exited nonzero, was signaled, or wrote to stderr.
    NonZeroExit,
    /// The OS refused to start the process at all.
    SpawnFailure,
    /// Still running when the time limit elapsed; killed by the watchdog.
    TimedOut,
}

/// What one invocation produced. Failures are data, not errors: every spawn
/// attempt yields exactly one Outcome.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub kind: OutcomeKind,
    pub stdout: String,
    /// Captured stderr, or the underlying OS error for `SpawnFailure`.
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

impl Outcome {
    fn spawn_failure(message: String) -> Outcome {
        Outcome {
            kind: OutcomeKind::SpawnFailure,
            stdout: String::new(),
            stderr: message,
            exit_code: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Human-readable diagnostics for a non-`Completed` outcome.
    pub fn error_message(&self) -> String {
        match self.kind {
            OutcomeKind::Completed => String::new(),
            OutcomeKind::TimedOut => {
                format!("time limit exceeded after {} ms", self.elapsed.as_millis())
            }
            OutcomeKind::SpawnFailure => self.stderr.trim_end().to_string(),
            OutcomeKind::NonZeroExit => {
                if self.stderr.trim().is_empty() {
                    match self.exit_code {
                        Some(code) => format!("process exited with code {}", code),
                        None => "process terminated by signal".to_string(),
                    }
                } else {
                    self.stderr.trim_end().to_string()
                }
            }
        }
    }
}

/// Runs the command to completion or to its deadline.
///
/// The timer starts right before spawn. stdout and stderr are drained by two
/// concurrent reader tasks while the wait runs; a full pipe buffer can
/// otherwise block the child forever. Both readers are joined before the
/// Outcome is finalized, also on the timeout path, so partial output
/// survives a kill.
#[tracing::instrument(skip(spec), fields(program = %spec.program))]
pub async fn run(spec: &CommandSpec) -> Outcome {
    let mut cmd = tokio::process::Command::new(&spec.program);
    cmd.args(&spec.args);
    for (key, value) in &spec.env {
        cmd.env(key, value);
    }
    if let Some(dir) = &spec.current_dir {
        cmd.current_dir(dir);
    }
    cmd.stdin(if spec.stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);
    // The child gets its own process group, so the watchdog can take down
    // grandchildren that would otherwise keep the pipes open.
    unsafe {
        cmd.pre_exec(|| {
            let _ = nix::unistd::setpgid(nix::unistd::Pid::from_raw(0), nix::unistd::Pid::from_raw(0));
            Ok(())
        });
    }

    let started = Instant::now();
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            tracing::warn!(program = %spec.program, error = %err, "failed to spawn process");
            return Outcome::spawn_failure(format!("failed to spawn {}: {}", spec.program, err));
        }
    };

    let stdin_writer = spec.stdin.as_ref().and_then(|input| {
        let data = input.clone().into_bytes();
        child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move {
                let _ = stdin.write_all(&data).await;
                let _ = stdin.shutdown().await;
            })
        })
    });
    let stdout_reader = spawn_drain(child.stdout.take());
    let stderr_reader = spawn_drain(child.stderr.take());

    let (waited, elapsed) = match tokio::time::timeout(spec.time_limit, child.wait()).await {
        Ok(Ok(status)) => (Waited::Exited(status), started.elapsed()),
        Ok(Err(err)) => (Waited::Failed(err), started.elapsed()),
        Err(_elapsed) => {
            kill_group(&mut child).await;
            (Waited::TimedOut, started.elapsed())
        }
    };

    if let Some(writer) = stdin_writer {
        let _ = writer.await;
    }
    let stdout = collect(stdout_reader).await;
    let stderr = collect(stderr_reader).await;

    let outcome = match waited {
        Waited::Exited(status) => {
            let kind = if status.success() && stderr.trim().is_empty() {
                OutcomeKind::Completed
            } else {
                OutcomeKind::NonZeroExit
            };
            Outcome {
                kind,
                stdout,
                stderr,
                exit_code: status.code(),
                elapsed,
            }
        }
        Waited::Failed(err) => Outcome {
            kind: OutcomeKind::SpawnFailure,
            stdout,
            stderr: format!("failed to wait for {}: {}", spec.program, err),
            exit_code: None,
            elapsed,
        },
        Waited::TimedOut => Outcome {
            kind: OutcomeKind::TimedOut,
            stdout,
            stderr,
            exit_code: None,
            elapsed,
        },
    };
    tracing::debug!(kind = %outcome.kind, elapsed_ms = outcome.elapsed.as_millis() as u64, "process finished");
    outcome
}

enum Waited {
    Exited(std::process::ExitStatus),
    Failed(std::io::Error),
    TimedOut,
}

fn spawn_drain<R>(stream: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_end(&mut buf).await;
        }
        buf
    })
}

async fn collect(reader: JoinHandle<Vec<u8>>) -> String {
    let buf = reader.await.unwrap_or_default();
    String::from_utf8_lossy(&buf).into_owned()
}

/// Kills the child's whole process group, then reaps the child. Idempotent:
/// signaling an already-dead group is a no-op.
async fn kill_group(child: &mut tokio::process::Child) {
    if let Some(pid) = child.id() {
        let _ = nix::sys::signal::kill(
            nix::unistd::Pid::from_raw(-(pid as i32)),
            nix::sys::signal::Signal::SIGKILL,
        );
    }
    let _ = child.start_kill();
    let _ = child.wait().await;
}
