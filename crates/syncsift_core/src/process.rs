//! Bounded execution of external tools.
//!
//! Every external invocation in the pipeline (FFmpeg, ffprobe, the sync
//! scorer) goes through `run_with_timeout`, which drains the child's
//! output on reader threads and polls for exit against a deadline. On
//! timeout the child is killed and reaped, so no zombie processes
//! accumulate across a long batch.

use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Error from running an external command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} timed out after {timeout:?}")]
    TimedOut { tool: String, timeout: Duration },

    #[error("i/o error while waiting for {tool}: {source}")]
    Wait {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured output of a finished command.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited with status zero.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, or -1 when the command died without one (signal).
    pub fn exit_code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }
}

/// Run a command to completion under a hard deadline.
///
/// stdout and stderr are drained on their own threads so the child can
/// never stall on a full pipe while we wait for it. When the deadline
/// passes the child is killed and reaped and `CommandError::TimedOut`
/// is returned.
pub fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
) -> Result<CommandOutput, CommandError> {
    let tool = tool_name(&cmd);
    tracing::debug!("Running {}: {:?}", tool, cmd);

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| CommandError::Spawn {
        tool: tool.clone(),
        source: e,
    })?;

    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let waited = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Ok(status),
            Ok(None) => {}
            Err(e) => {
                break Err(CommandError::Wait {
                    tool: tool.clone(),
                    source: e,
                })
            }
        }
        if Instant::now() >= deadline {
            tracing::warn!("{} exceeded {:?}, killing", tool, timeout);
            break Err(CommandError::TimedOut {
                tool: tool.clone(),
                timeout,
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let status = match waited {
        Ok(status) => status,
        Err(e) => {
            // Make sure the child is gone and the pipes are closed
            // before reporting, so the reader threads can finish.
            let _ = child.kill();
            let _ = child.wait();
            let _ = stdout_reader.join();
            let _ = stderr_reader.join();
            return Err(e);
        }
    };

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();

    Ok(CommandOutput {
        status,
        stdout,
        stderr,
    })
}

/// Read a child pipe to the end on its own thread.
fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Some(mut pipe) = pipe {
            // Lossy conversion keeps odd tool output from failing a run.
            if pipe.read_to_end(&mut bytes).is_ok() {
                return String::from_utf8_lossy(&bytes).into_owned();
            }
        }
        String::new()
    })
}

/// Short tool name for logs and errors (program basename).
fn tool_name(cmd: &Command) -> String {
    let program = cmd.get_program();
    Path::new(program)
        .file_name()
        .unwrap_or(program)
        .to_string_lossy()
        .into_owned()
}
