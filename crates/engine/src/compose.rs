//! Compose subprocess runner.
//!
//! Stack lifecycle actions shell out to the engine's compose plugin
//! rather than going through the socket API. Two shapes are offered:
//! collected one-shot runs (`up`, `down`, `ls`, `ps`) and a streaming
//! run whose output is relayed line by line through the
//! [`ChunkSource`] contract.
//!
//! Every method here blocks until the subprocess makes progress. Call
//! them from a worker context, never from the event loop.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;

use bytes::Bytes;
use tracing::debug;

use dockyard_core::stream::{ChunkSource, StreamFault};
use dockyard_core::types::StackDescriptor;

use crate::error::EngineError;

/// Runs compose actions against a stack directory.
///
/// The subprocess always runs with the stack directory as its working
/// directory and the resolved declaration file passed via `-f`, so
/// relative paths and `.env` interpolation behave as they would for an
/// operator in that directory.
#[derive(Debug, Clone)]
pub struct ComposeRunner {
    program: String,
}

impl Default for ComposeRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposeRunner {
    pub fn new() -> Self {
        Self {
            program: "docker".to_owned(),
        }
    }

    fn stack_command(&self, stack: &StackDescriptor, action: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("compose")
            .arg("-f")
            .arg(&stack.compose_file)
            .args(action)
            .current_dir(&stack.path);
        cmd
    }

    /// Brings a stack up in detached mode, collecting all output.
    pub fn up(&self, stack: &StackDescriptor) -> Result<String, EngineError> {
        debug!(stack = %stack.name, "compose up");
        run_collect(self.stack_command(stack, &["up", "-d"]), "up")
    }

    /// Tears a stack down, collecting all output.
    pub fn down(&self, stack: &StackDescriptor) -> Result<String, EngineError> {
        debug!(stack = %stack.name, "compose down");
        run_collect(self.stack_command(stack, &["down"]), "down")
    }

    /// Lists compose projects known to the engine, as JSON text.
    pub fn ls(&self) -> Result<String, EngineError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["compose", "ls", "--format", "json"]);
        run_collect(cmd, "ls")
    }

    /// Shows service status for a stack, as JSON text.
    pub fn ps(&self, stack: &StackDescriptor) -> Result<String, EngineError> {
        run_collect(self.stack_command(stack, &["ps", "--format", "json"]), "ps")
    }

    /// Brings a stack up, relaying subprocess output as a chunk stream.
    ///
    /// stdout and stderr are merged line by line in arrival order. A
    /// non-zero exit surfaces as a trailing fault after all output has
    /// been delivered.
    pub fn stream_up(&self, stack: &StackDescriptor) -> Result<CommandStreamSource, EngineError> {
        debug!(stack = %stack.name, "compose up (streaming)");
        spawn_streaming(self.stack_command(stack, &["up", "-d"]), "up")
    }

    /// Tears a stack down, relaying subprocess output as a chunk stream.
    pub fn stream_down(&self, stack: &StackDescriptor) -> Result<CommandStreamSource, EngineError> {
        debug!(stack = %stack.name, "compose down (streaming)");
        spawn_streaming(self.stack_command(stack, &["down"]), "down")
    }
}

fn run_collect(mut cmd: Command, action: &str) -> Result<String, EngineError> {
    let output = cmd.output().map_err(|e| EngineError::Compose {
        action: action.to_owned(),
        reason: format!("failed to launch: {e}"),
    })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = if stderr.trim().is_empty() {
            output.status.to_string()
        } else {
            stderr.trim().to_owned()
        };
        Err(EngineError::Compose {
            action: action.to_owned(),
            reason,
        })
    }
}

fn spawn_streaming(mut cmd: Command, action: &str) -> Result<CommandStreamSource, EngineError> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| EngineError::Compose {
            action: action.to_owned(),
            reason: format!("failed to launch: {e}"),
        })?;

    let (tx, rx) = mpsc::channel();
    if let Some(stdout) = child.stdout.take() {
        pump_lines(stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        pump_lines(stderr, tx);
    }

    Ok(CommandStreamSource {
        child: Some(child),
        rx,
        action: action.to_owned(),
        finished: false,
    })
}

/// Forwards one pipe of the subprocess into the merge channel, one line
/// per chunk. The thread exits when the pipe closes or the receiver is
/// dropped.
fn pump_lines(reader: impl Read + Send + 'static, tx: mpsc::Sender<Bytes>) {
    std::thread::spawn(move || {
        let reader = BufReader::new(reader);
        for line in reader.lines() {
            let Ok(line) = line else { break };
            let mut buf = line.into_bytes();
            buf.push(b'\n');
            if tx.send(Bytes::from(buf)).is_err() {
                break;
            }
        }
    });
}

/// Output of a streaming compose run.
///
/// Chunks arrive while the subprocess runs. Once both pipes close the
/// exit status is checked: success ends the stream, failure yields one
/// final fault. Dropping the source kills the subprocess.
pub struct CommandStreamSource {
    child: Option<Child>,
    rx: mpsc::Receiver<Bytes>,
    action: String,
    finished: bool,
}

impl ChunkSource for CommandStreamSource {
    fn next_chunk(&mut self) -> Option<Result<Bytes, StreamFault>> {
        if self.finished {
            return None;
        }
        match self.rx.recv() {
            Ok(chunk) => Some(Ok(chunk)),
            Err(_) => {
                // Both pump threads are done; settle the exit status.
                self.finished = true;
                let mut child = self.child.take()?;
                match child.wait() {
                    Ok(status) if status.success() => None,
                    Ok(status) => Some(Err(StreamFault(format!(
                        "compose {} failed: {status}",
                        self.action
                    )))),
                    Err(e) => Some(Err(StreamFault(format!(
                        "compose {}: could not collect exit status: {e}",
                        self.action
                    )))),
                }
            }
        }
    }
}

impl Drop for CommandStreamSource {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
