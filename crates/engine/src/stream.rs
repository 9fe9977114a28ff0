//! Blocking adapters over the engine's async streams.
//!
//! The session layer consumes [`ChunkSource`] and [`ShellConduit`] from
//! dedicated worker contexts that are allowed to block. The engine API
//! hands out async streams, so these adapters pin a runtime handle and
//! drive the stream with `block_on`. That is only legal on a
//! `spawn_blocking` thread; calling `next_chunk` from the event loop
//! would abort the runtime.

use std::pin::Pin;

use bollard::container::LogOutput;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::runtime::Handle;

use dockyard_core::stream::{ChunkSource, ShellConduit, ShellInput, StreamFault};

type LogStream = Pin<Box<dyn Stream<Item = Result<LogOutput, bollard::errors::Error>> + Send>>;

/// Follow-mode log stream adapted to the blocking chunk contract.
///
/// Each item from the engine (one log frame, stdout and stderr merged)
/// becomes one chunk, in the order the engine produced them.
pub struct LogStreamSource {
    handle: Handle,
    stream: LogStream,
}

impl LogStreamSource {
    /// Captures the current runtime handle. Must be called from async
    /// context; the source itself is then moved to a worker thread.
    pub fn new(
        stream: impl Stream<Item = Result<LogOutput, bollard::errors::Error>> + Send + 'static,
    ) -> Self {
        Self {
            handle: Handle::current(),
            stream: Box::pin(stream),
        }
    }
}

impl ChunkSource for LogStreamSource {
    fn next_chunk(&mut self) -> Option<Result<Bytes, StreamFault>> {
        match self.handle.block_on(self.stream.next()) {
            Some(Ok(output)) => Some(Ok(output.into_bytes())),
            Some(Err(e)) => Some(Err(StreamFault(e.to_string()))),
            None => None,
        }
    }
}

type ShellWriter = Pin<Box<dyn AsyncWrite + Send>>;

/// Attached exec session split into blocking halves.
pub struct ExecShellConduit {
    handle: Handle,
    output: LogStream,
    input: ShellWriter,
}

impl ExecShellConduit {
    /// Wraps the two halves of an attached exec. Must be called from
    /// async context.
    pub fn new(
        output: impl Stream<Item = Result<LogOutput, bollard::errors::Error>> + Send + 'static,
        input: ShellWriter,
    ) -> Self {
        Self {
            handle: Handle::current(),
            output: Box::pin(output),
            input,
        }
    }
}

impl ShellConduit for ExecShellConduit {
    fn split(self: Box<Self>) -> (Box<dyn ChunkSource>, Box<dyn ShellInput>) {
        let source = LogStreamSource {
            handle: self.handle.clone(),
            stream: self.output,
        };
        let sink = ExecInputSink {
            handle: self.handle,
            input: self.input,
            closed: false,
        };
        (Box::new(source), Box::new(sink))
    }
}

/// Client-to-engine half of an exec session.
struct ExecInputSink {
    handle: Handle,
    input: ShellWriter,
    closed: bool,
}

impl ShellInput for ExecInputSink {
    fn write_chunk(&mut self, data: &[u8]) -> Result<(), StreamFault> {
        if self.closed {
            return Err(StreamFault("shell input already closed".to_owned()));
        }
        self.handle
            .block_on(async {
                self.input.write_all(data).await?;
                self.input.flush().await
            })
            .map_err(|e| StreamFault(e.to_string()))
    }

    fn shutdown(&mut self) {
        if !self.closed {
            self.closed = true;
            let _ = self.handle.block_on(self.input.shutdown());
        }
    }
}
