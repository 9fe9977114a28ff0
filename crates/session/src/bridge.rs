//! Streaming bridges.
//!
//! A bridge pairs one engine-side blocking source with one client
//! connection. The source is consumed on a dedicated blocking worker
//! and handed to the event loop over a bounded channel, so a slow
//! client applies backpressure to the engine read instead of buffering
//! without bound.
//!
//! Cancellation is cooperative: the worker checks the token between
//! reads. A worker stuck inside a blocking read is left behind on
//! teardown and never awaited; it unblocks and exits on its own when
//! the read returns or the handoff channel drops.

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use dockyard_core::stream::{ChunkSource, ShellConduit, ShellInput, StreamFault};

use crate::connection::{ClientMessage, ClientReceiver, ClientSender, error_notification};

/// How a bridge ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeOutcome {
    /// The source was exhausted and every chunk was delivered.
    Completed,
    /// The source reported a fault; the client got one error
    /// notification before teardown.
    Faulted(String),
    /// The client went away first (close frame, transport error, or a
    /// failed send).
    ClientClosed,
}

impl BridgeOutcome {
    /// Metric label for this outcome.
    pub fn as_label(&self) -> &'static str {
        match self {
            BridgeOutcome::Completed => "completed",
            BridgeOutcome::Faulted(_) => "faulted",
            BridgeOutcome::ClientClosed => "client_closed",
        }
    }
}

/// Relays a one-way source to the client until it ends, faults, or the
/// client leaves. Input frames from the client are ignored.
///
/// Chunks are delivered as text frames, decoded best-effort: invalid
/// UTF-8 sequences are replaced, never allowed to abort the stream.
///
/// The token is cancelled before returning on every path, so the caller
/// can hang engine-side cleanup off it.
pub async fn relay_source<S, R>(
    source: Box<dyn ChunkSource>,
    sender: &mut S,
    receiver: &mut R,
    cancel: &CancellationToken,
    capacity: usize,
) -> BridgeOutcome
where
    S: ClientSender,
    R: ClientReceiver,
{
    let mut chunks = spawn_source_worker(source, cancel.clone(), capacity);

    loop {
        tokio::select! {
            item = chunks.recv() => match item {
                Some(Ok(chunk)) => {
                    let text = String::from_utf8_lossy(&chunk).into_owned();
                    if sender.send_text(text).await.is_err() {
                        cancel.cancel();
                        return BridgeOutcome::ClientClosed;
                    }
                }
                Some(Err(fault)) => {
                    cancel.cancel();
                    let _ = sender.send_text(error_notification(&fault.to_string())).await;
                    return BridgeOutcome::Faulted(fault.0);
                }
                None => {
                    cancel.cancel();
                    return BridgeOutcome::Completed;
                }
            },
            msg = receiver.recv() => {
                if client_is_gone(&msg) {
                    cancel.cancel();
                    return BridgeOutcome::ClientClosed;
                }
            }
        }
    }
}

/// Bridges an interactive shell: engine output flows to the client as
/// binary frames, and client frames flow to the shell input through a
/// second worker.
///
/// Closing the client shuts down the input half; the output half is
/// then torn down the same way as in [`relay_source`].
pub async fn bridge_shell<S, R>(
    conduit: Box<dyn ShellConduit>,
    sender: &mut S,
    receiver: &mut R,
    cancel: &CancellationToken,
    capacity: usize,
) -> BridgeOutcome
where
    S: ClientSender,
    R: ClientReceiver,
{
    let (source, input) = conduit.split();
    let mut chunks = spawn_source_worker(source, cancel.clone(), capacity);
    let input_tx = spawn_input_worker(input, capacity);

    loop {
        tokio::select! {
            item = chunks.recv() => match item {
                Some(Ok(chunk)) => {
                    if sender.send_chunk(chunk).await.is_err() {
                        cancel.cancel();
                        return BridgeOutcome::ClientClosed;
                    }
                }
                Some(Err(fault)) => {
                    cancel.cancel();
                    let _ = sender.send_text(error_notification(&fault.to_string())).await;
                    return BridgeOutcome::Faulted(fault.0);
                }
                None => {
                    cancel.cancel();
                    return BridgeOutcome::Completed;
                }
            },
            msg = receiver.recv() => match msg {
                Some(Ok(ClientMessage::Data(data))) => {
                    if input_tx.send(data).await.is_err() {
                        // input half died; the output half will surface
                        // the fault or end shortly
                        debug!("shell input worker gone, dropping client frame");
                    }
                }
                Some(Ok(ClientMessage::Text(text))) => {
                    if input_tx.send(Bytes::from(text)).await.is_err() {
                        debug!("shell input worker gone, dropping client frame");
                    }
                }
                _ => {
                    cancel.cancel();
                    return BridgeOutcome::ClientClosed;
                }
            }
        }
    }
}

fn client_is_gone(msg: &Option<Result<ClientMessage, crate::connection::ConnectionError>>) -> bool {
    !matches!(msg, Some(Ok(ClientMessage::Data(_))) | Some(Ok(ClientMessage::Text(_))))
}

/// Consumes a blocking source on a worker thread, handing chunks to the
/// event loop over a bounded channel. `blocking_send` is the
/// backpressure point: the worker stalls instead of reading ahead when
/// the event loop falls behind.
fn spawn_source_worker(
    mut source: Box<dyn ChunkSource>,
    cancel: CancellationToken,
    capacity: usize,
) -> mpsc::Receiver<Result<Bytes, StreamFault>> {
    let (tx, rx) = mpsc::channel(capacity);
    tokio::task::spawn_blocking(move || {
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match source.next_chunk() {
                Some(item) => {
                    let was_fault = item.is_err();
                    if tx.blocking_send(item).is_err() || was_fault {
                        break;
                    }
                }
                None => break,
            }
        }
    });
    rx
}

/// Feeds client frames into the blocking shell input. When the channel
/// closes (bridge teardown) the input is shut down exactly once.
fn spawn_input_worker(mut input: Box<dyn ShellInput>, capacity: usize) -> mpsc::Sender<Bytes> {
    let (tx, mut rx) = mpsc::channel::<Bytes>(capacity);
    tokio::task::spawn_blocking(move || {
        while let Some(data) = rx.blocking_recv() {
            if input.write_chunk(&data).is_err() {
                break;
            }
        }
        input.shutdown();
    });
    tx
}
