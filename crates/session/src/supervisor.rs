//! Per-session supervision.
//!
//! A [`Session`] owns one client connection and one cancellation token
//! from acceptance to teardown. Every exit path cancels the token,
//! closes the connection with the right close code, and records the
//! outcome, so callers only choose which bridge to run.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use dockyard_core::metrics::{LABEL_OUTCOME, LABEL_SESSION_KIND, SESSIONS_CLOSED_TOTAL, SESSIONS_OPENED_TOTAL};
use dockyard_core::stream::{ChunkSource, ShellConduit};

use crate::bridge::{BridgeOutcome, bridge_shell, relay_source};
use crate::connection::{ClientConnection, ClientSender, NORMAL_CLOSE, UNAUTHORIZED_CLOSE, error_notification};

/// What a session is streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// Follow-mode container logs.
    Logs,
    /// Interactive container shell.
    Shell,
    /// Streaming compose deploy.
    Deploy,
}

impl SessionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionKind::Logs => "logs",
            SessionKind::Shell => "shell",
            SessionKind::Deploy => "deploy",
        }
    }
}

/// One accepted streaming session.
pub struct Session<C: ClientConnection> {
    kind: SessionKind,
    sender: C::Sender,
    receiver: C::Receiver,
    cancel: CancellationToken,
    capacity: usize,
}

impl<C: ClientConnection> Session<C> {
    /// Accepts a connection into a session. The session is counted as
    /// opened from this point, even if it is rejected before bridging.
    pub fn open(kind: SessionKind, connection: C, capacity: usize) -> Self {
        let (sender, receiver) = connection.split();
        debug!(kind = kind.as_str(), "session opened");
        metrics::counter!(SESSIONS_OPENED_TOTAL, LABEL_SESSION_KIND => kind.as_str()).increment(1);
        Self {
            kind,
            sender,
            receiver,
            cancel: CancellationToken::new(),
            capacity,
        }
    }

    /// Token tied to this session's lifetime. Cancelled on every exit
    /// path; engine-side cleanup can be hung off it.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Rejects the session because token verification failed. No
    /// engine access has happened; the client only sees the close code.
    pub async fn deny_unauthorized(mut self) {
        self.cancel.cancel();
        let _ = self.sender.close(UNAUTHORIZED_CLOSE).await;
        self.record("unauthorized");
    }

    /// Rejects the session after acceptance but before bridging, e.g.
    /// because opening the engine stream failed. The client gets one
    /// error notification and a normal close.
    pub async fn reject(mut self, message: &str) {
        self.cancel.cancel();
        let _ = self.sender.send_text(error_notification(message)).await;
        let _ = self.sender.close(NORMAL_CLOSE).await;
        self.record("rejected");
    }

    /// Runs a one-way relay to completion and tears the session down.
    pub async fn relay(mut self, source: Box<dyn ChunkSource>) -> BridgeOutcome {
        let outcome = relay_source(
            source,
            &mut self.sender,
            &mut self.receiver,
            &self.cancel,
            self.capacity,
        )
        .await;
        self.finish(outcome).await
    }

    /// Runs an interactive shell bridge to completion and tears the
    /// session down.
    pub async fn shell(mut self, conduit: Box<dyn ShellConduit>) -> BridgeOutcome {
        let outcome = bridge_shell(
            conduit,
            &mut self.sender,
            &mut self.receiver,
            &self.cancel,
            self.capacity,
        )
        .await;
        self.finish(outcome).await
    }

    async fn finish(mut self, outcome: BridgeOutcome) -> BridgeOutcome {
        // the bridge has already cancelled the token on its way out
        let _ = self.sender.close(NORMAL_CLOSE).await;
        info!(
            kind = self.kind.as_str(),
            outcome = outcome.as_label(),
            "session closed"
        );
        self.record(outcome.as_label());
        outcome
    }

    fn record(&self, outcome: &'static str) {
        metrics::counter!(
            SESSIONS_CLOSED_TOTAL,
            LABEL_SESSION_KIND => self.kind.as_str(),
            LABEL_OUTCOME => outcome
        )
        .increment(1);
    }
}
