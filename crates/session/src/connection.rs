//! Client connection seam.
//!
//! The transport layer (whatever speaks websockets to the browser) is a
//! collaborator, not part of this crate. Bridges talk to it through
//! [`ClientConnection`], split into independent send and receive halves
//! so the event loop can hold both across a `select!`.
//!
//! The bridge is the sole writer on a connection; nothing else may send
//! frames while a session is running.

use std::future::Future;

use bytes::Bytes;

/// Close code for a normally completed session.
pub const NORMAL_CLOSE: u16 = 1000;

/// Close code for a session rejected before any engine access because
/// token verification failed.
pub const UNAUTHORIZED_CLOSE: u16 = 4401;

/// A frame received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Binary payload (shell keystrokes).
    Data(Bytes),
    /// Text payload.
    Text(String),
    /// The client closed its half of the connection.
    Close,
}

/// Transport-level failure on the client connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The connection is gone; no further frames can be sent.
    #[error("connection closed")]
    Closed,

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Write half of a client connection.
pub trait ClientSender: Send {
    /// Sends one output chunk to the client.
    fn send_chunk(
        &mut self,
        data: Bytes,
    ) -> impl Future<Output = Result<(), ConnectionError>> + Send;

    /// Sends a text frame to the client.
    fn send_text(
        &mut self,
        text: String,
    ) -> impl Future<Output = Result<(), ConnectionError>> + Send;

    /// Closes the connection with the given close code. Idempotent.
    fn close(&mut self, code: u16) -> impl Future<Output = Result<(), ConnectionError>> + Send;
}

/// Read half of a client connection.
pub trait ClientReceiver: Send {
    /// Waits for the next frame from the client. `None` means the
    /// connection is gone without a close frame.
    fn recv(
        &mut self,
    ) -> impl Future<Output = Option<Result<ClientMessage, ConnectionError>>> + Send;
}

/// A client connection that can be split into independent halves.
pub trait ClientConnection: Send {
    type Sender: ClientSender;
    type Receiver: ClientReceiver;

    fn split(self) -> (Self::Sender, Self::Receiver);
}

/// Renders the single error notification sent to a client before a
/// faulted session is closed.
pub fn error_notification(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_notification_is_json_with_error_key() {
        let payload = error_notification("engine stream dropped");
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["error"], "engine stream dropped");
    }

    #[tokio::test]
    async fn mock_connection_records_sent_frames() {
        use testing::*;

        let (conn, sent) = MockConnection::new();
        let (mut sender, _receiver) = conn.split();
        sender.send_chunk(Bytes::from_static(b"hi")).await.unwrap();
        sender.close(NORMAL_CLOSE).await.unwrap();

        let frames = sent.lock().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1], SentFrame::Close(NORMAL_CLOSE));
    }
}
