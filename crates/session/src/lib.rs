//! Dockyard streaming sessions.
//!
//! Bridges one client connection to one engine-side blocking stream:
//! follow-mode logs, an interactive shell, or a streaming compose
//! deploy. Also home to the sliding-window rate limiter and the token
//! verification seam, both of which gate work before any engine access.
//!
//! The transport itself (websockets, HTTP upgrade handling) is a
//! collaborator behind [`ClientConnection`]; this crate never touches a
//! socket.

pub mod auth;
pub mod bridge;
pub mod connection;
pub mod limiter;
pub mod supervisor;

pub use auth::{StaticTokenVerifier, TokenVerifier};
pub use bridge::{BridgeOutcome, bridge_shell, relay_source};
pub use connection::{
    ClientConnection, ClientMessage, ClientReceiver, ClientSender, ConnectionError, NORMAL_CLOSE,
    UNAUTHORIZED_CLOSE, error_notification,
};
pub use limiter::RateLimiter;
pub use supervisor::{Session, SessionKind};
