//! Dockyard engine gateway.
//!
//! Talks to one container engine daemon: inventory listings, container
//! lifecycle, prune and disk usage accounting, compose subprocess runs,
//! and the blocking stream adapters behind log tail and interactive
//! shell sessions.
//!
//! The public surface is [`EngineGateway`] parameterized over an
//! [`EngineClient`]. Production code plugs in [`BollardEngineClient`];
//! tests plug in a mock.

pub mod client;
pub mod compose;
pub mod error;
pub mod gateway;
pub mod stream;
pub mod usage;

pub use client::{BollardEngineClient, EngineClient};
pub use compose::{CommandStreamSource, ComposeRunner};
pub use error::EngineError;
pub use gateway::EngineGateway;
pub use stream::{ExecShellConduit, LogStreamSource};
