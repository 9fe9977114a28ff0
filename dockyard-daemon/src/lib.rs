//! Dockyard daemon library.
//!
//! This library exposes internal modules for integration testing and
//! for transports embedding the control plane. In production,
//! `dockyard-daemon` is used as a binary (main.rs).

pub mod cli;
pub mod logging;
pub mod metrics_server;
pub mod service;
pub mod settings;
