//! CLI argument definitions for dockyard-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Dockyard container host control plane daemon.
///
/// Exposes container engine inventory, stack registry, and streaming
/// session operations to a remote frontend.
#[derive(Parser, Debug)]
#[command(name = "dockyard-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to dockyard.toml configuration file.
    #[arg(short, long, default_value = "/etc/dockyard/dockyard.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}
