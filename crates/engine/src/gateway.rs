//! Engine gateway.
//!
//! [`EngineGateway`] is the single entry point the control plane uses to
//! talk to the engine. It layers defaults from [`EngineConfig`], error
//! accounting, and domain aggregation on top of a raw [`EngineClient`].

use dockyard_core::config::EngineConfig;
use dockyard_core::metrics::ENGINE_ERRORS_TOTAL;
use dockyard_core::stream::{ChunkSource, ShellConduit};
use dockyard_core::types::{
    CleanupFlags, ContainerSummary, DiskUsageSummary, ImageSummary, NetworkSummary, PruneResults,
    VolumeSummary,
};
use tracing::warn;

use crate::client::EngineClient;
use crate::error::EngineError;
use crate::usage;

/// Control-plane facade over one engine endpoint.
///
/// The gateway never retries: an engine failure is reported to the
/// caller as-is and counted, nothing more.
pub struct EngineGateway<C: EngineClient> {
    client: C,
    config: EngineConfig,
}

impl<C: EngineClient> EngineGateway<C> {
    pub fn new(client: C, config: EngineConfig) -> Self {
        Self { client, config }
    }

    /// Verifies engine connectivity. Used at startup and for health checks.
    pub async fn ping(&self) -> Result<(), EngineError> {
        self.note(self.client.ping().await)
    }

    pub async fn containers(&self) -> Result<Vec<ContainerSummary>, EngineError> {
        self.note(self.client.list_containers().await)
    }

    pub async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.note(self.client.start_container(id).await)
    }

    pub async fn stop_container(&self, id: &str) -> Result<(), EngineError> {
        self.note(
            self.client
                .stop_container(id, self.config.stop_timeout_secs)
                .await,
        )
    }

    pub async fn volumes(&self) -> Result<Vec<VolumeSummary>, EngineError> {
        self.note(self.client.list_volumes().await)
    }

    pub async fn remove_volume(&self, name: &str, force: bool) -> Result<(), EngineError> {
        self.note(self.client.remove_volume(name, force).await)
    }

    pub async fn networks(&self) -> Result<Vec<NetworkSummary>, EngineError> {
        self.note(self.client.list_networks().await)
    }

    pub async fn remove_network(&self, id: &str) -> Result<(), EngineError> {
        self.note(self.client.remove_network(id).await)
    }

    pub async fn images(&self) -> Result<Vec<ImageSummary>, EngineError> {
        self.note(self.client.list_images().await)
    }

    pub async fn remove_image(
        &self,
        id: &str,
        force: bool,
        noprune: bool,
    ) -> Result<(), EngineError> {
        self.note(self.client.remove_image(id, force, noprune).await)
    }

    /// Aggregated disk usage, recomputed from the engine on every call.
    pub async fn disk_usage(&self) -> Result<DiskUsageSummary, EngineError> {
        let raw = self.note(self.client.disk_usage().await)?;
        Ok(usage::summarize(&raw))
    }

    /// Prunes exactly the categories selected by `flags`, in a fixed
    /// order: containers, volumes, networks, images. The first failure
    /// aborts the remaining categories.
    pub async fn prune(&self, flags: CleanupFlags) -> Result<PruneResults, EngineError> {
        let mut results = PruneResults::default();
        if flags.containers {
            results.containers = Some(self.note(self.client.prune_containers().await)?);
        }
        if flags.volumes {
            results.volumes = Some(self.note(self.client.prune_volumes().await)?);
        }
        if flags.networks {
            results.networks = Some(self.note(self.client.prune_networks().await)?);
        }
        if flags.images {
            results.images = Some(self.note(self.client.prune_images().await)?);
        }
        Ok(results)
    }

    /// Opens a follow-mode log stream. `tail` falls back to the
    /// configured default line count.
    pub async fn log_stream(
        &self,
        id: &str,
        tail: Option<usize>,
    ) -> Result<Box<dyn ChunkSource>, EngineError> {
        let tail = tail.unwrap_or(self.config.default_log_tail);
        self.note(self.client.open_log_stream(id, tail).await)
    }

    /// Opens an interactive shell. `cmd` falls back to the configured
    /// shell command.
    pub async fn shell(
        &self,
        id: &str,
        cmd: Option<Vec<String>>,
    ) -> Result<Box<dyn ShellConduit>, EngineError> {
        let cmd = cmd.unwrap_or_else(|| self.config.shell_command.clone());
        self.note(self.client.open_shell(id, &cmd).await)
    }

    fn note<T>(&self, result: Result<T, EngineError>) -> Result<T, EngineError> {
        if let Err(err) = &result {
            warn!(error = %err, "engine call failed");
            metrics::counter!(ENGINE_ERRORS_TOTAL).increment(1);
        }
        result
    }
}
