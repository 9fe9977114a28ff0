//! Control plane service.
//!
//! [`ControlPlane`] ties the engine gateway, the stack registry, the
//! settings store, the rate limiter, and the session layer into the
//! operation surface a transport exposes to the frontend. Every
//! mutating action is gated by the sliding-window rate limiter before
//! the engine is touched; every streaming operation goes through a
//! supervised session.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use dockyard_core::DockyardError;
use dockyard_core::config::DockyardConfig;
use dockyard_core::types::{
    CleanupFlags, ContainerSummary, DiskUsageSummary, ImageSummary, NetworkSummary, PruneResults,
    StackDescriptor, VolumeSummary,
};
use dockyard_engine::{ComposeRunner, EngineClient, EngineGateway};
use dockyard_session::{
    BridgeOutcome, ClientConnection, RateLimiter, Session, SessionKind, TokenVerifier,
};
use dockyard_stacks::{StackContents, StackRegistry};

use crate::settings::{SettingsDocument, SettingsPatch, SettingsStore};

/// The single administrative account all rate windows are keyed under.
pub const ADMIN_USER: &str = "admin";

pub const ACTION_CONTAINER_START: &str = "container_start";
pub const ACTION_CONTAINER_STOP: &str = "container_stop";
pub const ACTION_VOLUME_DELETE: &str = "volume_delete";
pub const ACTION_NETWORK_DELETE: &str = "network_delete";
pub const ACTION_IMAGE_DELETE: &str = "image_delete";
pub const ACTION_CLEANUP: &str = "cleanup";
pub const ACTION_STACK_CREATE: &str = "stack_create";
pub const ACTION_STACK_UPDATE: &str = "stack_update";
pub const ACTION_COMPOSE_UP: &str = "compose_up";
pub const ACTION_COMPOSE_DOWN: &str = "compose_down";

/// Which compose action a deploy stream runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployAction {
    Up,
    Down,
}

impl DeployAction {
    /// Rate-window name, shared with the collected variant of the same
    /// action.
    fn rate_action(self) -> &'static str {
        match self {
            DeployAction::Up => ACTION_COMPOSE_UP,
            DeployAction::Down => ACTION_COMPOSE_DOWN,
        }
    }
}

/// Result of a cleanup run: what was pruned, plus usage measured
/// before and after so the caller sees what was actually reclaimed.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    pub results: PruneResults,
    pub before: DiskUsageSummary,
    pub after: DiskUsageSummary,
    /// `before` minus `after`, clamped at zero.
    pub space_reclaimed: i64,
}

/// The control plane for one container engine host.
pub struct ControlPlane<C: EngineClient> {
    gateway: EngineGateway<C>,
    compose: ComposeRunner,
    settings: SettingsStore,
    limiter: RateLimiter,
    verifier: Arc<dyn TokenVerifier>,
    session_capacity: usize,
}

impl<C: EngineClient> ControlPlane<C> {
    pub fn new(client: C, config: &DockyardConfig, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            gateway: EngineGateway::new(client, config.engine.clone()),
            compose: ComposeRunner::new(),
            settings: SettingsStore::new(&config.general.settings_file),
            limiter: RateLimiter::new(
                config.limits.mutation_limit,
                std::time::Duration::from_secs(config.limits.window_seconds),
            ),
            verifier,
            session_capacity: config.session.channel_capacity,
        }
    }

    /// Engine connectivity check, used at startup and by health probes.
    pub async fn ping(&self) -> Result<(), DockyardError> {
        Ok(self.gateway.ping().await?)
    }

    // --- inventory ---

    pub async fn containers(&self) -> Result<Vec<ContainerSummary>, DockyardError> {
        Ok(self.gateway.containers().await?)
    }

    pub async fn container_start(&self, id: &str) -> Result<(), DockyardError> {
        self.limiter.check(ADMIN_USER, ACTION_CONTAINER_START)?;
        info!(container = id, "starting container");
        Ok(self.gateway.start_container(id).await?)
    }

    pub async fn container_stop(&self, id: &str) -> Result<(), DockyardError> {
        self.limiter.check(ADMIN_USER, ACTION_CONTAINER_STOP)?;
        info!(container = id, "stopping container");
        Ok(self.gateway.stop_container(id).await?)
    }

    pub async fn volumes(&self) -> Result<Vec<VolumeSummary>, DockyardError> {
        Ok(self.gateway.volumes().await?)
    }

    pub async fn volume_delete(&self, name: &str, force: bool) -> Result<(), DockyardError> {
        self.limiter.check(ADMIN_USER, ACTION_VOLUME_DELETE)?;
        info!(volume = name, force, "removing volume");
        Ok(self.gateway.remove_volume(name, force).await?)
    }

    pub async fn networks(&self) -> Result<Vec<NetworkSummary>, DockyardError> {
        Ok(self.gateway.networks().await?)
    }

    pub async fn network_delete(&self, id: &str) -> Result<(), DockyardError> {
        self.limiter.check(ADMIN_USER, ACTION_NETWORK_DELETE)?;
        info!(network = id, "removing network");
        Ok(self.gateway.remove_network(id).await?)
    }

    pub async fn images(&self) -> Result<Vec<ImageSummary>, DockyardError> {
        Ok(self.gateway.images().await?)
    }

    pub async fn image_delete(
        &self,
        id: &str,
        force: bool,
        noprune: bool,
    ) -> Result<(), DockyardError> {
        self.limiter.check(ADMIN_USER, ACTION_IMAGE_DELETE)?;
        info!(image = id, force, noprune, "removing image");
        Ok(self.gateway.remove_image(id, force, noprune).await?)
    }

    // --- disk usage and cleanup ---

    pub async fn disk_usage(&self) -> Result<DiskUsageSummary, DockyardError> {
        Ok(self.gateway.disk_usage().await?)
    }

    /// Prunes the selected categories and reports usage before and
    /// after. At least one category must be selected.
    pub async fn cleanup(&self, flags: CleanupFlags) -> Result<CleanupReport, DockyardError> {
        if flags.is_empty() {
            return Err(DockyardError::Validation(
                "no cleanup categories selected".to_owned(),
            ));
        }
        self.limiter.check(ADMIN_USER, ACTION_CLEANUP)?;

        let before = self.gateway.disk_usage().await?;
        let results = self.gateway.prune(flags).await?;
        let after = self.gateway.disk_usage().await?;
        let space_reclaimed = before.reclaimed_since(&after);
        info!(space_reclaimed, "cleanup finished");

        Ok(CleanupReport {
            results,
            before,
            after,
            space_reclaimed,
        })
    }

    // --- settings ---

    pub async fn settings(&self) -> Result<SettingsDocument, DockyardError> {
        self.settings.load().await
    }

    pub async fn update_settings(
        &self,
        patch: SettingsPatch,
    ) -> Result<SettingsDocument, DockyardError> {
        self.settings.update(patch).await
    }

    // --- stacks ---

    /// Registry rooted at the currently configured stack root. Rebuilt
    /// on every use so a settings change takes effect immediately.
    async fn registry(&self) -> Result<StackRegistry, DockyardError> {
        let document = self.settings.load().await?;
        Ok(StackRegistry::new(document.stack_root))
    }

    pub async fn stacks(&self) -> Result<Vec<StackDescriptor>, DockyardError> {
        Ok(self.registry().await?.discover().await?)
    }

    pub async fn stack_read(&self, name: &str) -> Result<StackContents, DockyardError> {
        Ok(self.registry().await?.read(name).await?)
    }

    pub async fn stack_create(
        &self,
        name: &str,
        compose: &str,
        env: Option<&str>,
        overwrite: bool,
    ) -> Result<StackDescriptor, DockyardError> {
        self.limiter.check(ADMIN_USER, ACTION_STACK_CREATE)?;
        info!(stack = name, overwrite, "creating stack");
        Ok(self
            .registry()
            .await?
            .create(name, compose, env, overwrite)
            .await?)
    }

    pub async fn stack_update(
        &self,
        name: &str,
        compose: &str,
        env: Option<&str>,
    ) -> Result<StackDescriptor, DockyardError> {
        self.limiter.check(ADMIN_USER, ACTION_STACK_UPDATE)?;
        info!(stack = name, "updating stack");
        Ok(self.registry().await?.update(name, compose, env).await?)
    }

    // --- compose ---

    pub async fn compose_up(&self, name: &str) -> Result<String, DockyardError> {
        self.limiter.check(ADMIN_USER, ACTION_COMPOSE_UP)?;
        let stack = self.registry().await?.resolve(name).await?;
        info!(stack = name, "compose up");
        let runner = self.compose.clone();
        run_compose(move || runner.up(&stack)).await
    }

    pub async fn compose_down(&self, name: &str) -> Result<String, DockyardError> {
        self.limiter.check(ADMIN_USER, ACTION_COMPOSE_DOWN)?;
        let stack = self.registry().await?.resolve(name).await?;
        info!(stack = name, "compose down");
        let runner = self.compose.clone();
        run_compose(move || runner.down(&stack)).await
    }

    pub async fn compose_ls(&self) -> Result<String, DockyardError> {
        let runner = self.compose.clone();
        run_compose(move || runner.ls()).await
    }

    pub async fn compose_ps(&self, name: &str) -> Result<String, DockyardError> {
        let stack = self.registry().await?.resolve(name).await?;
        let runner = self.compose.clone();
        run_compose(move || runner.ps(&stack)).await
    }

    // --- streaming sessions ---

    /// Follow-mode log tail for one container. Returns `None` when the
    /// session was rejected before bridging.
    pub async fn log_session<Conn: ClientConnection>(
        &self,
        connection: Conn,
        token: Option<&str>,
        container_id: &str,
        tail: Option<usize>,
    ) -> Option<BridgeOutcome> {
        let session = Session::open(SessionKind::Logs, connection, self.session_capacity);
        if self.verifier.verify_token(token).is_none() {
            session.deny_unauthorized().await;
            return None;
        }
        match self.gateway.log_stream(container_id, tail).await {
            Ok(source) => Some(session.relay(source).await),
            Err(e) => {
                session.reject(&e.to_string()).await;
                None
            }
        }
    }

    /// Interactive shell inside one container.
    pub async fn shell_session<Conn: ClientConnection>(
        &self,
        connection: Conn,
        token: Option<&str>,
        container_id: &str,
        cmd: Option<Vec<String>>,
    ) -> Option<BridgeOutcome> {
        let session = Session::open(SessionKind::Shell, connection, self.session_capacity);
        if self.verifier.verify_token(token).is_none() {
            session.deny_unauthorized().await;
            return None;
        }
        match self.gateway.shell(container_id, cmd).await {
            Ok(conduit) => Some(session.shell(conduit).await),
            Err(e) => {
                session.reject(&e.to_string()).await;
                None
            }
        }
    }

    /// Streaming compose deploy for one stack. Each action shares its
    /// rate window with the collected variant of the same action.
    pub async fn deploy_session<Conn: ClientConnection>(
        &self,
        connection: Conn,
        token: Option<&str>,
        stack_name: &str,
        action: DeployAction,
    ) -> Option<BridgeOutcome> {
        let session = Session::open(SessionKind::Deploy, connection, self.session_capacity);
        let Some(user) = self.verifier.verify_token(token) else {
            session.deny_unauthorized().await;
            return None;
        };
        if let Err(e) = self.limiter.check(&user, action.rate_action()) {
            session.reject(&e.to_string()).await;
            return None;
        }
        let stack = match self.registry().await {
            Ok(registry) => match registry.resolve(stack_name).await {
                Ok(stack) => stack,
                Err(e) => {
                    session.reject(&DockyardError::from(e).to_string()).await;
                    return None;
                }
            },
            Err(e) => {
                session.reject(&e.to_string()).await;
                return None;
            }
        };
        // the subprocess spawn is a blocking syscall, keep it off the
        // event loop
        let runner = self.compose.clone();
        let spawned = tokio::task::spawn_blocking(move || match action {
            DeployAction::Up => runner.stream_up(&stack),
            DeployAction::Down => runner.stream_down(&stack),
        })
        .await;
        match spawned {
            Ok(Ok(source)) => Some(session.relay(Box::new(source)).await),
            Ok(Err(e)) => {
                session.reject(&DockyardError::from(e).to_string()).await;
                None
            }
            Err(e) => {
                session
                    .reject(&format!("compose worker failed: {e}"))
                    .await;
                None
            }
        }
    }
}

/// Runs one blocking compose action on the worker pool.
async fn run_compose<F>(f: F) -> Result<String, DockyardError>
where
    F: FnOnce() -> Result<String, dockyard_engine::EngineError> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DockyardError::Engine(format!("compose worker failed: {e}")))?;
    Ok(result?)
}
