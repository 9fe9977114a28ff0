//! Engine API abstraction for testability.
//!
//! The [`EngineClient`] trait abstracts the bollard engine API, allowing
//! production code to use [`BollardEngineClient`] while tests use
//! `MockEngineClient`.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐
//! │ EngineGateway  │
//! └───────┬────────┘
//!         │
//!         ▼
//!  ┌──────────────┐
//!  │ EngineClient │ (trait)
//!  └──────────────┘
//!       │      │
//!       ▼      ▼
//!  ┌───────┐ ┌──────┐
//!  │Bollard│ │ Mock │
//!  └───┬───┘ └──────┘
//!      │
//!      ▼
//!  Engine daemon
//! ```
//!
//! # Error Handling
//!
//! - **404 errors**: Converted to `EngineError::NotFound`
//! - **Connection errors**: Wrapped as `EngineError::Unavailable`
//! - **Everything else**: Wrapped as `EngineError::Api` with the engine's
//!   message preserved verbatim

use std::future::Future;
use std::sync::Arc;

use dockyard_core::stream::{ChunkSource, ShellConduit};
use dockyard_core::types::{
    ContainerSummary, ImageSummary, NetworkSummary, PortMapping, PruneReport, RawDiskUsage,
    VolumeSummary, short_image_id,
};

use crate::error::EngineError;
use crate::stream::{ExecShellConduit, LogStreamSource};

/// Trait abstracting engine API operations.
///
/// All engine calls go through this trait, enabling testability via
/// mocking. Listing methods return fresh read-only projections on every
/// call; nothing is cached between calls.
///
/// # Implementations
///
/// - [`BollardEngineClient`]: Production implementation using the
///   `bollard` library
/// - `MockEngineClient`: Test implementation with configurable responses
///   (available in tests only)
pub trait EngineClient: Send + Sync + 'static {
    /// Checks engine daemon connectivity.
    fn ping(&self) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Lists all containers, running or not.
    fn list_containers(
        &self,
    ) -> impl Future<Output = Result<Vec<ContainerSummary>, EngineError>> + Send;

    /// Starts a container by ID or name.
    fn start_container(&self, id: &str) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Stops a container with the given grace period in seconds.
    fn stop_container(
        &self,
        id: &str,
        timeout_secs: i64,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Lists all volumes.
    fn list_volumes(&self)
    -> impl Future<Output = Result<Vec<VolumeSummary>, EngineError>> + Send;

    /// Removes a volume by name. `force` removes it even while in use.
    fn remove_volume(
        &self,
        name: &str,
        force: bool,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Lists all networks.
    fn list_networks(
        &self,
    ) -> impl Future<Output = Result<Vec<NetworkSummary>, EngineError>> + Send;

    /// Removes a network by ID or name.
    fn remove_network(&self, id: &str) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Lists top-level images.
    fn list_images(&self) -> impl Future<Output = Result<Vec<ImageSummary>, EngineError>> + Send;

    /// Removes an image by ID or reference. `force` removes tagged
    /// images; `noprune` keeps untagged parent layers.
    fn remove_image(
        &self,
        id: &str,
        force: bool,
        noprune: bool,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Fetches the raw disk usage snapshot from the engine.
    fn disk_usage(&self) -> impl Future<Output = Result<RawDiskUsage, EngineError>> + Send;

    /// Removes stopped containers.
    fn prune_containers(&self)
    -> impl Future<Output = Result<PruneReport, EngineError>> + Send;

    /// Removes unused volumes.
    fn prune_volumes(&self) -> impl Future<Output = Result<PruneReport, EngineError>> + Send;

    /// Removes unused networks.
    fn prune_networks(&self) -> impl Future<Output = Result<PruneReport, EngineError>> + Send;

    /// Removes unused images, dangling or not.
    fn prune_images(&self) -> impl Future<Output = Result<PruneReport, EngineError>> + Send;

    /// Opens a follow-mode log stream for a container.
    ///
    /// The returned source blocks on reads and must only be consumed
    /// from a dedicated worker context, never from the event loop.
    fn open_log_stream(
        &self,
        id: &str,
        tail: usize,
    ) -> impl Future<Output = Result<Box<dyn ChunkSource>, EngineError>> + Send;

    /// Opens an interactive exec shell inside a container.
    fn open_shell(
        &self,
        id: &str,
        cmd: &[String],
    ) -> impl Future<Output = Result<Box<dyn ShellConduit>, EngineError>> + Send;
}

/// Maps a bollard error to [`EngineError`], preserving the engine message.
fn map_api_err(what: &str, err: bollard::errors::Error) -> EngineError {
    match err {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        } => EngineError::NotFound(what.to_owned()),
        bollard::errors::Error::IOError { .. } => EngineError::Unavailable(format!("{what}: {err}")),
        other => EngineError::Api(format!("{what}: {other}")),
    }
}

/// Production engine client implementation using `bollard`.
///
/// Communicates with the engine daemon over a Unix socket. Internally
/// uses `Arc<bollard::Docker>` for safe sharing across async tasks.
pub struct BollardEngineClient {
    docker: Arc<bollard::Docker>,
}

impl BollardEngineClient {
    /// Connects to the engine using the default local socket.
    pub fn connect_local() -> Result<Self, EngineError> {
        let docker = bollard::Docker::connect_with_local_defaults()
            .map_err(|e| EngineError::Unavailable(format!("failed to connect to engine: {e}")))?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Connects to the engine using a specific socket path.
    pub fn connect_with_socket(socket_path: &str) -> Result<Self, EngineError> {
        let docker =
            bollard::Docker::connect_with_socket(socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| {
                    EngineError::Unavailable(format!(
                        "failed to connect to engine at {socket_path}: {e}"
                    ))
                })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }
}

impl EngineClient for BollardEngineClient {
    async fn ping(&self) -> Result<(), EngineError> {
        self.docker
            .ping()
            .await
            .map_err(|e| EngineError::Unavailable(format!("ping failed: {e}")))?;
        Ok(())
    }

    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, EngineError> {
        use bollard::container::ListContainersOptions;

        let options = ListContainersOptions::<String> {
            all: true,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| map_api_err("containers", e))?;

        let mut result = Vec::with_capacity(containers.len());
        for container in containers {
            let id = container.id.unwrap_or_default();
            let name = container
                .names
                .unwrap_or_default()
                .first()
                .map(|n| n.trim_start_matches('/').to_owned())
                .unwrap_or_default();
            let image = match container.image {
                Some(tag) if !tag.is_empty() => vec![tag],
                _ => vec![short_image_id(&container.image_id.unwrap_or_default())],
            };
            let ports = container
                .ports
                .unwrap_or_default()
                .into_iter()
                .map(|p| PortMapping {
                    ip: p.ip,
                    private_port: u16::try_from(p.private_port).unwrap_or(0),
                    public_port: p.public_port.and_then(|port| u16::try_from(port).ok()),
                    protocol: p.typ.map(|t| t.to_string()),
                })
                .collect();

            result.push(ContainerSummary {
                id,
                name,
                status: container.state.unwrap_or_default(),
                image,
                labels: container.labels.unwrap_or_default(),
                ports,
            });
        }

        Ok(result)
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        use bollard::container::StartContainerOptions;

        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| map_api_err(&format!("container {id}"), e))
    }

    async fn stop_container(&self, id: &str, timeout_secs: i64) -> Result<(), EngineError> {
        use bollard::container::StopContainerOptions;

        self.docker
            .stop_container(id, Some(StopContainerOptions { t: timeout_secs }))
            .await
            .map_err(|e| map_api_err(&format!("container {id}"), e))
    }

    async fn list_volumes(&self) -> Result<Vec<VolumeSummary>, EngineError> {
        use bollard::volume::ListVolumesOptions;

        let response = self
            .docker
            .list_volumes(None::<ListVolumesOptions<String>>)
            .await
            .map_err(|e| map_api_err("volumes", e))?;

        Ok(response
            .volumes
            .unwrap_or_default()
            .into_iter()
            .map(|v| VolumeSummary {
                name: v.name,
                mountpoint: v.mountpoint,
                driver: v.driver,
                labels: v.labels,
                scope: v.scope.map(|s| s.to_string()),
            })
            .collect())
    }

    async fn remove_volume(&self, name: &str, force: bool) -> Result<(), EngineError> {
        use bollard::volume::RemoveVolumeOptions;

        self.docker
            .remove_volume(name, Some(RemoveVolumeOptions { force }))
            .await
            .map_err(|e| map_api_err(&format!("volume {name}"), e))
    }

    async fn list_networks(&self) -> Result<Vec<NetworkSummary>, EngineError> {
        use bollard::network::ListNetworksOptions;

        let networks = self
            .docker
            .list_networks(None::<ListNetworksOptions<String>>)
            .await
            .map_err(|e| map_api_err("networks", e))?;

        Ok(networks
            .into_iter()
            .map(|n| NetworkSummary {
                id: n.id.unwrap_or_default(),
                name: n.name.unwrap_or_default(),
                driver: n.driver,
                scope: n.scope,
                labels: n.labels.unwrap_or_default(),
            })
            .collect())
    }

    async fn remove_network(&self, id: &str) -> Result<(), EngineError> {
        self.docker
            .remove_network(id)
            .await
            .map_err(|e| map_api_err(&format!("network {id}"), e))
    }

    async fn list_images(&self) -> Result<Vec<ImageSummary>, EngineError> {
        use bollard::image::ListImagesOptions;

        let images = self
            .docker
            .list_images(None::<ListImagesOptions<String>>)
            .await
            .map_err(|e| map_api_err("images", e))?;

        Ok(images
            .into_iter()
            .map(|img| ImageSummary {
                short_id: short_image_id(&img.id),
                id: img.id,
                tags: img.repo_tags,
                labels: img.labels,
                size: img.size,
            })
            .collect())
    }

    async fn remove_image(&self, id: &str, force: bool, noprune: bool) -> Result<(), EngineError> {
        use bollard::image::RemoveImageOptions;

        self.docker
            .remove_image(id, Some(RemoveImageOptions { force, noprune }), None)
            .await
            .map_err(|e| map_api_err(&format!("image {id}"), e))?;
        Ok(())
    }

    async fn disk_usage(&self) -> Result<RawDiskUsage, EngineError> {
        let response = self
            .docker
            .df()
            .await
            .map_err(|e| map_api_err("disk usage", e))?;

        Ok(RawDiskUsage {
            layers_size: response.layers_size.unwrap_or(0),
            image_sizes: response
                .images
                .unwrap_or_default()
                .iter()
                .map(|img| img.size)
                .collect(),
            container_rootfs_sizes: response
                .containers
                .unwrap_or_default()
                .iter()
                .map(|c| c.size_root_fs.unwrap_or(0))
                .collect(),
            volume_usage_sizes: response
                .volumes
                .unwrap_or_default()
                .iter()
                .map(|v| v.usage_data.as_ref().map_or(0, |u| u.size))
                .collect(),
            build_cache_sizes: response
                .build_cache
                .unwrap_or_default()
                .iter()
                .map(|b| b.size.unwrap_or(0))
                .collect(),
        })
    }

    async fn prune_containers(&self) -> Result<PruneReport, EngineError> {
        use bollard::container::PruneContainersOptions;

        let response = self
            .docker
            .prune_containers(None::<PruneContainersOptions<String>>)
            .await
            .map_err(|e| map_api_err("container prune", e))?;

        Ok(PruneReport {
            deleted: response.containers_deleted.unwrap_or_default(),
            space_reclaimed: response.space_reclaimed.unwrap_or(0),
        })
    }

    async fn prune_volumes(&self) -> Result<PruneReport, EngineError> {
        use bollard::volume::PruneVolumesOptions;

        let response = self
            .docker
            .prune_volumes(None::<PruneVolumesOptions<String>>)
            .await
            .map_err(|e| map_api_err("volume prune", e))?;

        Ok(PruneReport {
            deleted: response.volumes_deleted.unwrap_or_default(),
            space_reclaimed: response.space_reclaimed.unwrap_or(0),
        })
    }

    async fn prune_networks(&self) -> Result<PruneReport, EngineError> {
        use bollard::network::PruneNetworksOptions;

        let response = self
            .docker
            .prune_networks(None::<PruneNetworksOptions<String>>)
            .await
            .map_err(|e| map_api_err("network prune", e))?;

        Ok(PruneReport {
            deleted: response.networks_deleted.unwrap_or_default(),
            // The engine reports no byte count for network prune.
            space_reclaimed: 0,
        })
    }

    async fn prune_images(&self) -> Result<PruneReport, EngineError> {
        use std::collections::HashMap;

        use bollard::image::PruneImagesOptions;

        // dangling=false widens the prune to every unused image, not
        // just untagged ones.
        let mut filters = HashMap::new();
        filters.insert("dangling".to_owned(), vec!["false".to_owned()]);

        let response = self
            .docker
            .prune_images(Some(PruneImagesOptions { filters }))
            .await
            .map_err(|e| map_api_err("image prune", e))?;

        let deleted = response
            .images_deleted
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| item.deleted.or(item.untagged))
            .collect();

        Ok(PruneReport {
            deleted,
            space_reclaimed: response.space_reclaimed.unwrap_or(0),
        })
    }

    async fn open_log_stream(
        &self,
        id: &str,
        tail: usize,
    ) -> Result<Box<dyn ChunkSource>, EngineError> {
        use bollard::container::LogsOptions;

        let options = LogsOptions::<String> {
            follow: true,
            stdout: true,
            stderr: true,
            tail: tail.to_string(),
            ..Default::default()
        };

        // Verify the container exists up front so a bad ID surfaces as
        // NotFound before any stream is handed out.
        self.docker
            .inspect_container(id, None)
            .await
            .map_err(|e| map_api_err(&format!("container {id}"), e))?;

        let stream = self.docker.logs(id, Some(options));
        Ok(Box::new(LogStreamSource::new(stream)))
    }

    async fn open_shell(
        &self,
        id: &str,
        cmd: &[String],
    ) -> Result<Box<dyn ShellConduit>, EngineError> {
        use bollard::exec::{CreateExecOptions, StartExecResults};

        let exec = self
            .docker
            .create_exec(
                id,
                CreateExecOptions::<String> {
                    attach_stdin: Some(true),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    tty: Some(true),
                    cmd: Some(cmd.to_vec()),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| map_api_err(&format!("container {id}"), e))?;

        match self
            .docker
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| map_api_err(&format!("exec {}", exec.id), e))?
        {
            StartExecResults::Attached { output, input } => {
                Ok(Box::new(ExecShellConduit::new(output, input)))
            }
            StartExecResults::Detached => Err(EngineError::Api(
                "exec started detached despite attach request".to_owned(),
            )),
        }
    }
}

/// 테스트용 Mock 엔진 클라이언트
///
/// 설정 가능한 응답을 반환하여 엔진 없이도 테스트할 수 있습니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockEngineClient {
    /// list_containers 호출 시 반환할 목록
    pub containers: Vec<ContainerSummary>,
    /// list_volumes 호출 시 반환할 목록
    pub volumes: Vec<VolumeSummary>,
    /// list_networks 호출 시 반환할 목록
    pub networks: Vec<NetworkSummary>,
    /// list_images 호출 시 반환할 목록
    pub images: Vec<ImageSummary>,
    /// disk_usage 호출 시 반환할 스냅샷
    pub usage: RawDiskUsage,
    /// 변이 호출 시 실패를 시뮬레이션할지 여부
    pub fail_actions: bool,
}

#[cfg(test)]
impl MockEngineClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_containers(mut self, containers: Vec<ContainerSummary>) -> Self {
        self.containers = containers;
        self
    }

    pub fn with_usage(mut self, usage: RawDiskUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_failing_actions(mut self) -> Self {
        self.fail_actions = true;
        self
    }

    fn check_failure(&self, what: &str) -> Result<(), EngineError> {
        if self.fail_actions {
            Err(EngineError::Api(format!("mock failure: {what}")))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
impl EngineClient for MockEngineClient {
    async fn ping(&self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, EngineError> {
        Ok(self.containers.clone())
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.check_failure("start")?;
        self.containers
            .iter()
            .find(|c| c.id == id)
            .map(|_| ())
            .ok_or_else(|| EngineError::NotFound(format!("container {id}")))
    }

    async fn stop_container(&self, id: &str, _timeout_secs: i64) -> Result<(), EngineError> {
        self.check_failure("stop")?;
        self.containers
            .iter()
            .find(|c| c.id == id)
            .map(|_| ())
            .ok_or_else(|| EngineError::NotFound(format!("container {id}")))
    }

    async fn list_volumes(&self) -> Result<Vec<VolumeSummary>, EngineError> {
        Ok(self.volumes.clone())
    }

    async fn remove_volume(&self, name: &str, _force: bool) -> Result<(), EngineError> {
        self.check_failure("remove_volume")?;
        self.volumes
            .iter()
            .find(|v| v.name == name)
            .map(|_| ())
            .ok_or_else(|| EngineError::NotFound(format!("volume {name}")))
    }

    async fn list_networks(&self) -> Result<Vec<NetworkSummary>, EngineError> {
        Ok(self.networks.clone())
    }

    async fn remove_network(&self, id: &str) -> Result<(), EngineError> {
        self.check_failure("remove_network")?;
        self.networks
            .iter()
            .find(|n| n.id == id)
            .map(|_| ())
            .ok_or_else(|| EngineError::NotFound(format!("network {id}")))
    }

    async fn list_images(&self) -> Result<Vec<ImageSummary>, EngineError> {
        Ok(self.images.clone())
    }

    async fn remove_image(&self, id: &str, _force: bool, _noprune: bool) -> Result<(), EngineError> {
        self.check_failure("remove_image")?;
        self.images
            .iter()
            .find(|img| img.id == id)
            .map(|_| ())
            .ok_or_else(|| EngineError::NotFound(format!("image {id}")))
    }

    async fn disk_usage(&self) -> Result<RawDiskUsage, EngineError> {
        Ok(self.usage.clone())
    }

    async fn prune_containers(&self) -> Result<PruneReport, EngineError> {
        self.check_failure("prune_containers")?;
        Ok(PruneReport::default())
    }

    async fn prune_volumes(&self) -> Result<PruneReport, EngineError> {
        self.check_failure("prune_volumes")?;
        Ok(PruneReport::default())
    }

    async fn prune_networks(&self) -> Result<PruneReport, EngineError> {
        self.check_failure("prune_networks")?;
        Ok(PruneReport::default())
    }

    async fn prune_images(&self) -> Result<PruneReport, EngineError> {
        self.check_failure("prune_images")?;
        Ok(PruneReport::default())
    }

    async fn open_log_stream(
        &self,
        id: &str,
        _tail: usize,
    ) -> Result<Box<dyn ChunkSource>, EngineError> {
        self.containers
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| EngineError::NotFound(format!("container {id}")))?;
        Ok(Box::new(crate::stream::testing::StaticSource::new(vec![])))
    }

    async fn open_shell(
        &self,
        id: &str,
        _cmd: &[String],
    ) -> Result<Box<dyn ShellConduit>, EngineError> {
        self.containers
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| EngineError::NotFound(format!("container {id}")))?;
        Ok(Box::new(crate::stream::testing::LoopbackConduit::new()))
    }
}
