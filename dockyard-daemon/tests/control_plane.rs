//! End-to-end tests for the control plane service, driven through a
//! mock engine client and a mock client connection.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use dockyard_core::DockyardError;
use dockyard_core::config::DockyardConfig;
use dockyard_core::stream::{ChunkSource, ShellConduit, StreamFault};
use dockyard_core::types::{
    CleanupFlags, ContainerSummary, ImageSummary, NetworkSummary, PruneReport, RawDiskUsage,
    VolumeSummary,
};
use dockyard_daemon::service::{ControlPlane, DeployAction};
use dockyard_daemon::settings::{SettingsDocument, SettingsStore};
use dockyard_engine::{EngineClient, EngineError};
use dockyard_session::{
    BridgeOutcome, ClientConnection, ClientMessage, ClientReceiver, ClientSender, ConnectionError,
    NORMAL_CLOSE, StaticTokenVerifier, UNAUTHORIZED_CLOSE,
};

const TOKEN: &str = "test-token";

// --- engine mock ---

#[derive(Default, Clone)]
struct MockEngine {
    containers: Vec<ContainerSummary>,
    usage: RawDiskUsage,
    log_chunks: Vec<Bytes>,
    log_fault: Option<String>,
}

impl MockEngine {
    fn find_container(&self, id: &str) -> Result<(), EngineError> {
        self.containers
            .iter()
            .find(|c| c.id == id)
            .map(|_| ())
            .ok_or_else(|| EngineError::NotFound(format!("container {id}")))
    }
}

struct VecSource(VecDeque<Result<Bytes, StreamFault>>);

impl ChunkSource for VecSource {
    fn next_chunk(&mut self) -> Option<Result<Bytes, StreamFault>> {
        self.0.pop_front()
    }
}

impl EngineClient for MockEngine {
    async fn ping(&self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, EngineError> {
        Ok(self.containers.clone())
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.find_container(id)
    }

    async fn stop_container(&self, id: &str, _timeout_secs: i64) -> Result<(), EngineError> {
        self.find_container(id)
    }

    async fn list_volumes(&self) -> Result<Vec<VolumeSummary>, EngineError> {
        Ok(Vec::new())
    }

    async fn remove_volume(&self, name: &str, _force: bool) -> Result<(), EngineError> {
        Err(EngineError::NotFound(format!("volume {name}")))
    }

    async fn list_networks(&self) -> Result<Vec<NetworkSummary>, EngineError> {
        Ok(Vec::new())
    }

    async fn remove_network(&self, id: &str) -> Result<(), EngineError> {
        Err(EngineError::NotFound(format!("network {id}")))
    }

    async fn list_images(&self) -> Result<Vec<ImageSummary>, EngineError> {
        Ok(Vec::new())
    }

    async fn remove_image(&self, id: &str, _force: bool, _noprune: bool) -> Result<(), EngineError> {
        Err(EngineError::NotFound(format!("image {id}")))
    }

    async fn disk_usage(&self) -> Result<RawDiskUsage, EngineError> {
        Ok(self.usage.clone())
    }

    async fn prune_containers(&self) -> Result<PruneReport, EngineError> {
        Ok(PruneReport::default())
    }

    async fn prune_volumes(&self) -> Result<PruneReport, EngineError> {
        Ok(PruneReport::default())
    }

    async fn prune_networks(&self) -> Result<PruneReport, EngineError> {
        Ok(PruneReport::default())
    }

    async fn prune_images(&self) -> Result<PruneReport, EngineError> {
        Ok(PruneReport {
            deleted: vec!["sha256:aaa".to_owned()],
            space_reclaimed: 42,
        })
    }

    async fn open_log_stream(
        &self,
        id: &str,
        _tail: usize,
    ) -> Result<Box<dyn ChunkSource>, EngineError> {
        self.find_container(id)?;
        let mut chunks: VecDeque<_> = self.log_chunks.iter().cloned().map(Ok).collect();
        if let Some(fault) = &self.log_fault {
            chunks.push_back(Err(StreamFault(fault.clone())));
        }
        Ok(Box::new(VecSource(chunks)))
    }

    async fn open_shell(
        &self,
        id: &str,
        _cmd: &[String],
    ) -> Result<Box<dyn ShellConduit>, EngineError> {
        self.find_container(id)?;
        Err(EngineError::Api("shell not supported by mock".to_owned()))
    }
}

// --- connection mock ---

#[derive(Debug, Clone, PartialEq, Eq)]
enum SentFrame {
    Chunk(Bytes),
    Text(String),
    Close(u16),
}

struct MockConnection {
    incoming: VecDeque<ClientMessage>,
    sent: Arc<Mutex<Vec<SentFrame>>>,
}

impl MockConnection {
    fn new() -> (Self, Arc<Mutex<Vec<SentFrame>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                incoming: VecDeque::new(),
                sent: Arc::clone(&sent),
            },
            sent,
        )
    }
}

struct MockSender(Arc<Mutex<Vec<SentFrame>>>);
struct MockReceiver(VecDeque<ClientMessage>);

impl ClientConnection for MockConnection {
    type Sender = MockSender;
    type Receiver = MockReceiver;

    fn split(self) -> (MockSender, MockReceiver) {
        (MockSender(self.sent), MockReceiver(self.incoming))
    }
}

impl ClientSender for MockSender {
    async fn send_chunk(&mut self, data: Bytes) -> Result<(), ConnectionError> {
        self.0.lock().unwrap().push(SentFrame::Chunk(data));
        Ok(())
    }

    async fn send_text(&mut self, text: String) -> Result<(), ConnectionError> {
        self.0.lock().unwrap().push(SentFrame::Text(text));
        Ok(())
    }

    async fn close(&mut self, code: u16) -> Result<(), ConnectionError> {
        self.0.lock().unwrap().push(SentFrame::Close(code));
        Ok(())
    }
}

impl ClientReceiver for MockReceiver {
    async fn recv(&mut self) -> Option<Result<ClientMessage, ConnectionError>> {
        match self.0.pop_front() {
            Some(message) => Some(Ok(message)),
            // connection stays open with no client input
            None => std::future::pending().await,
        }
    }
}

// --- harness ---

struct Harness {
    control: ControlPlane<MockEngine>,
    _dir: tempfile::TempDir,
}

async fn harness(engine: MockEngine) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let settings_file = dir.path().join("settings.json");
    let stack_root = dir.path().join("stacks");

    let mut config = DockyardConfig::default();
    config.general.settings_file = settings_file.display().to_string();

    // point the registry at a writable root inside the tempdir
    SettingsStore::new(&settings_file)
        .save(&SettingsDocument {
            stack_root: stack_root.display().to_string(),
            frontend_port: 18675,
            theme: "light".to_owned(),
        })
        .await
        .unwrap();

    Harness {
        control: ControlPlane::new(engine, &config, Arc::new(StaticTokenVerifier::new(TOKEN))),
        _dir: dir,
    }
}

fn running_container(id: &str) -> ContainerSummary {
    ContainerSummary {
        id: id.to_owned(),
        name: "web".to_owned(),
        status: "running".to_owned(),
        image: vec!["nginx:latest".to_owned()],
        labels: Default::default(),
        ports: vec![],
    }
}

// --- rate limiting ---

#[tokio::test]
async fn sixth_mutation_of_same_action_is_rate_limited() {
    let h = harness(MockEngine {
        containers: vec![running_container("abc123")],
        ..Default::default()
    })
    .await;

    for _ in 0..5 {
        h.control.container_start("abc123").await.unwrap();
    }
    let err = h.control.container_start("abc123").await.unwrap_err();
    assert!(matches!(err, DockyardError::RateLimited { .. }));

    // a different action is unaffected
    h.control.container_stop("abc123").await.unwrap();
}

#[tokio::test]
async fn reads_are_never_rate_limited() {
    let h = harness(MockEngine::default()).await;
    for _ in 0..20 {
        h.control.containers().await.unwrap();
    }
}

// --- cleanup ---

#[tokio::test]
async fn cleanup_reports_only_selected_categories() {
    let h = harness(MockEngine::default()).await;
    let report = h
        .control
        .cleanup(CleanupFlags {
            images: true,
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(report.results.images.is_some());
    assert!(report.results.containers.is_none());
    assert!(report.results.volumes.is_none());
    assert!(report.results.networks.is_none());
    // mock usage is unchanged by the prune, so nothing was reclaimed
    assert_eq!(report.space_reclaimed, 0);
}

#[tokio::test]
async fn cleanup_with_no_categories_is_a_validation_error() {
    let h = harness(MockEngine::default()).await;
    let err = h.control.cleanup(CleanupFlags::default()).await.unwrap_err();
    assert!(matches!(err, DockyardError::Validation(_)));
}

#[tokio::test]
async fn disk_usage_uses_engine_accounting() {
    let h = harness(MockEngine {
        usage: RawDiskUsage {
            layers_size: 1000,
            image_sizes: vec![600, 400],
            container_rootfs_sizes: vec![50],
            volume_usage_sizes: vec![200],
            build_cache_sizes: vec![25],
        },
        ..Default::default()
    })
    .await;

    let summary = h.control.disk_usage().await.unwrap();
    assert_eq!(summary.total_size, 1275);
    assert_eq!(summary.images.count, 2);
}

// --- stacks ---

#[tokio::test]
async fn stack_create_read_and_conflict() {
    let h = harness(MockEngine::default()).await;

    h.control
        .stack_create("web", "services: {}\n", Some("PORT=80\n"), false)
        .await
        .unwrap();

    let contents = h.control.stack_read("web").await.unwrap();
    assert_eq!(contents.compose, "services: {}\n");
    assert_eq!(contents.env, "PORT=80\n");

    let err = h
        .control
        .stack_create("web", "services: {}\n", None, false)
        .await
        .unwrap_err();
    assert!(matches!(err, DockyardError::Conflict(_)));
}

#[tokio::test]
async fn stack_names_are_validated_before_any_filesystem_access() {
    let h = harness(MockEngine::default()).await;
    for name in ["../evil", "a/b", ""] {
        let err = h.control.stack_read(name).await.unwrap_err();
        assert!(
            matches!(err, DockyardError::Validation(_)),
            "expected validation error for {name:?}"
        );
    }
}

#[tokio::test]
async fn stacks_are_listed_sorted() {
    let h = harness(MockEngine::default()).await;
    h.control
        .stack_create("zeta", "services: {}\n", None, false)
        .await
        .unwrap();
    h.control
        .stack_create("alpha", "services: {}\n", None, false)
        .await
        .unwrap();

    let stacks = h.control.stacks().await.unwrap();
    let names: Vec<_> = stacks.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["alpha", "zeta"]);
}

// --- settings ---

#[tokio::test]
async fn settings_update_changes_stack_root_for_subsequent_calls() {
    let h = harness(MockEngine::default()).await;
    let other_root = h._dir.path().join("other-root");

    h.control
        .update_settings(dockyard_daemon::settings::SettingsPatch {
            stack_root: Some(other_root.display().to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    // old root's stacks are no longer visible; new root is empty
    assert!(h.control.stacks().await.unwrap().is_empty());
    let document = h.control.settings().await.unwrap();
    assert_eq!(document.stack_root, other_root.display().to_string());
}

// --- streaming sessions ---

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn log_session_streams_chunks_in_order() {
    let h = harness(MockEngine {
        containers: vec![running_container("abc123")],
        log_chunks: vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")],
        ..Default::default()
    })
    .await;

    let (conn, sent) = MockConnection::new();
    let outcome = h
        .control
        .log_session(conn, Some(TOKEN), "abc123", None)
        .await;

    assert_eq!(outcome, Some(BridgeOutcome::Completed));
    let frames = sent.lock().unwrap();
    assert_eq!(
        *frames,
        vec![
            SentFrame::Text("a".to_owned()),
            SentFrame::Text("b".to_owned()),
            SentFrame::Close(NORMAL_CLOSE),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn log_session_delivers_invalid_utf8_with_replacement() {
    let h = harness(MockEngine {
        containers: vec![running_container("abc123")],
        log_chunks: vec![Bytes::from_static(b"partial \xf0\x9f line\n")],
        ..Default::default()
    })
    .await;

    let (conn, sent) = MockConnection::new();
    let outcome = h
        .control
        .log_session(conn, Some(TOKEN), "abc123", None)
        .await;

    assert_eq!(outcome, Some(BridgeOutcome::Completed));
    let frames = sent.lock().unwrap();
    assert_eq!(
        frames[0],
        SentFrame::Text("partial \u{FFFD} line\n".to_owned())
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn log_session_with_bad_token_closes_with_auth_code() {
    let h = harness(MockEngine {
        containers: vec![running_container("abc123")],
        ..Default::default()
    })
    .await;

    let (conn, sent) = MockConnection::new();
    let outcome = h
        .control
        .log_session(conn, Some("wrong"), "abc123", None)
        .await;

    assert_eq!(outcome, None);
    let frames = sent.lock().unwrap();
    assert_eq!(*frames, vec![SentFrame::Close(UNAUTHORIZED_CLOSE)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn log_session_without_token_closes_with_auth_code() {
    let h = harness(MockEngine {
        containers: vec![running_container("abc123")],
        ..Default::default()
    })
    .await;

    let (conn, sent) = MockConnection::new();
    let outcome = h.control.log_session(conn, None, "abc123", None).await;

    assert_eq!(outcome, None);
    let frames = sent.lock().unwrap();
    assert_eq!(*frames, vec![SentFrame::Close(UNAUTHORIZED_CLOSE)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn log_session_for_unknown_container_is_rejected_with_notification() {
    let h = harness(MockEngine::default()).await;

    let (conn, sent) = MockConnection::new();
    let outcome = h.control.log_session(conn, Some(TOKEN), "ghost", None).await;

    assert_eq!(outcome, None);
    let frames = sent.lock().unwrap();
    assert_eq!(frames.len(), 2);
    match &frames[0] {
        SentFrame::Text(payload) => {
            let value: serde_json::Value = serde_json::from_str(payload).unwrap();
            assert!(value["error"].as_str().unwrap().contains("ghost"));
        }
        other => panic!("expected error notification, got {other:?}"),
    }
    assert_eq!(frames[1], SentFrame::Close(NORMAL_CLOSE));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn log_session_fault_sends_single_error_notification() {
    let h = harness(MockEngine {
        containers: vec![running_container("abc123")],
        log_chunks: vec![Bytes::from_static(b"last line")],
        log_fault: Some("engine stream dropped".to_owned()),
        ..Default::default()
    })
    .await;

    let (conn, sent) = MockConnection::new();
    let outcome = h
        .control
        .log_session(conn, Some(TOKEN), "abc123", None)
        .await;

    assert_eq!(
        outcome,
        Some(BridgeOutcome::Faulted("engine stream dropped".to_owned()))
    );
    let frames = sent.lock().unwrap();
    assert_eq!(frames[0], SentFrame::Text("last line".to_owned()));
    assert!(matches!(frames[1], SentFrame::Text(_)));
    assert_eq!(frames[2], SentFrame::Close(NORMAL_CLOSE));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deploy_session_with_unknown_stack_is_rejected() {
    let h = harness(MockEngine::default()).await;

    let (conn, sent) = MockConnection::new();
    let outcome = h
        .control
        .deploy_session(conn, Some(TOKEN), "ghost", DeployAction::Up)
        .await;

    assert_eq!(outcome, None);
    let frames = sent.lock().unwrap();
    assert!(matches!(frames[0], SentFrame::Text(_)));
    assert_eq!(frames[1], SentFrame::Close(NORMAL_CLOSE));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deploy_up_and_down_use_separate_rate_windows() {
    let h = harness(MockEngine::default()).await;

    // the window is consumed before stack resolution, so unknown-stack
    // deploys still count as admissions
    for _ in 0..5 {
        let (conn, _sent) = MockConnection::new();
        h.control
            .deploy_session(conn, Some(TOKEN), "ghost", DeployAction::Up)
            .await;
    }

    let (conn, sent) = MockConnection::new();
    h.control
        .deploy_session(conn, Some(TOKEN), "ghost", DeployAction::Up)
        .await;
    let frames = sent.lock().unwrap();
    match &frames[0] {
        SentFrame::Text(payload) => assert!(payload.contains("rate limit exceeded")),
        other => panic!("expected rate limit rejection, got {other:?}"),
    }
    drop(frames);

    // the down window is untouched; rejection is about the stack, not
    // the limit
    let (conn, sent) = MockConnection::new();
    h.control
        .deploy_session(conn, Some(TOKEN), "ghost", DeployAction::Down)
        .await;
    let frames = sent.lock().unwrap();
    match &frames[0] {
        SentFrame::Text(payload) => {
            assert!(payload.contains("not found"));
            assert!(!payload.contains("rate limit"));
        }
        other => panic!("expected stack rejection, got {other:?}"),
    }
}
