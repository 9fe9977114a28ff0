use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;

use dockyard_core::config::DockyardConfig;
use dockyard_core::error::ConfigError;
use dockyard_core::metrics::{DAEMON_BUILD_INFO, DAEMON_UPTIME_SECONDS};
use dockyard_daemon::cli::DaemonCli;
use dockyard_daemon::logging;
use dockyard_daemon::metrics_server;
use dockyard_daemon::service::ControlPlane;
use dockyard_engine::BollardEngineClient;
use dockyard_session::{StaticTokenVerifier, TokenVerifier};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // 설정 로드: 파일이 없으면 기본값 + 환경변수 오버라이드로 동작
    let mut config = match DockyardConfig::load(&cli.config).await {
        Ok(config) => config,
        Err(dockyard_core::DockyardError::Config(ConfigError::FileNotFound { path })) => {
            eprintln!("config file {path} not found, using defaults");
            let mut config = DockyardConfig::default();
            config.apply_env_overrides();
            config
        }
        Err(e) => return Err(anyhow::anyhow!("failed to load config: {e}")),
    };

    // CLI 오버라이드가 최우선
    if let Some(log_level) = cli.log_level {
        config.general.log_level = log_level;
    }
    if let Some(log_format) = cli.log_format {
        config.general.log_format = log_format;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!("dockyard-daemon starting");

    if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)?;
        metrics::gauge!(DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
        let started = Instant::now();
        tokio::spawn(async move {
            loop {
                metrics::gauge!(DAEMON_UPTIME_SECONDS).set(started.elapsed().as_secs_f64());
                tokio::time::sleep(Duration::from_secs(15)).await;
            }
        });
    }

    let token = std::env::var("DOCKYARD_API_TOKEN")
        .context("DOCKYARD_API_TOKEN must be set; sessions cannot be authorized without it")?;
    let verifier = Arc::new(StaticTokenVerifier::new(token));
    if !verifier.is_set_up() {
        anyhow::bail!("DOCKYARD_API_TOKEN is empty; sessions cannot be authorized");
    }

    // 엔진에 도달할 수 없으면 기동 자체를 실패시킨다
    let client = BollardEngineClient::connect_with_socket(&config.engine.socket)
        .map_err(|e| anyhow::anyhow!("failed to create engine client: {e}"))?;
    let control = ControlPlane::new(client, &config, verifier);
    control
        .ping()
        .await
        .map_err(|e| anyhow::anyhow!("engine unreachable at startup: {e}"))?;
    tracing::info!(socket = %config.engine.socket, "engine connection verified");

    // 전송 레이어는 라이브러리 API를 통해 control plane에 접속한다
    tracing::info!("dockyard-daemon running");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    tracing::info!("dockyard-daemon shut down");
    Ok(())
}
