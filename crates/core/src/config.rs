//! 설정 관리 — dockyard.toml 파싱 및 런타임 설정
//!
//! [`DockyardConfig`]는 데몬 전체의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`DOCKYARD_ENGINE_SOCKET=/run/docker.sock` 형식)
//! 3. 설정 파일 (`dockyard.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! 스택 루트/프론트엔드 포트/테마 같은 런타임 가변 설정 문서는 이
//! 구조체가 아니라 데몬의 settings 모듈이 별도 JSON 파일로 관리합니다.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, DockyardError};

/// Dockyard 통합 설정
///
/// `dockyard.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DockyardConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 엔진 게이트웨이 설정
    #[serde(default)]
    pub engine: EngineConfig,
    /// 변이 작업 레이트 리밋 설정
    #[serde(default)]
    pub limits: LimitsConfig,
    /// 스트리밍 세션 설정
    #[serde(default)]
    pub session: SessionConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl DockyardConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DockyardError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DockyardError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DockyardError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                DockyardError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, DockyardError> {
        toml::from_str(toml_str).map_err(|e| {
            DockyardError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `DOCKYARD_{SECTION}_{FIELD}`
    /// 예: `DOCKYARD_ENGINE_SOCKET=/run/docker.sock`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "DOCKYARD_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "DOCKYARD_GENERAL_LOG_FORMAT");
        override_string(
            &mut self.general.settings_file,
            "DOCKYARD_GENERAL_SETTINGS_FILE",
        );

        // Engine
        override_string(&mut self.engine.socket, "DOCKYARD_ENGINE_SOCKET");
        override_usize(
            &mut self.engine.default_log_tail,
            "DOCKYARD_ENGINE_DEFAULT_LOG_TAIL",
        );
        override_i64(
            &mut self.engine.stop_timeout_secs,
            "DOCKYARD_ENGINE_STOP_TIMEOUT_SECS",
        );
        override_csv(&mut self.engine.shell_command, "DOCKYARD_ENGINE_SHELL_COMMAND");

        // Limits
        override_usize(&mut self.limits.mutation_limit, "DOCKYARD_LIMITS_MUTATION_LIMIT");
        override_u64(&mut self.limits.window_seconds, "DOCKYARD_LIMITS_WINDOW_SECONDS");

        // Session
        override_usize(
            &mut self.session.channel_capacity,
            "DOCKYARD_SESSION_CHANNEL_CAPACITY",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "DOCKYARD_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "DOCKYARD_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "DOCKYARD_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), DockyardError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.engine.socket.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "engine.socket".to_owned(),
                reason: "socket path must not be empty".to_owned(),
            }
            .into());
        }

        if self.engine.shell_command.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "engine.shell_command".to_owned(),
                reason: "shell command must not be empty".to_owned(),
            }
            .into());
        }

        if self.limits.mutation_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.mutation_limit".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.limits.window_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.window_seconds".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.session.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 런타임 설정 문서(JSON) 경로
    pub settings_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            settings_file: "/var/lib/dockyard/settings.json".to_owned(),
        }
    }
}

/// 엔진 게이트웨이 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 엔진 소켓 경로
    pub socket: String,
    /// 로그 tail 기본 라인 수
    pub default_log_tail: usize,
    /// 컨테이너 정지 기본 유예 시간 (초)
    pub stop_timeout_secs: i64,
    /// 대화형 셸 기본 커맨드
    pub shell_command: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            socket: "/var/run/docker.sock".to_owned(),
            default_log_tail: 200,
            stop_timeout_secs: 10,
            shell_command: vec!["/bin/sh".to_owned()],
        }
    }
}

/// 변이 작업 레이트 리밋 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// 윈도우당 허용 호출 수
    pub mutation_limit: usize,
    /// 슬라이딩 윈도우 길이 (초)
    pub window_seconds: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            mutation_limit: 5,
            window_seconds: 60,
        }
    }
}

/// 스트리밍 세션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// 워커 → 이벤트 루프 핸드오프 채널 용량 (청크 수)
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
        }
    }
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 수신 주소
    pub listen_addr: String,
    /// 수신 포트
    pub port: u16,
    /// 스크레이프 엔드포인트 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9275,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_i64(target: &mut i64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<i64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse i64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split(',').map(|s| s.trim().to_owned()).collect();
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = DockyardConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.engine.socket, "/var/run/docker.sock");
        assert_eq!(config.engine.default_log_tail, 200);
        assert_eq!(config.limits.mutation_limit, 5);
        assert_eq!(config.limits.window_seconds, 60);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn default_config_passes_validation() {
        let config = DockyardConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = DockyardConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.engine.shell_command, vec!["/bin/sh"]);
    }

    #[test]
    fn parse_partial_toml_merges_with_defaults() {
        let toml = r#"
[general]
log_level = "debug"

[engine]
socket = "/run/docker.sock"
default_log_tail = 500
"#;
        let config = DockyardConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        // log_format은 기본값 유지
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.engine.socket, "/run/docker.sock");
        assert_eq!(config.engine.default_log_tail, 500);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[general]
log_level = "warn"
log_format = "pretty"
settings_file = "/opt/dockyard/settings.json"

[engine]
socket = "/run/user/1000/docker.sock"
default_log_tail = 100
stop_timeout_secs = 30
shell_command = ["/bin/bash", "-l"]

[limits]
mutation_limit = 10
window_seconds = 120

[session]
channel_capacity = 256

[metrics]
enabled = true
listen_addr = "0.0.0.0"
port = 9300
"#;
        let config = DockyardConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.engine.stop_timeout_secs, 30);
        assert_eq!(config.engine.shell_command, vec!["/bin/bash", "-l"]);
        assert_eq!(config.limits.mutation_limit, 10);
        assert_eq!(config.session.channel_capacity, 256);
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.port, 9300);
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let result = DockyardConfig::parse("invalid = [[[toml");
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            DockyardError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = DockyardConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = DockyardConfig::default();
        config.general.log_format = "xml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    fn validate_rejects_empty_socket() {
        let mut config = DockyardConfig::default();
        config.engine.socket = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("engine.socket"));
    }

    #[test]
    fn validate_rejects_zero_limit() {
        let mut config = DockyardConfig::default();
        config.limits.mutation_limit = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("mutation_limit"));
    }

    #[test]
    fn validate_rejects_zero_window() {
        let mut config = DockyardConfig::default();
        config.limits.window_seconds = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("window_seconds"));
    }

    #[test]
    fn validate_rejects_zero_channel_capacity() {
        let mut config = DockyardConfig::default();
        config.session.channel_capacity = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("channel_capacity"));
    }

    #[test]
    fn validate_rejects_empty_shell_command() {
        let mut config = DockyardConfig::default();
        config.engine.shell_command = Vec::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("shell_command"));
    }

    #[test]
    #[serial]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_DOCKYARD_STR", "overridden") };
        override_string(&mut val, "TEST_DOCKYARD_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_DOCKYARD_STR") };
    }

    #[test]
    #[serial]
    fn env_override_usize_invalid_keeps_original() {
        let mut val = 200usize;
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_DOCKYARD_USIZE_BAD", "not-a-number") };
        override_usize(&mut val, "TEST_DOCKYARD_USIZE_BAD");
        assert_eq!(val, 200); // 원래 값 유지
        unsafe { std::env::remove_var("TEST_DOCKYARD_USIZE_BAD") };
    }

    #[test]
    #[serial]
    fn env_override_csv() {
        let mut val = vec!["/bin/sh".to_owned()];
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_DOCKYARD_CSV", "/bin/bash, -l") };
        override_csv(&mut val, "TEST_DOCKYARD_CSV");
        assert_eq!(val, vec!["/bin/bash", "-l"]);
        unsafe { std::env::remove_var("TEST_DOCKYARD_CSV") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = "original".to_owned();
        override_string(&mut val, "TEST_DOCKYARD_NONEXISTENT_12345");
        assert_eq!(val, "original");
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = DockyardConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = DockyardConfig::parse(&toml_str).unwrap();
        assert_eq!(config.general.log_level, parsed.general.log_level);
        assert_eq!(config.engine.socket, parsed.engine.socket);
        assert_eq!(config.limits.window_seconds, parsed.limits.window_seconds);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let result = DockyardConfig::from_file("/nonexistent/path/dockyard.toml").await;
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            DockyardError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
