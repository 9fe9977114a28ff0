//! 에러 타입 — 제어 평면 전역의 실패 분류
//!
//! [`DockyardError`]는 경계 레이어가 전송 프로토콜의 상태 코드로 변환하는
//! 최상위 분류입니다. 각 모듈 크레이트는 자체 에러 타입을 정의하고
//! `From` 변환으로 이 분류에 합류합니다.

/// Dockyard 최상위 에러 타입
///
/// 모든 작업은 첫 번째로 일치하는 분류를 종단 실패로 보고합니다.
/// 엔진 실패는 일시적이라고 가정하지 않으며 자동 재시도하지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum DockyardError {
    /// 입력 검증 실패 — 어떤 I/O도 수행하기 전에 거부됨
    #[error("validation error: {0}")]
    Validation(String),

    /// 인증 실패 — 엔진 접근 전에 거부됨
    #[error("authentication required")]
    Unauthorized,

    /// 대상(컨테이너/볼륨/네트워크/이미지/스택)을 찾을 수 없음
    #[error("not found: {0}")]
    NotFound(String),

    /// 대상이 이미 존재함 (overwrite 미지정)
    #[error("conflict: {0}")]
    Conflict(String),

    /// 슬라이딩 윈도우 한도 초과
    #[error("rate limit exceeded for {action}")]
    RateLimited {
        /// 거부된 작업 이름
        action: String,
    },

    /// 엔진 엔드포인트에 도달할 수 없음 — 해당 게이트웨이 인스턴스에 치명적
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    /// 그 외 엔진이 보고한 실패 (엔진 메시지 그대로 노출)
    #[error("engine error: {0}")]
    Engine(String),

    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound {
        /// 찾지 못한 파일 경로
        path: String,
    },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed {
        /// 파싱 실패 사유
        reason: String,
    },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}
