//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `dockyard_`
//! - 접미어: `_total` (counter), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 작업 이름 레이블 키 (container_start, cleanup 등)
pub const LABEL_ACTION: &str = "action";

/// 세션 종류 레이블 키 (logs, shell, deploy)
pub const LABEL_SESSION_KIND: &str = "kind";

/// 세션 종료 사유 레이블 키 (completed, faulted, client_closed, unauthorized)
pub const LABEL_OUTCOME: &str = "outcome";

// ─── 세션 메트릭 ───────────────────────────────────────────────────

/// 시작된 스트리밍 세션 수 (counter, label: kind)
pub const SESSIONS_OPENED_TOTAL: &str = "dockyard_sessions_opened_total";

/// 종료된 스트리밍 세션 수 (counter, labels: kind, outcome)
pub const SESSIONS_CLOSED_TOTAL: &str = "dockyard_sessions_closed_total";

// ─── 레이트 리미터 메트릭 ──────────────────────────────────────────

/// 레이트 리밋으로 거부된 호출 수 (counter, label: action)
pub const RATE_LIMIT_REJECTIONS_TOTAL: &str = "dockyard_rate_limit_rejections_total";

// ─── 엔진 게이트웨이 메트릭 ────────────────────────────────────────

/// 엔진 호출 실패 수 (counter)
pub const ENGINE_ERRORS_TOTAL: &str = "dockyard_engine_errors_total";

// ─── 데몬 메트릭 ───────────────────────────────────────────────────

/// 데몬 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "dockyard_daemon_uptime_seconds";

/// 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "dockyard_daemon_build_info";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출하세요.
pub fn describe_all() {
    metrics::describe_counter!(
        SESSIONS_OPENED_TOTAL,
        "Number of streaming sessions accepted"
    );
    metrics::describe_counter!(
        SESSIONS_CLOSED_TOTAL,
        "Number of streaming sessions closed, by outcome"
    );
    metrics::describe_counter!(
        RATE_LIMIT_REJECTIONS_TOTAL,
        "Number of calls rejected by the sliding-window rate limiter"
    );
    metrics::describe_counter!(ENGINE_ERRORS_TOTAL, "Number of failed engine calls");
    metrics::describe_gauge!(DAEMON_UPTIME_SECONDS, "Daemon uptime in seconds");
    metrics::describe_gauge!(DAEMON_BUILD_INFO, "Build information (value is always 1)");
}
