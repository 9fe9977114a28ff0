//! Dockyard 공통 크레이트 — 컨테이너 엔진 호스트 제어 평면의 공유 기반.
//!
//! 에러 분류, 도메인 타입, 데몬 설정, 그리고 엔진 크레이트가 구현하고
//! 세션 크레이트가 소비하는 블로킹 스트림 seam trait을 정의합니다.

pub mod config;
pub mod error;
pub mod metrics;
pub mod stream;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, DockyardError};

// 설정
pub use config::DockyardConfig;

// 스트림 seam trait
pub use stream::{ChunkSource, ShellConduit, ShellInput, StreamFault};

// 도메인 타입
pub use types::{
    CategoryUsage, CleanupFlags, ContainerSummary, DiskUsageSummary, ImageSummary, NetworkSummary,
    PruneReport, PruneResults, RawDiskUsage, StackDescriptor, VolumeSummary,
};
