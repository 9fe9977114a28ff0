//! 도메인 타입 — 제어 평면 전역에서 사용되는 공통 타입
//!
//! 엔진 인벤토리의 읽기 전용 투영(summary), 스택 디스크립터,
//! 디스크 사용량 집계 타입을 정의합니다. summary는 매 조회마다 새로
//! 생성되며 캐시되지 않고, 엔진 자체 ID 외의 identity를 갖지 않습니다.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// 컨테이너 요약
///
/// 엔진 인벤토리 목록에서 생성되는 읽기 전용 투영입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSummary {
    /// 컨테이너 ID (엔진 전체 ID)
    pub id: String,
    /// 표시 이름 (선행 `/` 제거됨)
    pub name: String,
    /// 상태 문자열 (running, exited 등)
    pub status: String,
    /// 이미지 태그 목록 (태그가 없으면 short ID 하나)
    pub image: Vec<String>,
    /// 레이블
    pub labels: HashMap<String, String>,
    /// 포트 매핑
    pub ports: Vec<PortMapping>,
}

/// 포트 매핑 항목
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortMapping {
    /// 호스트 바인드 IP (있을 경우)
    pub ip: Option<String>,
    /// 컨테이너 내부 포트
    pub private_port: u16,
    /// 호스트 공개 포트 (있을 경우)
    pub public_port: Option<u16>,
    /// 프로토콜 (tcp, udp)
    pub protocol: Option<String>,
}

/// 볼륨 요약
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeSummary {
    /// 볼륨 이름
    pub name: String,
    /// 호스트 마운트 지점
    pub mountpoint: String,
    /// 드라이버 이름
    pub driver: String,
    /// 레이블
    pub labels: HashMap<String, String>,
    /// 스코프 (local, global)
    pub scope: Option<String>,
}

/// 네트워크 요약
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSummary {
    /// 네트워크 ID
    pub id: String,
    /// 네트워크 이름
    pub name: String,
    /// 드라이버 이름
    pub driver: Option<String>,
    /// 스코프
    pub scope: Option<String>,
    /// 레이블
    pub labels: HashMap<String, String>,
}

/// 이미지 요약
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSummary {
    /// 이미지 ID (`sha256:` 접두어 포함)
    pub id: String,
    /// 태그 목록
    pub tags: Vec<String>,
    /// 축약 ID
    pub short_id: String,
    /// 레이블
    pub labels: HashMap<String, String>,
    /// 이미지 크기 (바이트)
    pub size: i64,
}

/// 이미지 ID의 축약형을 계산합니다.
///
/// `sha256:` 접두어가 있으면 접두어 + 해시 10자리, 없으면 앞 10자리입니다.
pub fn short_image_id(id: &str) -> String {
    const PREFIX: &str = "sha256:";
    if let Some(hash) = id.strip_prefix(PREFIX) {
        let end = hash.len().min(10);
        format!("{PREFIX}{}", &hash[..end])
    } else {
        let end = id.len().min(10);
        id[..end].to_owned()
    }
}

/// 스택 디스크립터
///
/// 설정된 스택 루트 아래의 compose 스타일 디렉토리 하나를 가리킵니다.
/// `name`은 단일 경로 세그먼트여야 하며, 이 불변식이 스택 루트 밖으로의
/// 경로 탈출을 막습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDescriptor {
    /// 스택 이름 (디렉토리 이름과 동일)
    pub name: String,
    /// 스택 디렉토리 경로
    pub path: PathBuf,
    /// 선언 파일(compose 파일) 경로
    pub compose_file: PathBuf,
}

impl fmt::Display for StackDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.path.display())
    }
}

/// 카테고리별 디스크 사용량
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryUsage {
    /// 항목 수
    pub count: usize,
    /// 합계 크기 (바이트)
    pub size: i64,
}

/// 디스크 사용량 집계
///
/// 엔진의 원시 사용량 데이터로부터 매 호출마다 처음부터 재계산됩니다.
/// `total_size` 산식은 원본 엔진 회계 그대로입니다:
/// 레이어 크기 + 컨테이너 루트 FS + 볼륨 사용량 + 빌드 캐시.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskUsageSummary {
    /// 총 사용량 (바이트)
    pub total_size: i64,
    /// 이미지 카테고리
    pub images: CategoryUsage,
    /// 컨테이너 카테고리
    pub containers: CategoryUsage,
    /// 볼륨 카테고리
    pub volumes: CategoryUsage,
    /// 빌드 캐시 카테고리
    pub build_cache: CategoryUsage,
}

impl DiskUsageSummary {
    /// prune 전후 비교로 회수된 바이트를 계산합니다. 음수가 되지 않습니다.
    pub fn reclaimed_since(&self, after: &DiskUsageSummary) -> i64 {
        (self.total_size - after.total_size).max(0)
    }
}

/// 엔진이 보고한 원시 디스크 사용량 스냅샷
///
/// 카테고리별 항목 크기 목록만 담습니다. 집계는
/// `dockyard-engine`의 usage 모듈이 수행합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDiskUsage {
    /// 이미지 레이어 총 크기
    pub layers_size: i64,
    /// 이미지별 크기
    pub image_sizes: Vec<i64>,
    /// 컨테이너별 루트 파일시스템 크기
    pub container_rootfs_sizes: Vec<i64>,
    /// 볼륨별 사용량
    pub volume_usage_sizes: Vec<i64>,
    /// 빌드 캐시 항목별 크기
    pub build_cache_sizes: Vec<i64>,
}

/// 정리(prune) 대상 카테고리 플래그
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CleanupFlags {
    /// 정지된 컨테이너 제거
    #[serde(default)]
    pub containers: bool,
    /// 미사용 볼륨 제거
    #[serde(default)]
    pub volumes: bool,
    /// 미사용 네트워크 제거
    #[serde(default)]
    pub networks: bool,
    /// 미사용 이미지 제거 (dangling 여부 무관)
    #[serde(default)]
    pub images: bool,
}

impl CleanupFlags {
    /// 어떤 카테고리도 선택되지 않았는지 여부
    pub fn is_empty(&self) -> bool {
        !(self.containers || self.volumes || self.networks || self.images)
    }
}

/// 카테고리 하나의 prune 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneReport {
    /// 삭제된 항목 식별자
    pub deleted: Vec<String>,
    /// 회수된 공간 (바이트)
    pub space_reclaimed: i64,
}

/// 카테고리별 prune 결과 모음
///
/// 플래그가 켜진 카테고리의 키만 채워집니다. 직렬화 시 비어 있는
/// 카테고리는 생략되어, 요청하지 않은 카테고리가 응답에 나타나지 않습니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PruneResults {
    /// 컨테이너 prune 결과
    #[serde(skip_serializing_if = "Option::is_none")]
    pub containers: Option<PruneReport>,
    /// 볼륨 prune 결과
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volumes: Option<PruneReport>,
    /// 네트워크 prune 결과
    #[serde(skip_serializing_if = "Option::is_none")]
    pub networks: Option<PruneReport>,
    /// 이미지 prune 결과
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<PruneReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_image_id_with_sha256_prefix() {
        let id = "sha256:abcdef0123456789abcdef0123456789abcdef0123456789abcdef0123456789";
        assert_eq!(short_image_id(id), "sha256:abcdef0123");
    }

    #[test]
    fn short_image_id_without_prefix() {
        assert_eq!(short_image_id("abcdef0123456789"), "abcdef0123");
    }

    #[test]
    fn short_image_id_shorter_than_ten() {
        assert_eq!(short_image_id("abc"), "abc");
        assert_eq!(short_image_id("sha256:abc"), "sha256:abc");
    }

    #[test]
    fn reclaimed_never_negative() {
        let before = DiskUsageSummary {
            total_size: 100,
            ..Default::default()
        };
        let after = DiskUsageSummary {
            total_size: 250,
            ..Default::default()
        };
        assert_eq!(before.reclaimed_since(&after), 0);
        assert_eq!(after.reclaimed_since(&before), 150);
    }

    #[test]
    fn cleanup_flags_empty() {
        assert!(CleanupFlags::default().is_empty());
        let flags = CleanupFlags {
            images: true,
            ..Default::default()
        };
        assert!(!flags.is_empty());
    }

    #[test]
    fn prune_results_serialization_omits_unset_categories() {
        let results = PruneResults {
            images: Some(PruneReport {
                deleted: vec!["sha256:aaa".to_owned()],
                space_reclaimed: 42,
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(&results).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("images"));
        assert!(!obj.contains_key("containers"));
        assert!(!obj.contains_key("volumes"));
        assert!(!obj.contains_key("networks"));
    }

    #[test]
    fn stack_descriptor_display() {
        let descriptor = StackDescriptor {
            name: "myapp".to_owned(),
            path: PathBuf::from("/srv/stacks/myapp"),
            compose_file: PathBuf::from("/srv/stacks/myapp/docker-compose.yaml"),
        };
        let rendered = descriptor.to_string();
        assert!(rendered.contains("myapp"));
        assert!(rendered.contains("/srv/stacks/myapp"));
    }
}
