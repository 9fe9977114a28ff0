//! 스택 디렉토리 레지스트리
//!
//! 설정된 스택 루트 아래의 compose 스타일 디렉토리를 관리합니다.
//! 레지스트리 자체는 어떤 인덱스도 유지하지 않으며, 파일시스템이
//! 유일한 진실의 원천입니다. 모든 조회는 매번 디렉토리를 다시 읽습니다.
//!
//! # 이름 불변식
//!
//! 스택 이름은 단일 경로 세그먼트여야 합니다. 이 검증은 어떤
//! 파일시스템 접근보다도 먼저 수행되며, 스택 루트 밖으로의 경로
//! 탈출을 원천 차단합니다.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use dockyard_core::types::StackDescriptor;

use crate::error::StacksError;

/// 스택 디렉토리에서 선언 파일로 인정되는 파일명, 우선순위 순
pub const COMPOSE_FILE_CANDIDATES: [&str; 4] = [
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// 신규 스택 생성 시 사용하는 선언 파일명
const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";

/// 환경 파일명
const ENV_FILE: &str = ".env";

/// 스택의 파일 내용 (선언 파일 + 환경 파일)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackContents {
    /// 선언 파일 내용
    pub compose: String,
    /// 환경 파일 내용. 파일이 없으면 빈 문자열입니다.
    pub env: String,
}

/// 스택 루트 하나를 관리하는 레지스트리
#[derive(Debug, Clone)]
pub struct StackRegistry {
    root: PathBuf,
}

impl StackRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 스택 루트 경로
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 스택 이름을 검증합니다. I/O 없이 수행됩니다.
    ///
    /// 비어 있거나, 경로 구분자를 포함하거나, `.`/`..` 같은 특수
    /// 세그먼트인 이름은 거부됩니다.
    pub fn validate_name(name: &str) -> Result<(), StacksError> {
        if name.is_empty() {
            return Err(StacksError::InvalidName(name.to_owned()));
        }
        match Path::new(name).file_name() {
            Some(file_name) if file_name == name => Ok(()),
            _ => Err(StacksError::InvalidName(name.to_owned())),
        }
    }

    /// 스택 루트 아래의 모든 스택을 이름순으로 나열합니다.
    ///
    /// 선언 파일이 없는 디렉토리와 일반 파일은 건너뜁니다.
    /// 스택 루트 자체가 없으면 빈 목록을 반환합니다.
    pub async fn discover(&self) -> Result<Vec<StackDescriptor>, StacksError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(root = %self.root.display(), "stack root does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut stacks = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let path = entry.path();
            if let Some(compose_file) = find_compose_file(&path).await {
                stacks.push(StackDescriptor {
                    name,
                    path,
                    compose_file,
                });
            }
        }

        stacks.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(count = stacks.len(), root = %self.root.display(), "discovered stacks");
        Ok(stacks)
    }

    /// 이름으로 스택을 해석합니다.
    pub async fn resolve(&self, name: &str) -> Result<StackDescriptor, StacksError> {
        Self::validate_name(name)?;

        let path = self.root.join(name);
        if !tokio::fs::try_exists(&path).await? {
            return Err(StacksError::NotFound(name.to_owned()));
        }
        let compose_file = find_compose_file(&path)
            .await
            .ok_or_else(|| StacksError::MissingComposeFile(name.to_owned()))?;

        Ok(StackDescriptor {
            name: name.to_owned(),
            path,
            compose_file,
        })
    }

    /// 새 스택을 생성합니다.
    ///
    /// 같은 이름의 디렉토리가 이미 있으면 `overwrite`가 설정된 경우에만
    /// 진행하며, 그렇지 않으면 기존 파일을 건드리지 않고 거부합니다.
    /// 덮어쓸 때는 기존 선언 파일명을 유지합니다.
    pub async fn create(
        &self,
        name: &str,
        compose: &str,
        env: Option<&str>,
        overwrite: bool,
    ) -> Result<StackDescriptor, StacksError> {
        Self::validate_name(name)?;

        let path = self.root.join(name);
        if tokio::fs::try_exists(&path).await? && !overwrite {
            return Err(StacksError::AlreadyExists(name.to_owned()));
        }

        tokio::fs::create_dir_all(&path).await?;
        let compose_file = match find_compose_file(&path).await {
            Some(existing) => existing,
            None => path.join(DEFAULT_COMPOSE_FILE),
        };
        tokio::fs::write(&compose_file, compose).await?;
        if let Some(env) = env {
            tokio::fs::write(path.join(ENV_FILE), env).await?;
        }

        debug!(stack = name, "created stack");
        Ok(StackDescriptor {
            name: name.to_owned(),
            path,
            compose_file,
        })
    }

    /// 기존 스택의 파일을 덮어씁니다. 스택이 없으면 거부합니다.
    ///
    /// 선언 파일은 기존 파일명을 유지합니다. `env`가 `None`이면 환경
    /// 파일을 삭제하여, 갱신 후의 스택이 전달된 내용만 담게 합니다.
    pub async fn update(
        &self,
        name: &str,
        compose: &str,
        env: Option<&str>,
    ) -> Result<StackDescriptor, StacksError> {
        let descriptor = self.resolve(name).await?;

        tokio::fs::write(&descriptor.compose_file, compose).await?;
        let env_path = descriptor.path.join(ENV_FILE);
        match env {
            Some(env) => tokio::fs::write(&env_path, env).await?,
            None => match tokio::fs::remove_file(&env_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }

        debug!(stack = name, "updated stack");
        Ok(descriptor)
    }

    /// 스택의 파일 내용을 읽습니다.
    pub async fn read(&self, name: &str) -> Result<StackContents, StacksError> {
        let descriptor = self.resolve(name).await?;

        let compose = tokio::fs::read_to_string(&descriptor.compose_file).await?;
        let env = match tokio::fs::read_to_string(descriptor.path.join(ENV_FILE)).await {
            Ok(env) => env,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(StackContents { compose, env })
    }
}

/// 디렉토리에서 우선순위가 가장 높은 선언 파일을 찾습니다.
async fn find_compose_file(dir: &Path) -> Option<PathBuf> {
    for candidate in COMPOSE_FILE_CANDIDATES {
        let path = dir.join(candidate);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Some(path);
        }
    }
    None
}
