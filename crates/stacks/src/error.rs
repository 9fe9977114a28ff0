//! 스택 레지스트리 에러 타입

use dockyard_core::DockyardError;

/// 스택 레지스트리가 생성하는 에러
#[derive(Debug, thiserror::Error)]
pub enum StacksError {
    /// 스택 이름이 단일 경로 세그먼트가 아님
    #[error("invalid stack name: {0:?}")]
    InvalidName(String),

    /// 스택 디렉토리가 존재하지 않음
    #[error("stack not found: {0}")]
    NotFound(String),

    /// 스택 디렉토리가 이미 존재함
    #[error("stack already exists: {0}")]
    AlreadyExists(String),

    /// 스택 디렉토리에 선언 파일이 없음
    #[error("no compose file in stack: {0}")]
    MissingComposeFile(String),

    /// 파일시스템 I/O 실패
    #[error("stack io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StacksError> for DockyardError {
    fn from(err: StacksError) -> Self {
        match err {
            StacksError::InvalidName(name) => {
                DockyardError::Validation(format!("invalid stack name: {name:?}"))
            }
            StacksError::NotFound(name) => DockyardError::NotFound(format!("stack {name}")),
            StacksError::AlreadyExists(name) => {
                DockyardError::Conflict(format!("stack {name} already exists"))
            }
            StacksError::MissingComposeFile(name) => {
                DockyardError::NotFound(format!("compose file for stack {name}"))
            }
            StacksError::Io(e) => DockyardError::Io(e),
        }
    }
}
