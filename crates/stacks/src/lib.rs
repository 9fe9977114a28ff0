//! Dockyard 스택 레지스트리
//!
//! 설정된 스택 루트 아래의 compose 스타일 디렉토리를 발견하고,
//! 생성/갱신하고, 파일 내용을 읽는 레이어입니다. 파일시스템이 유일한
//! 진실의 원천이며 별도 인덱스를 두지 않습니다.

pub mod error;
pub mod registry;

pub use error::StacksError;
pub use registry::{COMPOSE_FILE_CANDIDATES, StackContents, StackRegistry};
