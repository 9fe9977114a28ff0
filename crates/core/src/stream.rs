//! 스트림 seam trait — 블로킹 엔진 소스를 세션 레이어에 연결하는 확장 포인트
//!
//! 엔진 측 I/O 프리미티브(로그 라인 이터레이터, exec 소켓, 서브프로세스
//! 출력)는 제어 스레드를 블로킹해야만 읽을 수 있습니다. 이 trait들은
//! 그런 소스를 표현하며, `dockyard-session`의 브리지가 전용 워커
//! 컨텍스트(`spawn_blocking`)에서 소비합니다. 이벤트 루프에서 직접
//! 호출해서는 안 됩니다.

use bytes::Bytes;

/// 엔진 측 스트림 장애
///
/// 브리지는 이 메시지를 단일 에러 통지로 클라이언트에 전달한 뒤
/// 연결을 닫습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFault(pub String);

impl std::fmt::Display for StreamFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for StreamFault {}

/// 블로킹 청크 소스
///
/// 이산 청크(라인 단위 텍스트 또는 원시 바이트)의 이터레이터입니다.
/// `next_chunk`는 다음 청크가 준비될 때까지 호출 스레드를 블로킹합니다.
///
/// # 반환 규약
/// - `Some(Ok(chunk))`: 다음 청크. 소스가 생산한 순서대로 전달됩니다.
/// - `Some(Err(fault))`: 엔진 측 장애. 이후 `next_chunk`를 다시 호출하면 안 됩니다.
/// - `None`: 소스 소진 (정상 종료).
///
/// 구현체는 `Drop`에서 엔진 측 자원(소켓, 프로세스 핸들)을 정확히
/// 한 번 해제해야 합니다.
pub trait ChunkSource: Send {
    /// 다음 청크를 블로킹 방식으로 읽습니다.
    fn next_chunk(&mut self) -> Option<Result<Bytes, StreamFault>>;
}

/// 블로킹 쓰기 싱크 (클라이언트 → 엔진 방향)
///
/// 대화형 셸의 입력 절반입니다. 클라이언트가 보낸 바이트를 엔진
/// 소켓에 기록합니다.
pub trait ShellInput: Send {
    /// 바이트를 엔진 측에 기록합니다. 완료까지 블로킹합니다.
    fn write_chunk(&mut self, data: &[u8]) -> Result<(), StreamFault>;

    /// 쓰기 방향을 종료합니다. 멱등해야 합니다.
    fn shutdown(&mut self);
}

/// 양방향 셸 채널
///
/// 출력 절반(엔진 → 클라이언트, [`ChunkSource`])과 입력 절반
/// (클라이언트 → 엔진, [`ShellInput`])으로 분리됩니다. 두 절반은 서로
/// 독립적인 워커에서 동시에 사용됩니다.
pub trait ShellConduit: Send {
    /// 채널을 읽기/쓰기 절반으로 분리합니다.
    fn split(self: Box<Self>) -> (Box<dyn ChunkSource>, Box<dyn ShellInput>);
}
