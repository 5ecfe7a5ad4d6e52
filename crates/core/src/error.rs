//! 에러 타입 — 도메인별 에러 정의
//!
//! [`DocforgeError`]는 최상위 에러이며, 각 도메인 에러는 `#[from]`으로
//! 감싸져 상위 레이어에서 `?` 연산자로 자연스럽게 전파됩니다.

/// Docforge 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum DocforgeError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 문서 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
///
/// 모든 변형은 파이프라인 실행 전체를 종료시킵니다 (fail-fast).
/// 문서 단위 재시도나 부분 성공 모드는 없습니다.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 필수 필드 누락 — 라우팅 판별자가 없는 문서는 치명적 에러입니다
    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },

    /// 소스 시퀀스에서 발생한 에러 (그대로 전파)
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    /// 싱크에서 발생한 에러 (그대로 전파)
    #[error("sink rejection: {0}")]
    SinkRejection(String),

    /// 벌크 레코드 직렬화 실패
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// 취소로 인한 중단 — 포기(abandon) 취소는 실패로 기록됩니다
    #[error("pipeline cancelled before completion")]
    Cancelled,

    /// 이미 실행 중인 파이프라인을 다시 시작함
    #[error("pipeline already running")]
    AlreadyRunning,

    /// 실행 중이 아닌 파이프라인에 대한 조작
    #[error("pipeline not running")]
    NotRunning,

    /// 채널이 예기치 않게 닫힘
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

/// 문서 파싱 에러
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// JSON 파싱 실패
    #[error("invalid json: {reason}")]
    InvalidJson { reason: String },

    /// 최상위 값이 객체가 아님
    #[error("document must be a json object, got {kind}")]
    NotAnObject { kind: String },
}
