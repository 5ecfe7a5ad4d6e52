//! 보강 파이프라인 에러 타입
//!
//! [`EnrichPipelineError`]는 파이프라인 조립과 소스/싱크 I/O에서 발생하는
//! 에러를 표현합니다. 스테이지 처리 에러는 core의
//! [`PipelineError`](docforge_core::error::PipelineError) 분류를 그대로 사용하며,
//! `From<EnrichPipelineError> for DocforgeError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use docforge_core::error::{ConfigError, DocforgeError, PipelineError};

/// 보강 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum EnrichPipelineError {
    /// 설정 값 오류
    #[error("config error: {field}: {reason}")]
    Config {
        /// 문제가 된 설정 필드
        field: String,
        /// 오류 사유
        reason: String,
    },

    /// 파이프라인 조립 오류 (싱크 누락 등)
    #[error("build error: {0}")]
    Build(String),

    /// NDJSON 소스 파일 에러
    #[error("source error: {path}: {reason}")]
    Source {
        /// 소스 파일 경로
        path: String,
        /// 에러 사유
        reason: String,
    },

    /// 싱크 개방/구성 에러
    #[error("sink error: {name}: {reason}")]
    Sink {
        /// 싱크 이름
        name: String,
        /// 에러 사유
        reason: String,
    },
}

impl From<EnrichPipelineError> for DocforgeError {
    fn from(err: EnrichPipelineError) -> Self {
        match err {
            EnrichPipelineError::Config { field, reason } => {
                DocforgeError::Config(ConfigError::InvalidValue { field, reason })
            }
            EnrichPipelineError::Build(reason) => {
                DocforgeError::Config(ConfigError::InvalidValue {
                    field: "pipeline".to_owned(),
                    reason,
                })
            }
            source @ EnrichPipelineError::Source { .. } => {
                DocforgeError::Pipeline(PipelineError::UpstreamFailure(source.to_string()))
            }
            sink @ EnrichPipelineError::Sink { .. } => {
                DocforgeError::Pipeline(PipelineError::SinkRejection(sink.to_string()))
            }
        }
    }
}
