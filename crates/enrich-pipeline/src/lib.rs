#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`source`]: NDJSON 파일에서 문서 수집 (바운드 mpsc 채널로 공급)
//! - [`stage`]: 변형 스테이지 (타임스탬프 정규화, 라우팅, 평탄화, 직렬화)
//! - [`sink`]: 종단 싱크 (파일, 인메모리 버퍼)
//! - [`pipeline`]: 전체 파이프라인 오케스트레이션 (Pipeline trait 구현)
//! - [`config`]: 파이프라인 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! NdjsonFileSource -> mpsc -> StageSet -> Sink
//!        |                      |           |
//!   NDJSON 라인        Normalizer/Router   FileSink/BufferSink
//!                      Compactor/Serializer
//! ```
//!
//! 실행 상태는 `Idle → Running → {Completed | Failed}`로 전이하며
//! 종단 상태에서 재시작할 수 없습니다. 모든 실패는 fail-fast로
//! 파이프라인 전체를 종료합니다.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod stage;

// --- 주요 타입 re-export ---

// 파이프라인
pub use pipeline::{
    CancelMode, EnrichPipeline, EnrichPipelineBuilder, PipelineCanceller, PipelineState,
    PipelineSummary,
};

// 설정
pub use config::{PipelineConfig, PipelineConfigBuilder};

// 에러
pub use error::EnrichPipelineError;

// 스테이지
pub use stage::{BulkSerializer, FieldCompactor, RoutingDecorator, StageSet, TimestampNormalizer};

// 소스
pub use source::{NdjsonFileSource, NdjsonFileSourceConfig, SourceItem, SourceStatus};

// 싱크
pub use sink::{BufferSink, FileSink};
