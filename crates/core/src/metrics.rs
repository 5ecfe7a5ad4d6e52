//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다. Recorder 설치는
//! 임베더(CLI 등)의 책임입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `docforge_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(docforge_core::metrics::PIPELINE_DOCUMENTS_PROCESSED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 스테이지 이름 레이블 키
pub const LABEL_STAGE: &str = "stage";

/// 싱크 이름 레이블 키
pub const LABEL_SINK: &str = "sink";

/// 목적지 인덱스 레이블 키
pub const LABEL_DESTINATION: &str = "destination";

// ─── Pipeline 메트릭 ────────────────────────────────────────────────

/// Pipeline: 소스에서 수신한 문서 수 (counter)
pub const PIPELINE_DOCUMENTS_RECEIVED_TOTAL: &str = "docforge_pipeline_documents_received_total";

/// Pipeline: 싱크까지 전달된 문서 수 (counter)
pub const PIPELINE_DOCUMENTS_PROCESSED_TOTAL: &str = "docforge_pipeline_documents_processed_total";

/// Pipeline: 스테이지가 드롭한 문서 수 (counter, label: stage)
pub const PIPELINE_DOCUMENTS_DROPPED_TOTAL: &str = "docforge_pipeline_documents_dropped_total";

/// Pipeline: 종단 실패 수 (counter)
pub const PIPELINE_FAILURES_TOTAL: &str = "docforge_pipeline_failures_total";

/// Pipeline: 문서 하나의 스테이지 통과 시간 (histogram, 초)
pub const PIPELINE_STAGE_DURATION_SECONDS: &str = "docforge_pipeline_stage_duration_seconds";

/// Pipeline: 싱크 기록 시간 (histogram, 초)
pub const PIPELINE_SINK_WRITE_DURATION_SECONDS: &str =
    "docforge_pipeline_sink_write_duration_seconds";

// ─── 설명 등록 ─────────────────────────────────────────────────────

/// 모든 메트릭의 설명을 현재 recorder에 등록합니다.
///
/// Recorder 설치 직후 한 번 호출합니다. Recorder가 없으면 no-op입니다.
pub fn describe_all() {
    metrics::describe_counter!(
        PIPELINE_DOCUMENTS_RECEIVED_TOTAL,
        "Documents received from the source sequence"
    );
    metrics::describe_counter!(
        PIPELINE_DOCUMENTS_PROCESSED_TOTAL,
        "Documents fully transformed and accepted by the sink"
    );
    metrics::describe_counter!(
        PIPELINE_DOCUMENTS_DROPPED_TOTAL,
        "Documents dropped by a stage election"
    );
    metrics::describe_counter!(
        PIPELINE_FAILURES_TOTAL,
        "Terminal pipeline failures (fail-fast aborts)"
    );
    metrics::describe_histogram!(
        PIPELINE_STAGE_DURATION_SECONDS,
        "Time for one document to pass the whole stage set"
    );
    metrics::describe_histogram!(
        PIPELINE_SINK_WRITE_DURATION_SECONDS,
        "Time for the sink to accept one envelope"
    );
}
