//! 보강 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의
//! [`CorePipelineConfig`](docforge_core::config::CorePipelineConfig)를
//! 기반으로 파이프라인 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use docforge_core::config::DocforgeConfig;
//! use docforge_enrich_pipeline::config::PipelineConfig;
//!
//! let core_config = DocforgeConfig::default();
//! let config = PipelineConfig::from_core(&core_config.pipeline);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::EnrichPipelineError;

/// 보강 파이프라인 설정
///
/// core의 `[pipeline]` 섹션에서 파생되며, 파이프라인 내부에서
/// 사용하는 추가 설정을 포함합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 원본 타임스탬프 필드 이름 (정규화 후 제거)
    pub timestamp_field: String,
    /// 정규화된 타임스탬프가 기록될 "마지막 관측" 필드
    pub last_seen_field: String,
    /// 정규화된 타임스탬프가 기록될 "수집 시각" 필드
    pub ingested_field: String,
    /// 라우팅 판별자 필드 이름 (누락 시 파이프라인 전체 실패)
    pub type_field: String,
    /// 문서 식별자 필드 이름 (선택)
    pub id_field: String,
    /// 목적지 인덱스 이름 접두어
    pub namespace_prefix: String,
    /// 벌크 직렬화 스테이지 실행 여부
    pub include_serialization: bool,
    /// 소스 채널 용량 (backpressure 경계)
    pub channel_capacity: usize,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// NDJSON 소스 라인 최대 길이 (바이트)
    pub max_line_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timestamp_field: "@timestamp".to_owned(),
            last_seen_field: "last_seen".to_owned(),
            ingested_field: "ingested".to_owned(),
            type_field: "entity_type".to_owned(),
            id_field: "entity_id".to_owned(),
            namespace_prefix: "telemetry".to_owned(),
            include_serialization: true,
            channel_capacity: 1024,
            max_line_bytes: 1024 * 1024, // 1MB
        }
    }
}

impl PipelineConfig {
    /// core의 `CorePipelineConfig`에서 파이프라인 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &docforge_core::config::CorePipelineConfig) -> Self {
        Self {
            timestamp_field: core.timestamp_field.clone(),
            last_seen_field: core.last_seen_field.clone(),
            ingested_field: core.ingested_field.clone(),
            type_field: core.type_field.clone(),
            id_field: core.id_field.clone(),
            namespace_prefix: core.namespace_prefix.clone(),
            include_serialization: core.include_serialization,
            channel_capacity: core.channel_capacity,
            ..Self::default()
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), EnrichPipelineError> {
        const MAX_CHANNEL_CAPACITY: usize = 1_000_000;
        const MAX_LINE_BYTES: usize = 16 * 1024 * 1024; // 16MB

        for (field, value) in [
            ("timestamp_field", &self.timestamp_field),
            ("last_seen_field", &self.last_seen_field),
            ("ingested_field", &self.ingested_field),
            ("type_field", &self.type_field),
            ("id_field", &self.id_field),
        ] {
            if value.is_empty() {
                return Err(EnrichPipelineError::Config {
                    field: field.to_owned(),
                    reason: "field name must not be empty".to_owned(),
                });
            }
        }

        // 원본 필드를 제거하므로 목적지 필드와 겹치면 값이 유실됨
        if self.timestamp_field == self.last_seen_field
            || self.timestamp_field == self.ingested_field
        {
            return Err(EnrichPipelineError::Config {
                field: "timestamp_field".to_owned(),
                reason: "must differ from last_seen_field and ingested_field".to_owned(),
            });
        }

        if self.namespace_prefix.is_empty()
            || self.namespace_prefix.chars().any(char::is_whitespace)
        {
            return Err(EnrichPipelineError::Config {
                field: "namespace_prefix".to_owned(),
                reason: "must be non-empty and contain no whitespace".to_owned(),
            });
        }

        if self.channel_capacity == 0 || self.channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(EnrichPipelineError::Config {
                field: "channel_capacity".to_owned(),
                reason: format!("must be 1-{}", MAX_CHANNEL_CAPACITY),
            });
        }

        if self.max_line_bytes == 0 || self.max_line_bytes > MAX_LINE_BYTES {
            return Err(EnrichPipelineError::Config {
                field: "max_line_bytes".to_owned(),
                reason: format!("must be 1-{}", MAX_LINE_BYTES),
            });
        }

        Ok(())
    }
}

/// 파이프라인 설정 빌더
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 원본 타임스탬프 필드 이름을 설정합니다.
    pub fn timestamp_field(mut self, field: impl Into<String>) -> Self {
        self.config.timestamp_field = field.into();
        self
    }

    /// 라우팅 판별자 필드 이름을 설정합니다.
    pub fn type_field(mut self, field: impl Into<String>) -> Self {
        self.config.type_field = field.into();
        self
    }

    /// 문서 식별자 필드 이름을 설정합니다.
    pub fn id_field(mut self, field: impl Into<String>) -> Self {
        self.config.id_field = field.into();
        self
    }

    /// 목적지 인덱스 접두어를 설정합니다.
    pub fn namespace_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.namespace_prefix = prefix.into();
        self
    }

    /// 벌크 직렬화 스테이지 실행 여부를 설정합니다.
    pub fn include_serialization(mut self, include: bool) -> Self {
        self.config.include_serialization = include;
        self
    }

    /// 소스 채널 용량을 설정합니다.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// NDJSON 소스 라인 최대 길이를 설정합니다.
    pub fn max_line_bytes(mut self, bytes: usize) -> Self {
        self.config.max_line_bytes = bytes;
        self
    }

    /// 설정을 검증하고 `PipelineConfig`를 생성합니다.
    pub fn build(self) -> Result<PipelineConfig, EnrichPipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
