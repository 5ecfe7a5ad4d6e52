//! 설정 관리 — docforge.toml 파싱 및 런타임 설정
//!
//! [`DocforgeConfig`]는 모든 섹션의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`DOCFORGE_PIPELINE_NAMESPACE_PREFIX=staging` 형식)
//! 3. 설정 파일 (`docforge.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), docforge_core::error::DocforgeError> {
//! use docforge_core::config::DocforgeConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = DocforgeConfig::load("docforge.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = DocforgeConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, DocforgeError};

/// Docforge 통합 설정
///
/// `docforge.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocforgeConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 파이프라인 설정
    #[serde(default)]
    pub pipeline: CorePipelineConfig,
}

impl DocforgeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DocforgeError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DocforgeError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DocforgeError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                DocforgeError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, DocforgeError> {
        toml::from_str(toml_str).map_err(|e| {
            DocforgeError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `DOCFORGE_{SECTION}_{FIELD}`
    /// 예: `DOCFORGE_GENERAL_LOG_LEVEL=debug`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "DOCFORGE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "DOCFORGE_GENERAL_LOG_FORMAT");

        // Pipeline
        override_string(
            &mut self.pipeline.timestamp_field,
            "DOCFORGE_PIPELINE_TIMESTAMP_FIELD",
        );
        override_string(
            &mut self.pipeline.last_seen_field,
            "DOCFORGE_PIPELINE_LAST_SEEN_FIELD",
        );
        override_string(
            &mut self.pipeline.ingested_field,
            "DOCFORGE_PIPELINE_INGESTED_FIELD",
        );
        override_string(&mut self.pipeline.type_field, "DOCFORGE_PIPELINE_TYPE_FIELD");
        override_string(&mut self.pipeline.id_field, "DOCFORGE_PIPELINE_ID_FIELD");
        override_string(
            &mut self.pipeline.namespace_prefix,
            "DOCFORGE_PIPELINE_NAMESPACE_PREFIX",
        );
        override_bool(
            &mut self.pipeline.include_serialization,
            "DOCFORGE_PIPELINE_INCLUDE_SERIALIZATION",
        );
        override_usize(
            &mut self.pipeline.channel_capacity,
            "DOCFORGE_PIPELINE_CHANNEL_CAPACITY",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), DocforgeError> {
        self.general.validate()?;
        self.pipeline.validate()?;
        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 출력 형식 (text, json)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "text".to_owned(),
        }
    }
}

impl GeneralConfig {
    /// 일반 설정값을 검증합니다.
    pub fn validate(&self) -> Result<(), ConfigError> {
        const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of {:?}", LEVELS),
            });
        }

        const FORMATS: &[&str] = &["text", "json"];
        if !FORMATS.contains(&self.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of {:?}", FORMATS),
            });
        }

        Ok(())
    }
}

/// 파이프라인 설정 (`[pipeline]` 섹션)
///
/// enrich-pipeline 크레이트는 이 섹션에서 자체 `PipelineConfig`를 파생합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorePipelineConfig {
    /// 원본 타임스탬프 필드 이름 (정규화 후 제거)
    pub timestamp_field: String,
    /// 정규화된 타임스탬프가 기록될 "마지막 관측" 필드
    pub last_seen_field: String,
    /// 정규화된 타임스탬프가 기록될 "수집 시각" 필드
    pub ingested_field: String,
    /// 라우팅 판별자 필드 이름 (필수 필드)
    pub type_field: String,
    /// 문서 식별자 필드 이름 (선택 필드)
    pub id_field: String,
    /// 목적지 인덱스 이름 접두어
    pub namespace_prefix: String,
    /// 벌크 직렬화 스테이지 실행 여부
    pub include_serialization: bool,
    /// 소스 채널 용량 (backpressure 경계)
    pub channel_capacity: usize,
}

impl Default for CorePipelineConfig {
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
        }
    }
}

impl CorePipelineConfig {
    /// 파이프라인 설정값을 검증합니다.
    pub fn validate(&self) -> Result<(), ConfigError> {
        const MAX_CHANNEL_CAPACITY: usize = 1_000_000;

        for (field, value) in [
            ("pipeline.timestamp_field", &self.timestamp_field),
            ("pipeline.last_seen_field", &self.last_seen_field),
            ("pipeline.ingested_field", &self.ingested_field),
            ("pipeline.type_field", &self.type_field),
            ("pipeline.id_field", &self.id_field),
        ] {
            if value.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: "field name must not be empty".to_owned(),
                });
            }
        }

        // 타임스탬프 원본과 목적지 필드가 같으면 제거 시 값이 유실됨
        if self.timestamp_field == self.last_seen_field
            || self.timestamp_field == self.ingested_field
        {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.timestamp_field".to_owned(),
                reason: "must differ from last_seen_field and ingested_field".to_owned(),
            });
        }

        if self.namespace_prefix.is_empty()
            || self.namespace_prefix.chars().any(char::is_whitespace)
        {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.namespace_prefix".to_owned(),
                reason: "must be non-empty and contain no whitespace".to_owned(),
            });
        }

        if self.channel_capacity == 0 || self.channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.channel_capacity".to_owned(),
                reason: format!("must be 1-{}", MAX_CHANNEL_CAPACITY),
            });
        }

        Ok(())
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

/// 환경변수가 존재하면 문자열 설정값을 교체합니다.
fn override_string(target: &mut String, var: &str) {
    if let Ok(value) = std::env::var(var) {
        *target = value;
    }
}

/// 환경변수가 존재하면 bool 설정값을 교체합니다.
///
/// "true"/"1"/"false"/"0" 외의 값은 경고 후 무시합니다.
fn override_bool(target: &mut bool, var: &str) {
    if let Ok(value) = std::env::var(var) {
        match value.as_str() {
            "true" | "1" => *target = true,
            "false" | "0" => *target = false,
            other => warn!(var, value = other, "ignoring invalid boolean override"),
        }
    }
}

/// 환경변수가 존재하면 usize 설정값을 교체합니다.
fn override_usize(target: &mut usize, var: &str) {
    if let Ok(value) = std::env::var(var) {
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(var, value = %value, "ignoring invalid integer override"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = DocforgeConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn parse_empty_string_uses_defaults() {
        let config = DocforgeConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.pipeline.namespace_prefix, "telemetry");
        assert!(config.pipeline.include_serialization);
    }

    #[test]
    fn parse_partial_config() {
        let config = DocforgeConfig::parse(
            "[pipeline]\nnamespace_prefix = \"staging\"\nchannel_capacity = 64",
        )
        .unwrap();
        assert_eq!(config.pipeline.namespace_prefix, "staging");
        assert_eq!(config.pipeline.channel_capacity, 64);
        // 지정하지 않은 필드는 기본값
        assert_eq!(config.pipeline.type_field, "entity_type");
    }

    #[test]
    fn parse_rejects_malformed_toml() {
        let result = DocforgeConfig::parse("[pipeline\nbroken");
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_unknown_log_level() {
        let mut config = DocforgeConfig::default();
        config.general.log_level = "verbose".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_type_field() {
        let mut config = DocforgeConfig::default();
        config.pipeline.type_field = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_timestamp_destination_collision() {
        let mut config = DocforgeConfig::default();
        config.pipeline.timestamp_field = "last_seen".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timestamp_field"));
    }

    #[test]
    fn validate_rejects_whitespace_prefix() {
        let mut config = DocforgeConfig::default();
        config.pipeline.namespace_prefix = "tele metry".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_channel_capacity() {
        let mut config = DocforgeConfig::default();
        config.pipeline.channel_capacity = 0;
        assert!(config.validate().is_err());
    }
}
