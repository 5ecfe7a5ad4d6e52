//! 타임스탬프 정규화 스테이지
//!
//! 원본 타임스탬프 필드를 RFC 3339 (UTC) 표현으로 변환하여
//! "마지막 관측"과 "수집 시각" 필드 쌍에 기록하고 원본 필드를 제거합니다.
//!
//! # 허용 입력
//! - RFC 3339 문자열 (`"2025-06-01T12:00:00Z"`)
//! - epoch 밀리초 정수 (`1748779200000`)
//!
//! 타임스탬프 필드가 없으면 문서를 그대로 통과시킵니다. 값이 있지만
//! 해석할 수 없으면 이 스테이지는 실패하지 않습니다: 경고 로그 후
//! 문서를 변경 없이 통과시킵니다 (sentinel 값을 만들지 않음).

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

use docforge_core::error::DocforgeError;
use docforge_core::pipeline::Stage;
use docforge_core::types::Envelope;

use crate::config::PipelineConfig;

/// 타임스탬프 정규화 스테이지
///
/// 문서 단위로만 동작하며 공유 상태가 없습니다.
/// 이미 정규화된 문서(원본 필드 없음)에 다시 적용해도 no-op입니다.
pub struct TimestampNormalizer {
    /// 원본 타임스탬프 필드 이름
    timestamp_field: String,
    /// "마지막 관측" 목적지 필드 이름
    last_seen_field: String,
    /// "수집 시각" 목적지 필드 이름
    ingested_field: String,
}

impl TimestampNormalizer {
    /// 설정에서 정규화 스테이지를 생성합니다.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            timestamp_field: config.timestamp_field.clone(),
            last_seen_field: config.last_seen_field.clone(),
            ingested_field: config.ingested_field.clone(),
        }
    }

    /// 타임스탬프 값을 UTC `DateTime`으로 해석합니다.
    ///
    /// 해석 불가능한 값은 `None`을 반환합니다 (스테이지 실패 아님).
    fn parse_value(value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::String(text) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Value::Number(num) => {
                let millis = num.as_i64()?;
                Utc.timestamp_millis_opt(millis).single()
            }
            _ => None,
        }
    }
}

impl Stage for TimestampNormalizer {
    fn name(&self) -> &str {
        "timestamp_normalizer"
    }

    fn process(&mut self, mut envelope: Envelope) -> Result<Option<Envelope>, DocforgeError> {
        let Some(raw) = envelope.document.get(&self.timestamp_field) else {
            // 타임스탬프 필드 없음: 그대로 통과 (재적용 시 no-op 보장)
            return Ok(Some(envelope));
        };

        let Some(parsed) = Self::parse_value(raw) else {
            tracing::warn!(
                field = %self.timestamp_field,
                value = %raw,
                "unrecognized timestamp value, passing document through unchanged"
            );
            return Ok(Some(envelope));
        };

        let canonical = parsed.to_rfc3339_opts(SecondsFormat::Millis, true);
        envelope
            .document
            .insert(&self.last_seen_field, Value::String(canonical.clone()));
        envelope
            .document
            .insert(&self.ingested_field, Value::String(canonical));
        envelope.document.remove(&self.timestamp_field);

        Ok(Some(envelope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docforge_core::types::Document;
    use serde_json::json;

    fn normalizer() -> TimestampNormalizer {
        TimestampNormalizer::from_config(&PipelineConfig::default())
    }

    fn doc_with_timestamp(value: Value) -> Envelope {
        let mut doc = Document::new();
        doc.insert("@timestamp", value);
        doc.insert("entity_type", json!("Host"));
        Envelope::new(doc)
    }

    #[test]
    fn rfc3339_string_is_normalized() {
        let mut stage = normalizer();
        let out = stage
            .process(doc_with_timestamp(json!("2025-06-01T12:00:00Z")))
            .unwrap()
            .unwrap();

        assert!(!out.document.contains("@timestamp"));
        let last_seen = out.document.get("last_seen").unwrap();
        let ingested = out.document.get("ingested").unwrap();
        assert_eq!(last_seen, ingested);
        assert_eq!(last_seen, &json!("2025-06-01T12:00:00.000Z"));
    }

    #[test]
    fn offset_timestamp_converts_to_utc() {
        let mut stage = normalizer();
        let out = stage
            .process(doc_with_timestamp(json!("2025-06-01T15:30:00+03:30")))
            .unwrap()
            .unwrap();
        assert_eq!(
            out.document.get("last_seen"),
            Some(&json!("2025-06-01T12:00:00.000Z"))
        );
    }

    #[test]
    fn epoch_millis_number_is_normalized() {
        let mut stage = normalizer();
        // 2025-06-01T12:00:00Z
        let out = stage
            .process(doc_with_timestamp(json!(1748779200000_i64)))
            .unwrap()
            .unwrap();
        assert_eq!(
            out.document.get("ingested"),
            Some(&json!("2025-06-01T12:00:00.000Z"))
        );
        assert!(!out.document.contains("@timestamp"));
    }

    #[test]
    fn absent_timestamp_passes_through_unchanged() {
        let mut stage = normalizer();
        let mut doc = Document::new();
        doc.insert("entity_type", json!("Host"));
        let before = doc.clone();

        let out = stage.process(Envelope::new(doc)).unwrap().unwrap();
        assert_eq!(out.document, before);
    }

    #[test]
    fn malformed_string_passes_through_unchanged() {
        let mut stage = normalizer();
        let out = stage
            .process(doc_with_timestamp(json!("yesterday at noon")))
            .unwrap()
            .unwrap();

        // 실패하지도, sentinel을 만들지도 않음
        assert_eq!(
            out.document.get("@timestamp"),
            Some(&json!("yesterday at noon"))
        );
        assert!(!out.document.contains("last_seen"));
        assert!(!out.document.contains("ingested"));
    }

    #[test]
    fn non_scalar_timestamp_passes_through_unchanged() {
        let mut stage = normalizer();
        let out = stage
            .process(doc_with_timestamp(json!({"nested": true})))
            .unwrap()
            .unwrap();
        assert!(out.document.contains("@timestamp"));
        assert!(!out.document.contains("last_seen"));
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut stage = normalizer();
        let once = stage
            .process(doc_with_timestamp(json!("2025-06-01T12:00:00Z")))
            .unwrap()
            .unwrap();
        let before = once.document.clone();

        // 이미 정규화된 문서(원본 필드 없음)에 재적용해도 no-op
        let twice = stage.process(once).unwrap().unwrap();
        assert_eq!(twice.document, before);
    }

    #[test]
    fn custom_field_names_are_respected() {
        let config = PipelineConfig {
            timestamp_field: "event_time".to_owned(),
            last_seen_field: "seen_at".to_owned(),
            ingested_field: "stored_at".to_owned(),
            ..Default::default()
        };
        let mut stage = TimestampNormalizer::from_config(&config);

        let mut doc = Document::new();
        doc.insert("event_time", json!("2025-01-01T00:00:00Z"));
        let out = stage.process(Envelope::new(doc)).unwrap().unwrap();

        assert!(!out.document.contains("event_time"));
        assert!(out.document.contains("seen_at"));
        assert!(out.document.contains("stored_at"));
    }
}
