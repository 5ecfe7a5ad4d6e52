//! 벌크 직렬화 스테이지
//!
//! 라우팅 완료된 Envelope을 전송용 바이트 레코드로 변환합니다.
//! 레코드는 개행으로 끝나는 JSON 두 줄입니다:
//!
//! ```text
//! {"index":{"_index":"telemetry.webapp","_id":"app-01"}}
//! {"name":"checkout","last_seen":"2025-06-01T12:00:00.000Z",...}
//! ```
//!
//! 액션 줄은 라우팅 결정의 목적지와 선택적 식별자를 담고,
//! 소스 줄은 문서 본문입니다. 문서와 라우팅 결정은 직렬화 후에도
//! Envelope에 남아 싱크가 계속 사용할 수 있습니다.

use bytes::Bytes;
use serde_json::json;

use docforge_core::error::{DocforgeError, PipelineError};
use docforge_core::pipeline::Stage;
use docforge_core::types::Envelope;

/// 벌크 직렬화 스테이지
///
/// 라우팅 결정이 없는 Envelope이 도달하면 `Serialization` 에러로
/// 파이프라인을 종료합니다 (스테이지 순서 위반).
#[derive(Debug, Default)]
pub struct BulkSerializer;

impl BulkSerializer {
    /// 새 직렬화 스테이지를 생성합니다.
    pub fn new() -> Self {
        Self
    }
}

impl Stage for BulkSerializer {
    fn name(&self) -> &str {
        "bulk_serializer"
    }

    fn process(&mut self, mut envelope: Envelope) -> Result<Option<Envelope>, DocforgeError> {
        let Some(routing) = &envelope.routing else {
            return Err(PipelineError::Serialization(
                "envelope reached serializer without a routing decision".to_owned(),
            )
            .into());
        };

        let action = match &routing.document_id {
            Some(id) => json!({"index": {"_index": routing.destination, "_id": id}}),
            None => json!({"index": {"_index": routing.destination}}),
        };

        let mut record = serde_json::to_vec(&action)
            .map_err(|e| PipelineError::Serialization(e.to_string()))?;
        record.push(b'\n');
        serde_json::to_writer(&mut record, &envelope.document)
            .map_err(|e| PipelineError::Serialization(e.to_string()))?;
        record.push(b'\n');

        envelope.encoded = Some(Bytes::from(record));
        Ok(Some(envelope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docforge_core::types::{Document, RoutingDecision};
    use serde_json::json;

    fn routed_envelope(routing: RoutingDecision) -> Envelope {
        let mut doc = Document::new();
        doc.insert("name", json!("checkout"));
        Envelope::new(doc).with_routing(routing)
    }

    fn lines(bytes: &Bytes) -> Vec<serde_json::Value> {
        let text = std::str::from_utf8(bytes).unwrap();
        assert!(text.ends_with('\n'));
        text.lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn record_has_action_and_source_lines() {
        let mut stage = BulkSerializer::new();
        let out = stage
            .process(routed_envelope(
                RoutingDecision::new("telemetry.webapp").with_document_id("app-01"),
            ))
            .unwrap()
            .unwrap();

        let encoded = out.encoded.expect("record should be encoded");
        let lines = lines(&encoded);
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            json!({"index": {"_index": "telemetry.webapp", "_id": "app-01"}})
        );
        assert_eq!(lines[1], json!({"name": "checkout"}));
    }

    #[test]
    fn action_line_omits_id_when_absent() {
        let mut stage = BulkSerializer::new();
        let out = stage
            .process(routed_envelope(RoutingDecision::new("telemetry.host")))
            .unwrap()
            .unwrap();

        let lines = lines(&out.encoded.unwrap());
        assert_eq!(lines[0], json!({"index": {"_index": "telemetry.host"}}));
    }

    #[test]
    fn document_and_routing_survive_serialization() {
        let mut stage = BulkSerializer::new();
        let out = stage
            .process(routed_envelope(RoutingDecision::new("telemetry.host")))
            .unwrap()
            .unwrap();

        assert!(out.is_routed());
        assert!(out.document.contains("name"));
    }

    #[test]
    fn unrouted_envelope_fails() {
        let mut stage = BulkSerializer::new();
        let err = stage
            .process(Envelope::new(Document::new()))
            .unwrap_err();
        assert!(matches!(
            err,
            DocforgeError::Pipeline(PipelineError::Serialization(_))
        ));
    }
}
