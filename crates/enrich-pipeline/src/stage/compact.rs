//! 필드 평탄화 스테이지
//!
//! 중첩된 객체 필드 경로를 점 표기 키로 평탄화합니다.
//!
//! ```text
//! {"host": {"os": {"name": "linux"}}}  →  {"host.os.name": "linux"}
//! ```
//!
//! 배열과 스칼라는 리프로 취급되어 그대로 유지됩니다.
//! 빈 객체는 기록할 리프가 없으므로 결과에서 사라집니다.

use serde_json::{Map, Value};

use docforge_core::error::DocforgeError;
use docforge_core::pipeline::Stage;
use docforge_core::types::{Document, Envelope};

/// 필드 평탄화 스테이지
///
/// 결정적 변환입니다: 같은 입력은 항상 같은 출력을 만듭니다.
/// 평탄화된 키가 기존 키와 충돌하면 나중에 평탄화된 값이 남습니다.
#[derive(Debug, Default)]
pub struct FieldCompactor;

impl FieldCompactor {
    /// 새 평탄화 스테이지를 생성합니다.
    pub fn new() -> Self {
        Self
    }

    /// 필드 맵을 평탄화합니다.
    fn flatten(fields: Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, value) in fields {
            Self::flatten_into(&mut out, key, value);
        }
        out
    }

    /// 값 하나를 평탄화하여 출력 맵에 기록합니다.
    fn flatten_into(out: &mut Map<String, Value>, key: String, value: Value) {
        match value {
            Value::Object(nested) => {
                for (child_key, child_value) in nested {
                    Self::flatten_into(out, format!("{key}.{child_key}"), child_value);
                }
            }
            leaf => {
                out.insert(key, leaf);
            }
        }
    }
}

impl Stage for FieldCompactor {
    fn name(&self) -> &str {
        "field_compactor"
    }

    fn process(&mut self, mut envelope: Envelope) -> Result<Option<Envelope>, DocforgeError> {
        let fields = envelope.document.into_fields();
        envelope.document = Document::from_fields(Self::flatten(fields));
        Ok(Some(envelope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compact(input: Value) -> Document {
        let Value::Object(fields) = input else {
            panic!("test input must be an object");
        };
        let mut stage = FieldCompactor::new();
        stage
            .process(Envelope::new(Document::from_fields(fields)))
            .unwrap()
            .unwrap()
            .document
    }

    #[test]
    fn flat_document_is_unchanged() {
        let doc = compact(json!({"a": 1, "b": "two"}));
        assert_eq!(doc.get("a"), Some(&json!(1)));
        assert_eq!(doc.get("b"), Some(&json!("two")));
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn nested_objects_become_dotted_keys() {
        let doc = compact(json!({"host": {"os": {"name": "linux"}}}));
        assert_eq!(doc.get("host.os.name"), Some(&json!("linux")));
        assert!(!doc.contains("host"));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn arrays_are_leaves() {
        let doc = compact(json!({"tags": ["a", "b"], "nested": {"list": [1, 2]}}));
        assert_eq!(doc.get("tags"), Some(&json!(["a", "b"])));
        assert_eq!(doc.get("nested.list"), Some(&json!([1, 2])));
    }

    #[test]
    fn nulls_are_leaves() {
        let doc = compact(json!({"a": {"b": null}}));
        assert_eq!(doc.get("a.b"), Some(&json!(null)));
    }

    #[test]
    fn empty_object_compacts_to_nothing() {
        let doc = compact(json!({"meta": {}, "kept": 1}));
        assert!(!doc.contains("meta"));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn empty_document_stays_empty() {
        let doc = compact(json!({}));
        assert!(doc.is_empty());
    }

    #[test]
    fn compaction_is_idempotent() {
        let once = compact(json!({"a": {"b": 1}, "c": [{"d": 2}]}));
        let twice = compact(Value::Object(once.fields().clone()));
        assert_eq!(once, twice);
    }

    #[test]
    fn dotted_key_collision_keeps_flattened_value() {
        // 기존 "a.b" 키와 {"a": {"b": ...}}의 평탄화 결과가 충돌하는 경우
        let doc = compact(json!({"a.b": "literal", "a": {"b": "nested"}}));
        assert_eq!(doc.len(), 1);
        assert!(doc.contains("a.b"));
    }

    #[test]
    fn routing_and_encoded_are_untouched() {
        use docforge_core::types::RoutingDecision;

        let mut stage = FieldCompactor::new();
        let mut doc = Document::new();
        doc.insert("a", json!({"b": 1}));
        let envelope =
            Envelope::new(doc).with_routing(RoutingDecision::new("telemetry.host"));

        let out = stage.process(envelope).unwrap().unwrap();
        assert!(out.is_routed());
        assert!(out.document.contains("a.b"));
    }
}
