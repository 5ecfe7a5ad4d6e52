//! 도메인 타입 — 파이프라인 전역에서 사용되는 공통 타입
//!
//! 하나의 텔레메트리 레코드는 [`Document`]로 표현되며,
//! 스테이지 사이를 흐르는 단위는 [`Envelope`]입니다.
//! 라우팅 결정([`RoutingDecision`])은 문서 필드가 아니라 Envelope에 붙습니다.
//! 도메인 필드와의 키 충돌을 피하기 위해 예약 필드를 사용하지 않습니다.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ParseError;

/// 텔레메트리 문서 — 필드 이름에서 JSON 값으로의 매핑
///
/// 관심 필드(타임스탬프, 타입 판별자, 식별자)도 일반 필드와 동일하게
/// 맵에 저장됩니다. 어떤 필드가 어떤 역할인지는 설정이 결정합니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: Map<String, Value>,
}

impl Document {
    /// 빈 문서를 생성합니다.
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    /// 필드 맵에서 문서를 생성합니다.
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// JSON 텍스트 한 줄에서 문서를 파싱합니다.
    ///
    /// 최상위 값이 JSON 객체가 아니면 [`ParseError::NotAnObject`]를 반환합니다.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_str(text).map_err(|e| ParseError::InvalidJson {
            reason: e.to_string(),
        })?;
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(ParseError::NotAnObject {
                kind: json_kind(&other).to_owned(),
            }),
        }
    }

    /// 필드 값을 조회합니다.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// 필드 존재 여부를 확인합니다.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// 필드를 설정합니다. 기존 값이 있으면 반환합니다.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(field.into(), value)
    }

    /// 필드를 제거하고 값을 반환합니다.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// 필드 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// 필드가 하나도 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 필드 맵에 대한 불변 참조를 반환합니다.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// 문서를 소비하고 필드 맵을 반환합니다.
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 직렬화 실패는 Map<String, Value>에서 발생하지 않음
        match serde_json::to_string(&self.fields) {
            Ok(json) => write!(f, "{json}"),
            Err(_) => write!(f, "{{}}"),
        }
    }
}

/// JSON 값의 종류 이름 (에러 메시지용)
fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 라우팅 결정 — 문서가 기록될 목적지 인덱스와 선택적 식별자
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// 목적지 인덱스 이름 (예: "telemetry.webapp")
    pub destination: String,
    /// 싱크가 사용할 명시적 문서 식별자. None이면 싱크가 자동 할당합니다.
    pub document_id: Option<String>,
}

impl RoutingDecision {
    /// 식별자 없는 라우팅 결정을 생성합니다.
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            document_id: None,
        }
    }

    /// 문서 식별자를 설정합니다.
    pub fn with_document_id(mut self, id: impl Into<String>) -> Self {
        self.document_id = Some(id.into());
        self
    }
}

impl fmt::Display for RoutingDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.document_id {
            Some(id) => write!(f, "{} (id={})", self.destination, id),
            None => write!(f, "{}", self.destination),
        }
    }
}

/// 스테이지 사이를 흐르는 단위 — 문서와 대역 외 메타데이터의 묶음
///
/// 스테이지는 Envelope의 소유권을 받아 변형한 뒤 다음 스테이지로 넘깁니다.
/// 문서는 파이프라인을 정확히 한 번 통과하며, 싱크가 수락하거나
/// 실패가 스트림을 종료하면 해제됩니다.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// 페이로드 문서
    pub document: Document,
    /// 라우팅 스테이지가 붙이는 라우팅 결정
    pub routing: Option<RoutingDecision>,
    /// 직렬화 스테이지가 채우는 전송용 바이트 레코드
    pub encoded: Option<Bytes>,
}

impl Envelope {
    /// 문서만 담은 새 Envelope을 생성합니다.
    pub fn new(document: Document) -> Self {
        Self {
            document,
            routing: None,
            encoded: None,
        }
    }

    /// 라우팅 결정을 붙입니다.
    pub fn with_routing(mut self, routing: RoutingDecision) -> Self {
        self.routing = Some(routing);
        self
    }

    /// 라우팅 결정이 붙어 있는지 확인합니다.
    pub fn is_routed(&self) -> bool {
        self.routing.is_some()
    }

    /// 전송용 레코드가 채워져 있는지 확인합니다.
    pub fn is_encoded(&self) -> bool {
        self.encoded.is_some()
    }
}

impl From<Document> for Envelope {
    fn from(document: Document) -> Self {
        Self::new(document)
    }
}
