//! 라우팅 결정 스테이지
//!
//! 문서의 논리 타입 판별자 필드에서 목적지 인덱스 이름을 계산하여
//! Envelope에 [`RoutingDecision`]을 붙입니다.
//!
//! 판별자 필드는 필수입니다: 누락되면 파이프라인 전체가
//! `MissingRequiredField`로 실패합니다. 라우팅 불가능한 문서는
//! 목적지 파티셔닝을 오염시키므로 재시도 없이 중단하는 것이 규약입니다.

use serde_json::Value;

use docforge_core::error::{DocforgeError, PipelineError};
use docforge_core::pipeline::Stage;
use docforge_core::types::{Envelope, RoutingDecision};

use crate::config::PipelineConfig;

/// 라우팅 결정 스테이지
///
/// 목적지 이름은 `{namespace_prefix}.{소문자 판별자}` 형식입니다.
/// 예: 접두어 `telemetry`, 판별자 `"WebApp"` → `telemetry.webapp`
pub struct RoutingDecorator {
    /// 판별자 필드 이름 (필수)
    type_field: String,
    /// 식별자 필드 이름 (선택)
    id_field: String,
    /// 목적지 이름 접두어
    namespace_prefix: String,
}

impl RoutingDecorator {
    /// 설정에서 라우팅 스테이지를 생성합니다.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            type_field: config.type_field.clone(),
            id_field: config.id_field.clone(),
            namespace_prefix: config.namespace_prefix.clone(),
        }
    }

    /// 판별자 값에서 목적지 이름을 계산합니다.
    fn destination(&self, discriminator: &str) -> String {
        format!("{}.{}", self.namespace_prefix, discriminator.to_lowercase())
    }

    /// 식별자 필드 값을 문자열로 변환합니다.
    ///
    /// 문자열과 숫자만 식별자로 인정합니다. 그 외 타입은 무시되어
    /// 싱크가 자동 할당하게 됩니다.
    fn document_id(value: &Value) -> Option<String> {
        match value {
            Value::String(text) if !text.is_empty() => Some(text.clone()),
            Value::Number(num) => Some(num.to_string()),
            _ => None,
        }
    }
}

impl Stage for RoutingDecorator {
    fn name(&self) -> &str {
        "routing_decorator"
    }

    fn process(&mut self, mut envelope: Envelope) -> Result<Option<Envelope>, DocforgeError> {
        let discriminator = match envelope.document.get(&self.type_field) {
            Some(Value::String(text)) if !text.is_empty() => text.clone(),
            // 누락, 빈 문자열, 비문자열 모두 라우팅 불가 — 치명적 에러
            _ => {
                return Err(PipelineError::MissingRequiredField {
                    field: self.type_field.clone(),
                }
                .into());
            }
        };

        let mut routing = RoutingDecision::new(self.destination(&discriminator));
        if let Some(id) = envelope.document.get(&self.id_field).and_then(Self::document_id) {
            routing = routing.with_document_id(id);
        }

        tracing::trace!(destination = %routing.destination, "routing decision attached");
        envelope.routing = Some(routing);
        Ok(Some(envelope))
    }
}
