//! 변형 스테이지 모듈 -- 문서를 순서대로 변형하는 단계들
//!
//! # 제공 스테이지
//! - [`TimestampNormalizer`]: 타임스탬프 필드를 정규화된 필드 쌍으로 재작성
//! - [`RoutingDecorator`]: 판별자 필드에서 목적지 인덱스 계산
//! - [`FieldCompactor`]: 중첩 객체를 점 표기 키로 평탄화
//! - [`BulkSerializer`]: 벌크 전송용 바이트 레코드 생성
//!
//! # 아키텍처
//! [`StageSet`]은 등록 순서를 보존하는 스테이지 목록입니다.
//! 모든 문서는 등록 순서대로 모든 스테이지를 통과하며,
//! 스테이지가 명시적으로 드롭하지 않는 한 건너뛰지 않습니다.

pub mod compact;
pub mod routing;
pub mod serialize;
pub mod timestamp;

pub use compact::FieldCompactor;
pub use routing::RoutingDecorator;
pub use serialize::BulkSerializer;
pub use timestamp::TimestampNormalizer;

use metrics::counter;

use docforge_core::error::DocforgeError;
use docforge_core::pipeline::Stage;
use docforge_core::types::Envelope;

/// 스테이지 세트 -- 선언 순서가 보존되는 스테이지 목록
///
/// 코디네이터는 문서 하나마다 이 세트를 처음부터 끝까지 실행합니다.
/// 스테이지가 `Ok(None)`을 반환하면 문서는 드롭되고 나머지 스테이지는
/// 실행되지 않습니다. `Err`은 파이프라인 전체의 종료 실패입니다.
pub struct StageSet {
    /// 등록된 스테이지 목록 (순서대로 실행)
    stages: Vec<Box<dyn Stage>>,
}

impl StageSet {
    /// 빈 스테이지 세트를 생성합니다.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// 스테이지를 맨 뒤에 등록합니다.
    pub fn register(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    /// 등록된 스테이지 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// 스테이지가 하나도 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// 등록된 스테이지 이름 목록을 반환합니다.
    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Envelope 하나를 모든 스테이지에 순서대로 통과시킵니다.
    ///
    /// # 반환 규약
    /// - `Ok(Some(envelope))`: 모든 스테이지 통과
    /// - `Ok(None)`: 어떤 스테이지가 문서를 드롭함
    /// - `Err(_)`: 스테이지 실패 (파이프라인 종료)
    pub fn process(&mut self, envelope: Envelope) -> Result<Option<Envelope>, DocforgeError> {
        let mut current = envelope;
        for stage in &mut self.stages {
            match stage.process(current)? {
                Some(next) => current = next,
                None => {
                    tracing::debug!(stage = stage.name(), "document dropped by stage");
                    counter!(
                        docforge_core::metrics::PIPELINE_DOCUMENTS_DROPPED_TOTAL,
                        docforge_core::metrics::LABEL_STAGE => stage.name().to_owned()
                    )
                    .increment(1);
                    return Ok(None);
                }
            }
        }
        Ok(Some(current))
    }
}

impl Default for StageSet {
    fn default() -> Self {
        Self::new()
    }
}
