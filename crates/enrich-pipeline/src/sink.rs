//! 벌크 싱크 모듈 -- 변형 완료된 문서의 종단 소비자
//!
//! # 제공 싱크
//! - [`FileSink`]: 벌크 NDJSON 파일 기록 (버퍼링)
//! - [`BufferSink`]: 인메모리 캡처 (테스트 및 dry-run)
//!
//! 싱크 I/O 에러는 모두 `SinkRejection`으로 분류되어
//! 파이프라인 전체를 종료시킵니다.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use docforge_core::error::{DocforgeError, PipelineError};
use docforge_core::pipeline::{BoxFuture, Sink};
use docforge_core::types::Envelope;

/// Envelope을 기록할 바이트로 변환합니다.
///
/// 직렬화 스테이지가 채운 레코드가 있으면 그대로 사용하고,
/// 없으면 (직렬화 비활성 모드) 문서를 JSON 한 줄로 내보냅니다.
fn envelope_payload(envelope: &Envelope) -> Result<Bytes, DocforgeError> {
    if let Some(encoded) = &envelope.encoded {
        return Ok(encoded.clone());
    }
    let mut line = serde_json::to_vec(&envelope.document)
        .map_err(|e| PipelineError::Serialization(e.to_string()))?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}

/// 벌크 NDJSON 파일 싱크
///
/// 기록은 내부 버퍼를 거치며, [`Sink::flush`]가 호출될 때 디스크로
/// 내보내집니다. 파이프라인은 완료 직전과 드레인 취소 시 flush를
/// 보장합니다.
#[derive(Debug)]
pub struct FileSink {
    /// 기록 경로 (로깅용)
    path: String,
    /// 버퍼링된 파일 기록기
    writer: BufWriter<File>,
    /// 기록된 envelope 수
    written: u64,
}

impl FileSink {
    /// 파일을 생성(덮어쓰기)하고 싱크를 만듭니다.
    pub async fn create(path: impl AsRef<std::path::Path>) -> Result<Self, DocforgeError> {
        let path_display = path.as_ref().display().to_string();
        let file = File::create(path.as_ref())
            .await
            .map_err(|e| PipelineError::SinkRejection(format!("{path_display}: {e}")))?;
        Ok(Self {
            path: path_display,
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    /// 기록된 envelope 수를 반환합니다.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl Sink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn write(&mut self, envelope: Envelope) -> BoxFuture<'_, Result<(), DocforgeError>> {
        Box::pin(async move {
            let payload = envelope_payload(&envelope)?;
            self.writer
                .write_all(&payload)
                .await
                .map_err(|e| PipelineError::SinkRejection(format!("{}: {e}", self.path)))?;
            self.written += 1;
            Ok(())
        })
    }

    fn flush(&mut self) -> BoxFuture<'_, Result<(), DocforgeError>> {
        Box::pin(async move {
            self.writer
                .flush()
                .await
                .map_err(|e| PipelineError::SinkRejection(format!("{}: {e}", self.path)))?;
            tracing::debug!(path = %self.path, written = self.written, "file sink flushed");
            Ok(())
        })
    }
}

/// 인메모리 캡처 싱크
///
/// 테스트와 dry-run에서 사용합니다. `Clone`된 핸들은 같은 버퍼를
/// 공유하므로, 파이프라인에 싱크를 넘긴 뒤에도 캡처 내용을
/// 검사할 수 있습니다. `failing_after(n)`으로 n개 수락 후
/// 실패하는 싱크를 만들 수 있습니다 (SinkRejection 전파 테스트용).
#[derive(Clone, Default)]
pub struct BufferSink {
    /// 캡처된 envelope 버퍼 (핸들 간 공유)
    captured: Arc<Mutex<Vec<Envelope>>>,
    /// n개 수락 후 실패 (테스트용)
    fail_after: Option<usize>,
    /// flush 호출 횟수 (핸들 간 공유)
    flush_count: Arc<Mutex<u64>>,
}

impl BufferSink {
    /// 새 캡처 싱크를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// `limit`개 수락 후 모든 write가 실패하는 싱크를 생성합니다.
    pub fn failing_after(limit: usize) -> Self {
        Self {
            fail_after: Some(limit),
            ..Self::default()
        }
    }

    /// 캡처된 envelope의 사본을 반환합니다.
    pub fn captured(&self) -> Vec<Envelope> {
        self.lock_captured().clone()
    }

    /// 캡처된 envelope 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.lock_captured().len()
    }

    /// 캡처된 envelope이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.lock_captured().is_empty()
    }

    /// flush 호출 횟수를 반환합니다.
    pub fn flush_count(&self) -> u64 {
        *self
            .flush_count
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_captured(&self) -> std::sync::MutexGuard<'_, Vec<Envelope>> {
        self.captured
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Sink for BufferSink {
    fn name(&self) -> &str {
        "buffer"
    }

    fn write(&mut self, envelope: Envelope) -> BoxFuture<'_, Result<(), DocforgeError>> {
        Box::pin(async move {
            let mut captured = self.lock_captured();
            if let Some(limit) = self.fail_after {
                if captured.len() >= limit {
                    return Err(PipelineError::SinkRejection(format!(
                        "buffer sink rejecting writes after {limit} envelopes"
                    ))
                    .into());
                }
            }
            captured.push(envelope);
            Ok(())
        })
    }

    fn flush(&mut self) -> BoxFuture<'_, Result<(), DocforgeError>> {
        Box::pin(async move {
            *self
                .flush_count
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) += 1;
            Ok(())
        })
    }
}
