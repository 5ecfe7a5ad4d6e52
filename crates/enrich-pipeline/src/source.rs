//! 문서 소스 모듈 -- NDJSON 파일에서 문서를 읽어 파이프라인에 공급합니다.
//!
//! # 소스 채널 규약
//! 소스는 `mpsc::Sender<SourceItem>`으로 문서를 보냅니다.
//! - `Ok(Document)`: 문서 하나
//! - `Err(_)`: 소스에서 발생한 에러 — 코디네이터가 그대로 전파하고 중단
//! - 채널 닫힘: 입력 끝 (정상 완료 신호)
//!
//! 채널이 바운드되어 있으므로 `send().await`가 곧 backpressure입니다.
//! 코디네이터가 문서를 소비하지 못하면 소스 태스크가 대기합니다.

use std::path::PathBuf;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use docforge_core::error::DocforgeError;
use docforge_core::types::Document;

use crate::config::PipelineConfig;
use crate::error::EnrichPipelineError;

/// 소스 채널로 전달되는 항목
pub type SourceItem = Result<Document, DocforgeError>;

/// 소스 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    /// 실행 대기 중
    Idle,
    /// 실행 중
    Running,
    /// 에러로 중단됨
    Error(String),
    /// 입력 끝까지 정상 완료됨
    Finished,
}

/// NDJSON 파일 소스 설정
#[derive(Debug, Clone)]
pub struct NdjsonFileSourceConfig {
    /// 읽을 NDJSON 파일 경로
    pub path: PathBuf,
    /// 라인 최대 길이 (바이트)
    pub max_line_bytes: usize,
}

impl NdjsonFileSourceConfig {
    /// 파이프라인 설정과 파일 경로에서 소스 설정을 생성합니다.
    pub fn from_pipeline(config: &PipelineConfig, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_line_bytes: config.max_line_bytes,
        }
    }
}

/// NDJSON 파일 소스
///
/// 파일의 각 라인을 [`Document`]로 파싱하여 소스 채널로 보냅니다.
/// 빈 라인은 건너뜁니다. 파싱 실패나 I/O 에러는 `Err` 항목으로 전달되고
/// 소스는 즉시 종료합니다 (fail-fast).
pub struct NdjsonFileSource {
    /// 소스 설정
    config: NdjsonFileSourceConfig,
    /// 문서 전송 채널
    tx: mpsc::Sender<SourceItem>,
    /// 현재 상태
    status: SourceStatus,
}

impl NdjsonFileSource {
    /// 새 NDJSON 파일 소스를 생성합니다.
    pub fn new(config: NdjsonFileSourceConfig, tx: mpsc::Sender<SourceItem>) -> Self {
        Self {
            config,
            tx,
            status: SourceStatus::Idle,
        }
    }

    /// 현재 상태를 반환합니다.
    pub fn status(&self) -> &SourceStatus {
        &self.status
    }

    /// 소스를 실행합니다.
    ///
    /// 파일 끝, 에러, 또는 수신측 종료까지 실행되고 최종 상태를 반환합니다.
    /// 소스를 소비하므로 반환 시점에 송신 채널이 닫혀
    /// 코디네이터에 입력 끝이 전달됩니다.
    /// `tokio::spawn`으로 별도 태스크에서 호출하세요.
    pub async fn run(mut self) -> SourceStatus {
        self.status = SourceStatus::Running;
        let path = self.config.path.clone();
        tracing::info!(path = %path.display(), "ndjson source started");

        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) => {
                self.fail(format!("open failed: {e}")).await;
                return self.status;
            }
        };

        let mut lines = BufReader::new(file).lines();
        let mut sent: u64 = 0;

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break, // 파일 끝
                Err(e) => {
                    self.fail(format!("read failed: {e}")).await;
                    return self.status;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            if line.len() > self.config.max_line_bytes {
                self.fail(format!(
                    "line {} exceeds max length ({} > {} bytes)",
                    sent + 1,
                    line.len(),
                    self.config.max_line_bytes
                ))
                .await;
                return self.status;
            }

            let document = match Document::parse(&line) {
                Ok(document) => document,
                Err(e) => {
                    self.fail(format!("line {}: {e}", sent + 1)).await;
                    return self.status;
                }
            };

            // 바운드 채널: 코디네이터가 소비할 때까지 대기 (backpressure)
            if self.tx.send(Ok(document)).await.is_err() {
                // 수신측이 사라짐 — 파이프라인이 이미 종료됨
                tracing::debug!("source channel closed by receiver, stopping");
                self.status = SourceStatus::Finished;
                return self.status;
            }
            sent += 1;
        }

        tracing::info!(documents = sent, "ndjson source finished");
        self.status = SourceStatus::Finished;
        self.status
    }

    /// 에러를 채널로 전달하고 소스를 종료 상태로 만듭니다.
    async fn fail(&mut self, reason: String) {
        tracing::error!(path = %self.config.path.display(), %reason, "ndjson source failed");
        let err = EnrichPipelineError::Source {
            path: self.config.path.display().to_string(),
            reason: reason.clone(),
        };
        // 수신측이 이미 사라진 경우는 무시 (전파할 곳이 없음)
        let _ = self.tx.send(Err(err.into())).await;
        self.status = SourceStatus::Error(reason);
    }
}
