//! 파이프라인 오케스트레이션 -- 소스/스테이지/싱크의 전체 흐름을 관리합니다.
//!
//! [`EnrichPipeline`]은 core의 [`Pipeline`](docforge_core::pipeline::Pipeline)
//! trait을 구현하여 임베더(CLI 등)에서 표준 생명주기로 관리됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! Source -> mpsc -> [Normalizer -> Router -> Compactor -> Serializer] -> Sink
//! ```
//!
//! # 실행 보장
//! - **순서**: 문서는 소스 순서 그대로 싱크에 도달합니다 (FIFO).
//! - **Backpressure**: 싱크 write가 끝나기 전에는 다음 소스 항목을
//!   당기지 않습니다. 소스 채널이 바운드되어 있어 생산자도 대기합니다.
//! - **Fail-fast**: 소스/스테이지/싱크 어디서든 실패하면 즉시 종료하며,
//!   이후 어떤 문서도 당기지 않습니다. 재시도/부분 성공 모드는 없습니다.
//! - **완료**: 입력 끝 + 진행 중 문서 드레인 + 싱크 flush 후 정확히
//!   한 번 완료를 알립니다.

use std::time::Instant;

use metrics::{counter, histogram};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use docforge_core::error::{DocforgeError, PipelineError};
use docforge_core::metrics as metric_names;
use docforge_core::pipeline::{HealthStatus, Pipeline, Sink, Stage};
use docforge_core::types::Envelope;

use crate::config::PipelineConfig;
use crate::error::EnrichPipelineError;
use crate::source::SourceItem;
use crate::stage::{
    BulkSerializer, FieldCompactor, RoutingDecorator, StageSet, TimestampNormalizer,
};

/// 파이프라인 실행 상태
///
/// ```text
/// Idle → Running → {Completed | Failed}
/// ```
/// `Completed`와 `Failed`는 종단 상태입니다. 재시작은 허용되지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// 생성됨, 아직 시작하지 않음
    Idle,
    /// 실행 중
    Running,
    /// 정상 완료됨 (종단)
    Completed,
    /// 실패로 종료됨 (종단)
    Failed,
}

/// 취소 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelMode {
    /// 소스 당기기를 멈추고 진행 중 문서를 드레인한 뒤 정상 완료
    Drain,
    /// 즉시 중단 — 실행은 `Cancelled` 실패로 종료됨 (침묵 절단 금지)
    Abandon,
}

/// 실행 결과 요약
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    /// 싱크까지 전달된 문서 수
    pub processed: u64,
    /// 스테이지가 드롭한 문서 수
    pub dropped: u64,
}

/// 보강 파이프라인 -- 소스/스테이지/싱크의 전체 흐름을 관리합니다.
///
/// # 사용 예시
/// ```ignore
/// use docforge_core::pipeline::Pipeline;
/// use docforge_enrich_pipeline::{BufferSink, EnrichPipelineBuilder};
///
/// let (mut pipeline, source_tx) = EnrichPipelineBuilder::new()
///     .config(config)
///     .sink(Box::new(BufferSink::new()))
///     .build()?;
///
/// pipeline.start().await?;
/// // ... source_tx로 문서 공급, 채널을 닫으면 입력 끝 ...
/// let summary = pipeline.wait().await?;
/// ```
pub struct EnrichPipeline {
    /// 파이프라인 설정
    config: PipelineConfig,
    /// 현재 상태 (`wait()`가 종단 상태를 확정함)
    state: PipelineState,
    /// start()에서 소비되는 실행 구성 요소
    parts: Option<RunParts>,
    /// 코디네이터 태스크 핸들
    handle: Option<JoinHandle<Result<PipelineSummary, DocforgeError>>>,
    /// 드레인 취소 토큰
    drain_token: CancellationToken,
    /// 포기 취소 토큰
    abandon_token: CancellationToken,
    /// 실행 식별자 (로그 상관용)
    run_id: uuid::Uuid,
    /// wait()가 확정한 실행 요약
    summary: Option<PipelineSummary>,
}

/// 코디네이터 태스크로 이동되는 실행 구성 요소
struct RunParts {
    source_rx: mpsc::Receiver<SourceItem>,
    stages: StageSet,
    sink: Box<dyn Sink>,
}

/// 파이프라인 취소 핸들
///
/// [`EnrichPipeline::canceller`]로 얻으며, 파이프라인과 독립적으로
/// 이동/복제할 수 있습니다.
#[derive(Clone)]
pub struct PipelineCanceller {
    drain_token: CancellationToken,
    abandon_token: CancellationToken,
    run_id: uuid::Uuid,
}

impl PipelineCanceller {
    /// 파이프라인을 취소합니다. [`EnrichPipeline::cancel`]과 동일합니다.
    pub fn cancel(&self, mode: CancelMode) {
        tracing::info!(run_id = %self.run_id, ?mode, "pipeline cancellation requested");
        match mode {
            CancelMode::Drain => self.drain_token.cancel(),
            CancelMode::Abandon => self.abandon_token.cancel(),
        }
    }
}

impl EnrichPipeline {
    /// 파이프라인 설정에 대한 참조를 반환합니다.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 현재 상태를 반환합니다.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// 현재 상태 이름을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            PipelineState::Idle => "idle",
            PipelineState::Running => "running",
            PipelineState::Completed => "completed",
            PipelineState::Failed => "failed",
        }
    }

    /// 실행 식별자를 반환합니다.
    pub fn run_id(&self) -> uuid::Uuid {
        self.run_id
    }

    /// 싱크까지 전달된 문서 수를 반환합니다 (`wait()` 이후 유효).
    pub fn processed_count(&self) -> u64 {
        self.summary.map(|s| s.processed).unwrap_or(0)
    }

    /// 드롭된 문서 수를 반환합니다 (`wait()` 이후 유효).
    pub fn dropped_count(&self) -> u64 {
        self.summary.map(|s| s.dropped).unwrap_or(0)
    }

    /// 파이프라인을 외부에서 취소합니다.
    ///
    /// [`CancelMode::Drain`]은 진행 중 문서를 드레인하고 싱크를 flush한 뒤
    /// 정상 완료로 이어집니다. [`CancelMode::Abandon`]은 즉시 중단하며
    /// 실행은 `Cancelled` 실패로 기록됩니다. 어느 쪽이든 이후 소스에서
    /// 새 문서를 당기지 않습니다.
    pub fn cancel(&self, mode: CancelMode) {
        tracing::info!(run_id = %self.run_id, ?mode, "pipeline cancellation requested");
        match mode {
            CancelMode::Drain => self.drain_token.cancel(),
            CancelMode::Abandon => self.abandon_token.cancel(),
        }
    }

    /// 분리된 취소 핸들을 반환합니다.
    ///
    /// `wait()`가 파이프라인을 가변 대여하는 동안에도 다른 태스크에서
    /// 취소를 걸 수 있습니다 (시그널 핸들러 등).
    pub fn canceller(&self) -> PipelineCanceller {
        PipelineCanceller {
            drain_token: self.drain_token.clone(),
            abandon_token: self.abandon_token.clone(),
            run_id: self.run_id,
        }
    }

    /// 실행 완료를 대기하고 종단 상태를 확정합니다.
    ///
    /// 정확히 한 번 호출할 수 있습니다. `start()` 전에 호출하면
    /// `NotRunning` 에러를 반환합니다.
    pub async fn wait(&mut self) -> Result<PipelineSummary, DocforgeError> {
        let handle = self
            .handle
            .take()
            .ok_or(PipelineError::NotRunning)?;

        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(PipelineError::ChannelClosed(format!(
                "coordinator task failed: {e}"
            ))
            .into()),
        };

        match &result {
            Ok(summary) => {
                self.state = PipelineState::Completed;
                self.summary = Some(*summary);
                tracing::info!(
                    run_id = %self.run_id,
                    processed = summary.processed,
                    dropped = summary.dropped,
                    "pipeline completed"
                );
            }
            Err(e) => {
                self.state = PipelineState::Failed;
                tracing::error!(run_id = %self.run_id, error = %e, "pipeline failed");
            }
        }

        result
    }

    /// 코디네이터 루프 — 단일 태스크에서 실행됩니다.
    ///
    /// 문서는 한 번에 하나씩 스테이지 세트를 통과한 뒤 싱크에 기록되므로
    /// FIFO 순서와 read-before-write backpressure가 구조적으로 보장됩니다.
    async fn run_loop(
        mut parts: RunParts,
        drain_token: CancellationToken,
        abandon_token: CancellationToken,
    ) -> Result<PipelineSummary, DocforgeError> {
        let mut summary = PipelineSummary::default();

        loop {
            tokio::select! {
                biased;

                _ = abandon_token.cancelled() => {
                    counter!(metric_names::PIPELINE_FAILURES_TOTAL).increment(1);
                    return Err(PipelineError::Cancelled.into());
                }

                _ = drain_token.cancelled() => break,

                item = parts.source_rx.recv() => {
                    let document = match item {
                        // 채널 닫힘 = 입력 끝
                        None => break,
                        // 소스 에러는 그대로 전파
                        Some(Err(e)) => {
                            counter!(metric_names::PIPELINE_FAILURES_TOTAL).increment(1);
                            return Err(e);
                        }
                        Some(Ok(document)) => document,
                    };

                    counter!(metric_names::PIPELINE_DOCUMENTS_RECEIVED_TOTAL).increment(1);
                    let stage_started = Instant::now();

                    let envelope = match parts.stages.process(Envelope::new(document)) {
                        Err(e) => {
                            counter!(metric_names::PIPELINE_FAILURES_TOTAL).increment(1);
                            return Err(e);
                        }
                        Ok(None) => {
                            summary.dropped += 1;
                            continue;
                        }
                        Ok(Some(envelope)) => envelope,
                    };
                    histogram!(metric_names::PIPELINE_STAGE_DURATION_SECONDS)
                        .record(stage_started.elapsed().as_secs_f64());

                    let write_started = Instant::now();
                    if let Err(e) = parts.sink.write(envelope).await {
                        counter!(metric_names::PIPELINE_FAILURES_TOTAL).increment(1);
                        return Err(e);
                    }
                    histogram!(metric_names::PIPELINE_SINK_WRITE_DURATION_SECONDS)
                        .record(write_started.elapsed().as_secs_f64());

                    summary.processed += 1;
                    counter!(metric_names::PIPELINE_DOCUMENTS_PROCESSED_TOTAL).increment(1);
                }
            }
        }

        // 정상 종료 경로 (입력 끝 또는 드레인 취소): 싱크를 비움
        parts.sink.flush().await?;
        Ok(summary)
    }
}

impl Pipeline for EnrichPipeline {
    async fn start(&mut self) -> Result<(), DocforgeError> {
        if self.state == PipelineState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }
        let Some(parts) = self.parts.take() else {
            // 종단 상태에서의 재시작 시도
            return Err(PipelineError::AlreadyRunning.into());
        };

        tracing::info!(
            run_id = %self.run_id,
            stages = ?parts.stages.names(),
            sink = parts.sink.name(),
            "starting enrich pipeline"
        );

        let drain_token = self.drain_token.clone();
        let abandon_token = self.abandon_token.clone();
        self.handle = Some(tokio::spawn(Self::run_loop(
            parts,
            drain_token,
            abandon_token,
        )));
        self.state = PipelineState::Running;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), DocforgeError> {
        if self.state != PipelineState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        tracing::info!(run_id = %self.run_id, "stopping enrich pipeline (drain)");
        self.cancel(CancelMode::Drain);
        self.wait().await.map(|_| ())
    }

    fn health_check(&self) -> impl std::future::Future<Output = HealthStatus> + Send {
        // `self`가 비-Sync 필드(Box<dyn Sink>/Box<dyn Stage>)를 보유하므로
        // `&self`를 future에 캡처하면 Send가 되지 않는다. 상태는 Copy이므로
        // 값으로 복사해 캡처하여 동일한 결과를 Send future로 반환한다.
        let state = self.state;
        async move {
            match state {
                PipelineState::Running => HealthStatus::Healthy,
                PipelineState::Idle => HealthStatus::Unhealthy("not started".to_owned()),
                PipelineState::Completed => HealthStatus::Unhealthy("completed".to_owned()),
                PipelineState::Failed => HealthStatus::Unhealthy("failed".to_owned()),
            }
        }
    }
}

/// 보강 파이프라인 빌더
///
/// 스테이지 세트를 조립하고 필요한 채널을 생성합니다.
pub struct EnrichPipelineBuilder {
    config: PipelineConfig,
    source_rx: Option<mpsc::Receiver<SourceItem>>,
    sink: Option<Box<dyn Sink>>,
    extra_stages: Vec<Box<dyn Stage>>,
}

impl EnrichPipelineBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            source_rx: None,
            sink: None,
            extra_stages: Vec::new(),
        }
    }

    /// 파이프라인 설정을 지정합니다.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 외부 소스 채널을 설정합니다.
    ///
    /// 설정하지 않으면 빌더가 `config.channel_capacity` 용량의 채널을
    /// 생성하고 송신측을 반환합니다.
    pub fn source(mut self, rx: mpsc::Receiver<SourceItem>) -> Self {
        self.source_rx = Some(rx);
        self
    }

    /// 종단 싱크를 설정합니다 (필수).
    pub fn sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// 추가 스테이지를 등록합니다.
    ///
    /// 추가 스테이지는 평탄화 뒤, 직렬화 앞에 등록 순서대로 배치됩니다.
    pub fn stage(mut self, stage: Box<dyn Stage>) -> Self {
        self.extra_stages.push(stage);
        self
    }

    /// 파이프라인을 빌드합니다.
    ///
    /// # Returns
    /// - `EnrichPipeline`: 파이프라인 인스턴스
    /// - `Option<mpsc::Sender<SourceItem>>`: 소스 송신 채널
    ///   (외부 소스 채널을 설정한 경우 None)
    pub fn build(
        self,
    ) -> Result<(EnrichPipeline, Option<mpsc::Sender<SourceItem>>), EnrichPipelineError> {
        self.config.validate()?;

        let sink = self
            .sink
            .ok_or_else(|| EnrichPipelineError::Build("a sink is required".to_owned()))?;

        let (source_rx, source_tx) = match self.source_rx {
            Some(rx) => (rx, None),
            None => {
                let (tx, rx) = mpsc::channel(self.config.channel_capacity);
                (rx, Some(tx))
            }
        };

        // 스테이지 조립: 정규화 -> 라우팅 -> 평탄화 -> (추가) -> 직렬화
        let mut stages = StageSet::new();
        stages.register(Box::new(TimestampNormalizer::from_config(&self.config)));
        stages.register(Box::new(RoutingDecorator::from_config(&self.config)));
        stages.register(Box::new(FieldCompactor::new()));
        for stage in self.extra_stages {
            stages.register(stage);
        }
        if self.config.include_serialization {
            stages.register(Box::new(BulkSerializer::new()));
        }

        let pipeline = EnrichPipeline {
            config: self.config,
            state: PipelineState::Idle,
            parts: Some(RunParts {
                source_rx,
                stages,
                sink,
            }),
            handle: None,
            drain_token: CancellationToken::new(),
            abandon_token: CancellationToken::new(),
            run_id: uuid::Uuid::new_v4(),
            summary: None,
        };

        Ok((pipeline, source_tx))
    }
}

impl Default for EnrichPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
