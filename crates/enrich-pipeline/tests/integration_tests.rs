//! 통합 테스트 -- 파이프라인 전체 흐름 검증
//!
//! 이 파일은 NDJSON 소스부터 싱크까지의 전체 파이프라인을 검증합니다.
//! 순서 보존, fail-fast 전파, 취소, 직렬화 모드를 다룹니다.

use std::io::Write;

use serde_json::json;
use tokio::sync::mpsc;

use docforge_core::error::{DocforgeError, PipelineError};
use docforge_core::pipeline::Pipeline;
use docforge_core::types::Document;
use docforge_enrich_pipeline::{
    BufferSink, CancelMode, EnrichPipelineBuilder, FileSink, NdjsonFileSource,
    NdjsonFileSourceConfig, PipelineConfig, PipelineState,
};

fn entity_document(n: usize, entity_type: &str) -> Document {
    let mut doc = Document::new();
    doc.insert("@timestamp", json!("2025-06-01T12:00:00Z"));
    doc.insert("entity_type", json!(entity_type));
    doc.insert("entity_id", json!(format!("ent-{n:03}")));
    doc.insert("seq", json!(n));
    doc.insert("host", json!({"os": {"name": "linux"}}));
    doc
}

/// 문서 N개가 소스 순서 그대로, 모든 스테이지를 거쳐 싱크에 도달하는지 검증
#[tokio::test]
async fn n_documents_reach_sink_in_source_order() {
    let sink = BufferSink::new();
    let (mut pipeline, source_tx) = EnrichPipelineBuilder::new()
        .sink(Box::new(sink.clone()))
        .build()
        .expect("build");

    pipeline.start().await.expect("start");

    let tx = source_tx.expect("builder should create source channel");
    for n in 0..10 {
        tx.send(Ok(entity_document(n, "WebApp"))).await.expect("send");
    }
    drop(tx);

    let summary = pipeline.wait().await.expect("pipeline should complete");
    assert_eq!(summary.processed, 10);
    assert_eq!(summary.dropped, 0);

    let captured = sink.captured();
    assert_eq!(captured.len(), 10);
    for (n, envelope) in captured.iter().enumerate() {
        // 순서 보존
        assert_eq!(envelope.document.get("seq"), Some(&json!(n)));
        // 타임스탬프 정규화: 원본 제거, 목적지 쌍 동일 값
        assert!(!envelope.document.contains("@timestamp"));
        assert_eq!(
            envelope.document.get("last_seen"),
            envelope.document.get("ingested")
        );
        // 라우팅: 소문자 목적지 + 명시적 식별자
        let routing = envelope.routing.as_ref().expect("routed");
        assert_eq!(routing.destination, "telemetry.webapp");
        assert_eq!(routing.document_id.as_deref(), Some(&format!("ent-{n:03}")[..]));
        // 평탄화: 중첩 객체가 점 표기 키로
        assert!(envelope.document.contains("host.os.name"));
        assert!(!envelope.document.contains("host"));
        // 직렬화: 전송 레코드 존재
        assert!(envelope.is_encoded());
    }
}

/// 판별자 없는 문서에서 MissingRequiredField로 실패하고
/// 이후 문서가 싱크에 도달하지 않는지 검증
#[tokio::test]
async fn missing_discriminator_aborts_pipeline() {
    let sink = BufferSink::new();
    let (mut pipeline, source_tx) = EnrichPipelineBuilder::new()
        .sink(Box::new(sink.clone()))
        .build()
        .expect("build");

    pipeline.start().await.expect("start");

    let tx = source_tx.unwrap();
    tx.send(Ok(entity_document(0, "Host"))).await.unwrap();
    tx.send(Ok(entity_document(1, "Host"))).await.unwrap();

    // 판별자 누락 문서
    let mut bad = Document::new();
    bad.insert("seq", json!(2));
    tx.send(Ok(bad)).await.unwrap();

    // 실패 이후의 문서 — 싱크에 도달하면 안 됨 (채널이 닫혀 send가 실패할 수 있음)
    let _ = tx.send(Ok(entity_document(3, "Host"))).await;
    let _ = tx.send(Ok(entity_document(4, "Host"))).await;
    drop(tx);

    let err = pipeline.wait().await.expect_err("pipeline should fail");
    assert!(matches!(
        err,
        DocforgeError::Pipeline(PipelineError::MissingRequiredField { .. })
    ));
    assert_eq!(pipeline.state(), PipelineState::Failed);

    // 실패 전에 완전히 처리된 문서만 싱크에 존재
    let captured = sink.captured();
    assert_eq!(captured.len(), 2);
    assert_eq!(captured[0].document.get("seq"), Some(&json!(0)));
    assert_eq!(captured[1].document.get("seq"), Some(&json!(1)));
}

/// 소스 에러가 UpstreamFailure로 그대로 전파되는지 검증
#[tokio::test]
async fn source_error_propagates_verbatim() {
    let sink = BufferSink::new();
    let (mut pipeline, source_tx) = EnrichPipelineBuilder::new()
        .sink(Box::new(sink.clone()))
        .build()
        .expect("build");

    pipeline.start().await.expect("start");

    let tx = source_tx.unwrap();
    tx.send(Ok(entity_document(0, "Host"))).await.unwrap();
    tx.send(Err(PipelineError::UpstreamFailure(
        "generator exploded".to_owned(),
    )
    .into()))
        .await
        .unwrap();
    drop(tx);

    let err = pipeline.wait().await.expect_err("should fail");
    assert!(err.to_string().contains("generator exploded"));
    assert_eq!(sink.len(), 1);
}

/// 싱크 거부가 SinkRejection으로 전파되고 이후 문서가 처리되지 않는지 검증
#[tokio::test]
async fn sink_rejection_aborts_pipeline() {
    let sink = BufferSink::failing_after(2);
    let (mut pipeline, source_tx) = EnrichPipelineBuilder::new()
        .sink(Box::new(sink.clone()))
        .build()
        .expect("build");

    pipeline.start().await.expect("start");

    let tx = source_tx.unwrap();
    for n in 0..5 {
        let _ = tx.send(Ok(entity_document(n, "Host"))).await;
    }
    drop(tx);

    let err = pipeline.wait().await.expect_err("should fail");
    assert!(matches!(
        err,
        DocforgeError::Pipeline(PipelineError::SinkRejection(_))
    ));
    assert_eq!(sink.len(), 2);
}

/// 직렬화 비활성 모드: encoded 없이 싱크에 도달
#[tokio::test]
async fn serialization_can_be_disabled() {
    let config = PipelineConfig {
        include_serialization: false,
        ..Default::default()
    };
    let sink = BufferSink::new();
    let (mut pipeline, source_tx) = EnrichPipelineBuilder::new()
        .config(config)
        .sink(Box::new(sink.clone()))
        .build()
        .expect("build");

    pipeline.start().await.expect("start");
    let tx = source_tx.unwrap();
    tx.send(Ok(entity_document(0, "Service"))).await.unwrap();
    drop(tx);

    pipeline.wait().await.expect("complete");

    let captured = sink.captured();
    assert_eq!(captured.len(), 1);
    assert!(!captured[0].is_encoded());
    assert!(captured[0].is_routed());
}

/// NDJSON 파일 소스 → 파일 싱크 전체 흐름 검증
#[tokio::test]
async fn file_to_file_end_to_end() {
    let mut input = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(
        input,
        "{}",
        r#"{"@timestamp":"2025-06-01T12:00:00Z","entity_type":"WebApp","entity_id":"app-01","name":"checkout"}"#
    )
    .unwrap();
    writeln!(
        input,
        "{}",
        r#"{"@timestamp":"2025-06-01T12:01:00Z","entity_type":"Host","entity_id":"host-01","host":{"cpu":4}}"#
    )
    .unwrap();
    input.flush().unwrap();

    let out_dir = tempfile::tempdir().expect("tempdir");
    let out_path = out_dir.path().join("bulk.ndjson");

    let config = PipelineConfig::default();
    let (source_item_tx, source_item_rx) = mpsc::channel(config.channel_capacity);
    let source = NdjsonFileSource::new(
        NdjsonFileSourceConfig::from_pipeline(&config, input.path()),
        source_item_tx,
    );

    let file_sink = FileSink::create(&out_path).await.expect("sink");
    let (mut pipeline, _none) = EnrichPipelineBuilder::new()
        .config(config)
        .source(source_item_rx)
        .sink(Box::new(file_sink))
        .build()
        .expect("build");

    let source_task = tokio::spawn(source.run());
    pipeline.start().await.expect("start");

    let summary = pipeline.wait().await.expect("complete");
    source_task.await.expect("source task");
    assert_eq!(summary.processed, 2);

    let content = tokio::fs::read_to_string(&out_path).await.expect("read");
    let lines: Vec<&str> = content.lines().collect();
    // 문서당 액션 줄 + 소스 줄
    assert_eq!(lines.len(), 4);
    assert!(lines[0].contains(r#""_index":"telemetry.webapp""#));
    assert!(lines[0].contains(r#""_id":"app-01""#));
    assert!(lines[1].contains(r#""name":"checkout""#));
    assert!(lines[2].contains(r#""_index":"telemetry.host""#));
    assert!(lines[3].contains(r#""host.cpu":4"#));
}

/// 파일 소스의 파싱 에러가 파이프라인 실패로 이어지는지 검증
#[tokio::test]
async fn malformed_source_line_fails_pipeline() {
    let mut input = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(input, "{}", r#"{"entity_type":"Host","entity_id":"h1"}"#).unwrap();
    writeln!(input, "this is not json").unwrap();
    input.flush().unwrap();

    let config = PipelineConfig::default();
    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let source = NdjsonFileSource::new(
        NdjsonFileSourceConfig::from_pipeline(&config, input.path()),
        tx,
    );

    let sink = BufferSink::new();
    let (mut pipeline, _none) = EnrichPipelineBuilder::new()
        .config(config)
        .source(rx)
        .sink(Box::new(sink.clone()))
        .build()
        .expect("build");

    tokio::spawn(source.run());
    pipeline.start().await.expect("start");

    let err = pipeline.wait().await.expect_err("should fail");
    assert!(matches!(
        err,
        DocforgeError::Pipeline(PipelineError::UpstreamFailure(_))
    ));
    assert_eq!(sink.len(), 1);
}

/// 드레인 취소: 처리된 만큼으로 정상 완료, 싱크 flush 보장
#[tokio::test]
async fn drain_cancellation_completes_with_partial_output() {
    let sink = BufferSink::new();
    let (mut pipeline, source_tx) = EnrichPipelineBuilder::new()
        .sink(Box::new(sink.clone()))
        .build()
        .expect("build");

    pipeline.start().await.expect("start");

    let tx = source_tx.unwrap();
    for n in 0..3 {
        tx.send(Ok(entity_document(n, "Host"))).await.unwrap();
    }
    // 문서가 소비될 기회를 준 뒤 드레인 취소
    tokio::task::yield_now().await;
    pipeline.cancel(CancelMode::Drain);

    let summary = pipeline.wait().await.expect("drain should complete normally");
    assert_eq!(pipeline.state(), PipelineState::Completed);
    assert!(summary.processed <= 3);
    assert_eq!(sink.len() as u64, summary.processed);
    assert_eq!(sink.flush_count(), 1);
    drop(tx);
}

/// 포기 취소: Cancelled 실패로 종료 (침묵 절단 금지)
#[tokio::test]
async fn abandon_cancellation_is_reported_as_failure() {
    let sink = BufferSink::new();
    let (mut pipeline, source_tx) = EnrichPipelineBuilder::new()
        .sink(Box::new(sink))
        .build()
        .expect("build");

    pipeline.start().await.expect("start");
    pipeline.cancel(CancelMode::Abandon);

    let err = pipeline.wait().await.expect_err("abandon must surface as failure");
    assert!(matches!(
        err,
        DocforgeError::Pipeline(PipelineError::Cancelled)
    ));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    drop(source_tx);
}

/// Pipeline trait을 통한 stop(): 드레인 후 정상 완료
#[tokio::test]
async fn stop_drains_and_completes() {
    let sink = BufferSink::new();
    let (mut pipeline, source_tx) = EnrichPipelineBuilder::new()
        .sink(Box::new(sink.clone()))
        .build()
        .expect("build");

    pipeline.start().await.expect("start");

    let tx = source_tx.unwrap();
    tx.send(Ok(entity_document(0, "Host"))).await.unwrap();
    tokio::task::yield_now().await;

    pipeline.stop().await.expect("stop should drain");
    assert_eq!(pipeline.state(), PipelineState::Completed);
    drop(tx);
}
