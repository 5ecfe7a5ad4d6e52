#![no_main]

use docforge_core::types::{Document, Envelope};
use docforge_enrich_pipeline::{
    BulkSerializer, FieldCompactor, PipelineConfig, RoutingDecorator, StageSet,
    TimestampNormalizer,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(document) = Document::parse(text) else {
        return;
    };

    let config = PipelineConfig::default();
    let mut stages = StageSet::new();
    stages.register(Box::new(TimestampNormalizer::from_config(&config)));
    stages.register(Box::new(RoutingDecorator::from_config(&config)));
    stages.register(Box::new(FieldCompactor::new()));
    stages.register(Box::new(BulkSerializer::new()));

    // 임의 문서에 대해 패닉 없이 Ok/Err로만 끝나야 함
    if let Ok(Some(envelope)) = stages.process(Envelope::new(document)) {
        assert!(envelope.is_routed());
        assert!(envelope.is_encoded());
    }
});
