#![no_main]

use docforge_core::pipeline::Stage;
use docforge_core::types::{Document, Envelope};
use docforge_enrich_pipeline::FieldCompactor;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(document) = Document::parse(text) else {
        return;
    };

    let mut stage = FieldCompactor::new();
    if let Ok(Some(envelope)) = stage.process(Envelope::new(document)) {
        // 평탄화 결과에는 객체 값이 남지 않아야 함
        for value in envelope.document.fields().values() {
            assert!(!value.is_object());
        }
    }
});
