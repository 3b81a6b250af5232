#![no_main]

use ferrous_docs::{CandidateUnit, ResolutionOrigin, StaticCandidateSource, TypeResolutionCache, ViewType};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let source = Arc::new(StaticCandidateSource::with_units(vec![CandidateUnit::new(
        "app",
        vec![
            ViewType::new("app::views", "EditorView"),
            ViewType::new("app::views", "ReportView"),
        ],
    )]));
    let cache = TypeResolutionCache::new(source.clone());

    // Each chunk is an opcode byte followed by a name.
    for chunk in data.chunks(8) {
        let (op, rest) = (chunk[0], &chunk[1..]);
        let name = String::from_utf8_lossy(rest).to_string();
        match op % 5 {
            0 => {
                let resolution = cache.resolve(&name);
                // Placeholders and fallbacks always travel together.
                assert_eq!(resolution.is_fallback(), resolution.view.is_placeholder());
                if resolution.is_fallback() {
                    assert!(resolution.view.diagnostic().is_some());
                }
            }
            1 => {
                let view = ViewType::new("fuzz", "Registered");
                cache.register(name.clone(), view.clone());
                let resolved = cache.resolve(&name);
                if name.trim() == name {
                    assert_eq!(resolved.origin, ResolutionOrigin::Registered);
                    assert_eq!(resolved.view, view);
                }
            }
            2 => cache.clear_cache(),
            3 => cache.clear_registered_types(),
            _ => source.add_unit(CandidateUnit::new("fuzz", vec![ViewType::new("fuzz::views", name)])),
        }
    }

    // Known views resolve regardless of the history above unless shadowed.
    if !cache.is_registered("ReportView") {
        assert_eq!(cache.resolve("ReportView").view.name(), "ReportView");
    }
});
