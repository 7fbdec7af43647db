#![no_main]

use indexmap::IndexMap;
use libfuzzer_sys::fuzz_target;
use picarc::{Config, LanguageRouter, MissingRecordId, RecordDecoder, StatisticsAggregator};

fuzz_target!(|data: &[u8]| {
    let Ok(registry) = Config::default().registry() else {
        return;
    };
    let mut languages = IndexMap::new();
    languages.insert("ger".to_string(), Vec::new());
    let mut router = LanguageRouter::from_writers(languages, Vec::new());
    let mut stats = StatisticsAggregator::new(router.codes()).start_source("fuzz");

    // In-memory sinks cannot fail, so any error is a decoder bug.
    RecordDecoder::new(&registry, MissingRecordId::Blank)
        .decode(data, &mut router, &mut stats)
        .unwrap();
    let (sinks, fallback) = router.finish().unwrap();

    let written = sinks["ger"].iter().chain(&fallback).filter(|&&b| b == b'\n').count();
    assert_eq!(written as u64, stats.lines_written);
});
