//! Property tests for the decoding pipeline

mod common;

use common::{Framing, PicaBuilder};
use indexmap::IndexMap;
use picarc::{
    AssemblerEvent, ByteCursor, Config, LanguageRouter, LineAssembler, MissingRecordId,
    RecordDecoder, SourceStatistics, StatisticsAggregator,
};
use proptest::prelude::*;

fn record_ends(bytes: &[u8]) -> usize {
    let mut cursor = ByteCursor::new(bytes);
    let mut assembler = LineAssembler::new();
    let mut count = 0;
    while let Some(byte) = cursor.next_byte().unwrap() {
        count += assembler
            .push(byte, cursor.lookback())
            .iter()
            .filter(|e| matches!(e, AssemblerEvent::RecordEnd))
            .count();
    }
    count
}

fn decode(bytes: &[u8]) -> (String, SourceStatistics) {
    let registry = Config::default().registry().unwrap();
    let mut router = LanguageRouter::from_writers(IndexMap::new(), Vec::new());
    let mut stats = StatisticsAggregator::new(router.codes()).start_source("prop");
    RecordDecoder::new(&registry, MissingRecordId::Skip)
        .decode(bytes, &mut router, &mut stats)
        .unwrap();
    let (_, fallback) = router.finish().unwrap();
    (String::from_utf8(fallback).unwrap(), stats)
}

#[derive(Debug, Clone)]
struct SyntheticRecord {
    id: Option<String>,
    titles: Vec<String>,
}

fn record_strategy() -> impl Strategy<Value = SyntheticRecord> {
    (
        proptest::option::of("[A-Z0-9]{1,10}"),
        proptest::collection::vec("[a-zA-Z]{1,12}", 0..4),
    )
        .prop_map(|(id, titles)| SyntheticRecord { id, titles })
}

fn serialize(records: &[SyntheticRecord], framing: Framing) -> Vec<u8> {
    let mut builder = PicaBuilder::with_framing(framing);
    for record in records {
        builder = builder.field("002@", &[('0', "Aau")]);
        if let Some(id) = &record.id {
            builder = builder.field("003@", &[('0', id.as_str())]);
        }
        for title in &record.titles {
            builder = builder.field("021A", &[('a', title.as_str())]);
        }
        builder = builder.end_record();
    }
    builder.build()
}

fn framing_strategy() -> impl Strategy<Value = Framing> {
    prop_oneof![Just(Framing::CrLf), Just(Framing::LfFieldTerminator)]
}

proptest! {
    #[test]
    fn boundaries_match_terminators_after_line_feed(
        bytes in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let expected = bytes.windows(2).filter(|w| *w == b"\n\x1d").count();
        prop_assert_eq!(record_ends(&bytes), expected);
    }

    #[test]
    fn every_record_is_counted_once(
        records in proptest::collection::vec(record_strategy(), 0..8),
        framing in framing_strategy(),
    ) {
        let (_, stats) = decode(&serialize(&records, framing));
        prop_assert_eq!(stats.languages.total, records.len() as u64);
        prop_assert!(!stats.truncated);
    }

    #[test]
    fn lines_carry_their_own_record_identifier(
        records in proptest::collection::vec(record_strategy(), 0..8),
        framing in framing_strategy(),
    ) {
        let (fallback, stats) = decode(&serialize(&records, framing));

        let mut expected = String::new();
        let mut skipped = 0;
        for record in &records {
            match &record.id {
                Some(id) => {
                    for title in &record.titles {
                        expected.push_str(&format!("{id}\t021A\t{title}\n"));
                    }
                },
                None => skipped += record.titles.len() as u64,
            }
        }
        prop_assert_eq!(fallback, expected);
        prop_assert_eq!(stats.lines_without_record_id, skipped);
    }

    #[test]
    fn arbitrary_bytes_never_fail(bytes in proptest::collection::vec(any::<u8>(), 0..1024)) {
        let (fallback, stats) = decode(&bytes);
        prop_assert_eq!(fallback.lines().count() as u64, stats.lines_written);
    }
}
