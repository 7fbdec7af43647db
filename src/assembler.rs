//! Reassembly of logical lines and record boundaries from raw bytes.
//!
//! [`LineAssembler`] is the state machine at the heart of the decoder. It is fed
//! one byte at a time together with the byte before it and emits
//! [`AssemblerEvent`]s: a completed [`LogicalLine`] per field occurrence and a
//! record boundary per record terminator.
//!
//! Content bytes go through an incremental UTF-8 decoder, so multi-byte
//! characters are only emitted once complete. Malformed sequences are replaced
//! with U+FFFD and counted; they never stop decoding.
//!
//! Combining diacritics (lead byte `0xCC`) are composed with the character
//! before them:
//!
//! ```
//! use picarc::assembler::{AssemblerEvent, LineAssembler};
//!
//! let mut assembler = LineAssembler::new();
//! let mut lookback = None;
//! let mut lines = Vec::new();
//! for &byte in b"021A \x1faCafe\xcc\x81\r\n" {
//!     for event in assembler.push(byte, lookback) {
//!         if let AssemblerEvent::Line(line) = event {
//!             lines.push(line);
//!         }
//!     }
//!     lookback = Some(byte);
//! }
//! assert_eq!(lines[0].segments(), ["021A ", "aCaf\u{e9}"]);
//! ```

use std::fmt;

use encoding_rs::{Decoder, UTF_8};
use smallvec::SmallVec;
use tracing::{debug, trace};
use unicode_normalization::UnicodeNormalization;

use crate::classify::{classify, ByteKind};

/// One field occurrence as an ordered list of text segments.
///
/// Segments are separated in the source by the escaped delimiter (space
/// followed by a subfield separator). The first segment carries the tag, the
/// remaining segments the subfield payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogicalLine {
    segments: SmallVec<[String; 2]>,
}

impl LogicalLine {
    /// Build a line from already decoded segments.
    #[must_use]
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LogicalLine {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// All segments in source order.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The segment holding the tag (and possibly an occurrence suffix).
    #[must_use]
    pub fn tag_segment(&self) -> &str {
        self.segments.first().map_or("", String::as_str)
    }

    /// The segments after the tag.
    #[must_use]
    pub fn payload(&self) -> &[String] {
        self.segments.get(1..).unwrap_or(&[])
    }

    fn is_blank(&self) -> bool {
        self.segments.iter().all(|s| s.trim().is_empty())
    }
}

impl fmt::Display for LogicalLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("\t")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

/// Output of the assembler for a single input byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblerEvent {
    /// A completed field occurrence.
    Line(LogicalLine),
    /// The current record ended.
    RecordEnd,
}

/// Events produced by one call to [`LineAssembler::push`]; never more than two.
pub type Events = SmallVec<[AssemblerEvent; 2]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    /// A combining-mark lead byte was seen; the next byte completes the mark.
    UnicodeComposing { lead: u8 },
}

/// Byte-driven state machine turning a PICA+ stream into lines and record boundaries.
///
/// Per byte, in this order:
/// 1. while composing, a continuation byte completes the pending combining
///    mark, which replaces the previous character by its composed form;
/// 2. a line boundary (`CR LF` or `LF 0x1E`) completes the current line;
/// 3. a record boundary (`LF 0x1D`) completes a pending line, if any, then
///    ends the record;
/// 4. the escaped delimiter (`SP 0x1F`) starts a new segment;
/// 5. a combining-mark lead byte starts composition, bare `CR`/`LF` and stray
///    field terminators are dropped, everything else is decoded as content.
#[derive(Debug)]
pub struct LineAssembler {
    state: State,
    decoder: Decoder,
    segments: SmallVec<[String; 2]>,
    segment: String,
    offset: u64,
    replaced: u64,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl LineAssembler {
    /// Create an assembler at the start of a stream.
    #[must_use]
    pub fn new() -> Self {
        LineAssembler {
            state: State::Normal,
            decoder: UTF_8.new_decoder_without_bom_handling(),
            segments: SmallVec::new(),
            segment: String::with_capacity(256),
            offset: 0,
            replaced: 0,
        }
    }

    /// Feed the next byte of the stream.
    ///
    /// `lookback` is the byte that preceded `byte` in the stream, `None` at
    /// the start.
    pub fn push(&mut self, byte: u8, lookback: Option<u8>) -> Events {
        self.offset += 1;
        let mut events = Events::new();

        if let State::UnicodeComposing { lead } = self.state {
            self.state = State::Normal;
            if is_continuation(byte) {
                self.compose(lead, byte);
                return events;
            }
            // Malformed mark: the lead goes to the decoder on its own and
            // `byte` is classified as usual.
            let mut segment = std::mem::take(&mut self.segment);
            self.decode(&[lead], &mut segment, false);
            self.segment = segment;
        }

        match classify(byte, lookback) {
            ByteKind::FieldEnd => {
                if let Some(line) = self.take_line() {
                    events.push(AssemblerEvent::Line(line));
                }
            },
            ByteKind::RecordEnd => {
                if let Some(line) = self.take_line() {
                    events.push(AssemblerEvent::Line(line));
                }
                events.push(AssemblerEvent::RecordEnd);
            },
            ByteKind::SubfieldSep => self.close_segment(),
            ByteKind::UnicodeLead => self.state = State::UnicodeComposing { lead: byte },
            ByteKind::Control => {},
            ByteKind::Data(data) => {
                let mut segment = std::mem::take(&mut self.segment);
                self.decode(&[data], &mut segment, false);
                self.segment = segment;
            },
        }
        events
    }

    /// Number of malformed byte sequences replaced so far.
    #[must_use]
    pub fn replaced(&self) -> u64 {
        self.replaced
    }

    /// End the stream, discarding any unterminated partial line.
    ///
    /// Returns the discarded partial line, if there was one, for diagnostics.
    pub fn finish(mut self) -> Option<LogicalLine> {
        self.state = State::Normal;
        let partial = self.take_line();
        if let Some(line) = &partial {
            trace!(
                offset = self.offset,
                "discarding unterminated line at end of stream: {line}"
            );
        }
        partial
    }

    fn decode(&mut self, bytes: &[u8], dst: &mut String, last: bool) {
        let needed = self
            .decoder
            .max_utf8_buffer_length(bytes.len())
            .unwrap_or(bytes.len() * 3 + 8);
        dst.reserve(needed);
        let (_, _, had_replacements) = self.decoder.decode_to_string(bytes, dst, last);
        if had_replacements {
            self.replaced += 1;
            debug!(offset = self.offset, "replaced malformed byte sequence");
        }
        if last {
            self.decoder = UTF_8.new_decoder_without_bom_handling();
        }
    }

    fn compose(&mut self, lead: u8, byte: u8) {
        let mut mark = String::new();
        self.decode(&[lead, byte], &mut mark, false);

        let mut composed = String::with_capacity(mark.len() + 4);
        if let Some(base) = self.segment.pop() {
            composed.push(base);
        }
        composed.push_str(&mark);
        self.segment.extend(composed.nfc());
    }

    fn close_segment(&mut self) {
        let mut segment = std::mem::take(&mut self.segment);
        self.decode(&[], &mut segment, true);
        self.segments.push(segment);
        self.segment = String::with_capacity(256);
    }

    fn take_line(&mut self) -> Option<LogicalLine> {
        self.close_segment();
        let line = LogicalLine {
            segments: std::mem::take(&mut self.segments),
        };
        if line.is_blank() {
            None
        } else {
            Some(line)
        }
    }
}

fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(bytes: &[u8]) -> (Vec<AssemblerEvent>, LineAssembler) {
        let mut assembler = LineAssembler::new();
        let mut events = Vec::new();
        let mut lookback = None;
        for &byte in bytes {
            events.extend(assembler.push(byte, lookback));
            lookback = Some(byte);
        }
        (events, assembler)
    }

    fn lines(events: &[AssemblerEvent]) -> Vec<Vec<String>> {
        events
            .iter()
            .filter_map(|e| match e {
                AssemblerEvent::Line(line) => Some(line.segments().to_vec()),
                AssemblerEvent::RecordEnd => None,
            })
            .collect()
    }

    #[test]
    fn test_crlf_ends_line() {
        let (events, _) = run(b"003@ \x1f0PPN123\r\n");
        assert_eq!(lines(&events), vec![vec!["003@ ", "0PPN123"]]);
    }

    #[test]
    fn test_lf_field_terminator_ends_line() {
        let (events, _) = run(b"\x1e003@ \x1f0PPN1\n\x1e021A \x1faFoo\n\x1e");
        assert_eq!(
            lines(&events),
            vec![vec!["003@ ", "0PPN1"], vec!["021A ", "aFoo"]]
        );
    }

    #[test]
    fn test_record_end_event() {
        let (events, _) = run(b"003@ \x1f0A\r\n\x1d\r\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], AssemblerEvent::RecordEnd);
    }

    #[test]
    fn test_record_end_completes_pending_line() {
        let (events, _) = run(b"\x1e021A \x1faFoo\n\x1d");
        assert_eq!(
            events,
            vec![
                AssemblerEvent::Line(LogicalLine::from_segments(["021A ", "aFoo"])),
                AssemblerEvent::RecordEnd,
            ]
        );
    }

    #[test]
    fn test_separator_after_space_splits_segment() {
        let (events, _) = run(b"021A \x1faFoo\x1fdBar\r\n");
        assert_eq!(lines(&events), vec![vec!["021A ", "aFoo\x1fdBar"]]);
    }

    #[test]
    fn test_separator_after_other_byte_is_content() {
        let (events, _) = run(b"021A\x1faFoo\r\n");
        assert_eq!(lines(&events), vec![vec!["021A\x1faFoo"]]);
    }

    #[test]
    fn test_literal_tab_is_content() {
        let (events, _) = run(b"021A \x1faFoo\tBar\r\n");
        assert_eq!(lines(&events), vec![vec!["021A ", "aFoo\tBar"]]);
    }

    #[test]
    fn test_multibyte_characters_survive() {
        let (events, assembler) = run("021A \x1faM\u{fc}ller\r\n".as_bytes());
        assert_eq!(lines(&events), vec![vec!["021A ", "aM\u{fc}ller"]]);
        assert_eq!(assembler.replaced(), 0);
    }

    #[test]
    fn test_combining_mark_composes_with_previous_character() {
        let (events, _) = run(b"021A \x1faGoe\xcc\x88the\r\n");
        assert_eq!(lines(&events), vec![vec!["021A ", "aGo\u{eb}the"]]);
    }

    #[test]
    fn test_invalid_byte_is_replaced() {
        let (events, assembler) = run(b"021A \x1faFo\xffo\r\n");
        assert_eq!(lines(&events), vec![vec!["021A ", "aFo\u{fffd}o"]]);
        assert_eq!(assembler.replaced(), 1);
    }

    #[test]
    fn test_dangling_lead_byte_at_line_end_is_replaced() {
        let (events, assembler) = run(b"021A \x1faFoo\xc3\r\n");
        assert_eq!(lines(&events), vec![vec!["021A ", "aFoo\u{fffd}"]]);
        assert_eq!(assembler.replaced(), 1);
    }

    #[test]
    fn test_lead_byte_without_continuation_is_replaced() {
        let (events, assembler) = run(b"021A \x1faFoo\xcc\r\n");
        assert_eq!(lines(&events), vec![vec!["021A ", "aFoo\u{fffd}"]]);
        assert_eq!(assembler.replaced(), 1);

        let (events, _) = run(b"021A \x1faFoo\xccx\r\n");
        assert_eq!(lines(&events), vec![vec!["021A ", "aFoo\u{fffd}x"]]);
    }

    #[test]
    fn test_blank_lines_are_not_emitted() {
        let (events, _) = run(b"\r\n\r\n\n\x1e");
        assert!(events.is_empty());
    }

    #[test]
    fn test_partial_line_discarded_at_end() {
        let (events, assembler) = run(b"003@ \x1f0PPN1\r\n021A \x1faUnfinished");
        assert_eq!(lines(&events).len(), 1);
        let partial = assembler.finish().expect("partial line");
        assert_eq!(partial.segments(), ["021A ", "aUnfinished"]);
    }

    #[test]
    fn test_finish_without_partial_line() {
        let (_, assembler) = run(b"003@ \x1f0PPN1\r\n");
        assert!(assembler.finish().is_none());
    }

    #[test]
    fn test_display_joins_segments_with_tab() {
        let line = LogicalLine::from_segments(["021A ", "aFoo"]);
        assert_eq!(line.to_string(), "021A \taFoo");
        assert_eq!(line.tag_segment(), "021A ");
        assert_eq!(line.payload(), ["aFoo".to_string()]);
    }
}
