//! Splitting logical lines into a tag and subfield tokens.

use indexmap::IndexSet;
use smallvec::SmallVec;

use crate::assembler::LogicalLine;
use crate::classify::SUBFIELD_SEPARATOR;
use crate::field::{FieldToken, SubfieldToken, Tag};

/// Turns [`LogicalLine`]s into [`FieldToken`]s for the fields of interest.
///
/// Only segmentation happens here: the tag segment is trimmed and may carry an
/// occurrence suffix (`021A/01`); every payload segment is split on the
/// subfield separator, pieces are trimmed and empty pieces dropped. The first
/// character of a piece is its marker.
///
/// # Examples
///
/// ```
/// use picarc::assembler::LogicalLine;
/// use picarc::field::Tag;
/// use picarc::tokenizer::FieldTokenizer;
///
/// let tokenizer = FieldTokenizer::new([Tag::new("021A")?]);
/// let line = LogicalLine::from_segments(["021A ", "aFoo\x1fdBar"]);
/// let field = tokenizer.tokenize(&line).expect("field of interest");
/// assert_eq!(field.subfield('a'), Some("Foo"));
/// assert_eq!(field.subfield('d'), Some("Bar"));
/// # Ok::<(), picarc::PicaError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FieldTokenizer {
    fields: IndexSet<Tag>,
}

impl FieldTokenizer {
    /// Create a tokenizer that emits tokens only for `fields`.
    pub fn new(fields: impl IntoIterator<Item = Tag>) -> Self {
        FieldTokenizer {
            fields: fields.into_iter().collect(),
        }
    }

    /// Tokenize a line, or return `None` if it carries no payload or its tag
    /// is not a field of interest.
    #[must_use]
    pub fn tokenize(&self, line: &LogicalLine) -> Option<FieldToken> {
        if line.payload().is_empty() {
            return None;
        }
        let (tag, occurrence) = split_tag(line.tag_segment())?;
        let tag = self.fields.get(tag)?.clone();

        Some(FieldToken {
            tag,
            occurrence: occurrence.map(str::to_string),
            subfields: split_subfields(line.payload()),
        })
    }
}

/// Split `021A/01` into tag and occurrence.
fn split_tag(segment: &str) -> Option<(&str, Option<&str>)> {
    let segment = segment.trim();
    let (tag, occurrence) = match segment.split_once('/') {
        Some((tag, occ)) if !occ.is_empty() && occ.bytes().all(|b| b.is_ascii_digit()) => {
            (tag, Some(occ))
        },
        Some(_) => return None,
        None => (segment, None),
    };
    (tag.len() == 4).then_some((tag, occurrence))
}

fn split_subfields(payload: &[String]) -> SmallVec<[SubfieldToken; 4]> {
    payload
        .iter()
        .flat_map(|segment| segment.split(char::from(SUBFIELD_SEPARATOR)))
        .map(str::trim)
        .filter_map(|piece| {
            let mut chars = piece.chars();
            let marker = chars.next()?;
            Some(SubfieldToken::new(marker, chars.as_str().trim()))
        })
        .collect()
}
