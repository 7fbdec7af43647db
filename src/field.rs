//! Field-level data types: tags, subfields, tokenized fields and output lines.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{PicaError, Result};

/// Tag of the record identifier field (PPN).
pub const RECORD_ID_TAG: &str = "003@";
/// Tag of the language field.
pub const LANGUAGE_TAG: &str = "010@";

/// A four character PICA+ field tag such as `021A` or `003@`.
///
/// Tags are validated on construction: exactly four ASCII graphic characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag(String);

impl Tag {
    /// Parse and validate a tag.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::InvalidTag`] unless `value` is exactly four ASCII
    /// graphic characters.
    pub fn new(value: &str) -> Result<Self> {
        if value.len() == 4 && value.bytes().all(|b| b.is_ascii_graphic()) {
            Ok(Tag(value.to_string()))
        } else {
            Err(PicaError::InvalidTag(format!(
                "{value:?} is not a four character tag"
            )))
        }
    }

    /// The tag as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Tag {
    type Err = PicaError;

    fn from_str(s: &str) -> Result<Self> {
        Tag::new(s)
    }
}

impl TryFrom<String> for Tag {
    type Error = PicaError;

    fn try_from(value: String) -> Result<Self> {
        Tag::new(&value)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.0
    }
}

impl Borrow<str> for Tag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Tag {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Tag {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A marker-prefixed segment of a field payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubfieldToken {
    /// Subfield code, the first character of the segment.
    pub marker: char,
    /// The rest of the segment, trimmed.
    pub value: String,
}

impl SubfieldToken {
    /// Create a subfield token.
    pub fn new(marker: char, value: impl Into<String>) -> Self {
        SubfieldToken {
            marker,
            value: value.into(),
        }
    }
}

/// One tokenized field occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldToken {
    /// Field tag.
    pub tag: Tag,
    /// Occurrence suffix (`021A/01` → `01`), if the source carried one.
    pub occurrence: Option<String>,
    /// Subfields in source order.
    pub subfields: SmallVec<[SubfieldToken; 4]>,
}

impl FieldToken {
    /// Create a field token without occurrence.
    pub fn new(tag: Tag, subfields: impl IntoIterator<Item = SubfieldToken>) -> Self {
        FieldToken {
            tag,
            occurrence: None,
            subfields: subfields.into_iter().collect(),
        }
    }

    /// Value of the first subfield, whatever its marker.
    #[must_use]
    pub fn first_value(&self) -> Option<&str> {
        self.subfields.first().map(|s| s.value.as_str())
    }

    /// Value of the first subfield with the given marker.
    #[must_use]
    pub fn subfield(&self, marker: char) -> Option<&str> {
        self.subfields_with(marker).next()
    }

    /// Values of all subfields with the given marker, in order.
    pub fn subfields_with(&self, marker: char) -> impl Iterator<Item = &str> {
        self.subfields
            .iter()
            .filter(move |s| s.marker == marker)
            .map(|s| s.value.as_str())
    }
}

/// A formatted line destined for a language sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    /// Identifier of the record the line belongs to; `None` if the record had
    /// not presented one yet.
    pub record_id: Option<String>,
    /// Tag of the field the line was produced from.
    pub tag: Tag,
    /// Handler-specific rendering of the field.
    pub value: String,
}

impl fmt::Display for OutputLine {
    /// Tab-separated `record id / tag / value`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}",
            self.record_id.as_deref().unwrap_or(""),
            self.tag,
            self.value
        )
    }
}
