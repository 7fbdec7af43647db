//! Mutable per-record state shared by handlers and the writer.

use crate::field::{OutputLine, Tag};

/// Label used for records without a recognized language.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// A change to the [`RecordContext`] requested by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextUpdate {
    /// A record identifier field was seen.
    RecordId(String),
    /// A language field was seen.
    Language(String),
}

/// State of the record currently being decoded.
///
/// Both the identifier and the language are cleared at every record boundary
/// and overwritten by later occurrences of their fields within a record, so
/// the last occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordContext {
    record_id: Option<String>,
    language: Option<String>,
    missing_id_reported: bool,
}

impl RecordContext {
    /// Create a context for the first record of a stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier of the current record, if one was seen.
    #[must_use]
    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    /// Language code of the current record, if one was seen.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Apply a handler's update.
    pub fn apply(&mut self, update: ContextUpdate) {
        match update {
            ContextUpdate::RecordId(id) => self.record_id = Some(id),
            ContextUpdate::Language(code) => self.language = Some(code),
        }
    }

    /// Build an output line for the current record.
    #[must_use]
    pub fn output_line(&self, tag: &Tag, value: String) -> OutputLine {
        OutputLine {
            record_id: self.record_id.clone(),
            tag: tag.clone(),
            value,
        }
    }

    /// Returns `true` the first time it is called for a record without an
    /// identifier, so the condition is reported once per record.
    pub fn report_missing_id(&mut self) -> bool {
        !std::mem::replace(&mut self.missing_id_reported, true)
    }

    /// Reset for the next record.
    pub fn end_record(&mut self) {
        *self = Self::default();
    }
}
