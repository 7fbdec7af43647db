//! Per-language record counts for each source and for the whole run.
//!
//! Records are counted once, at their record boundary, under the bucket their
//! language resolved to at that moment: a configured language code or
//! `unknown`.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;

use crate::context::UNKNOWN_LANGUAGE;
use crate::error::{PicaError, Result};

/// Record counts per language bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LanguageStatistics {
    /// Records per bucket label, configured languages first, `unknown` last.
    pub records: IndexMap<String, u64>,
    /// Records observed.
    pub total: u64,
    /// Records counted under a configured language.
    pub resolved: u64,
    /// `resolved / total`, `0.0` before the first record.
    pub resolved_ratio: f64,
    /// Language codes that were present but not configured, with record counts.
    pub unrecognized: BTreeMap<String, u64>,
}

impl LanguageStatistics {
    /// Empty statistics listing every configured code plus `unknown`.
    pub fn with_buckets<'a>(codes: impl IntoIterator<Item = &'a str>) -> Self {
        let mut records: IndexMap<String, u64> =
            codes.into_iter().map(|code| (code.to_string(), 0)).collect();
        records.insert(UNKNOWN_LANGUAGE.to_string(), 0);
        LanguageStatistics {
            records,
            ..Self::default()
        }
    }

    /// Count one record.
    ///
    /// `label` is the bucket the record was routed to; `code` is the raw
    /// language code of the record, if any.
    pub fn count(&mut self, label: &str, code: Option<&str>) {
        *self.records.entry(label.to_string()).or_insert(0) += 1;
        self.total += 1;
        if label == UNKNOWN_LANGUAGE {
            if let Some(code) = code {
                *self.unrecognized.entry(code.to_string()).or_insert(0) += 1;
            }
        } else {
            self.resolved += 1;
        }
        self.update_ratio();
    }

    fn merge(&mut self, other: &LanguageStatistics) {
        for (label, count) in &other.records {
            *self.records.entry(label.clone()).or_insert(0) += count;
        }
        for (code, count) in &other.unrecognized {
            *self.unrecognized.entry(code.clone()).or_insert(0) += count;
        }
        self.total += other.total;
        self.resolved += other.resolved;
        self.update_ratio();
    }

    #[allow(clippy::cast_precision_loss)]
    fn update_ratio(&mut self) {
        self.resolved_ratio = if self.total == 0 {
            0.0
        } else {
            self.resolved as f64 / self.total as f64
        };
    }
}

/// Counters for one decoded source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceStatistics {
    /// Path of the source.
    pub path: PathBuf,
    /// Records per language.
    pub languages: LanguageStatistics,
    /// Language fields seen, including repeated ones within a record.
    pub language_fields: u64,
    /// Output lines written to any sink.
    pub lines_written: u64,
    /// Output lines produced while the record had no identifier.
    pub lines_without_record_id: u64,
    /// Malformed byte sequences replaced during decoding.
    pub replaced_sequences: u64,
    /// Whether the source ended inside a line.
    pub truncated: bool,
    /// Failure that stopped decoding of this source.
    pub error: Option<String>,
}

impl SourceStatistics {
    /// Empty counters for `path`.
    pub fn new<'a>(path: impl Into<PathBuf>, codes: impl IntoIterator<Item = &'a str>) -> Self {
        SourceStatistics {
            path: path.into(),
            languages: LanguageStatistics::with_buckets(codes),
            language_fields: 0,
            lines_written: 0,
            lines_without_record_id: 0,
            replaced_sequences: 0,
            truncated: false,
            error: None,
        }
    }
}

/// Run-wide totals over all sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunTotals {
    /// Records per language over all sources.
    pub languages: LanguageStatistics,
    /// Language fields seen.
    pub language_fields: u64,
    /// Output lines written.
    pub lines_written: u64,
    /// Output lines produced without a record identifier.
    pub lines_without_record_id: u64,
    /// Malformed byte sequences replaced.
    pub replaced_sequences: u64,
    /// Sources that failed.
    pub failed_sources: u64,
}

/// Collects [`SourceStatistics`] in processing order.
#[derive(Debug, Clone)]
pub struct StatisticsAggregator {
    codes: Vec<String>,
    sources: Vec<SourceStatistics>,
}

impl StatisticsAggregator {
    /// Create an aggregator for the configured language codes.
    pub fn new<'a>(codes: impl IntoIterator<Item = &'a str>) -> Self {
        StatisticsAggregator {
            codes: codes.into_iter().map(str::to_string).collect(),
            sources: Vec::new(),
        }
    }

    /// Fresh counters for a source about to be decoded.
    #[must_use]
    pub fn start_source(&self, path: impl Into<PathBuf>) -> SourceStatistics {
        SourceStatistics::new(path, self.codes.iter().map(String::as_str))
    }

    /// Record the counters of a finished (or failed) source.
    pub fn add_source(&mut self, source: SourceStatistics) {
        self.sources.push(source);
    }

    /// Build the report over all sources added so far.
    #[must_use]
    pub fn report(&self) -> StatisticsReport {
        let mut totals = RunTotals {
            languages: LanguageStatistics::with_buckets(self.codes.iter().map(String::as_str)),
            ..RunTotals::default()
        };
        for source in &self.sources {
            totals.languages.merge(&source.languages);
            totals.language_fields += source.language_fields;
            totals.lines_written += source.lines_written;
            totals.lines_without_record_id += source.lines_without_record_id;
            totals.replaced_sequences += source.replaced_sequences;
            totals.failed_sources += u64::from(source.error.is_some());
        }
        StatisticsReport {
            totals,
            sources: self.sources.clone(),
        }
    }
}

/// Final statistics of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsReport {
    /// Totals over all sources.
    pub totals: RunTotals,
    /// Per-source counters in processing order.
    pub sources: Vec<SourceStatistics>,
}

impl StatisticsReport {
    /// Write the report as pretty-printed JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::Sink`] on I/O failure and [`PicaError::Json`] if
    /// serialization fails.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let sink_error = |source| PicaError::Sink {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(sink_error)?;
        }
        let mut writer = BufWriter::new(File::create(path).map_err(sink_error)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer).map_err(sink_error)?;
        writer.flush().map_err(sink_error)
    }
}

impl fmt::Display for StatisticsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let languages = &self.totals.languages;
        for (label, count) in &languages.records {
            writeln!(f, "{label}\t{count}")?;
        }
        writeln!(f, "total\t{}", languages.total)?;
        write!(
            f,
            "resolved\t{} ({:.2}%)",
            languages.resolved,
            languages.resolved_ratio * 100.0
        )
    }
}
