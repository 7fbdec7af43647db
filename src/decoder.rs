//! The decoding pipeline: bytes in, routed lines and statistics out.
//!
//! [`RecordDecoder`] wires the components together for one stream:
//!
//! ```text
//! ByteCursor → LineAssembler → FieldHandlerRegistry → RecordContext / LanguageRouter
//!                     └──── record boundary ────→ SourceStatistics
//! ```
//!
//! [`run`] drives a whole configured run: sinks are opened once, sources are
//! decoded one after the other, sinks are flushed once at the end and the
//! statistics report is written.
//!
//! # Examples
//!
//! ```
//! use indexmap::IndexMap;
//! use picarc::{Config, LanguageRouter, RecordDecoder, StatisticsAggregator};
//!
//! let config = Config::default();
//! let registry = config.registry()?;
//! let decoder = RecordDecoder::new(&registry, config.missing_record_id);
//!
//! let mut languages = IndexMap::new();
//! languages.insert("ger".to_string(), Vec::new());
//! let mut router = LanguageRouter::from_writers(languages, Vec::new());
//! let aggregator = StatisticsAggregator::new(router.codes());
//! let mut stats = aggregator.start_source("memory");
//!
//! let input = b"003@ \x1f0PPN123\r\n010@ \x1fager\r\n021A \x1faFoo\r\n\x1d\r\n";
//! decoder.decode(&input[..], &mut router, &mut stats)?;
//!
//! let (sinks, _) = router.finish()?;
//! assert_eq!(sinks["ger"], b"PPN123\t021A\tFoo\n");
//! assert_eq!(stats.languages.records["ger"], 1);
//! # Ok::<(), picarc::PicaError>(())
//! ```

use std::io::{self, Read, Write};

use tracing::{debug, error, info, warn};

use crate::assembler::{AssemblerEvent, LineAssembler, LogicalLine};
use crate::config::{Config, MissingRecordId};
use crate::context::{ContextUpdate, RecordContext};
use crate::cursor::ByteCursor;
use crate::error::{PicaError, Result};
use crate::handlers::FieldHandlerRegistry;
use crate::router::LanguageRouter;
use crate::source;
use crate::statistics::{SourceStatistics, StatisticsAggregator, StatisticsReport};

/// Decodes single PICA+ streams with a fixed handler registry.
#[derive(Debug, Clone, Copy)]
pub struct RecordDecoder<'a> {
    registry: &'a FieldHandlerRegistry,
    missing_record_id: MissingRecordId,
}

impl<'a> RecordDecoder<'a> {
    /// Create a decoder dispatching through `registry`.
    #[must_use]
    pub fn new(registry: &'a FieldHandlerRegistry, missing_record_id: MissingRecordId) -> Self {
        RecordDecoder {
            registry,
            missing_record_id,
        }
    }

    /// Decode `reader` to exhaustion, routing lines through `router` and
    /// counting into `stats`.
    ///
    /// The record context lives for this call only. An unterminated line at
    /// the end of the stream is discarded and flagged in `stats.truncated`.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::Source`] (for `stats.path`) if reading fails and
    /// [`PicaError::Sink`] if a sink cannot be written. Malformed bytes are
    /// not errors.
    pub fn decode<R: Read, W: Write>(
        &self,
        reader: R,
        router: &mut LanguageRouter<W>,
        stats: &mut SourceStatistics,
    ) -> Result<()> {
        let mut cursor = ByteCursor::new(reader);
        let mut assembler = LineAssembler::new();
        let mut context = RecordContext::new();

        loop {
            let byte = match cursor.next_byte() {
                Ok(Some(byte)) => byte,
                Ok(None) => break,
                Err(source) => {
                    stats.replaced_sequences = assembler.replaced();
                    return Err(PicaError::Source {
                        path: stats.path.clone(),
                        source,
                    });
                },
            };

            for event in assembler.push(byte, cursor.lookback()) {
                match event {
                    AssemblerEvent::Line(line) => {
                        self.dispatch(&line, &mut context, router, stats)?;
                    },
                    AssemblerEvent::RecordEnd => end_record(&mut context, router, stats),
                }
            }
        }

        stats.replaced_sequences = assembler.replaced();
        stats.truncated = assembler.finish().is_some();
        debug!(
            source = %stats.path.display(),
            bytes = cursor.position(),
            truncated = stats.truncated,
            "end of stream"
        );
        Ok(())
    }

    fn dispatch<W: Write>(
        &self,
        line: &LogicalLine,
        context: &mut RecordContext,
        router: &mut LanguageRouter<W>,
        stats: &mut SourceStatistics,
    ) -> Result<()> {
        let Some(outcome) = self.registry.dispatch(line, context) else {
            return Ok(());
        };

        if let Some(update) = outcome.update {
            if matches!(update, ContextUpdate::Language(_)) {
                stats.language_fields += 1;
            }
            context.apply(update);
        }

        let Some(output) = outcome.output else {
            return Ok(());
        };
        if output.record_id.is_none() {
            stats.lines_without_record_id += 1;
            if context.report_missing_id() {
                warn!(
                    source = %stats.path.display(),
                    tag = %output.tag,
                    "field precedes the record identifier"
                );
            }
            if self.missing_record_id == MissingRecordId::Skip {
                return Ok(());
            }
        }

        let bucket = router.bucket(context.language());
        debug!(language = router.label(bucket), "{output}");
        router.write(bucket, &output)?;
        stats.lines_written += 1;
        Ok(())
    }
}

fn end_record<W: Write>(
    context: &mut RecordContext,
    router: &LanguageRouter<W>,
    stats: &mut SourceStatistics,
) {
    let label = router.label(router.bucket(context.language()));
    debug!(
        record_id = context.record_id().unwrap_or_default(),
        language = label,
        "end of record"
    );
    stats.languages.count(label, context.language());
    context.end_record();
}

/// Decode every configured source into `router`, in order.
///
/// A source that cannot be opened or read is recorded as failed and the run
/// moves on to the next source; its lines written so far stay in the sinks.
///
/// # Errors
///
/// Returns [`PicaError::Sink`] if a sink write fails, which ends the run.
pub fn decode_sources<W: Write>(
    config: &Config,
    registry: &FieldHandlerRegistry,
    router: &mut LanguageRouter<W>,
) -> Result<StatisticsAggregator> {
    let mut aggregator = StatisticsAggregator::new(router.codes());
    let decoder = RecordDecoder::new(registry, config.missing_record_id);

    for path in &config.sources {
        let mut stats = aggregator.start_source(path);
        info!(source = %path.display(), "decoding");

        let outcome = source::open(path).and_then(|reader| decoder.decode(reader, router, &mut stats));
        match outcome {
            Ok(()) => info!(
                source = %path.display(),
                records = stats.languages.total,
                lines = stats.lines_written,
                "finished"
            ),
            Err(e @ PicaError::Source { .. }) => {
                error!(source = %path.display(), "{e}");
                stats.error = Some(e.to_string());
            },
            Err(e) => return Err(e),
        }
        aggregator.add_source(stats);
    }
    Ok(aggregator)
}

/// Run a complete configuration: open sinks, decode all sources, flush the
/// sinks and write the statistics report.
///
/// With `text_output` disabled no sink files are created; lines are still
/// produced and counted.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, a sink or the report
/// cannot be written. Failed sources are not errors; they are listed in the
/// report.
pub fn run(config: &Config) -> Result<StatisticsReport> {
    let registry = config.registry()?;
    for (tag, kind) in registry.bindings() {
        debug!(%tag, ?kind, "field of interest");
    }

    let report = if config.text_output {
        let router = LanguageRouter::create(&config.languages, &config.fallback)?;
        decode_into(config, &registry, router)?
    } else {
        let languages = config
            .languages
            .keys()
            .map(|code| (code.clone(), io::sink()))
            .collect();
        decode_into(config, &registry, LanguageRouter::from_writers(languages, io::sink()))?
    };

    report.write_json(&config.statistics)?;
    for line in report.to_string().lines() {
        info!("{line}");
    }
    info!(failed_sources = report.totals.failed_sources, "run complete");
    Ok(report)
}

fn decode_into<W: Write>(
    config: &Config,
    registry: &FieldHandlerRegistry,
    mut router: LanguageRouter<W>,
) -> Result<StatisticsReport> {
    let decoded = decode_sources(config, registry, &mut router);
    let flushed = router.finish();
    let report = decoded?.report();
    flushed?;
    Ok(report)
}
