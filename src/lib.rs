#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # picarc: PICA+ Rust Crate
//!
//! A streaming decoder for PICA+ dumps. Bytes are read one at a time,
//! reassembled into logical field lines, tokenized into subfields and handed
//! to per-field handlers, whose output is routed to one sink per record
//! language.
//!
//! ## Quick Start
//!
//! ```
//! use indexmap::IndexMap;
//! use picarc::{Config, LanguageRouter, RecordDecoder, StatisticsAggregator};
//!
//! let input = b"003@ \x1f0PPN456\r\n028A \x1faBar\x1fdBaz\x1f0gnd/1\r\n\x1d\r\n";
//!
//! let registry = Config::default().registry()?;
//! let mut router = LanguageRouter::from_writers(IndexMap::new(), Vec::new());
//! let mut stats = StatisticsAggregator::new(router.codes()).start_source("memory");
//! RecordDecoder::new(&registry, Default::default()).decode(&input[..], &mut router, &mut stats)?;
//!
//! let (_, fallback) = router.finish()?;
//! assert_eq!(fallback, b"PPN456\t028A\tBaz, Bar@gnd/1\n");
//! # Ok::<(), picarc::PicaError>(())
//! ```
//!
//! ## Modules
//!
//! - [`classify`] - Byte classes of the PICA+ framing
//! - [`cursor`] - Buffered byte reader with one byte of lookback
//! - [`assembler`] - Logical lines and record boundaries from bytes
//! - [`tokenizer`] - Tags and subfields from logical lines
//! - [`field`] - Tags, tokens and output lines
//! - [`handlers`] - Per-field handlers and their registry
//! - [`context`] - Per-record identifier and language
//! - [`router`] - Per-language output sinks
//! - [`statistics`] - Record counts per language
//! - [`config`] - TOML run configuration
//! - [`source`] - Opening plain and gzip sources
//! - [`decoder`] - The pipeline tying it all together
//! - [`error`] - Error types and result type

pub mod assembler;
pub mod classify;
pub mod config;
pub mod context;
pub mod cursor;
pub mod decoder;
pub mod error;
pub mod field;
pub mod handlers;
pub mod router;
pub mod source;
pub mod statistics;
pub mod tokenizer;

pub use assembler::{AssemblerEvent, LineAssembler, LogicalLine};
pub use config::{Config, MissingRecordId};
pub use context::{ContextUpdate, RecordContext};
pub use cursor::ByteCursor;
pub use decoder::{decode_sources, run, RecordDecoder};
pub use error::{PicaError, Result};
pub use field::{FieldToken, OutputLine, SubfieldToken, Tag};
pub use handlers::{FieldHandler, FieldHandlerRegistry, HandlerKind, HandlerOutcome};
pub use router::{Bucket, LanguageRouter};
pub use statistics::{
    LanguageStatistics, RunTotals, SourceStatistics, StatisticsAggregator, StatisticsReport,
};
pub use tokenizer::FieldTokenizer;
