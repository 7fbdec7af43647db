//! Routing of output lines to per-language sinks.
//!
//! The set of sinks is fixed when the router is built: one per configured
//! language code plus a fallback for everything else. Codes that were not
//! configured never create new sinks; they resolve to [`Bucket::Unclassified`].
//!
//! Sinks are written through whatever [`Write`] they wrap and flushed once, in
//! [`LanguageRouter::finish`].

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::context::UNKNOWN_LANGUAGE;
use crate::error::{PicaError, Result};
use crate::field::OutputLine;

/// Destination chosen for a record's lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Index of a configured language, in configuration order.
    Language(usize),
    /// Fallback for missing or unrecognized languages.
    Unclassified,
}

#[derive(Debug)]
struct Sink<W: Write> {
    path: PathBuf,
    writer: W,
}

impl<W: Write> Sink<W> {
    fn write_line(&mut self, line: &OutputLine) -> Result<()> {
        writeln!(self.writer, "{line}").map_err(|source| PicaError::Sink {
            path: self.path.clone(),
            source,
        })
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|source| PicaError::Sink {
            path: self.path.clone(),
            source,
        })
    }
}

/// Maps language codes to sinks.
///
/// # Examples
///
/// ```
/// use indexmap::IndexMap;
/// use picarc::router::{Bucket, LanguageRouter};
///
/// let mut languages = IndexMap::new();
/// languages.insert("ger".to_string(), Vec::new());
/// let router = LanguageRouter::from_writers(languages, Vec::new());
///
/// assert_eq!(router.bucket(Some("ger")), Bucket::Language(0));
/// assert_eq!(router.bucket(Some("fre")), Bucket::Unclassified);
/// assert_eq!(router.bucket(None), Bucket::Unclassified);
/// assert_eq!(router.label(Bucket::Unclassified), "unknown");
/// ```
#[derive(Debug)]
pub struct LanguageRouter<W: Write> {
    sinks: IndexMap<String, Sink<W>>,
    fallback: Sink<W>,
}

impl LanguageRouter<BufWriter<File>> {
    /// Create (truncate) one file per language and the fallback file.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::Sink`] if a directory or file cannot be created.
    pub fn create(languages: &IndexMap<String, PathBuf>, fallback: &Path) -> Result<Self> {
        let sinks = languages
            .iter()
            .map(|(code, path)| Ok((code.clone(), open_sink(path)?)))
            .collect::<Result<IndexMap<_, _>>>()?;
        Ok(LanguageRouter {
            sinks,
            fallback: open_sink(fallback)?,
        })
    }
}

fn open_sink(path: &Path) -> Result<Sink<BufWriter<File>>> {
    let sink_error = |source| PicaError::Sink {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(sink_error)?;
    }
    let file = File::create(path).map_err(sink_error)?;
    Ok(Sink {
        path: path.to_path_buf(),
        writer: BufWriter::new(file),
    })
}

impl<W: Write> LanguageRouter<W> {
    /// Build a router over existing writers.
    pub fn from_writers(languages: IndexMap<String, W>, fallback: W) -> Self {
        let sinks = languages
            .into_iter()
            .map(|(code, writer)| {
                let path = PathBuf::from(format!("<{code}>"));
                (code, Sink { path, writer })
            })
            .collect();
        LanguageRouter {
            sinks,
            fallback: Sink {
                path: PathBuf::from(format!("<{UNKNOWN_LANGUAGE}>")),
                writer: fallback,
            },
        }
    }

    /// Resolve a record language to its bucket.
    #[must_use]
    pub fn bucket(&self, language: Option<&str>) -> Bucket {
        language
            .and_then(|code| self.sinks.get_index_of(code))
            .map_or(Bucket::Unclassified, Bucket::Language)
    }

    /// Statistics label of a bucket: the language code, or `unknown`.
    #[must_use]
    pub fn label(&self, bucket: Bucket) -> &str {
        match bucket {
            Bucket::Language(index) => self
                .sinks
                .get_index(index)
                .map_or(UNKNOWN_LANGUAGE, |(code, _)| code.as_str()),
            Bucket::Unclassified => UNKNOWN_LANGUAGE,
        }
    }

    /// Configured language codes in configuration order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.sinks.keys().map(String::as_str)
    }

    /// Append `line` to the sink of `bucket`.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::Sink`] if the write fails.
    pub fn write(&mut self, bucket: Bucket, line: &OutputLine) -> Result<()> {
        let sink = match bucket {
            Bucket::Language(index) => match self.sinks.get_index_mut(index) {
                Some((_, sink)) => sink,
                None => &mut self.fallback,
            },
            Bucket::Unclassified => &mut self.fallback,
        };
        sink.write_line(line)
    }

    /// Flush every sink and hand back the writers.
    ///
    /// # Errors
    ///
    /// Returns the first [`PicaError::Sink`] raised while flushing; the
    /// remaining sinks are still flushed.
    pub fn finish(mut self) -> Result<(IndexMap<String, W>, W)> {
        let mut first_error = None;
        for sink in self.sinks.values_mut().chain(std::iter::once(&mut self.fallback)) {
            if let Err(e) = sink.flush() {
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let sinks = self
            .sinks
            .into_iter()
            .map(|(code, sink)| (code, sink.writer))
            .collect();
        Ok((sinks, self.fallback.writer))
    }
}
