//! Common test helpers and utilities shared across test suite.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use picarc::Config;

/// Line framing used when serializing test records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Fields end with `CR LF`.
    CrLf,
    /// Fields start with `0x1E` and end with `LF`.
    LfFieldTerminator,
}

/// Builds PICA+ byte streams.
///
/// ```ignore
/// let bytes = PicaBuilder::new()
///     .field("003@", &[('0', "PPN1")])
///     .end_record()
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct PicaBuilder {
    framing: Framing,
    bytes: Vec<u8>,
}

impl PicaBuilder {
    /// Creates a builder using `CR LF` framing.
    pub fn new() -> Self {
        Self::with_framing(Framing::CrLf)
    }

    /// Creates a builder using the given framing.
    pub fn with_framing(framing: Framing) -> Self {
        PicaBuilder {
            framing,
            bytes: Vec::new(),
        }
    }

    /// Appends a field: the tag, the escaped delimiter and the subfields.
    pub fn field(mut self, tag: &str, subfields: &[(char, &str)]) -> Self {
        if self.framing == Framing::LfFieldTerminator {
            self.bytes.push(0x1E);
        }
        self.bytes.extend_from_slice(tag.as_bytes());
        for (i, (marker, value)) in subfields.iter().enumerate() {
            if i == 0 {
                self.bytes.push(b' ');
            }
            self.bytes.push(0x1F);
            let mut buf = [0; 4];
            self.bytes.extend_from_slice(marker.encode_utf8(&mut buf).as_bytes());
            self.bytes.extend_from_slice(value.as_bytes());
        }
        self.end_line()
    }

    /// Appends raw bytes followed by a line end.
    pub fn raw_line(mut self, bytes: &[u8]) -> Self {
        if self.framing == Framing::LfFieldTerminator {
            self.bytes.push(0x1E);
        }
        self.bytes.extend_from_slice(bytes);
        self.end_line()
    }

    /// Appends the record terminator line.
    pub fn end_record(mut self) -> Self {
        self.bytes.extend_from_slice(b"\x1d");
        self.end_line()
    }

    /// Appends raw bytes without any framing.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// Finishes the stream.
    pub fn build(self) -> Vec<u8> {
        self.bytes
    }

    fn end_line(mut self) -> Self {
        match self.framing {
            Framing::CrLf => self.bytes.extend_from_slice(b"\r\n"),
            Framing::LfFieldTerminator => self.bytes.push(b'\n'),
        }
        self
    }
}

impl Default for PicaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The two-record stream used by the end-to-end tests: a German record with a
/// title and a record without language with an author.
pub fn two_record_dump() -> Vec<u8> {
    PicaBuilder::new()
        .field("003@", &[('0', "PPN123")])
        .field("010@", &[('a', "ger")])
        .field("021A", &[('a', "Foo")])
        .end_record()
        .field("003@", &[('0', "PPN456")])
        .field("028A", &[('a', "Bar"), ('d', "Baz"), ('0', "gnd/1")])
        .end_record()
        .build()
}

/// Writes `bytes` to `dir/name` and returns the path.
pub fn write_source(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).expect("Could not write test source");
    path
}

/// A configuration writing all sinks and the report below `dir`.
pub fn config_in(dir: &Path, sources: Vec<PathBuf>) -> Config {
    let mut languages = IndexMap::new();
    languages.insert("eng".to_string(), dir.join("analysis/eng_out.txt"));
    languages.insert("ger".to_string(), dir.join("analysis/ger_out.txt"));
    let mut config = Config {
        sources,
        languages,
        fallback: dir.join("analysis/out.txt"),
        statistics: dir.join("analysis/statistics.json"),
        ..Config::default()
    };
    config.validate().expect("Test configuration is valid");
    config
}

/// Reads a sink file as text.
pub fn read_sink(path: &Path) -> String {
    fs::read_to_string(path).expect("Could not read sink")
}
