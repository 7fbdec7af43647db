//! Run configuration.
//!
//! A [`Config`] is built once (from TOML, from code, or from defaults),
//! validated, and then passed by reference to everything that needs it.
//! Every key is optional in TOML; missing keys take the defaults below.
//!
//! ```toml
//! sources = ["dumps/iln11_013.pp", "dumps/iln11_002.pp.gz"]
//! fields = ["003@", "028A", "028B", "021A", "021B", "033A", "010@", "019@"]
//! fallback = "analysis/out.txt"
//! statistics = "analysis/statistics.json"
//! verbose = false
//! text_output = true
//! missing_record_id = "skip"
//!
//! [languages]
//! eng = "analysis/eng_out.txt"
//! ger = "analysis/ger_out.txt"
//!
//! [handlers]
//! "028C" = "author"
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::context::UNKNOWN_LANGUAGE;
use crate::error::{PicaError, Result};
use crate::field::{Tag, LANGUAGE_TAG, RECORD_ID_TAG};
use crate::handlers::{FieldHandlerRegistry, HandlerKind};

/// What to do with output lines of a record that has no identifier (yet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingRecordId {
    /// Drop the line and log a warning once per record (default).
    #[default]
    Skip,
    /// Write the line with an empty identifier column.
    Blank,
}

/// Configuration of a decoding run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Source files, processed one at a time in this order.
    pub sources: Vec<PathBuf>,
    /// Fields of interest. The identifier and language tags are always added.
    pub fields: IndexSet<Tag>,
    /// Sink path per recognized language code.
    pub languages: IndexMap<String, PathBuf>,
    /// Sink for records without a recognized language.
    pub fallback: PathBuf,
    /// Where the statistics report is written.
    pub statistics: PathBuf,
    /// Log every output line and record boundary.
    pub verbose: bool,
    /// Write the language sinks. When off, only statistics are produced.
    pub text_output: bool,
    /// Handling of lines from records without identifier.
    pub missing_record_id: MissingRecordId,
    /// Handler bindings overriding [`HandlerKind::default_for`].
    pub handlers: IndexMap<Tag, HandlerKind>,
}

impl Default for Config {
    fn default() -> Self {
        let fields = [
            RECORD_ID_TAG,
            "028A",
            "028B",
            "021A",
            "021B",
            "033A",
            LANGUAGE_TAG,
            "019@",
        ]
        .into_iter()
        .filter_map(|t| Tag::new(t).ok())
        .collect();

        let mut languages = IndexMap::new();
        languages.insert("eng".to_string(), PathBuf::from("analysis/eng_out.txt"));
        languages.insert("ger".to_string(), PathBuf::from("analysis/ger_out.txt"));

        Config {
            sources: Vec::new(),
            fields,
            languages,
            fallback: PathBuf::from("analysis/out.txt"),
            statistics: PathBuf::from("analysis/statistics.json"),
            verbose: false,
            text_output: true,
            missing_record_id: MissingRecordId::default(),
            handlers: IndexMap::new(),
        }
    }
}

impl Config {
    /// Parse a TOML document and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::ConfigParse`] for malformed TOML and
    /// [`PicaError::Config`] if validation fails.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::Config`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: &Path) -> Result<Self> {
        let input = fs::read_to_string(path).map_err(|e| {
            PicaError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&input)
    }

    /// Check consistency and add the mandatory fields of interest.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::Config`] for an empty or reserved language code,
    /// two sinks sharing a path, or invalid handler bindings.
    pub fn validate(&mut self) -> Result<()> {
        for required in [RECORD_ID_TAG, LANGUAGE_TAG] {
            self.fields.insert(Tag::new(required)?);
        }

        let mut paths = HashSet::new();
        for (code, path) in &self.languages {
            if code.trim().is_empty() || code != code.trim() {
                return Err(PicaError::Config(format!("invalid language code {code:?}")));
            }
            if code == UNKNOWN_LANGUAGE {
                return Err(PicaError::Config(format!(
                    "{UNKNOWN_LANGUAGE:?} is reserved for unclassified records"
                )));
            }
            if !paths.insert(path) {
                return Err(PicaError::Config(format!(
                    "{} is used by more than one language",
                    path.display()
                )));
            }
        }
        if paths.contains(&self.fallback) {
            return Err(PicaError::Config(format!(
                "fallback {} is also a language sink",
                self.fallback.display()
            )));
        }

        self.registry().map(|_| ())
    }

    /// Build the handler registry for the configured fields.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::Config`] for invalid handler bindings.
    pub fn registry(&self) -> Result<FieldHandlerRegistry> {
        FieldHandlerRegistry::new(self.fields.iter().cloned(), &self.handlers)
    }
}
