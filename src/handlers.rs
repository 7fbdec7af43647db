//! Per-tag interpretation of tokenized fields.
//!
//! Every field of interest is bound to one [`FieldHandler`]. Handlers are pure:
//! they look at a [`FieldToken`] and the current [`RecordContext`] and return a
//! [`HandlerOutcome`] describing a context update and/or an output line. The
//! decoder applies the outcome.
//!
//! | Kind        | Default tags     | Effect                                   |
//! |-------------|------------------|------------------------------------------|
//! | `record-id` | `003@`           | sets the record identifier               |
//! | `language`  | `010@`           | sets the record language                 |
//! | `title`     | `021A`, `021B`   | `$a` followed by the `$d` parts          |
//! | `author`    | `028A`, `028B`   | `$d, $a` with `@$0` authority suffix     |
//! | `generic`   | everything else  | PICA plain rendering of all subfields    |

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::assembler::LogicalLine;
use crate::context::{ContextUpdate, RecordContext};
use crate::error::{PicaError, Result};
use crate::field::{FieldToken, OutputLine, Tag, LANGUAGE_TAG, RECORD_ID_TAG};
use crate::tokenizer::FieldTokenizer;

/// Sorting mark used inside PICA+ titles to flag non-filing words.
const SORT_MARK: char = '@';

/// What a handler wants done with a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerOutcome {
    /// Change to apply to the record context.
    pub update: Option<ContextUpdate>,
    /// Line to route to a language sink.
    pub output: Option<OutputLine>,
}

impl HandlerOutcome {
    fn update(update: ContextUpdate) -> Self {
        HandlerOutcome {
            update: Some(update),
            output: None,
        }
    }

    fn output(line: OutputLine) -> Self {
        HandlerOutcome {
            update: None,
            output: Some(line),
        }
    }
}

/// Interprets the subfields of one kind of field.
pub trait FieldHandler: fmt::Debug + Send + Sync {
    /// Interpret `field` in the state of `context`.
    fn handle(&self, field: &FieldToken, context: &RecordContext) -> HandlerOutcome;
}

/// Stores the first subfield as record identifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordIdHandler;

impl FieldHandler for RecordIdHandler {
    fn handle(&self, field: &FieldToken, _context: &RecordContext) -> HandlerOutcome {
        match field.first_value().filter(|v| !v.is_empty()) {
            Some(id) => HandlerOutcome::update(ContextUpdate::RecordId(id.to_string())),
            None => HandlerOutcome::default(),
        }
    }
}

/// Stores the first subfield as record language.
#[derive(Debug, Clone, Copy, Default)]
pub struct LanguageHandler;

impl FieldHandler for LanguageHandler {
    fn handle(&self, field: &FieldToken, _context: &RecordContext) -> HandlerOutcome {
        match field.first_value().filter(|v| !v.is_empty()) {
            Some(code) => HandlerOutcome::update(ContextUpdate::Language(code.to_string())),
            None => HandlerOutcome::default(),
        }
    }
}

/// Main title (`$a`) followed by the additional title information (`$d`).
///
/// When `$a` repeats, the last occurrence is the main title. Every `$d` is
/// kept in order; each may hold several parts separated by semicolons, which
/// are trimmed and joined with single spaces. Sorting marks are dropped. A
/// field that renders to nothing produces no line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleHandler;

impl FieldHandler for TitleHandler {
    fn handle(&self, field: &FieldToken, context: &RecordContext) -> HandlerOutcome {
        let main = field.subfields_with('a').last().map(strip_sort_marks);
        let additions = field
            .subfields_with('d')
            .flat_map(|d| d.split(';'))
            .map(strip_sort_marks)
            .filter(|part| !part.is_empty());

        let title = main
            .into_iter()
            .filter(|m| !m.is_empty())
            .chain(additions)
            .collect::<Vec<_>>()
            .join(" ");
        if title.is_empty() {
            return HandlerOutcome::default();
        }
        HandlerOutcome::output(context.output_line(&field.tag, title))
    }
}

fn strip_sort_marks(value: &str) -> String {
    value.replace(SORT_MARK, "").trim().to_string()
}

/// Personal name rendered as `$d, $a`, with `@$0` when an authority
/// identifier is present.
///
/// A field without any name part falls back to the generic rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorHandler;

impl FieldHandler for AuthorHandler {
    fn handle(&self, field: &FieldToken, context: &RecordContext) -> HandlerOutcome {
        let names: Vec<&str> = [field.subfield('d'), field.subfield('a')]
            .into_iter()
            .flatten()
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            return GenericHandler.handle(field, context);
        }

        let mut value = names.join(", ");
        if let Some(authority) = field.subfield('0').filter(|a| !a.is_empty()) {
            value.push('@');
            value.push_str(authority);
        }
        HandlerOutcome::output(context.output_line(&field.tag, value))
    }
}

/// All subfields in PICA plain notation (`$aFoo$dBar`).
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericHandler;

impl FieldHandler for GenericHandler {
    fn handle(&self, field: &FieldToken, context: &RecordContext) -> HandlerOutcome {
        let mut value = String::new();
        for subfield in &field.subfields {
            value.push('$');
            value.push(subfield.marker);
            value.push_str(&subfield.value);
        }
        HandlerOutcome::output(context.output_line(&field.tag, value))
    }
}

/// The handler variants that can be bound to a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandlerKind {
    /// [`RecordIdHandler`]
    RecordId,
    /// [`LanguageHandler`]
    Language,
    /// [`TitleHandler`]
    Title,
    /// [`AuthorHandler`]
    Author,
    /// [`GenericHandler`]
    Generic,
}

impl HandlerKind {
    /// Handler used for `tag` when the configuration binds none.
    #[must_use]
    pub fn default_for(tag: &Tag) -> Self {
        match tag.as_str() {
            RECORD_ID_TAG => HandlerKind::RecordId,
            LANGUAGE_TAG => HandlerKind::Language,
            "021A" | "021B" => HandlerKind::Title,
            "028A" | "028B" => HandlerKind::Author,
            _ => HandlerKind::Generic,
        }
    }

    fn build(self) -> Box<dyn FieldHandler> {
        match self {
            HandlerKind::RecordId => Box::new(RecordIdHandler),
            HandlerKind::Language => Box::new(LanguageHandler),
            HandlerKind::Title => Box::new(TitleHandler),
            HandlerKind::Author => Box::new(AuthorHandler),
            HandlerKind::Generic => Box::new(GenericHandler),
        }
    }
}

/// Dispatches logical lines to the handler bound to their tag.
///
/// The record identifier and language tags are always fields of interest,
/// whatever the configured field list says.
#[derive(Debug)]
pub struct FieldHandlerRegistry {
    tokenizer: FieldTokenizer,
    handlers: IndexMap<Tag, (HandlerKind, Box<dyn FieldHandler>)>,
}

impl FieldHandlerRegistry {
    /// Build a registry for `fields`, using `bindings` where given and
    /// [`HandlerKind::default_for`] otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::Config`] if a binding targets a tag that is not a
    /// field of interest, rebinds the identifier or language tag, or binds the
    /// identifier or language handler to another tag.
    pub fn new(
        fields: impl IntoIterator<Item = Tag>,
        bindings: &IndexMap<Tag, HandlerKind>,
    ) -> Result<Self> {
        let mut tags: Vec<Tag> = fields.into_iter().collect();
        for required in [RECORD_ID_TAG, LANGUAGE_TAG] {
            if !tags.iter().any(|t| t == required) {
                tags.push(Tag::new(required)?);
            }
        }

        for (tag, kind) in bindings {
            if !tags.contains(tag) {
                return Err(PicaError::Config(format!(
                    "handler bound to {tag}, which is not a field of interest"
                )));
            }
            let fixed = HandlerKind::default_for(tag);
            let reserved = matches!(fixed, HandlerKind::RecordId | HandlerKind::Language);
            let claims_reserved = matches!(kind, HandlerKind::RecordId | HandlerKind::Language);
            if (reserved || claims_reserved) && *kind != fixed {
                return Err(PicaError::Config(format!(
                    "{tag} cannot be bound to the {kind:?} handler"
                )));
            }
        }

        let handlers = tags
            .iter()
            .map(|tag| {
                let kind = bindings
                    .get(tag)
                    .copied()
                    .unwrap_or_else(|| HandlerKind::default_for(tag));
                (tag.clone(), (kind, kind.build()))
            })
            .collect();

        Ok(FieldHandlerRegistry {
            tokenizer: FieldTokenizer::new(tags),
            handlers,
        })
    }

    /// Fields of interest with their handler kinds, in configuration order.
    pub fn bindings(&self) -> impl Iterator<Item = (&Tag, HandlerKind)> {
        self.handlers.iter().map(|(tag, (kind, _))| (tag, *kind))
    }

    /// Tokenize `line` and run the bound handler.
    ///
    /// Returns `None` for lines whose tag is not a field of interest.
    #[must_use]
    pub fn dispatch(&self, line: &LogicalLine, context: &RecordContext) -> Option<HandlerOutcome> {
        let field = self.tokenizer.tokenize(line)?;
        let (_, handler) = self.handlers.get(&field.tag)?;
        Some(handler.handle(&field, context))
    }
}
