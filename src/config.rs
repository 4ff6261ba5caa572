/*
 * This modules contains the configuration of the evaluation entry points. Most importantly, it
 * contains the `EvalConfig` struct, which implements the default trait, and its builder. It also
 * holds the resolution of the annotation field (column or named layer) an evaluation reads.
*/
use crate::segmenter::Language;
use either::Either as IndexOrName;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

/// Selects an annotation field: either a column index (negative indices count from the end) or
/// the name of a field/layer.
pub type FieldSelector = IndexOrName<isize, String>;

/// Failure to resolve which annotation field an evaluation should read.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("column {column} does not exist in a table of width {width}")]
    ColumnOutOfRange { column: isize, width: usize },
    #[error("row {row} has {found} fields, expected {expected}")]
    RaggedTable {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("annotation field {0:?} could not be found")]
    UnresolvedField(String),
    #[error("annotation field is ambiguous, candidates are: {0:?}")]
    AmbiguousField(Vec<String>),
}

/// Resolves a possibly negative column index against the width of a table. `-1` is the last
/// column.
pub fn resolve_column(column: isize, width: usize) -> Result<usize, ConfigurationError> {
    let resolved = if column < 0 {
        width.checked_sub(column.unsigned_abs())
    } else {
        Some(column.unsigned_abs()).filter(|c| *c < width)
    };
    resolved.ok_or(ConfigurationError::ColumnOutOfRange { column, width })
}

/// Resolves a `FieldSelector` into a column index. Names are looked up in `header`; a name found
/// more than once is ambiguous.
pub fn resolve_field<S: AsRef<str>>(
    selector: &FieldSelector,
    header: Option<&[S]>,
    width: usize,
) -> Result<usize, ConfigurationError> {
    match selector {
        IndexOrName::Left(column) => resolve_column(*column, width),
        IndexOrName::Right(name) => {
            let header = header.ok_or_else(|| ConfigurationError::UnresolvedField(name.clone()))?;
            let positions: Vec<usize> = header
                .iter()
                .enumerate()
                .filter(|(_, field)| field.as_ref() == name.as_str())
                .map(|(i, _)| i)
                .collect();
            match positions.as_slice() {
                [] => Err(ConfigurationError::UnresolvedField(name.clone())),
                [single] => resolve_column(*single as isize, width),
                _ => Err(ConfigurationError::AmbiguousField(
                    positions.iter().map(|p| format!("{}#{}", name, p)).collect(),
                )),
            }
        }
    }
}

/// A named annotation layer of a document, such as `"NER"` or `"chunking"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationLayer<T> {
    pub name: String,
    pub annotations: Vec<T>,
}

impl<T> AnnotationLayer<T> {
    pub fn new<S: Into<String>>(name: S, annotations: Vec<T>) -> Self {
        AnnotationLayer {
            name: name.into(),
            annotations,
        }
    }
}

/// Picks one annotation layer among the layers of a document. Without a name, the document must
/// hold exactly one layer.
pub fn select_layer<'l, T>(
    layers: &'l [AnnotationLayer<T>],
    name: Option<&str>,
) -> Result<&'l AnnotationLayer<T>, ConfigurationError> {
    match name {
        Some(name) => {
            let mut candidates = layers.iter().filter(|l| l.name == name);
            match (candidates.next(), candidates.next()) {
                (Some(layer), None) => Ok(layer),
                (None, _) => Err(ConfigurationError::UnresolvedField(String::from(name))),
                (Some(_), Some(_)) => Err(ConfigurationError::AmbiguousField(
                    layers
                        .iter()
                        .filter(|l| l.name == name)
                        .map(|l| l.name.clone())
                        .collect(),
                )),
            }
        }
        None => match layers {
            [single] => Ok(single),
            [] => Err(ConfigurationError::UnresolvedField(String::from("<any>"))),
            _ => Err(ConfigurationError::AmbiguousField(
                layers.iter().map(|l| l.name.clone()).collect(),
            )),
        },
    }
}

/// How numbers are written in a report. Spreadsheets in most european locales expect a decimal
/// comma, which is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportFormat {
    pub decimal_separator: char,
    pub decimals: usize,
}

impl Default for ReportFormat {
    fn default() -> Self {
        ReportFormat {
            decimal_separator: ',',
            decimals: 2,
        }
    }
}

impl ReportFormat {
    /// Formats a number with `decimals` digits after the separator.
    pub fn number(&self, value: f64) -> String {
        let formatted = format!("{:.*}", self.decimals, value);
        if self.decimal_separator == '.' {
            formatted
        } else {
            formatted.replace('.', &self.decimal_separator.to_string())
        }
    }
}

/// Config struct used to simplify the inputs of the corpus-level entry points. It implements the
/// default trait: reference tags in the second to last column, hypothesis tags in the last one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Field holding the reference tags.
    pub(crate) reference_field: FieldSelector,
    /// Field holding the hypothesis tags, i.e. the output of the tagger.
    pub(crate) tagging_field: FieldSelector,
    /// Language used when the evaluation needs to segment raw text.
    pub(crate) language: Language,
    /// Formatting of the numbers in the textual report.
    pub(crate) report: ReportFormat,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            reference_field: IndexOrName::Left(-2),
            tagging_field: IndexOrName::Left(-1),
            language: Language::French,
            report: ReportFormat::default(),
        }
    }
}

impl EvalConfig {
    pub fn reference_field(&self) -> &FieldSelector {
        &self.reference_field
    }
    pub fn tagging_field(&self) -> &FieldSelector {
        &self.tagging_field
    }
    pub fn language(&self) -> Language {
        self.language
    }
    pub fn report(&self) -> ReportFormat {
        self.report
    }
}

impl Display for EvalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let field = |selector: &FieldSelector| match selector {
            IndexOrName::Left(column) => format!("column {}", column),
            IndexOrName::Right(name) => format!("field {:?}", name),
        };
        write!(
            f,
            "Reference: {}\n Tagging: {}\n Language: {}\n Decimal separator: {:?}\n Decimals: {}",
            field(&self.reference_field),
            field(&self.tagging_field),
            self.language,
            self.report.decimal_separator,
            self.report.decimals
        )
    }
}

/// This builder can be used to build and customize an `EvalConfig` structure.
#[derive(Clone, Debug, Default)]
pub struct EvalConfigBuilder {
    config: EvalConfig,
}

impl EvalConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn reference_column(mut self, column: isize) -> Self {
        self.config.reference_field = IndexOrName::Left(column);
        self
    }
    pub fn tagging_column(mut self, column: isize) -> Self {
        self.config.tagging_field = IndexOrName::Left(column);
        self
    }
    pub fn reference_field<S: Into<String>>(mut self, name: S) -> Self {
        self.config.reference_field = IndexOrName::Right(name.into());
        self
    }
    pub fn tagging_field<S: Into<String>>(mut self, name: S) -> Self {
        self.config.tagging_field = IndexOrName::Right(name.into());
        self
    }
    pub fn language(mut self, language: Language) -> Self {
        self.config.language = language;
        self
    }
    pub fn decimal_separator(mut self, separator: char) -> Self {
        self.config.report.decimal_separator = separator;
        self
    }
    pub fn decimals(mut self, decimals: usize) -> Self {
        self.config.report.decimals = decimals;
        self
    }
    pub fn build(self) -> EvalConfig {
        self.config
    }
}
