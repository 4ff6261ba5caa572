/**
This modules gives the tools to print the scores of every label and the two averages as a
tab-separated table that can be pasted into a spreadsheet.
*/
use crate::config::ReportFormat;
use crate::metrics::{LabelCounts, Scores};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::fmt::Display;
use std::hash::Hash;
use std::str::FromStr;
use thiserror::Error;

/// The reporter holds the scores of every label and the averaged scores. It is displayed as a
/// tab-separated table with a decimal comma:
///
/// ```rust
/// use chunkeval::{classification_report, compile_chunks, Counts};
///
/// let reference = compile_chunks(&["B-PER", "I-PER", "O", "B-LOC", "O"]).unwrap();
/// let hypothesis = compile_chunks(&["B-PER", "I-PER", "O", "B-ORG", "O"]).unwrap();
/// let reporter = classification_report(&Counts::from_chunk_sets(&reference, &hypothesis));
///
/// let expected_report = "entity\tprecision\trecall\tf-measure
/// LOC\t0,00\t0,00\t0,00
/// ORG\t0,00\t0,00\t0,00
/// PER\t100,00\t100,00\t100,00
///
/// micro-average\t50,00\t50,00\t50,00
/// macro-average\t33,33\t33,33\t33,33
/// ";
/// assert_eq!(expected_report, reporter.to_string());
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Reporter {
    pub(crate) labels: BTreeSet<LabelMetricsInner>,
}

/// By converting the reporter into a `HashSet` of `LabelMetrics`, you lose the ordering of the
/// rows.
impl From<Reporter> for HashSet<LabelMetrics> {
    fn from(value: Reporter) -> Self {
        value.labels.into_iter().map(LabelMetrics::from).collect()
    }
}

impl Reporter {
    pub(crate) fn insert(&mut self, metrics: LabelMetricsInner) -> bool {
        self.labels.insert(metrics)
    }

    /// Scores of a single label, without averaging.
    pub fn get(&self, label: &str) -> Option<LabelMetrics> {
        self.labels
            .iter()
            .find(|m| m.average == Average::None && m.label == label)
            .cloned()
            .map(LabelMetrics::from)
    }

    fn averaged(&self, average: Average) -> Option<LabelMetrics> {
        self.labels
            .iter()
            .find(|m| m.average == average)
            .cloned()
            .map(LabelMetrics::from)
    }

    /// Scores computed from the counts pooled over every label.
    pub fn micro(&self) -> Option<LabelMetrics> {
        self.averaged(Average::Micro)
    }

    /// Mean of the per label precision and recall. Absent when there is no label at all.
    pub fn macro_average(&self) -> Option<LabelMetrics> {
        self.averaged(Average::Macro)
    }

    /// Per label rows, sorted by label.
    pub fn iter_labels(&self) -> impl Iterator<Item = LabelMetrics> + '_ {
        self.labels
            .iter()
            .filter(|m| m.average == Average::None)
            .cloned()
            .map(LabelMetrics::from)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Writes the table with the given number format.
    pub fn render(&self, format: &ReportFormat) -> String {
        let mut lines = vec![String::from("entity\tprecision\trecall\tf-measure")];
        let mut blank_written = false;
        for metrics in self.labels.iter() {
            if metrics.average != Average::None && !blank_written {
                lines.push(String::new());
                blank_written = true;
            }
            lines.push(metrics.render(format));
        }
        let mut table = lines.join("\n");
        table.push('\n');
        table
    }
}

/// The Reporter acts as a spreadsheet when displayed, with the default number format.
impl Display for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render(&ReportFormat::default()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Datastructure holding the scores of a given label.
pub struct LabelMetrics {
    /// The label, such as "PER", "LOC", etc. Empty for averaged rows.
    pub label: String,
    /// The average used to compute these scores
    pub average: Average,
    pub precision: f64,
    pub recall: f64,
    pub fscore: f64,
    pub ok: usize,
    pub gold: usize,
    pub guess: usize,
}

impl Hash for LabelMetrics {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.label.hash(state);
        self.average.hash(state)
    }
}

impl PartialEq for LabelMetrics {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label && self.average == other.average
    }
}
impl Eq for LabelMetrics {}

impl From<LabelMetricsInner> for LabelMetrics {
    fn from(value: LabelMetricsInner) -> Self {
        Self {
            label: value.label,
            average: value.average,
            precision: value.scores.precision,
            recall: value.scores.recall,
            fscore: value.scores.fscore,
            ok: value.counts.ok,
            gold: value.counts.gold,
            guess: value.counts.guess,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
/// One row of the report. Rows are identified by `(average, label)` and ordered that way, so that
/// the label rows come first, sorted, followed by the micro and macro rows.
pub(crate) struct LabelMetricsInner {
    pub(crate) label: String,
    pub(crate) average: Average,
    pub(crate) scores: Scores,
    pub(crate) counts: LabelCounts,
}

impl PartialEq for LabelMetricsInner {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label && self.average == other.average
    }
}
impl Eq for LabelMetricsInner {}

impl PartialOrd for LabelMetricsInner {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LabelMetricsInner {
    fn cmp(&self, other: &Self) -> Ordering {
        self.average
            .cmp(&other.average)
            .then_with(|| self.label.cmp(&other.label))
    }
}

impl LabelMetricsInner {
    pub(crate) fn new<S: Into<String>>(
        label: S,
        average: Average,
        scores: Scores,
        counts: LabelCounts,
    ) -> Self {
        LabelMetricsInner {
            label: label.into(),
            average,
            scores,
            counts,
        }
    }

    fn name(&self) -> &str {
        match self.average {
            Average::None => &self.label,
            Average::Micro => "micro-average",
            Average::Macro => "macro-average",
        }
    }

    fn render(&self, format: &ReportFormat) -> String {
        format!(
            "{}\t{}\t{}\t{}",
            self.name(),
            format.number(self.scores.precision),
            format.number(self.scores.recall),
            format.number(self.scores.fscore)
        )
    }
}

/// Enumeration of the averaging methods. `None` marks the rows of a single label. &str can be
/// parsed to create an `Average`.
#[derive(
    Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Serialize, Deserialize, Default,
)]
pub enum Average {
    #[default]
    None,
    Micro,
    Macro,
}

impl Display for Average {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("Impossible to parse the string ({0}) into an Average")]
pub struct AverageParsingError(String);

impl FromStr for Average {
    type Err = AverageParsingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Average::None),
            "micro" => Ok(Average::Micro),
            "macro" => Ok(Average::Macro),
            _ => Err(AverageParsingError(String::from(s))),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) trait CloseEnough {
        fn are_close(&self, other: &Self, eps: f64) -> bool;
    }

    // LabelMetrics does not compare scores in its PartialEq implementation.
    impl CloseEnough for LabelMetrics {
        fn are_close(&self, other: &Self, eps: f64) -> bool {
            self == other
                && f64::abs(self.precision - other.precision) < eps
                && f64::abs(self.recall - other.recall) < eps
                && f64::abs(self.fscore - other.fscore) < eps
                && (self.ok, self.gold, self.guess) == (other.ok, other.gold, other.guess)
        }
    }

    fn row(label: &str, average: Average, precision: f64) -> LabelMetricsInner {
        LabelMetricsInner::new(
            label,
            average,
            Scores {
                precision,
                recall: precision,
                fscore: precision,
            },
            LabelCounts::default(),
        )
    }

    #[test]
    fn test_rows_order() {
        let mut reporter = Reporter::default();
        reporter.insert(row("", Average::Macro, 1.0));
        reporter.insert(row("PER", Average::None, 2.0));
        reporter.insert(row("", Average::Micro, 3.0));
        reporter.insert(row("LOC", Average::None, 4.0));
        let order: Vec<(Average, String)> = reporter
            .labels
            .iter()
            .map(|m| (m.average, m.label.clone()))
            .collect();
        assert_eq!(
            order,
            vec![
                (Average::None, String::from("LOC")),
                (Average::None, String::from("PER")),
                (Average::Micro, String::new()),
                (Average::Macro, String::new()),
            ]
        );
    }

    #[test]
    fn test_render_with_custom_format() {
        let mut reporter = Reporter::default();
        reporter.insert(row("PER", Average::None, 200.0 / 3.0));
        reporter.insert(row("", Average::Micro, 50.0));
        let format = ReportFormat {
            decimal_separator: '.',
            decimals: 1,
        };
        assert_eq!(
            reporter.render(&format),
            "entity\tprecision\trecall\tf-measure\nPER\t66.7\t66.7\t66.7\n\nmicro-average\t50.0\t50.0\t50.0\n"
        );
    }

    #[test]
    fn test_empty_reporter_renders_header_only() {
        assert_eq!(
            Reporter::default().to_string(),
            "entity\tprecision\trecall\tf-measure\n"
        );
    }

    #[test]
    fn test_lookup() {
        let mut reporter = Reporter::default();
        reporter.insert(row("PER", Average::None, 2.0));
        reporter.insert(row("", Average::Micro, 3.0));
        assert_eq!(reporter.get("PER").map(|m| m.precision), Some(2.0));
        assert!(reporter.get("LOC").is_none());
        assert_eq!(reporter.micro().map(|m| m.precision), Some(3.0));
        assert!(reporter.macro_average().is_none());
        assert_eq!(reporter.iter_labels().count(), 1);
    }

    #[test]
    fn test_into_hashset() {
        let mut reporter = Reporter::default();
        reporter.insert(row("PER", Average::None, 2.0));
        reporter.insert(row("", Average::Micro, 3.0));
        let set: HashSet<LabelMetrics> = reporter.into();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_average_from_str() {
        assert_eq!("MICRO".parse::<Average>(), Ok(Average::Micro));
        assert_eq!(
            "weighted".parse::<Average>(),
            Err(AverageParsingError(String::from("weighted")))
        );
    }
}
