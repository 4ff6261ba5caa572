/**
This module counts correct, reference and hypothesis chunks per label and turns the counts into
precision, recall and F-measure, per label and averaged.
*/
use crate::align::{Alignment, AlignmentCategory};
use crate::config::ConfigurationError;
use crate::entity::{Chunks, ColumnError, LabeledSpan, TagFormatError};
use crate::reporter::{Average, LabelMetricsInner, Reporter};
use crate::segmenter::SegmentationError;
use crate::span::BoundsError;
use ahash::AHashMap;
use enum_iterator::all;
use itertools::{multizip, Itertools};
use ndarray::{Array1, Zip};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::ops::{AddAssign, Deref};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Metric {
    Precision,
    Recall,
    FScore,
}

impl Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Errors of the corpus-level computations. Every error of the crate converts into it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComputationError {
    #[error(transparent)]
    Format(#[from] TagFormatError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Bounds(#[from] BoundsError),
    #[error(transparent)]
    Segmentation(#[from] SegmentationError),
    #[error("cannot average over an empty set of labels")]
    EmptyLabelSet,
}

impl From<ColumnError> for ComputationError {
    fn from(value: ColumnError) -> Self {
        match value {
            ColumnError::Format(e) => ComputationError::Format(e),
            ColumnError::Configuration(e) => ComputationError::Configuration(e),
        }
    }
}

/// Counts of a single label. `ok` chunks are found in both the reference and the hypothesis,
/// `gold` chunks in the reference and `guess` chunks in the hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LabelCounts {
    pub ok: usize,
    pub gold: usize,
    pub guess: usize,
}

impl AddAssign for LabelCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.ok += rhs.ok;
        self.gold += rhs.gold;
        self.guess += rhs.guess;
    }
}

/// Per label counts of a corpus.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Counts(AHashMap<String, LabelCounts>);

impl Deref for Counts {
    type Target = AHashMap<String, LabelCounts>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, rhs: Self) {
        for (label, counts) in rhs.0 {
            *self.0.entry(label).or_default() += counts;
        }
    }
}

impl Counts {
    /// The label under which counts pooled over every label are reported.
    pub const POOLED: &'static str = "";

    /// Counts obtained by comparing chunk sets compiled from the same sequence: a chunk is `ok`
    /// when it is found in both sets.
    pub fn from_chunk_sets(reference: &Chunks, hypothesis: &Chunks) -> Counts {
        let mut counts = Counts::default();
        counts.add_chunk_sets(reference, hypothesis);
        counts
    }

    /// Adds the counts of one more sequence.
    pub fn add_chunk_sets(&mut self, reference: &Chunks, hypothesis: &Chunks) {
        for label in reference.labels().union(&hypothesis.labels()) {
            let gold = reference.filter(label);
            let guess = hypothesis.filter(label);
            *self.entry(label) += LabelCounts {
                ok: gold.intersection(&guess).count(),
                gold: gold.len(),
                guess: guess.len(),
            };
        }
    }

    /// Counts obtained from an alignment. Every pair counts once as `gold` and once as `guess`
    /// under the label of its reference item, only correct pairs are `ok`. Silence and noise count
    /// under their own label.
    pub fn from_alignment<T: LabeledSpan>(alignment: &Alignment<T>) -> Counts {
        let mut counts = Counts::default();
        for category in all::<AlignmentCategory>() {
            for (_, reference) in alignment.pairs(category) {
                let entry = counts.entry(reference.label());
                entry.gold += 1;
                entry.guess += 1;
                if category == AlignmentCategory::Correct {
                    entry.ok += 1;
                }
            }
        }
        for reference in alignment.silence() {
            counts.entry(reference.label()).gold += 1;
        }
        for hypothesis in alignment.noise() {
            counts.entry(hypothesis.label()).guess += 1;
        }
        counts
    }

    fn entry(&mut self, label: &str) -> &mut LabelCounts {
        self.0.entry(String::from(label)).or_default()
    }

    /// Counts of `label`, zeros if it was never seen. `Counts::POOLED` gives the pooled counts.
    pub fn get(&self, label: &str) -> LabelCounts {
        if label == Self::POOLED {
            return self.pooled();
        }
        self.0.get(label).copied().unwrap_or_default()
    }

    /// Labels seen in either side, sorted.
    pub fn labels(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).sorted().collect()
    }

    /// Counts summed over every label.
    pub fn pooled(&self) -> LabelCounts {
        let mut pooled = LabelCounts::default();
        for counts in self.0.values() {
            pooled += *counts;
        }
        pooled
    }
}

/// Precision, recall and F-measure, as percentages.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Scores {
    pub precision: f64,
    pub recall: f64,
    pub fscore: f64,
}

impl From<LabelCounts> for Scores {
    fn from(value: LabelCounts) -> Self {
        let (p, r, f) = precision_recall_fscore(&[value]);
        Scores {
            precision: p[0],
            recall: r[0],
            fscore: f[0],
        }
    }
}

/// Element-wise division where a zero denominator gives a zero result.
fn prf_divide(numerator: Array1<f64>, mut denominator: Array1<f64>, metric: Metric) -> Array1<f64> {
    let zero_mask = denominator.mapv(|v| v == 0.0);
    let mut found_zero_in_denom = false;
    denominator.mapv_inplace(|v| {
        if v == 0.0 {
            found_zero_in_denom = true;
            1.0
        } else {
            v
        }
    });
    let mut result = numerator / denominator;
    if found_zero_in_denom {
        Zip::from(&mut result)
            .and(&zero_mask)
            .for_each(|value, &is_zero| {
                if is_zero {
                    *value = 0.0
                }
            });
        debug!(%metric, "zero denominator, the score is set to 0");
    }
    result
}

/// Computes precision, recall and F-measure of every entry of `counts`:
/// `P = 100·ok/guess`, `R = 100·ok/gold` and `F = 2·P·R/(P+R)`, each being 0 when its
/// denominator is 0.
pub fn precision_recall_fscore(
    counts: &[LabelCounts],
) -> (Array1<f64>, Array1<f64>, Array1<f64>) {
    let ok: Array1<f64> = counts.iter().map(|c| c.ok as f64).collect();
    let gold: Array1<f64> = counts.iter().map(|c| c.gold as f64).collect();
    let guess: Array1<f64> = counts.iter().map(|c| c.guess as f64).collect();
    let precision = prf_divide(&ok * 100.0, guess, Metric::Precision);
    let recall = prf_divide(ok * 100.0, gold, Metric::Recall);
    let fscore = prf_divide(
        &precision * &recall * 2.0,
        &precision + &recall,
        Metric::FScore,
    );
    (precision, recall, fscore)
}

/// Macro-average: the mean of the precisions and the mean of the recalls, the F-measure being
/// computed from those two means (it is not the mean of the F-measures).
pub fn macro_average(scores: &[Scores]) -> Result<Scores, ComputationError> {
    let precision: Array1<f64> = scores.iter().map(|s| s.precision).collect();
    let recall: Array1<f64> = scores.iter().map(|s| s.recall).collect();
    let (Some(precision), Some(recall)) = (precision.mean(), recall.mean()) else {
        return Err(ComputationError::EmptyLabelSet);
    };
    let fscore = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    Ok(Scores {
        precision,
        recall,
        fscore,
    })
}

/// Builds the report of `counts`: one row per label, then the micro-average row and, if at least
/// one label was seen, the macro-average row.
pub fn classification_report(counts: &Counts) -> Reporter {
    let labels = counts.labels();
    let per_label: Vec<LabelCounts> = labels.iter().map(|l| counts.get(l)).collect();
    let (p, r, f) = precision_recall_fscore(&per_label);
    let mut reporter = Reporter::default();
    let mut scores = Vec::with_capacity(labels.len());
    for (label, label_counts, precision, recall, fscore) in multizip((
        labels.iter(),
        per_label.iter(),
        p.into_iter(),
        r.into_iter(),
        f.into_iter(),
    )) {
        let label_scores = Scores {
            precision,
            recall,
            fscore,
        };
        scores.push(label_scores);
        reporter.insert(LabelMetricsInner::new(
            *label,
            Average::None,
            label_scores,
            *label_counts,
        ));
    }
    let pooled = counts.pooled();
    reporter.insert(LabelMetricsInner::new(
        Counts::POOLED,
        Average::Micro,
        Scores::from(pooled),
        pooled,
    ));
    match macro_average(&scores) {
        Ok(macro_scores) => {
            reporter.insert(LabelMetricsInner::new(
                Counts::POOLED,
                Average::Macro,
                macro_scores,
                pooled,
            ));
        }
        Err(error) => debug!(%error, "no macro-average row"),
    }
    reporter
}
