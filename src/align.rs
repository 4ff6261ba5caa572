/**
Greedy alignment of a hypothesis annotation set against a reference annotation set.

The alignment runs four passes in a fixed order. Each pass walks the remaining hypothesis items
and, for each of them, takes the first remaining reference item satisfying the pass predicate.
Both are removed from their collection and recorded as a `(hypothesis, reference)` pair. This is
not an optimal matching: which of several candidates gets picked depends on the order of the
inputs, and downstream totals depend on that choice.
*/
use crate::entity::LabeledSpan;
use crate::metrics::Counts;
use enum_iterator::{all, Sequence};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tracing::debug;

/// Kinds of matched pairs, in the order in which the passes run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Sequence, Serialize, Deserialize,
)]
pub enum AlignmentCategory {
    Correct,
    Type,
    Boundary,
    TypeAndBoundary,
}

impl Display for AlignmentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Correct => "correct",
            Self::Type => "type error",
            Self::Boundary => "boundary error",
            Self::TypeAndBoundary => "type+boundary error",
        };
        write!(f, "{}", name)
    }
}

impl AlignmentCategory {
    /// Whether `hypothesis` and `reference` form a pair of this category.
    pub fn matches<T: LabeledSpan>(self, hypothesis: &T, reference: &T) -> bool {
        let (h, r) = (hypothesis, reference);
        let same_label = h.label() == r.label();
        let same_start = h.start() == r.start();
        let same_end = h.end() == r.end();
        match self {
            Self::Correct => same_label && same_start && same_end,
            Self::Type => !same_label && same_start && same_end,
            Self::Boundary => same_label && (same_start != same_end),
            // Kept as is: it does not mean "both bounds differ". Overlapping chunks whose starts
            // differ are not caught, while adjacent ones (`h.start == r.end`) are.
            Self::TypeAndBoundary => {
                (!same_label && !same_start && h.start() == r.end())
                    || (same_start && h.start() != r.end())
            }
        }
    }
}

/// Partition of a reference set and a hypothesis set. Pairs are `(hypothesis, reference)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment<T> {
    correct: Vec<(T, T)>,
    type_errors: Vec<(T, T)>,
    boundary_errors: Vec<(T, T)>,
    type_and_boundary_errors: Vec<(T, T)>,
    silence: Vec<T>,
    noise: Vec<T>,
}

impl<T> Alignment<T> {
    fn empty() -> Self {
        Alignment {
            correct: vec![],
            type_errors: vec![],
            boundary_errors: vec![],
            type_and_boundary_errors: vec![],
            silence: vec![],
            noise: vec![],
        }
    }

    pub fn pairs(&self, category: AlignmentCategory) -> &[(T, T)] {
        match category {
            AlignmentCategory::Correct => &self.correct,
            AlignmentCategory::Type => &self.type_errors,
            AlignmentCategory::Boundary => &self.boundary_errors,
            AlignmentCategory::TypeAndBoundary => &self.type_and_boundary_errors,
        }
    }

    fn pairs_mut(&mut self, category: AlignmentCategory) -> &mut Vec<(T, T)> {
        match category {
            AlignmentCategory::Correct => &mut self.correct,
            AlignmentCategory::Type => &mut self.type_errors,
            AlignmentCategory::Boundary => &mut self.boundary_errors,
            AlignmentCategory::TypeAndBoundary => &mut self.type_and_boundary_errors,
        }
    }

    pub fn len(&self, category: AlignmentCategory) -> usize {
        self.pairs(category).len()
    }

    pub fn correct(&self) -> &[(T, T)] {
        &self.correct
    }

    pub fn type_errors(&self) -> &[(T, T)] {
        &self.type_errors
    }

    pub fn boundary_errors(&self) -> &[(T, T)] {
        &self.boundary_errors
    }

    pub fn type_and_boundary_errors(&self) -> &[(T, T)] {
        &self.type_and_boundary_errors
    }

    /// Reference items left unmatched (false negatives).
    pub fn silence(&self) -> &[T] {
        &self.silence
    }

    /// Hypothesis items left unmatched (false positives).
    pub fn noise(&self) -> &[T] {
        &self.noise
    }

    /// Every matched pair with its category, pass by pass.
    pub fn iter_pairs(&self) -> impl Iterator<Item = (AlignmentCategory, &(T, T))> + '_ {
        all::<AlignmentCategory>()
            .flat_map(move |category| self.pairs(category).iter().map(move |p| (category, p)))
    }
}

impl<T: LabeledSpan> Alignment<T> {
    /// Per label counts. Pairs count under the label of their reference item, only correct pairs
    /// count as `ok`.
    pub fn counts(&self) -> Counts {
        Counts::from_alignment(self)
    }
}

/// Aligns `hypothesis` against `reference`. Both collections are consumed: every item ends up
/// either in exactly one pair or in silence/noise.
///
/// ```rust
/// use chunkeval::{align, AlignmentCategory, EntityChunk};
///
/// let reference = vec![EntityChunk::from(("PER", 0, 2))];
/// let hypothesis = vec![EntityChunk::from(("PERS", 0, 2))];
/// let alignment = align(reference, hypothesis);
/// assert_eq!(alignment.len(AlignmentCategory::Type), 1);
/// assert!(alignment.silence().is_empty() && alignment.noise().is_empty());
/// ```
pub fn align<T: LabeledSpan>(reference: Vec<T>, hypothesis: Vec<T>) -> Alignment<T> {
    let mut reference = reference;
    let mut hypothesis = hypothesis;
    let mut alignment = Alignment::empty();
    for category in all::<AlignmentCategory>() {
        // Kept as is: the type-error pass does not look at the hypothesis item that follows a
        // match. That item stays for the later passes.
        let skip_after_match = category == AlignmentCategory::Type;
        let pairs = greedy_pass(&mut hypothesis, &mut reference, skip_after_match, |h, r| {
            category.matches(h, r)
        });
        debug!(
            %category,
            matched = pairs.len(),
            hypothesis_left = hypothesis.len(),
            reference_left = reference.len(),
            "alignment pass done"
        );
        *alignment.pairs_mut(category) = pairs;
    }
    alignment.silence = reference;
    alignment.noise = hypothesis;
    alignment
}

/// One pass: hypothesis items outer, reference items inner, first match wins. With
/// `skip_after_match`, the hypothesis item following a match is left unmatched without being
/// examined.
fn greedy_pass<T, F>(
    hypothesis: &mut Vec<T>,
    reference: &mut Vec<T>,
    skip_after_match: bool,
    matches: F,
) -> Vec<(T, T)>
where
    F: Fn(&T, &T) -> bool,
{
    let mut pairs = Vec::new();
    let mut unmatched = Vec::with_capacity(hypothesis.len());
    let mut skip = false;
    for h in hypothesis.drain(..) {
        if skip {
            unmatched.push(h);
            skip = false;
            continue;
        }
        match reference.iter().position(|r| matches(&h, r)) {
            Some(index) => {
                let r = reference.remove(index);
                pairs.push((h, r));
                skip = skip_after_match;
            }
            None => unmatched.push(h),
        }
    }
    *hypothesis = unmatched;
    pairs
}
