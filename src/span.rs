/**
This module contains the primitive interval type shared by every layer of the crate, the
conversion from bounds to spans and the projection of token-index spans into character space.
*/
use crate::entity::EntityChunk;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::ops::Range;
use thiserror::Error;

/// Half-open interval `[lb, ub)`. A span does not know its unit: it can hold character offsets
/// (byte offsets into UTF-8 text) or token indices, depending on the layer it belongs to. Going
/// from one unit to the other is always explicit, see `SpanProjector`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Span {
    lb: usize,
    ub: usize,
}

/// Raised when spans or bounds do not respect the ordering they are required to have.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpanFormatError {
    #[error("invalid span: lower bound {lb} is greater than upper bound {ub}")]
    Inverted { lb: usize, ub: usize },
    #[error("bounds are not strictly increasing at position {position}: {previous} is followed by {next}")]
    NotIncreasing {
        position: usize,
        previous: Span,
        next: Span,
    },
}

/// Raised when a token-index span cannot be projected onto the token layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("token span {span} is out of bounds for a layer of {tokens} tokens")]
pub struct BoundsError {
    pub span: Span,
    pub tokens: usize,
}

impl Span {
    pub fn new(lb: usize, ub: usize) -> Result<Self, SpanFormatError> {
        if lb > ub {
            return Err(SpanFormatError::Inverted { lb, ub });
        }
        Ok(Span { lb, ub })
    }

    /// Empty span located at `at`. Used as a pure cut point.
    pub const fn point(at: usize) -> Self {
        Span { lb: at, ub: at }
    }

    pub const fn lb(&self) -> usize {
        self.lb
    }

    pub const fn ub(&self) -> usize {
        self.ub
    }

    pub const fn len(&self) -> usize {
        self.ub - self.lb
    }

    pub const fn is_empty(&self) -> bool {
        self.lb == self.ub
    }

    pub const fn as_range(&self) -> Range<usize> {
        self.lb..self.ub
    }

    /// `self ⊆ other`
    pub const fn is_inside(&self, other: &Span) -> bool {
        self.lb >= other.lb && self.ub <= other.ub
    }

    /// `other ⊆ self`
    pub const fn contains(&self, other: &Span) -> bool {
        other.is_inside(self)
    }

    /// Same lower bound, new upper bound. The span never inverts: `ub` is clamped to `lb`.
    pub(crate) fn with_ub(self, ub: usize) -> Span {
        Span {
            lb: self.lb,
            ub: ub.max(self.lb),
        }
    }

    /// Moves both bounds by `delta`. Returns `None` if a bound would leave the `usize` range.
    pub fn translate(&self, delta: isize) -> Option<Span> {
        Some(Span {
            lb: self.lb.checked_add_signed(delta)?,
            ub: self.ub.checked_add_signed(delta)?,
        })
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.lb, self.ub)
    }
}

impl TryFrom<(usize, usize)> for Span {
    type Error = SpanFormatError;
    fn try_from(value: (usize, usize)) -> Result<Self, Self::Error> {
        Span::new(value.0, value.1)
    }
}

impl From<Span> for Range<usize> {
    fn from(value: Span) -> Self {
        value.as_range()
    }
}

/// Converts N strictly increasing bounds into the N-1 spans lying between them. A bound is the
/// separator region between two consecutive spans: whitespace for tokens, an empty `Span::point`
/// for sentences and paragraphs. Span `i` goes from `bounds[i].ub` to `bounds[i + 1].lb`.
///
/// ```rust
/// use chunkeval::{bounds_to_spans, Span};
///
/// let bounds = [Span::point(0), Span::new(5, 6).unwrap(), Span::point(11)];
/// let spans = bounds_to_spans(&bounds).unwrap();
/// assert_eq!(spans, vec![Span::new(0, 5).unwrap(), Span::new(6, 11).unwrap()]);
/// ```
pub fn bounds_to_spans(bounds: &[Span]) -> Result<Vec<Span>, SpanFormatError> {
    let mut spans = Vec::with_capacity(bounds.len().saturating_sub(1));
    for (position, window) in bounds.windows(2).enumerate() {
        let (previous, next) = (window[0], window[1]);
        if previous.ub >= next.lb {
            return Err(SpanFormatError::NotIncreasing {
                position: position + 1,
                previous,
                next,
            });
        }
        spans.push(Span {
            lb: previous.ub,
            ub: next.lb,
        });
    }
    Ok(spans)
}

/// Plain cut-point form of `bounds_to_spans`: N strictly increasing cuts give N-1 contiguous
/// spans.
pub fn cuts_to_spans(cuts: &[usize]) -> Result<Vec<Span>, SpanFormatError> {
    let bounds: Vec<Span> = cuts.iter().copied().map(Span::point).collect();
    bounds_to_spans(&bounds)
}

/// Maps token-index spans into the character space of the text the tokens were cut from.
#[derive(Debug, Clone, Copy)]
pub struct SpanProjector<'a> {
    tokens: &'a [Span],
}

impl<'a> SpanProjector<'a> {
    pub fn new(tokens: &'a [Span]) -> Self {
        SpanProjector { tokens }
    }

    /// Projects the token span `[lb, ub)` to `[tokens[lb].lb, tokens[ub - 1].ub)`. The span must
    /// be non-empty and lie inside the token layer.
    pub fn project(&self, span: Span) -> Result<Span, BoundsError> {
        if span.lb >= span.ub || span.ub > self.tokens.len() {
            return Err(BoundsError {
                span,
                tokens: self.tokens.len(),
            });
        }
        Ok(Span {
            lb: self.tokens[span.lb].lb,
            ub: self.tokens[span.ub - 1].ub,
        })
    }

    /// Same as `project`, keeping the label of the chunk.
    pub fn project_chunk<'c>(&self, chunk: &EntityChunk<'c>) -> Result<EntityChunk<'c>, BoundsError> {
        let projected = self.project(Span {
            lb: chunk.start,
            ub: chunk.end,
        })?;
        Ok(EntityChunk::new(
            chunk.label.clone(),
            projected.lb,
            projected.ub,
        ))
    }
}
