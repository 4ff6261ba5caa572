use ahash::AHashSet;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{
    borrow::Cow,
    fmt::Display,
    ops::{Deref, DerefMut},
};

mod compiler;

// Re-exporting
pub use compiler::{compile_chunks, compile_column, ColumnError, Tag, TagFormatError};

/// An entity chunk is a labeled span, such as a named entity. It contains a start and an end
/// (i.e. at what index does it start and where does it stop, exclusive) and a label (such as `LOC`,
/// `PER`, etc.). Chunks are identified by their `(label, start, end)` value only: the same value
/// found twice is the same chunk.
///
/// The unit of `start` and `end` depends on where the chunk comes from: token indices when
/// compiled from a tag column, character offsets once projected with a `SpanProjector`.
#[derive(Debug, Hash, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityChunk<'a> {
    pub(crate) label: Cow<'a, str>,
    pub(crate) start: usize,
    pub(crate) end: usize,
}

impl<'a> EntityChunk<'a> {
    pub fn new(label: Cow<'a, str>, start: usize, end: usize) -> Self {
        EntityChunk { label, start, end }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Detaches the chunk from the buffer its label was borrowed from.
    pub fn into_owned(self) -> EntityChunk<'static> {
        EntityChunk {
            label: Cow::Owned(self.label.into_owned()),
            start: self.start,
            end: self.end,
        }
    }
}

impl<'a> Display for EntityChunk<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.label, self.start, self.end)
    }
}

impl<'a> From<(&'a str, usize, usize)> for EntityChunk<'a> {
    fn from(value: (&'a str, usize, usize)) -> Self {
        EntityChunk::new(Cow::Borrowed(value.0), value.1, value.2)
    }
}

/// Anything that can be compared as a `(label, start, end)` triple. The aligner works on this
/// trait so that annotations produced outside of this crate can be aligned without conversion.
pub trait LabeledSpan {
    fn label(&self) -> &str;
    fn start(&self) -> usize;
    fn end(&self) -> usize;
}

impl<'a> LabeledSpan for EntityChunk<'a> {
    fn label(&self) -> &str {
        &self.label
    }
    fn start(&self) -> usize {
        self.start
    }
    fn end(&self) -> usize {
        self.end
    }
}

impl<T: LabeledSpan + ?Sized> LabeledSpan for &T {
    fn label(&self) -> &str {
        (**self).label()
    }
    fn start(&self) -> usize {
        (**self).start()
    }
    fn end(&self) -> usize {
        (**self).end()
    }
}

/// The set of distinct chunks found in a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Chunks<'a>(AHashSet<EntityChunk<'a>>);

impl<'a> Deref for Chunks<'a> {
    type Target = AHashSet<EntityChunk<'a>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl<'a> DerefMut for Chunks<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<'a> IntoIterator for Chunks<'a> {
    type Item = EntityChunk<'a>;
    type IntoIter = <AHashSet<EntityChunk<'a>> as IntoIterator>::IntoIter;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> FromIterator<EntityChunk<'a>> for Chunks<'a> {
    fn from_iter<T: IntoIterator<Item = EntityChunk<'a>>>(iter: T) -> Self {
        Chunks(AHashSet::from_iter(iter))
    }
}

impl<'a> Extend<EntityChunk<'a>> for Chunks<'a> {
    fn extend<T: IntoIterator<Item = EntityChunk<'a>>>(&mut self, iter: T) {
        self.0.extend(iter)
    }
}

impl<'a> Chunks<'a> {
    /// Returns the chunks with the given label.
    ///
    /// * `label`: Only the chunks whose label is equal to `label` are kept.
    pub fn filter<S: AsRef<str>>(&self, label: S) -> AHashSet<&EntityChunk<'a>> {
        let label_ref = label.as_ref();
        self.iter().filter(|c| c.label == label_ref).collect()
    }

    pub fn labels(&self) -> AHashSet<&str> {
        self.iter().map(|c| c.label.as_ref()).collect()
    }

    /// Chunks in document order: by start, then end, then label. This is the order the aligner
    /// expects when the chunks come from a set.
    pub fn into_sorted_vec(self) -> Vec<EntityChunk<'a>> {
        self.0
            .into_iter()
            .sorted_by(|a, b| (a.start, a.end, &a.label).cmp(&(b.start, b.end, &b.label)))
            .collect()
    }
}
