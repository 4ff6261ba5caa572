/**
This module turns a single column of IOB2 tags into the set of chunks it encodes.
*/
use crate::config::{resolve_column, ConfigurationError};
use crate::entity::{Chunks, EntityChunk};
use std::borrow::Cow;
use std::fmt::Display;
use thiserror::Error;
use tracing::debug;

/// A tag value that is neither `O`, `B-<label>` nor `I-<label>`. It holds the offending value.
#[derive(Debug, Error, Clone, PartialEq, Eq, Hash)]
#[error("malformed tag {0:?}: expected \"O\", \"B-<label>\" or \"I-<label>\"")]
pub struct TagFormatError(pub String);

/// A parsed IOB2 tag. The payload of `Inside` is kept for reporting only, it never takes part in
/// chunk compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag<'a> {
    Outside,
    Begin(&'a str),
    Inside(&'a str),
}

impl<'a> TryFrom<&'a str> for Tag<'a> {
    type Error = TagFormatError;
    fn try_from(value: &'a str) -> Result<Self, Self::Error> {
        if value == "O" {
            return Ok(Tag::Outside);
        }
        if let Some(label) = value.strip_prefix("B-") {
            if !label.is_empty() {
                return Ok(Tag::Begin(label));
            }
        } else if let Some(payload) = value.strip_prefix("I-") {
            return Ok(Tag::Inside(payload));
        }
        Err(TagFormatError(String::from(value)))
    }
}

impl Display for Tag<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tag::Outside => write!(f, "O"),
            Tag::Begin(label) => write!(f, "B-{}", label),
            Tag::Inside(payload) => write!(f, "I-{}", payload),
        }
    }
}

/// State of the left-to-right scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState<'a> {
    Outside,
    InChunk { label: &'a str, start: usize },
}

impl<'a> ChunkState<'a> {
    /// Closes the open chunk, if any, at `end`.
    fn close(self, end: usize) -> Option<EntityChunk<'a>> {
        match self {
            ChunkState::Outside => None,
            ChunkState::InChunk { label, start } => {
                Some(EntityChunk::new(Cow::Borrowed(label), start, end))
            }
        }
    }
}

/// Compiles a sequence of IOB2 tags into its set of chunks.
///
/// `B-x` opens a chunk (closing the open one first), `O` closes the open chunk and `I-x` keeps
/// the current state whatever `x` is. An `I-x` tag found outside of any chunk opens nothing.
/// Identical chunks collapse into one.
///
/// ```rust
/// use chunkeval::{compile_chunks, EntityChunk};
///
/// let chunks = compile_chunks(&["B-PER", "I-PER", "O", "B-LOC", "O"]).unwrap();
/// assert_eq!(chunks.len(), 2);
/// assert!(chunks.contains(&EntityChunk::new("PER".into(), 0, 2)));
/// assert!(chunks.contains(&EntityChunk::new("LOC".into(), 3, 4)));
/// ```
pub fn compile_chunks<'a, I, S>(tags: I) -> Result<Chunks<'a>, TagFormatError>
where
    I: IntoIterator<Item = &'a S>,
    S: AsRef<str> + ?Sized + 'a,
{
    let mut chunks = Chunks::default();
    let mut state = ChunkState::Outside;
    let mut len = 0;
    for (index, raw) in tags.into_iter().enumerate() {
        len = index + 1;
        match Tag::try_from(raw.as_ref())? {
            Tag::Outside => {
                chunks.extend(state.close(index));
                state = ChunkState::Outside;
            }
            Tag::Begin(label) => {
                chunks.extend(state.close(index));
                state = ChunkState::InChunk {
                    label,
                    start: index,
                };
            }
            Tag::Inside(payload) => {
                if state == ChunkState::Outside {
                    debug!(index, payload, "inside tag outside of any chunk ignored");
                }
            }
        }
    }
    chunks.extend(state.close(len));
    Ok(chunks)
}

/// Errors raised when compiling a column of a token-by-field table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ColumnError {
    #[error(transparent)]
    Format(#[from] TagFormatError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Compiles the chunks of one column of a rectangular token-by-field table (one row per token).
/// Negative column indices address fields from the end, `-1` being the last one.
pub fn compile_column<'a, S: AsRef<str>>(
    rows: &'a [Vec<S>],
    column: isize,
) -> Result<Chunks<'a>, ColumnError> {
    let Some(first) = rows.first() else {
        return Ok(Chunks::default());
    };
    let width = first.len();
    let index = resolve_column(column, width)?;
    for (row_index, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(ConfigurationError::RaggedTable {
                row: row_index,
                expected: width,
                found: row.len(),
            }
            .into());
        }
    }
    Ok(compile_chunks(rows.iter().map(|row| &row[index]))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{QuickCheck, TestResult};
    use rstest::rstest;

    fn chunk(label: &'static str, start: usize, end: usize) -> EntityChunk<'static> {
        EntityChunk::new(Cow::Borrowed(label), start, end)
    }

    #[test]
    fn test_compile_chunks_simple_sentence() {
        let tags = vec!["B-PER", "I-PER", "O", "B-LOC", "O"];
        let actual = compile_chunks(&tags).unwrap();
        let expected = Chunks::from_iter([chunk("PER", 0, 2), chunk("LOC", 3, 4)]);
        assert_eq!(actual, expected);
    }

    #[rstest]
    #[case(vec!["B-PER", "B-PER"], vec![("PER", 0, 1), ("PER", 1, 2)])]
    #[case(vec!["O", "B-LOC", "I-LOC"], vec![("LOC", 1, 3)])]
    #[case(vec!["B-ORG"], vec![("ORG", 0, 1)])]
    #[case(vec!["I-PER", "I-PER", "O"], vec![])]
    #[case(vec!["O", "O"], vec![])]
    #[case(vec![], vec![])]
    fn test_compile_chunks_cases(
        #[case] tags: Vec<&'static str>,
        #[case] expected: Vec<(&'static str, usize, usize)>,
    ) {
        let actual = compile_chunks(&tags).unwrap();
        let expected = Chunks::from_iter(expected.into_iter().map(|(l, s, e)| chunk(l, s, e)));
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_inside_payload_is_ignored() {
        let tags = vec!["B-PER", "I-LOC", "I-ORG", "O"];
        let actual = compile_chunks(&tags).unwrap();
        assert_eq!(actual, Chunks::from_iter([chunk("PER", 0, 3)]));
    }

    #[rstest]
    #[case("X-PER")]
    #[case("B-")]
    #[case("BPER")]
    #[case("o")]
    #[case("")]
    fn test_compile_chunks_malformed_tag(#[case] bad: &'static str) {
        let tags = vec!["B-PER", bad, "O"];
        let actual = compile_chunks(&tags);
        assert_eq!(actual, Err(TagFormatError(String::from(bad))));
    }

    #[test]
    fn test_tag_display_round_trips() {
        for raw in ["O", "B-PER", "I-LOC"] {
            assert_eq!(Tag::try_from(raw).unwrap().to_string(), raw);
        }
    }

    #[test]
    fn test_compile_column_negative_index() {
        let rows = vec![
            vec!["Jean", "B-PER", "B-PER"],
            vec!["Dupont", "I-PER", "I-PER"],
            vec!["habite", "O", "O"],
            vec!["Paris", "B-LOC", "B-ORG"],
        ];
        let reference = compile_column(&rows, -2).unwrap();
        let tagging = compile_column(&rows, 2).unwrap();
        assert_eq!(
            reference,
            Chunks::from_iter([chunk("PER", 0, 2), chunk("LOC", 3, 4)])
        );
        assert_eq!(
            tagging,
            Chunks::from_iter([chunk("PER", 0, 2), chunk("ORG", 3, 4)])
        );
    }

    #[test]
    fn test_compile_column_errors() {
        let rows = vec![vec!["Jean", "B-PER"], vec!["Dupont"]];
        assert_eq!(
            compile_column(&rows, -1),
            Err(ColumnError::Configuration(ConfigurationError::RaggedTable {
                row: 1,
                expected: 2,
                found: 1
            }))
        );
        let rows = vec![vec!["Jean", "B-PER"]];
        assert!(matches!(
            compile_column(&rows, -3),
            Err(ColumnError::Configuration(
                ConfigurationError::ColumnOutOfRange { .. }
            ))
        ));
        let rows = vec![vec!["Jean", "PER"]];
        assert_eq!(
            compile_column(&rows, -1),
            Err(ColumnError::Format(TagFormatError(String::from("PER"))))
        );
        let rows: Vec<Vec<&str>> = vec![];
        assert!(compile_column(&rows, 5).unwrap().is_empty());
    }

    #[derive(Debug, Clone)]
    struct TagColumn(Vec<String>);

    impl quickcheck::Arbitrary for TagColumn {
        fn arbitrary(g: &mut quickcheck::Gen) -> Self {
            let choices = ["O", "B-PER", "I-PER", "B-LOC", "I-LOC", "I-ORG"];
            let len = usize::arbitrary(g) % 30;
            TagColumn(
                (0..len)
                    .map(|_| String::from(*g.choose(&choices).unwrap()))
                    .collect(),
            )
        }
    }

    #[test]
    fn test_compile_chunks_is_idempotent() {
        fn prop(column: TagColumn) -> TestResult {
            let first = compile_chunks(&column.0).unwrap();
            let second = compile_chunks(&column.0).unwrap();
            TestResult::from_bool(first == second)
        }
        QuickCheck::new()
            .tests(500)
            .quickcheck(prop as fn(TagColumn) -> TestResult);
    }

    #[test]
    fn test_compiled_chunks_are_well_formed() {
        fn prop(column: TagColumn) -> TestResult {
            let chunks = compile_chunks(&column.0).unwrap();
            let begins = column.0.iter().filter(|t| t.starts_with("B-")).count();
            let well_formed = chunks.iter().all(|c| {
                c.start() < c.end()
                    && c.end() <= column.0.len()
                    && column.0[c.start()] == format!("B-{}", c.label())
            });
            TestResult::from_bool(well_formed && chunks.len() == begins)
        }
        QuickCheck::new()
            .tests(500)
            .quickcheck(prop as fn(TagColumn) -> TestResult);
    }
}
