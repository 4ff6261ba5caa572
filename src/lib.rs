/*!
This library evaluates chunk annotations, such as named entities, against a reference. It covers
the whole chain going from raw text to scores:

* segmentation of raw text into tokens, sentences and paragraphs (`Segmenter`), with a segmenter
    for English and one for French,
* compilation of IOB2 tag columns into sets of chunks (`compile_chunks`),
* projection of token-index chunks into character offsets (`SpanProjector`),
* greedy alignment of two independently produced annotation sets (`align`),
* precision, recall and F-measure per label, micro and macro averaged (`classification_report`).

# Terminology
* A span is a half-open interval `[lb, ub)`. Its unit depends on the layer it belongs to:
    characters (byte offsets into the text) for tokens, paragraphs and projected chunks, token
    indices for sentences and compiled chunks.
* A chunk is a labeled span, `(label, start, end)`. Two chunks with the same value are the same
    chunk.
* A tag column is a list of IOB2 tags, one per token: `O` outside any chunk, `B-<label>` at the
    first token of a chunk, `I-<label>` inside a chunk. The label of an inside tag is not checked.
* Silence is a reference chunk left unmatched (a false negative), noise is a hypothesis chunk left
    unmatched (a false positive).

# Scores
For every label, `ok` counts the chunks found in both the reference and the hypothesis, `gold` the
chunks of the reference and `guess` the chunks of the hypothesis. Precision is `100·ok/guess`,
recall `100·ok/gold`, and the F-measure `2·P·R/(P+R)`; each of them is 0 when its denominator is
0. The micro-average pools the counts of every label, the macro-average takes the mean of the
precisions and the mean of the recalls, then computes the F-measure from those two means.
*/

mod align;
mod config;
mod entity;
mod metrics;
mod reporter;
mod segmenter;
mod span;

// The public api starts here
pub use align::{align, Alignment, AlignmentCategory};

pub use config::{
    resolve_column, resolve_field, select_layer, AnnotationLayer, ConfigurationError, EvalConfig,
    EvalConfigBuilder, FieldSelector, ReportFormat,
};

pub use entity::{
    compile_chunks, compile_column, Chunks, ColumnError, EntityChunk, LabeledSpan, Tag,
    TagFormatError,
};

pub use metrics::{
    classification_report, macro_average, precision_recall_fscore, ComputationError, Counts,
    LabelCounts, Metric, Scores,
};

pub use reporter::{Average, AverageParsingError, LabelMetrics, Reporter};

pub use segmenter::{
    English, French, Language, Layer, Segmentation, SegmentationError, Segmenter,
    UnknownLanguage,
};

pub use span::{
    bounds_to_spans, cuts_to_spans, BoundsError, Span, SpanFormatError, SpanProjector,
};

use tracing::{debug, info};

/// Main entrypoint for tag columns. The corpus is a list of sentences, each sentence being a
/// token-by-field table (one row per token). The reference and hypothesis tags are read from the
/// fields selected in `config`; fields selected by name are looked up in `header`. Chunks are
/// compared sentence by sentence.
///
/// ```rust
/// use chunkeval::{evaluate_columns, EvalConfig};
///
/// let corpus = vec![
///     vec![
///         vec!["Jean", "B-PER", "B-PER"],
///         vec!["Dupont", "I-PER", "I-PER"],
///         vec!["habite", "O", "O"],
///         vec!["Paris", "B-LOC", "O"],
///     ],
/// ];
/// let reporter = evaluate_columns(&corpus, None, &EvalConfig::default()).unwrap();
/// assert_eq!(reporter.get("PER").unwrap().fscore, 100.0);
/// assert_eq!(reporter.get("LOC").unwrap().recall, 0.0);
/// ```
pub fn evaluate_columns<S: AsRef<str>>(
    corpus: &[Vec<Vec<S>>],
    header: Option<&[S]>,
    config: &EvalConfig,
) -> Result<Reporter, ComputationError> {
    let mut counts = Counts::default();
    for (index, sentence) in corpus.iter().enumerate() {
        let Some(first) = sentence.first() else {
            continue;
        };
        let width = first.len();
        let reference_column = resolve_field(config.reference_field(), header, width)?;
        let tagging_column = resolve_field(config.tagging_field(), header, width)?;
        let reference = compile_column(sentence, reference_column as isize)?;
        let hypothesis = compile_column(sentence, tagging_column as isize)?;
        debug!(
            sentence = index,
            reference = reference.len(),
            hypothesis = hypothesis.len(),
            "sentence compiled"
        );
        counts.add_chunk_sets(&reference, &hypothesis);
    }
    info!(
        sentences = corpus.len(),
        labels = counts.len(),
        "tag columns evaluated"
    );
    Ok(classification_report(&counts))
}

/// Main entrypoint for annotation sets produced independently, over the same character offsets.
/// The sets are aligned, and the scores computed from the alignment.
pub fn evaluate_documents<T: LabeledSpan>(
    reference: Vec<T>,
    hypothesis: Vec<T>,
) -> (Alignment<T>, Reporter) {
    let alignment = align(reference, hypothesis);
    let reporter = classification_report(&alignment.counts());
    info!(
        correct = alignment.len(AlignmentCategory::Correct),
        silence = alignment.silence().len(),
        noise = alignment.noise().len(),
        "documents evaluated"
    );
    (alignment, reporter)
}

/// Segments `text` with the segmenter of the configured language, tags every sentence with
/// `tagger` and returns the resulting chunks in character offsets, in document order. The tagger
/// receives the token texts of a sentence and must return one IOB2 tag per token.
pub fn annotate_text<F>(
    text: &str,
    config: &EvalConfig,
    mut tagger: F,
) -> Result<(Segmentation, Vec<EntityChunk<'static>>), ComputationError>
where
    F: FnMut(&[&str]) -> Vec<String>,
{
    let segmentation = config.language().segmenter().segment(text)?;
    let mut annotations = Vec::new();
    for index in 0..segmentation.sentences().len() {
        let tokens: Vec<&str> = segmentation
            .sentence_tokens(index)
            .unwrap_or_default()
            .iter()
            .map(|t| &text[t.as_range()])
            .collect();
        let tags = tagger(&tokens);
        if tags.len() != tokens.len() {
            return Err(ConfigurationError::RaggedTable {
                row: index,
                expected: tokens.len(),
                found: tags.len(),
            }
            .into());
        }
        let chunks = compile_chunks(&tags)?.into_sorted_vec();
        let projected = segmentation.project_sentence_chunks(index, chunks)?;
        annotations.extend(projected.into_iter().map(EntityChunk::into_owned));
    }
    info!(
        language = %config.language(),
        tokens = segmentation.tokens().len(),
        sentences = segmentation.sentences().len(),
        chunks = annotations.len(),
        "text annotated"
    );
    Ok((segmentation, annotations))
}
