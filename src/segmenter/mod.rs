/*!
Segmentation of raw text into three layers of spans: tokens, sentences and paragraphs.

The units of the layers differ:
* token spans are in **character** units (byte offsets into the UTF-8 text),
* sentence spans are in **token-index** units,
* paragraph spans are back in **character** units.

Tokens never contain whitespace and together cover every non-whitespace character of the text,
so joining the token texts gives back the text stripped of its whitespace.
*/
use crate::entity::EntityChunk;
use crate::span::{bounds_to_spans, BoundsError, Span, SpanFormatError, SpanProjector};
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

mod english;
mod french;

pub use english::English;
pub use french::French;

/// Languages with a dedicated segmenter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Sequence, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    French,
}

impl Language {
    pub fn segmenter(self) -> Box<dyn Segmenter> {
        match self {
            Language::English => Box::new(English),
            Language::French => Box::new(French),
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::French => "fr",
        }
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("no segmenter for language {0:?}")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "fr" | "french" | "français" | "francais" => Ok(Language::French),
            _ => Err(UnknownLanguage(String::from(s))),
        }
    }
}

/// Name of a span layer, used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Sequence)]
pub enum Layer {
    Token,
    Sentence,
    Paragraph,
}

impl Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Layer::Token => "token",
            Layer::Sentence => "sentence",
            Layer::Paragraph => "paragraph",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SegmentationError {
    #[error(transparent)]
    Format(#[from] SpanFormatError),
    #[error("{layer} span #{position} does not line up with the layer beneath it")]
    Misaligned { layer: Layer, position: usize },
}

/// Language-specific segmentation. Implementors provide the word bounds; sentence and paragraph
/// bounds have default implementations driven by the punctuation hooks.
pub trait Segmenter {
    fn language(&self) -> Language;

    /// Bounds between tokens, in character units. Each bound covers the whitespace separating two
    /// tokens (empty when the tokens are glued, like `do` and `n't`), the first and last bounds
    /// cover the leading and trailing whitespace.
    fn word_bounds(&self, text: &str) -> Vec<Span>;

    /// Sentence cut points, in **token-index** units.
    fn sentence_bounds(&self, text: &str, tokens: &[Span]) -> Vec<Span> {
        default_sentence_bounds(self, text, tokens)
    }

    /// Paragraph cut points, in **character** units, from `0` to `text.len()`.
    fn paragraph_bounds(&self, text: &str, sentences: &[Span], tokens: &[Span]) -> Vec<Span> {
        default_paragraph_bounds(text, sentences, tokens)
    }

    /// Tokens that end a sentence.
    fn is_terminal(&self, token: &str) -> bool {
        !token.is_empty() && token.chars().all(|c| matches!(c, '.' | '!' | '?' | '…'))
    }

    /// Closing brackets and quotes that stay with the sentence they follow, even when separated
    /// from it by a space.
    fn closing_punctuation(&self) -> &'static [&'static str] {
        &[")", "]", "}", "”", "’"]
    }

    /// Computes the three span layers of `text`.
    fn segment(&self, text: &str) -> Result<Segmentation, SegmentationError> {
        let tokens = bounds_to_spans(&self.word_bounds(text))?;
        let sentences = bounds_to_spans(&self.sentence_bounds(text, &tokens))?;
        let paragraphs = bounds_to_spans(&self.paragraph_bounds(text, &sentences, &tokens))?;
        let segmentation = Segmentation::new(tokens, sentences, paragraphs, text.len());
        segmentation.validate()?;
        Ok(segmentation)
    }
}

/// The three span layers of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segmentation {
    tokens: Vec<Span>,
    sentences: Vec<Span>,
    paragraphs: Vec<Span>,
    text_len: usize,
}

impl Segmentation {
    /// Builds a segmentation from its layers. An empty paragraph layer stands for a single
    /// paragraph covering the whole document.
    pub fn new(
        tokens: Vec<Span>,
        sentences: Vec<Span>,
        mut paragraphs: Vec<Span>,
        text_len: usize,
    ) -> Self {
        if paragraphs.is_empty() {
            paragraphs.push(Span::point(0).with_ub(text_len));
        }
        Segmentation {
            tokens,
            sentences,
            paragraphs,
            text_len,
        }
    }

    pub fn tokens(&self) -> &[Span] {
        &self.tokens
    }

    pub fn sentences(&self) -> &[Span] {
        &self.sentences
    }

    pub fn paragraphs(&self) -> &[Span] {
        &self.paragraphs
    }

    pub fn text_len(&self) -> usize {
        self.text_len
    }

    pub fn token_texts<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.tokens.iter().map(|s| &text[s.as_range()]).collect()
    }

    /// Token spans of the `index`-th sentence.
    pub fn sentence_tokens(&self, index: usize) -> Option<&[Span]> {
        self.sentences
            .get(index)
            .and_then(|s| self.tokens.get(s.as_range()))
    }

    /// Character span of the `index`-th sentence.
    pub fn sentence_chars(&self, index: usize) -> Result<Span, BoundsError> {
        let sentence = self.sentences.get(index).copied().unwrap_or_default();
        SpanProjector::new(&self.tokens).project(sentence)
    }

    /// Projects chunks whose offsets are token indices local to the `index`-th sentence into
    /// character offsets of the document.
    pub fn project_sentence_chunks<'c, I>(
        &self,
        index: usize,
        chunks: I,
    ) -> Result<Vec<EntityChunk<'c>>, BoundsError>
    where
        I: IntoIterator<Item = EntityChunk<'c>>,
    {
        let sentence_tokens = self.sentence_tokens(index).unwrap_or_default();
        let projector = SpanProjector::new(sentence_tokens);
        chunks
            .into_iter()
            .map(|chunk| projector.project_chunk(&chunk))
            .collect()
    }

    /// Checks the layering: tokens lie in the text and do not overlap, sentences tile the token
    /// layer, paragraphs tile the text and only break where a sentence starts.
    pub fn validate(&self) -> Result<(), SegmentationError> {
        for (position, pair) in self.tokens.windows(2).enumerate() {
            if pair[0].ub() > pair[1].lb() {
                return Err(SegmentationError::Misaligned {
                    layer: Layer::Token,
                    position: position + 1,
                });
            }
        }
        if self.tokens.last().is_some_and(|t| t.ub() > self.text_len) {
            return Err(SegmentationError::Misaligned {
                layer: Layer::Token,
                position: self.tokens.len() - 1,
            });
        }
        check_tiling(&self.sentences, self.tokens.len(), Layer::Sentence)?;
        check_tiling(&self.paragraphs, self.text_len, Layer::Paragraph)?;
        let projector = SpanProjector::new(&self.tokens);
        let sentence_starts: Vec<usize> = self
            .sentences
            .iter()
            .filter_map(|s| projector.project(*s).ok())
            .map(|s| s.lb())
            .collect();
        for (position, paragraph) in self.paragraphs.iter().enumerate().skip(1) {
            if sentence_starts.binary_search(&paragraph.lb()).is_err() {
                return Err(SegmentationError::Misaligned {
                    layer: Layer::Paragraph,
                    position,
                });
            }
        }
        Ok(())
    }
}

/// Spans must be contiguous, start at 0 and end at `end`. An empty layer tiles an empty range.
fn check_tiling(spans: &[Span], end: usize, layer: Layer) -> Result<(), SegmentationError> {
    let mut expected_lb = 0;
    for (position, span) in spans.iter().enumerate() {
        if span.lb() != expected_lb {
            return Err(SegmentationError::Misaligned { layer, position });
        }
        expected_lb = span.ub();
    }
    if expected_lb != end {
        return Err(SegmentationError::Misaligned {
            layer,
            position: spans.len(),
        });
    }
    Ok(())
}

/// Characters of `text` covered by `span`.
fn slice<'t>(text: &'t str, span: &Span) -> &'t str {
    &text[span.as_range()]
}

/// Cuts the text on Unicode word boundaries and drops whitespace. A boundary segment never mixes
/// whitespace with other characters, except for marks attached to a space, which are kept as
/// their own token.
pub(crate) fn base_tokens(text: &str) -> Vec<Span> {
    let mut tokens = Vec::new();
    for (offset, piece) in text.split_word_bound_indices() {
        let mut start = None;
        for (i, c) in piece.char_indices() {
            match (c.is_whitespace(), start) {
                (false, None) => start = Some(i),
                (true, Some(lb)) => {
                    tokens.push(Span::point(offset + lb).with_ub(offset + i));
                    start = None;
                }
                _ => (),
            }
        }
        if let Some(lb) = start {
            tokens.push(Span::point(offset + lb).with_ub(offset + piece.len()));
        }
    }
    tokens
}

/// Inverse of `bounds_to_spans` for token spans covering part of a text of length `len`.
pub(crate) fn spans_to_bounds(tokens: &[Span], len: usize) -> Vec<Span> {
    let mut bounds = Vec::with_capacity(tokens.len() + 1);
    let mut previous_ub = 0;
    for token in tokens {
        bounds.push(Span::point(previous_ub).with_ub(token.lb()));
        previous_ub = token.ub();
    }
    bounds.push(Span::point(previous_ub).with_ub(len));
    bounds
}

/// Splits tokens where `split_at` says so. `split_at` returns the offset, relative to the token,
/// of the split; the second part is examined again.
pub(crate) fn split_tokens<F>(text: &str, tokens: Vec<Span>, split_at: F) -> Vec<Span>
where
    F: Fn(&str) -> Option<usize>,
{
    let mut result = Vec::with_capacity(tokens.len());
    for token in tokens {
        let mut current = token;
        while let Some(at) =
            split_at(slice(text, &current)).filter(|at| *at > 0 && *at < current.len())
        {
            let cut = current.lb() + at;
            result.push(Span::point(current.lb()).with_ub(cut));
            current = Span::point(cut).with_ub(current.ub());
        }
        result.push(current);
    }
    result
}

/// Glues a `.` token to the token before it when that token is a known abbreviation, a single
/// capital letter (an initial) or a dotted acronym such as `U.S`.
pub(crate) fn merge_abbreviations(
    text: &str,
    tokens: Vec<Span>,
    abbreviations: &[&str],
) -> Vec<Span> {
    let is_abbreviation = |word: &str| {
        let mut chars = word.chars();
        let initial = matches!((chars.next(), chars.next()), (Some(c), None) if c.is_uppercase());
        let acronym = word.contains('.')
            && word.chars().any(char::is_alphabetic)
            && word.chars().all(|c| c == '.' || c.is_alphabetic());
        initial || acronym || abbreviations.contains(&word)
    };
    merge_pairs(tokens, |left, right| {
        left.ub() == right.lb() && slice(text, right) == "." && is_abbreviation(slice(text, left))
    })
}

/// Glues runs of terminal punctuation (`...`, `?!`) into one token.
pub(crate) fn merge_terminal_runs(text: &str, tokens: Vec<Span>) -> Vec<Span> {
    let is_run = |span: &Span| {
        slice(text, span)
            .chars()
            .all(|c| matches!(c, '.' | '!' | '?' | '…'))
    };
    let mut result: Vec<Span> = Vec::with_capacity(tokens.len());
    for token in tokens {
        match result.last_mut() {
            Some(last) if last.ub() == token.lb() && is_run(&*last) && is_run(&token) => {
                *last = last.with_ub(token.ub());
            }
            _ => result.push(token),
        }
    }
    result
}

/// Merges each `left` token with its `right` neighbour when `should_merge` holds. A merged token is
/// not merged again.
fn merge_pairs<F>(tokens: Vec<Span>, should_merge: F) -> Vec<Span>
where
    F: Fn(&Span, &Span) -> bool,
{
    let mut result = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter().peekable();
    while let Some(token) = iter.next() {
        match iter.peek() {
            Some(next) if should_merge(&token, next) => {
                result.push(token.with_ub(next.ub()));
                iter.next();
            }
            _ => result.push(token),
        }
    }
    result
}

/// Joins hyphenated compounds (`state-of-the-art`, `Jean-Pierre`) into a single token. When the
/// trailing words of a compound are all clitics, they are kept apart as one token starting with
/// the hyphen (`a` `-t-il`).
pub(crate) fn merge_hyphenated<F>(text: &str, tokens: Vec<Span>, is_clitic: F) -> Vec<Span>
where
    F: Fn(&str) -> bool,
{
    let is_word = |span: &Span| slice(text, span).chars().all(char::is_alphanumeric);
    let glued = |a: &Span, b: &Span| a.ub() == b.lb();
    let mut result = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if !is_word(&tokens[i]) {
            result.push(tokens[i]);
            i += 1;
            continue;
        }
        // Collect `word (- word)*`.
        let mut last = i;
        while last + 2 < tokens.len()
            && slice(text, &tokens[last + 1]) == "-"
            && glued(&tokens[last], &tokens[last + 1])
            && glued(&tokens[last + 1], &tokens[last + 2])
            && is_word(&tokens[last + 2])
        {
            last += 2;
        }
        if last == i {
            result.push(tokens[i]);
            i += 1;
            continue;
        }
        let words: Vec<usize> = (i..=last).step_by(2).collect();
        let clitic_tail = (1..words.len())
            .find(|k| words[*k..].iter().all(|w| is_clitic(slice(text, &tokens[*w]))));
        match clitic_tail {
            Some(k) => {
                result.push(tokens[i].with_ub(tokens[words[k - 1]].ub()));
                result.push(tokens[words[k] - 1].with_ub(tokens[last].ub()));
            }
            None => result.push(tokens[i].with_ub(tokens[last].ub())),
        }
        i = last + 1;
    }
    result
}

/// Quotes that may open as well as close: they only stay with the previous sentence when glued
/// to it.
const AMBIGUOUS_QUOTES: [&str; 2] = ["\"", "'"];

fn newlines(text: &str) -> usize {
    text.matches('\n').count()
}

fn default_sentence_bounds<S: Segmenter + ?Sized>(
    segmenter: &S,
    text: &str,
    tokens: &[Span],
) -> Vec<Span> {
    let closing = segmenter.closing_punctuation();
    let is_closing = |index: usize| {
        let token = slice(text, &tokens[index]);
        closing.contains(&token)
            || (index > 0
                && AMBIGUOUS_QUOTES.contains(&token)
                && tokens[index - 1].ub() == tokens[index].lb())
    };
    let mut bounds = vec![Span::point(0)];
    let mut after_terminal = false;
    for i in 0..tokens.len() {
        let token = slice(text, &tokens[i]);
        if segmenter.is_terminal(token) {
            after_terminal = true;
        } else if !(after_terminal && is_closing(i)) {
            after_terminal = false;
        }
        let Some(next) = tokens.get(i + 1) else {
            break;
        };
        let blank_line = newlines(&text[tokens[i].ub()..next.lb()]) >= 2;
        let starts_lower = slice(text, next)
            .chars()
            .next()
            .is_some_and(char::is_lowercase);
        let ends = after_terminal && !is_closing(i + 1) && !starts_lower;
        if blank_line || ends {
            bounds.push(Span::point(i + 1));
            after_terminal = false;
        }
    }
    if !tokens.is_empty() {
        bounds.push(Span::point(tokens.len()));
    }
    bounds
}

fn default_paragraph_bounds(text: &str, sentences: &[Span], tokens: &[Span]) -> Vec<Span> {
    let projector = SpanProjector::new(tokens);
    let sentence_chars: Vec<Span> = sentences
        .iter()
        .filter_map(|s| projector.project(*s).ok())
        .collect();
    let mut bounds = vec![Span::point(0)];
    for pair in sentence_chars.windows(2) {
        if newlines(&text[pair[0].ub()..pair[1].lb()]) >= 2 {
            bounds.push(Span::point(pair[1].lb()));
        }
    }
    if !text.is_empty() {
        bounds.push(Span::point(text.len()));
    }
    bounds
}
