use crate::segmenter::{
    base_tokens, merge_abbreviations, merge_hyphenated, merge_terminal_runs, spans_to_bounds,
    split_tokens, Language, Segmenter,
};
use crate::span::Span;

const ABBREVIATIONS: [&str; 33] = [
    "Mr", "Mrs", "Ms", "Dr", "Prof", "Sr", "Jr", "St", "Mt", "vs", "etc", "e.g", "i.e", "Inc",
    "Ltd", "Co", "Corp", "Jan", "Feb", "Mar", "Apr", "Jun", "Jul", "Aug", "Sep", "Sept", "Oct",
    "Nov", "Dec", "No", "Fig", "al", "approx",
];

/// Contracted suffixes, split off the word they are glued to (`do` `n't`, `John` `'s`).
const CONTRACTIONS: [&str; 14] = [
    "n't", "n’t", "'s", "’s", "'re", "’re", "'ve", "’ve", "'ll", "’ll", "'d", "’d", "'m", "’m",
];

/// Segmenter for English text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct English;

fn contraction_offset(word: &str) -> Option<usize> {
    CONTRACTIONS.iter().find_map(|suffix| {
        let at = word.len().checked_sub(suffix.len())?;
        word.get(at..)
            .filter(|tail| tail.eq_ignore_ascii_case(suffix))
            .map(|_| at)
    })
}

impl Segmenter for English {
    fn language(&self) -> Language {
        Language::English
    }

    fn word_bounds(&self, text: &str) -> Vec<Span> {
        let tokens = base_tokens(text);
        let tokens = split_tokens(text, tokens, contraction_offset);
        let tokens = merge_abbreviations(text, tokens, &ABBREVIATIONS);
        let tokens = merge_terminal_runs(text, tokens);
        let tokens = merge_hyphenated(text, tokens, |_| false);
        spans_to_bounds(&tokens, text.len())
    }
}
