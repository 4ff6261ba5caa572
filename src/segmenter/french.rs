use crate::segmenter::{
    base_tokens, merge_abbreviations, merge_hyphenated, merge_terminal_runs, spans_to_bounds,
    split_tokens, Language, Segmenter,
};
use crate::span::Span;

const ABBREVIATIONS: [&str; 22] = [
    "M", "MM", "Mme", "Mmes", "Mlle", "Mlles", "Dr", "Me", "Mgr", "Pr", "St", "Ste", "cf",
    "etc", "av", "apr", "env", "ex", "p", "pp", "vol", "chap",
];

/// Elided words, split right after their apostrophe (`l'` `homme`).
const ELISIONS: [&str; 13] = [
    "l", "d", "j", "m", "n", "s", "t", "c", "qu", "jusqu", "lorsqu", "puisqu", "quoiqu",
];

/// Pronouns that may follow a verb through a hyphen (`dit-elle`, `donne-le-moi`). `t` is the
/// euphonic letter of `a-t-il`.
const CLITICS: [&str; 20] = [
    "je", "tu", "il", "elle", "on", "nous", "vous", "ils", "elles", "ce", "le", "la", "les",
    "lui", "leur", "moi", "toi", "y", "en", "t",
];

/// Segmenter for French text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct French;

fn elision_offset(word: &str) -> Option<usize> {
    ELISIONS.iter().find_map(|prefix| {
        let head = word.get(..prefix.len())?;
        if !head.eq_ignore_ascii_case(prefix) {
            return None;
        }
        let rest = &word[prefix.len()..];
        let apostrophe = rest.chars().next().filter(|c| matches!(c, '\'' | '’'))?;
        Some(prefix.len() + apostrophe.len_utf8())
    })
}

fn is_clitic(word: &str) -> bool {
    let lowered = word.to_lowercase();
    CLITICS.contains(&lowered.as_str())
}

impl Segmenter for French {
    fn language(&self) -> Language {
        Language::French
    }

    fn word_bounds(&self, text: &str) -> Vec<Span> {
        let tokens = base_tokens(text);
        let tokens = split_tokens(text, tokens, elision_offset);
        let tokens = merge_abbreviations(text, tokens, &ABBREVIATIONS);
        let tokens = merge_terminal_runs(text, tokens);
        let tokens = merge_hyphenated(text, tokens, is_clitic);
        spans_to_bounds(&tokens, text.len())
    }

    fn closing_punctuation(&self) -> &'static [&'static str] {
        &[")", "]", "}", "»", "”", "’"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::tests::tokens_of;
    use rstest::rstest;

    #[rstest]
    #[case("l'homme", vec!["l'", "homme"])]
    #[case("L’école", vec!["L’", "école"])]
    #[case("jusqu'à demain", vec!["jusqu'", "à", "demain"])]
    #[case("aujourd'hui", vec!["aujourd'hui"])]
    #[case("a-t-il", vec!["a", "-t-il"])]
    #[case("dit-elle", vec!["dit", "-elle"])]
    #[case("donne-le-moi", vec!["donne", "-le-moi"])]
    #[case("Jean-Pierre et peut-être", vec!["Jean-Pierre", "et", "peut-être"])]
    #[case("M. Dupont et Mme Durand", vec!["M.", "Dupont", "et", "Mme", "Durand"])]
    #[case("« Bonjour », dit-il.", vec!["«", "Bonjour", "»", ",", "dit", "-il", "."])]
    fn test_french_tokens(#[case] text: &str, #[case] expected: Vec<&str>) {
        assert_eq!(tokens_of(Language::French, text), expected);
    }

    #[test]
    fn test_elision_offset() {
        assert_eq!(elision_offset("qu'il"), Some(3));
        assert_eq!(elision_offset("d’or"), Some(4));
        assert_eq!(elision_offset("dans"), None);
    }

    #[test]
    fn test_guillemets_close_the_sentence() {
        let text = "Il a dit : « Je pars. » Puis il est parti.";
        let segmentation = French.segment(text).unwrap();
        let first = segmentation.sentence_chars(0).unwrap();
        assert_eq!(&text[first.as_range()], "Il a dit : « Je pars. »");
        assert_eq!(segmentation.sentences().len(), 2);
    }
}
