/// Text helpers shared by the scanners.
///
/// Phrase lists are matched on normalized text: control and zero-width characters are
/// dropped and letters are lowercased, so "Non\u{200B}-Commercial" still counts as a
/// disclaimer. Term lists compile to one case-insensitive, word-bounded regex whose matches
/// keep byte offsets into the original text.
use regex::{Regex, RegexBuilder};

use crate::error::AppError;

/// Lowercase and strip control / zero-width characters.
pub fn normalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if ch.is_control() {
            continue;
        }
        for lc in ch.to_lowercase() {
            match lc {
                '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' => {}
                _ => out.push(lc),
            }
        }
    }
    out
}

/// A list of literal phrases checked by substring containment.
#[derive(Debug, Clone, Default)]
pub struct PhraseList {
    phrases: Vec<String>,
}

impl PhraseList {
    pub fn new(phrases: &[String]) -> Self {
        let phrases = phrases
            .iter()
            .map(|p| normalize(p.trim()))
            .filter(|p| !p.is_empty())
            .collect();
        Self { phrases }
    }

    /// First phrase contained in `text`, if any.
    pub fn find_in(&self, text: &str) -> Option<&str> {
        if self.phrases.is_empty() {
            return None;
        }
        let haystack = normalize(text);
        self.phrases
            .iter()
            .find(|p| haystack.contains(p.as_str()))
            .map(String::as_str)
    }

    pub fn contained_in(&self, text: &str) -> bool {
        self.find_in(text).is_some()
    }
}

/// Compile literal terms into `(?i)\b(?:t1|t2|..)\b`, longest first. Inner whitespace in a
/// term matches any run of whitespace. An empty list compiles to `None`.
pub fn compile_terms(terms: &[String]) -> Result<Option<Regex>, AppError> {
    let mut terms: Vec<String> = terms
        .iter()
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
        .collect();
    if terms.is_empty() {
        return Ok(None);
    }
    terms.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    terms.dedup();

    let alternation = terms
        .iter()
        .map(|t| regex::escape(t).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(r"\b(?:{alternation})\b");
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|source| AppError::Policy { pattern, source })
}

/// Canonical spelling of a matched term: lowercase, single spaces.
pub fn canonical_term(matched: &str) -> String {
    matched
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Byte range of the window extending `radius` characters on each side of `start..end`,
/// clamped to the string bounds.
pub fn window_bounds(text: &str, start: usize, end: usize, radius: usize) -> (usize, usize) {
    let from = text[..start]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(start);
    let to = text[end..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());
    (from, to)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalize_drops_zero_width_and_lowercases() {
        assert_eq!(normalize("Non\u{200B}-Commercial\n"), "non-commercial");
    }

    #[test]
    fn phrase_list_matches_case_insensitively() {
        let list = PhraseList::new(&strings(&["Scientific Study", "  "]));
        assert_eq!(list.find_in("A SCIENTIFIC STUDY found"), Some("scientific study"));
        assert!(!list.contained_in("a study"));
        assert!(!PhraseList::default().contained_in("anything"));
    }

    #[test]
    fn compiled_terms_respect_word_boundaries() {
        let re = compile_terms(&strings(&["sale", "order now"])).unwrap().unwrap();
        assert!(re.is_match("Big SALE today"));
        assert!(!re.is_match("wholesale prices"));
        assert!(re.is_match("order \n now"));
        assert!(compile_terms(&strings(&["", "  "])).unwrap().is_none());
    }

    #[test]
    fn test_canonical_term() {
        assert_eq!(canonical_term("Order \t NOW"), "order now");
    }

    #[test]
    fn window_is_clamped_and_char_based() {
        let text = "abcdefghij";
        assert_eq!(window_bounds(text, 4, 5, 2), (2, 7));
        assert_eq!(window_bounds(text, 0, 1, 50), (0, 10));

        let text = "ééé offer ééé";
        let start = text.find("offer").unwrap();
        let (from, to) = window_bounds(text, start, start + 5, 2);
        assert_eq!(&text[from..to], "é offer é");
    }
}
