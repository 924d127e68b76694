/// Scientific-term annotation for supplement descriptions.
///
/// Descriptions stay plain text; recognized terms are reported as byte ranges with a tag so
/// the rendering side decides how to mark them up.
use std::collections::HashMap;

use regex::Regex;

use crate::error::AppError;

const BUILTIN_TERMS: &[(&str, &str)] = &[
    ("adaptogen", "botany"),
    ("antioxidant", "biochemistry"),
    ("bioavailability", "pharmacology"),
    ("cholecalciferol", "vitamin"),
    ("collagen", "protein"),
    ("cortisol", "hormone"),
    ("electrolyte", "physiology"),
    ("energy metabolism", "biochemistry"),
    ("fatty acid", "nutrition"),
    ("haemoglobin", "physiology"),
    ("inflammation", "physiology"),
    ("melatonin", "hormone"),
    ("microbiome", "microbiology"),
    ("mitochondrial", "cell biology"),
    ("neurotransmitter", "neuroscience"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub start: usize,
    pub end: usize,
    /// The term as written in the annotated text.
    pub term: String,
    pub tag: String,
}

/// Term -> tag dictionary compiled into a single case-insensitive matcher.
#[derive(Debug, Clone)]
pub struct TermGlossary {
    tags: HashMap<String, String>,
    pattern: Option<Regex>,
}

impl TermGlossary {
    /// Build a glossary from `(term, tag)` pairs. Terms are literal phrases; a trailing
    /// plural "s" in the text is accepted.
    pub fn new<I, T, G>(entries: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (T, G)>,
        T: Into<String>,
        G: Into<String>,
    {
        let mut tags = HashMap::new();
        for (term, tag) in entries {
            let term = term.into().trim().to_lowercase();
            if !term.is_empty() {
                tags.insert(term, tag.into());
            }
        }

        let pattern = if tags.is_empty() {
            None
        } else {
            // Longest first so multi-word terms win over their prefixes.
            let mut terms: Vec<&String> = tags.keys().collect();
            terms.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
            let alternation = terms
                .iter()
                .map(|t| regex::escape(t))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!(r"(?i)\b(?:{alternation})s?\b"))?)
        };

        Ok(Self { tags, pattern })
    }

    pub fn builtin() -> Result<Self, AppError> {
        Self::new(BUILTIN_TERMS.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Non-overlapping annotations in text order.
    pub fn annotate(&self, text: &str) -> Vec<Annotation> {
        let Some(pattern) = &self.pattern else {
            return Vec::new();
        };
        pattern
            .find_iter(text)
            .filter_map(|m| {
                let lower = m.as_str().to_lowercase();
                let tag = self
                    .tags
                    .get(&lower)
                    .or_else(|| lower.strip_suffix('s').and_then(|t| self.tags.get(t)))?;
                Some(Annotation {
                    start: m.start(),
                    end: m.end(),
                    term: m.as_str().to_string(),
                    tag: tag.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotates_terms_with_byte_offsets() {
        let glossary = TermGlossary::builtin().unwrap();
        let text = "Supports energy metabolism and Neurotransmitter synthesis.";
        let found = glossary.annotate(text);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].term, "energy metabolism");
        assert_eq!(found[0].tag, "biochemistry");
        assert_eq!(&text[found[1].start..found[1].end], "Neurotransmitter");
        assert_eq!(found[1].tag, "neuroscience");
    }

    #[test]
    fn accepts_plurals_and_respects_word_boundaries() {
        let glossary = TermGlossary::new([("adaptogen", "botany")]).unwrap();
        let found = glossary.annotate("Adaptogens are not adaptogenic by default.");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].term, "Adaptogens");
        assert_eq!((found[0].start, found[0].end), (0, 10));
    }

    #[test]
    fn prefers_longest_term() {
        let glossary =
            TermGlossary::new([("fatty acid", "nutrition"), ("fatty acid oxidation", "metabolism")])
                .unwrap();
        let found = glossary.annotate("Fatty acid oxidation happens in mitochondria.");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tag, "metabolism");
    }

    #[test]
    fn empty_glossary_annotates_nothing() {
        let glossary = TermGlossary::new(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(glossary.len(), 0);
        assert!(glossary.annotate("cortisol").is_empty());
    }

    #[test]
    fn handles_multibyte_text() {
        let glossary = TermGlossary::builtin().unwrap();
        let text = "Réduit le cortisol après l’effort.";
        let found = glossary.annotate(text);
        assert_eq!(found.len(), 1);
        assert_eq!(&text[found[0].start..found[0].end], "cortisol");
    }
}
