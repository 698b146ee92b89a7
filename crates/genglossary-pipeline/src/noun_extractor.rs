//! Candidate-noun extraction ahead of LLM classification.
//!
//! [`NounExtractor`] is a narrow, pluggable collaborator -- same spirit as
//! [`genglossary_llm::LlmClient`] -- so the concrete tokenizer (a real NLP
//! library, a language-specific heuristic, ...) is swappable without
//! touching the Extract stage itself.

/// Produces candidate noun strings from a document's raw text.
pub trait NounExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Vec<String>;
}

/// A lightweight heuristic extractor: alphabetic tokens of at least
/// [`MIN_TOKEN_LEN`] characters, lowercased, de-duplicated in first-seen
/// order. Good enough to drive the pipeline end-to-end without a real
/// morphological analyzer wired in.
pub struct SimpleNounExtractor;

const MIN_TOKEN_LEN: usize = 4;

/// A small set of common English function words filtered out before terms
/// ever reach classification, so the LLM isn't asked to judge "the" or
/// "with" as a candidate glossary term.
const STOPWORDS: &[&str] = &[
    "this", "that", "these", "those", "with", "from", "into", "your", "their", "there",
    "which", "about", "other", "after", "before", "where", "while", "because", "should",
    "could", "would", "through", "between",
];

impl NounExtractor for SimpleNounExtractor {
    fn extract(&self, text: &str) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for raw_token in text.split(|c: char| !c.is_alphabetic()) {
            if raw_token.len() < MIN_TOKEN_LEN {
                continue;
            }
            let token = raw_token.to_lowercase();
            if STOPWORDS.contains(&token.as_str()) {
                continue;
            }
            if seen.insert(token.clone()) {
                out.push(token);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_deduplicated_lowercase_candidates() {
        let extractor = SimpleNounExtractor;
        let candidates = extractor.extract("The Widget connects to another Widget via a socket.");
        assert!(candidates.contains(&"widget".to_string()));
        assert!(candidates.contains(&"socket".to_string()));
        assert_eq!(candidates.iter().filter(|c| *c == "widget").count(), 1);
    }

    #[test]
    fn short_and_stop_words_are_dropped() {
        let extractor = SimpleNounExtractor;
        let candidates = extractor.extract("this is a small widget with a big socket");
        assert!(!candidates.contains(&"this".to_string()));
        assert!(!candidates.contains(&"a".to_string()));
        assert!(!candidates.contains(&"with".to_string()));
    }

    #[test]
    fn preserves_first_seen_order() {
        let extractor = SimpleNounExtractor;
        let candidates = extractor.extract("gizmo widget gizmo socket widget");
        assert_eq!(candidates, vec!["gizmo", "widget", "socket"]);
    }
}
