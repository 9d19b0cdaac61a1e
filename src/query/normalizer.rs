use std::collections::HashSet;

use regex::Regex;

/// Canned response emitted for every matched special intent.
pub const RAISE_QUERY_SENTINEL: &str = "{{RAISE_QUERY}}";

/// Whole-word acronym expansions applied during normalization.
const ACRONYMS: &[(&str, &str)] = &[
    ("lpu", "lpu"),
    ("cse", "computer science engineering"),
    ("ece", "electronics and communication engineering"),
    ("ai", "artificial intelligence"),
    ("ml", "machine learning"),
];

/// Literal utterances routed to a canned response instead of retrieval.
/// Compared against the normalized form of the incoming query.
const SPECIAL_INTENT_LITERALS: &[&str] = &[
    "i want to raise a query",
    "can i raise a query",
    "can i raise a ticket",
    "can i connect to someone",
    "can i speak to the counsellor",
    "How can I track my application status?",
];

/// Pattern fallbacks for special-intent variations, searched against the raw
/// lowercased query after the literal check misses.
const SPECIAL_INTENT_PATTERNS: &[&str] = &[
    r"(raise|submit|create|open|file|log)\s+(a\s+)?(query|ticket|issue|concern|complaint|problem)",
    r"(connect|speak|talk|chat|communicate)\s+(to|with)\s+(a\s+)?(someone|counsellor|counselor|advisor|person|representative|agent|staff|support)",
    r"(need|want)\s+(to\s+)?(speak|talk|connect|chat|communicate)",
    r"is there (someone|anyone) i can (talk|speak|chat) (to|with)",
    r"(track|check|know|see|find out|get)\s+(my\s+)?(application|admission)\s+(status|progress|update)",
    r"(how|where)\s+(can|do|could|would|should|might)\s+(i|we)\s+(track|check|see|find|know)\s+(my|the)\s+(application|admission)",
    r"(where|how)\s+can\s+i\s+see\s+(the\s+)?(status|progress)\s+of\s+my\s+(application|admission)",
    r"(need|want)\s+to\s+(know|see|check)\s+(how|if)\s+my\s+(application|admission)\s+(is\s+)?(progressing|going|doing)",
];

const MEMORY_TRIGGERS: &[&str] = &[
    "previous question",
    "last question",
    "what did i ask",
    "what was my question",
    "my previous",
    "earlier question",
];

/// A closed set of special intents. New intents are new variants plus table
/// rows in [`QueryNormalizer::new`]; dispatch stays exhaustive-checkable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialIntent {
    RaiseQuery,
}

impl SpecialIntent {
    pub fn sentinel(&self) -> &'static str {
        match self {
            SpecialIntent::RaiseQuery => RAISE_QUERY_SENTINEL,
        }
    }
}

pub struct QueryNormalizer {
    acronyms: Vec<(Regex, &'static str)>,
    strip_punct: Regex,
    intent_literals: HashSet<String>,
    intent_patterns: Vec<(Regex, SpecialIntent)>,
}

impl QueryNormalizer {
    pub fn new() -> Self {
        let acronyms = ACRONYMS
            .iter()
            .map(|(acronym, full)| {
                let pattern = format!(r"\b{}\b", regex::escape(acronym));
                (Regex::new(&pattern).expect("static acronym pattern"), *full)
            })
            .collect();
        let strip_punct = Regex::new(r"[^\w\s]").expect("static pattern");
        let intent_patterns = SPECIAL_INTENT_PATTERNS
            .iter()
            .map(|pattern| {
                (
                    Regex::new(pattern).expect("static intent pattern"),
                    SpecialIntent::RaiseQuery,
                )
            })
            .collect();

        let mut normalizer = Self {
            acronyms,
            strip_punct,
            intent_literals: HashSet::new(),
            intent_patterns,
        };
        normalizer.intent_literals = SPECIAL_INTENT_LITERALS
            .iter()
            .map(|literal| normalizer.normalize(literal))
            .collect();
        normalizer
    }

    /// Lowercase, expand whole-word acronyms, collapse whitespace and strip
    /// punctuation. Idempotent; always returns a (possibly empty) string.
    pub fn normalize(&self, raw: &str) -> String {
        let mut processed = raw.to_lowercase().trim().to_string();
        for (pattern, full_form) in &self.acronyms {
            processed = pattern.replace_all(&processed, *full_form).into_owned();
        }
        let processed = self.strip_punct.replace_all(&processed, "");
        processed.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Exact match on the normalized form first, then pattern search over the
    /// raw lowercased query. First match wins.
    pub fn match_special_intent(&self, raw: &str) -> Option<SpecialIntent> {
        if self.intent_literals.contains(&self.normalize(raw)) {
            return Some(SpecialIntent::RaiseQuery);
        }
        let lowered = raw.to_lowercase();
        self.intent_patterns
            .iter()
            .find(|(pattern, _)| pattern.is_match(&lowered))
            .map(|(_, intent)| *intent)
    }

    /// True when the query asks about earlier conversation turns.
    pub fn is_memory_query(&self, raw: &str) -> bool {
        let normalized = self.normalize(raw);
        MEMORY_TRIGGERS
            .iter()
            .any(|trigger| normalized.contains(trigger))
    }
}

impl Default for QueryNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_strips_punctuation() {
        let normalizer = QueryNormalizer::new();
        assert_eq!(
            normalizer.normalize("  What is the FEE, please?!  "),
            "what is the fee please"
        );
    }

    #[test]
    fn normalize_expands_acronyms_on_word_boundaries_only() {
        let normalizer = QueryNormalizer::new();
        assert_eq!(
            normalizer.normalize("fee for CSE"),
            "fee for computer science engineering"
        );
        // Substrings must not match.
        assert_eq!(normalizer.normalize("increse"), "increse");
    }

    #[test]
    fn normalize_collapses_whitespace_runs() {
        let normalizer = QueryNormalizer::new();
        assert_eq!(normalizer.normalize("a   b\t\tc"), "a b c");
    }

    #[test]
    fn normalize_is_idempotent() {
        let normalizer = QueryNormalizer::new();
        for raw in [
            "What is the fee for CSE?",
            "  AI and ML courses!!",
            "",
            "can i raise a ticket",
        ] {
            let once = normalizer.normalize(raw);
            assert_eq!(normalizer.normalize(&once), once);
        }
    }

    #[test]
    fn special_intent_matches_literals_after_normalization() {
        let normalizer = QueryNormalizer::new();
        assert_eq!(
            normalizer.match_special_intent("Can I raise a ticket?"),
            Some(SpecialIntent::RaiseQuery)
        );
        assert_eq!(
            normalizer.match_special_intent("How can I track my application status?"),
            Some(SpecialIntent::RaiseQuery)
        );
    }

    #[test]
    fn special_intent_matches_pattern_variations() {
        let normalizer = QueryNormalizer::new();
        assert_eq!(
            normalizer.match_special_intent("I would like to file a complaint"),
            Some(SpecialIntent::RaiseQuery)
        );
        assert_eq!(
            normalizer.match_special_intent("is there someone i can talk to"),
            Some(SpecialIntent::RaiseQuery)
        );
        assert_eq!(normalizer.match_special_intent("what is the fee"), None);
    }

    #[test]
    fn memory_queries_are_detected() {
        let normalizer = QueryNormalizer::new();
        assert!(normalizer.is_memory_query("What was my previous question?"));
        assert!(normalizer.is_memory_query("what did I ask earlier"));
        assert!(!normalizer.is_memory_query("what are the hostel fees"));
    }
}
