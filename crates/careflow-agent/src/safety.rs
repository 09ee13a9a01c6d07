//! Safety filter — the sole gate between user text and side effects.
//!
//! Scans requests for disallowed medical-advice topics before any interpreter
//! or backend call runs.  Matching is a crude case-insensitive substring scan
//! (Aho-Corasick over a curated keyword list): in this domain false positives
//! are far cheaper than false negatives, so no semantic analysis is attempted.

use aho_corasick::AhoCorasick;

/// Topics the agent must never act on.
const DISALLOWED_TOPICS: [&str; 12] = [
    "diagnose",
    "diagnosis",
    "treatment",
    "prescribe",
    "prescription",
    "medication",
    "dose",
    "symptom",
    "therapy",
    "cure",
    "disease",
    "drug",
];

/// Outcome of a safety check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyVerdict {
    /// No disallowed topic found; the request may proceed.
    Allowed,
    /// A disallowed topic was found; the request must be refused.
    Blocked {
        /// The keyword that matched.
        keyword: String,
        /// Human-readable refusal reason naming the keyword.
        reason: String,
    },
}

/// Keyword-based request filter.
pub struct SafetyFilter {
    automaton: AhoCorasick,
}

impl SafetyFilter {
    /// Build the filter over the curated disallowed-topic list.
    pub fn new() -> Self {
        let automaton = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(DISALLOWED_TOPICS)
            .expect("static keyword list always compiles");
        Self { automaton }
    }

    /// Check a request.  Returns the verdict for the first matched keyword.
    pub fn check(&self, text: &str) -> SafetyVerdict {
        match self.automaton.find(text) {
            Some(mat) => {
                let keyword = DISALLOWED_TOPICS[mat.pattern().as_usize()].to_string();
                tracing::warn!(keyword = %keyword, "request blocked by safety filter");
                let reason = format!(
                    "Request contains medical keyword '{keyword}'. This agent cannot provide \
                     medical advice, diagnosis, or treatment recommendations. It can only \
                     coordinate appointments and administrative tasks."
                );
                SafetyVerdict::Blocked { keyword, reason }
            }
            None => SafetyVerdict::Allowed,
        }
    }
}

impl Default for SafetyFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn administrative_request_is_allowed() {
        let filter = SafetyFilter::new();
        assert_eq!(
            filter.check("Schedule a cardiology appointment for Ravi Kumar next week"),
            SafetyVerdict::Allowed
        );
    }

    #[test]
    fn medication_request_is_blocked_and_names_keyword() {
        let filter = SafetyFilter::new();
        match filter.check("What medication should I take for headache?") {
            SafetyVerdict::Blocked { keyword, reason } => {
                assert_eq!(keyword, "medication");
                assert!(reason.contains("'medication'"));
            }
            SafetyVerdict::Allowed => panic!("expected a blocked verdict"),
        }
    }

    #[test]
    fn matching_is_case_insensitive() {
        let filter = SafetyFilter::new();
        assert!(matches!(
            filter.check("Please DIAGNOSE my condition"),
            SafetyVerdict::Blocked { .. }
        ));
    }

    #[test]
    fn substring_matches_inside_words() {
        // Deliberately crude: "drugstore" still trips the filter.
        let filter = SafetyFilter::new();
        assert!(matches!(
            filter.check("directions to the drugstore"),
            SafetyVerdict::Blocked { .. }
        ));
    }
}
