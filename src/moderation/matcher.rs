//! Keyword matcher boundary.
//!
//! Case-insensitive whole-word lookup against a configurable term set. The
//! matcher is a collaborator seam: deployments with their own
//! classification service implement [`KeywordMatcher`] and plug it in.

use std::collections::HashSet;
use std::sync::RwLock;

/// Result of matching one transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub matched: bool,
    /// Terms that matched, in order of first appearance.
    pub terms: Vec<String>,
}

impl Detection {
    fn clean() -> Self {
        Self {
            matched: false,
            terms: Vec::new(),
        }
    }
}

/// Trait for transcript classification.
pub trait KeywordMatcher: Send + Sync {
    /// Checks a transcript against the term set.
    fn detect(&self, text: &str) -> Detection;
}

/// Whole-word set matcher over lowercased terms.
pub struct WordSetMatcher {
    terms: RwLock<HashSet<String>>,
}

impl WordSetMatcher {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            terms: RwLock::new(
                terms
                    .into_iter()
                    .map(|t| t.as_ref().to_lowercase())
                    .collect(),
            ),
        }
    }

    /// Adds a term. Returns false if it was already present.
    pub fn add(&self, term: &str) -> bool {
        self.terms
            .write()
            .expect("term set poisoned")
            .insert(term.to_lowercase())
    }

    /// Removes a term. Returns false if it was not present.
    pub fn remove(&self, term: &str) -> bool {
        self.terms
            .write()
            .expect("term set poisoned")
            .remove(&term.to_lowercase())
    }

    /// Returns the current term set, sorted.
    pub fn terms(&self) -> Vec<String> {
        let mut terms: Vec<String> = self
            .terms
            .read()
            .expect("term set poisoned")
            .iter()
            .cloned()
            .collect();
        terms.sort();
        terms
    }
}

impl KeywordMatcher for WordSetMatcher {
    fn detect(&self, text: &str) -> Detection {
        let set = self.terms.read().expect("term set poisoned");
        if set.is_empty() {
            return Detection::clean();
        }

        let mut matched = Vec::new();
        for word in text.split(|c: char| !c.is_alphanumeric() && c != '\'') {
            if word.is_empty() {
                continue;
            }
            let lowered = word.to_lowercase();
            if set.contains(&lowered) && !matched.contains(&lowered) {
                matched.push(lowered);
            }
        }

        Detection {
            matched: !matched.is_empty(),
            terms: matched,
        }
    }
}
