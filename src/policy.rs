//! Pre-flight doctrine check.
//!
//! [`PolicyGuard`] scans a raw request for disallowed terms before any
//! asynchronous work is started. Matching is a case-insensitive substring
//! search and the first term in declared order wins.

use serde::Deserialize;

/// A disallowed term and the category reported when it matches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DoctrineTerm {
    pub term: String,
    pub category: String,
}

impl DoctrineTerm {
    pub fn new(term: &str, category: &str) -> Self {
        Self {
            term: term.to_string(),
            category: category.to_string(),
        }
    }
}

/// Result of a doctrine check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected { term: String, category: String },
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }

    /// Human-readable rejection reason, `None` when accepted.
    pub fn reason(&self) -> Option<String> {
        match self {
            Verdict::Accepted => None,
            Verdict::Rejected { term, category } => {
                Some(format!("disallowed term \"{term}\" ({category})"))
            }
        }
    }
}

const BUILTIN_DOCTRINE: &[(&str, &str)] = &[
    ("gore", "graphic violence"),
    ("massacre", "graphic violence"),
    ("decapitat", "graphic violence"),
    ("bomb", "weapons"),
    ("firearm", "weapons"),
    ("nude", "explicit content"),
    ("porn", "explicit content"),
    ("swastika", "hate symbols"),
    ("self-harm", "self-harm"),
];

/// Category reported for blank input.
pub const EMPTY_CATEGORY: &str = "empty";

/// Synchronous, side-effect free content check.
#[derive(Debug, Clone)]
pub struct PolicyGuard {
    terms: Vec<DoctrineTerm>,
}

impl Default for PolicyGuard {
    fn default() -> Self {
        Self::new(
            BUILTIN_DOCTRINE
                .iter()
                .map(|(term, category)| DoctrineTerm::new(term, category))
                .collect(),
        )
    }
}

impl PolicyGuard {
    /// Terms are lowercased once here so `validate` only lowercases the input.
    pub fn new(terms: Vec<DoctrineTerm>) -> Self {
        let terms = terms
            .into_iter()
            .filter(|t| !t.term.trim().is_empty())
            .map(|t| DoctrineTerm {
                term: t.term.to_lowercase(),
                category: t.category,
            })
            .collect();
        Self { terms }
    }

    /// Builds a guard from configured terms, using the built-in doctrine when none are given.
    pub fn from_terms(terms: &[DoctrineTerm]) -> Self {
        if terms.is_empty() {
            Self::default()
        } else {
            Self::new(terms.to_vec())
        }
    }

    pub fn validate(&self, raw_input: &str) -> Verdict {
        if raw_input.trim().is_empty() {
            return Verdict::Rejected {
                term: String::new(),
                category: EMPTY_CATEGORY.to_string(),
            };
        }

        let lower = raw_input.to_lowercase();
        self.terms
            .iter()
            .find(|t| lower.contains(&t.term))
            .map(|t| Verdict::Rejected {
                term: t.term.clone(),
                category: t.category.clone(),
            })
            .unwrap_or(Verdict::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_clean_input() {
        let guard = PolicyGuard::default();
        let verdict = guard.validate("levitating orbital sphere");
        assert!(verdict.is_valid());
        assert_eq!(verdict.reason(), None);
    }

    #[test]
    fn rejects_case_insensitively() {
        let guard = PolicyGuard::default();
        let verdict = guard.validate("A Floating BOMB over the sea");
        assert_eq!(
            verdict,
            Verdict::Rejected {
                term: "bomb".into(),
                category: "weapons".into()
            }
        );
        assert!(verdict.reason().unwrap().contains("weapons"));
    }

    #[test]
    fn substring_match_counts() {
        let guard = PolicyGuard::default();
        assert!(!guard.validate("the bombastic parade").is_valid());
    }

    #[test]
    fn first_declared_term_wins() {
        // "nude" appears first in the text, but "bomb" is declared first.
        let guard = PolicyGuard::new(vec![
            DoctrineTerm::new("bomb", "weapons"),
            DoctrineTerm::new("nude", "explicit content"),
        ]);
        let verdict = guard.validate("nude statue beside a bomb");
        assert_eq!(
            verdict,
            Verdict::Rejected {
                term: "bomb".into(),
                category: "weapons".into()
            }
        );
    }

    #[test]
    fn configured_terms_are_lowercased() {
        let guard = PolicyGuard::from_terms(&[DoctrineTerm::new("Dragon", "myth")]);
        assert!(!guard.validate("a small dragon").is_valid());
        assert!(guard.validate("a floating bomb").is_valid());
    }

    #[test]
    fn blank_input_is_rejected() {
        let guard = PolicyGuard::default();
        match guard.validate("   ") {
            Verdict::Rejected { category, .. } => assert_eq!(category, EMPTY_CATEGORY),
            Verdict::Accepted => panic!("blank input must be rejected"),
        }
    }
}
