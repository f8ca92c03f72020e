//! Annotation-based suppression.
//!
//! An element is exempt when one of its own annotations matches a
//! configured pattern. Nothing is inherited: a suppressed superclass or
//! enclosing class does not exempt its subclasses or members.

use crate::signature::OwnerPattern;

/// Annotation name patterns (exact or glob) that exempt an element.
#[derive(Debug, Clone, Default)]
pub struct SuppressionSet {
    patterns: Vec<OwnerPattern>,
}

impl SuppressionSet {
    /// Creates an empty set; nothing is suppressed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pattern such as `com.example.SuppressForbidden` or
    /// `**.SuppressForbidden`.
    pub fn add(&mut self, pattern: &str) {
        let pattern = OwnerPattern::new(pattern.trim());
        if !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
    }

    /// Whether any of `annotations` matches a pattern.
    #[must_use]
    pub fn is_suppressed(&self, annotations: &[String]) -> bool {
        annotations
            .iter()
            .any(|a| self.patterns.iter().any(|p| p.matches(a)))
    }

    /// Number of patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether no pattern is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for SuppressionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for pattern in iter {
            set.add(pattern.as_ref());
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn empty_set_suppresses_nothing() {
        let set = SuppressionSet::new();
        assert!(!set.is_suppressed(&names(&["com.example.SuppressForbidden"])));
    }

    #[test]
    fn exact_and_glob_patterns() {
        let set: SuppressionSet = ["com.example.SuppressForbidden", "**.AllowUnsafe"]
            .into_iter()
            .collect();
        assert!(set.is_suppressed(&names(&["java.lang.Deprecated", "com.example.SuppressForbidden"])));
        assert!(set.is_suppressed(&names(&["org.other.AllowUnsafe"])));
        assert!(!set.is_suppressed(&names(&["org.other.SuppressForbidden"])));
        assert!(!set.is_suppressed(&[]));
    }

    #[test]
    fn duplicate_patterns_collapse() {
        let set: SuppressionSet = ["a.B", " a.B "].into_iter().collect();
        assert_eq!(set.len(), 1);
    }
}
