// ============================================================
// Layer 3 — Class Registry
// ============================================================
// The ordered list of class names a model is trained on.
//
//   - len()   → number of output channels of the model
//   - order   → label index mapping (line 0 is class 0, ...)
//
// Parsing follows the class file convention: one name per line,
// trailing whitespace stripped. Blank lines carry no class.
// Duplicate names are kept as-is; the first one wins for lookups.
//
// Reference: Rust Book §8 (Strings), §13 (Iterators)

use serde::{Deserialize, Serialize};

/// Ordered, immutable list of class names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRegistry {
    names: Vec<String>,
}

impl ClassRegistry {
    /// Build a registry from the raw contents of a class file.
    pub fn from_lines(contents: &str) -> Self {
        let names = contents
            .lines()
            .map(|line| line.trim_end().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        Self { names }
    }

    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Number of classes, the model's output dimensionality
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Class name for a label index
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Label index for a class name (first occurrence)
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_defines_indices() {
        let reg = ClassRegistry::from_lines("background\naeroplane\nbicycle\n");
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.index_of("background"), Some(0));
        assert_eq!(reg.index_of("bicycle"), Some(2));
        assert_eq!(reg.name(1), Some("aeroplane"));
    }

    #[test]
    fn test_strips_trailing_whitespace_and_crlf() {
        let reg = ClassRegistry::from_lines("background \r\ncat\t\r\n");
        assert_eq!(reg.names(), &["background".to_string(), "cat".to_string()]);
    }

    #[test]
    fn test_skips_blank_lines() {
        let reg = ClassRegistry::from_lines("a\n\n   \nb\n\n");
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let reg = ClassRegistry::from_lines("dog\ndog\n");
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.index_of("dog"), Some(0));
    }

    #[test]
    fn test_unknown_lookups() {
        let reg = ClassRegistry::from_lines("a\n");
        assert_eq!(reg.index_of("z"), None);
        assert_eq!(reg.name(5), None);
        assert!(!reg.is_empty());
        assert!(ClassRegistry::from_lines("").is_empty());
    }
}
