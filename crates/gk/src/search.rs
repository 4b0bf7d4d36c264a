//! Row search queries

use regex::{Regex, RegexBuilder};

/// A compiled search: substring or regex, with or without case folding
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pattern: String,
    regex: bool,
    case_sensitive: bool,
    matcher: Regex,
    /// The pattern did not compile as a regex and is matched literally
    fell_back: bool,
}

impl SearchQuery {
    /// `None` for an empty pattern. An invalid regex is searched for literally.
    pub fn new(pattern: &str, regex: bool, case_sensitive: bool) -> Option<Self> {
        if pattern.is_empty() {
            return None;
        }
        let build = |source: &str| {
            RegexBuilder::new(source)
                .case_insensitive(!case_sensitive)
                .build()
        };
        let literal = || build(&regex::escape(pattern));
        let (matcher, fell_back) = if regex {
            match build(pattern) {
                Ok(matcher) => (matcher, false),
                Err(err) => {
                    tracing::debug!(pattern, %err, "invalid search regex, matching literally");
                    (literal().ok()?, true)
                }
            }
        } else {
            (literal().ok()?, false)
        };
        Some(Self {
            pattern: pattern.to_string(),
            regex,
            case_sensitive,
            matcher,
            fell_back,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_regex(&self) -> bool {
        self.regex
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn fell_back(&self) -> bool {
        self.fell_back
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }

    /// Byte ranges of every match in `text`
    pub fn match_ranges(&self, text: &str) -> Vec<(usize, usize)> {
        self.matcher
            .find_iter(text)
            .filter(|m| !m.is_empty())
            .map(|m| (m.start(), m.end()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_is_literal() {
        let query = SearchQuery::new("a.c", false, false).unwrap();
        assert!(query.is_match("xa.cx"));
        assert!(!query.is_match("abc"));
    }

    #[test]
    fn test_case_folding() {
        let folded = SearchQuery::new("fix", false, false).unwrap();
        assert!(folded.is_match("Fix parser"));
        let exact = SearchQuery::new("fix", false, true).unwrap();
        assert!(!exact.is_match("Fix parser"));
    }

    #[test]
    fn test_regex_and_fallback() {
        let query = SearchQuery::new("^fix(es)?:", true, false).unwrap();
        assert!(query.is_match("fixes: thing"));
        assert!(!query.fell_back());

        let broken = SearchQuery::new("fix(", true, false).unwrap();
        assert!(broken.fell_back());
        assert!(broken.is_match("call fix(x)"));
    }

    #[test]
    fn test_empty_pattern() {
        assert!(SearchQuery::new("", true, false).is_none());
    }

    #[test]
    fn test_match_ranges() {
        let query = SearchQuery::new("ab", false, false).unwrap();
        assert_eq!(query.match_ranges("ab xAB"), vec![(0, 2), (4, 6)]);
    }
}
