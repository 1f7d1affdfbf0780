//! Shell-style wildcard patterns.
//!
//! Patterns follow `fnmatch` rules: `*` matches any run of characters
//! (including `/`), `?` matches one character, `[seq]` / `[!seq]` match a
//! character class. Matching is anchored to the whole string and
//! case-sensitive. Patterns are translated to a regex once, up front.

use regex::Regex;

/// A compiled wildcard pattern
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compile a pattern that must match the whole candidate
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&translate(pattern))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Compile a pattern with an implicit trailing `*`, so it matches any
    /// candidate that starts with a match of `pattern`
    pub fn prefix(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&translate(&format!("{}*", pattern)))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Pattern text as given by the caller
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }
}

/// Translate a wildcard pattern into an anchored regex
pub fn translate(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut expr = String::from(r"(?s)\A");
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        i += 1;

        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    expr.push_str(&translate_class(&chars[i..end]));
                    i = end + 1;
                }
                // No closing bracket: the '[' is a literal
                None => expr.push_str(r"\["),
            },
            _ => expr.push_str(&regex::escape(&c.to_string())),
        }
    }

    expr.push_str(r"\z");
    expr
}

/// Index of the `]` closing a class that starts at `start` (just past `[`)
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start;
    if j < chars.len() && chars[j] == '!' {
        j += 1;
    }
    // A ']' right after the opening (or after '!') is part of the class
    if j < chars.len() && chars[j] == ']' {
        j += 1;
    }
    while j < chars.len() && chars[j] != ']' {
        j += 1;
    }
    (j < chars.len()).then_some(j)
}

fn translate_class(body: &[char]) -> String {
    let (negated, body) = match body.split_first() {
        Some(('!', tail)) => (true, tail),
        _ => (false, body),
    };

    let mut items = String::new();
    let mut j = 0;
    while j < body.len() {
        // "x-y" is a range; a '-' at either end of the class is literal
        if j + 2 < body.len() && body[j + 1] == '-' {
            let (lo, hi) = (body[j], body[j + 2]);
            // Reversed ranges match nothing
            if lo <= hi {
                push_class_char(&mut items, lo);
                items.push('-');
                push_class_char(&mut items, hi);
            }
            j += 3;
        } else {
            push_class_char(&mut items, body[j]);
            j += 1;
        }
    }

    match (negated, items.is_empty()) {
        (false, true) => String::from("[a&&b]"),
        (true, true) => String::from("."),
        (false, false) => format!("[{}]", items),
        (true, false) => format!("[^{}]", items),
    }
}

/// Push a class member, escaping characters that are special inside a
/// regex class (including the `--`, `&&` and `~~` set operators)
fn push_class_char(out: &mut String, c: char) {
    if matches!(c, '\\' | '[' | ']' | '^' | '&' | '~' | '-') {
        out.push('\\');
    }
    out.push(c);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, candidate: &str) -> bool {
        GlobPattern::new(pattern).unwrap().matches(candidate)
    }

    #[test]
    fn test_star_crosses_separators() {
        assert!(matches("conv*", "conv/Conv2D/Convolve"));
        assert!(matches("*Conv2D*", "vs/conv/Conv2D/fwd"));
        assert!(!matches("conv*", "pool/conv"));
    }

    #[test]
    fn test_anchored() {
        assert!(matches("abc", "abc"));
        assert!(!matches("abc", "abcd"));
        assert!(!matches("bc", "abc"));
    }

    #[test]
    fn test_question_mark() {
        assert!(matches("a?c", "abc"));
        assert!(!matches("a?c", "ac"));
    }

    #[test]
    fn test_character_classes() {
        assert!(matches("stage_[0-3]", "stage_2"));
        assert!(!matches("stage_[0-3]", "stage_5"));
        assert!(matches("stage_[!0-3]", "stage_5"));
        assert!(matches("[]]x", "]x"));
        assert!(matches("a[^]b", "a^b"));
        assert!(matches("[a-]", "-"));
        assert!(matches("[-a]", "-"));
    }

    #[test]
    fn test_unclosed_bracket_is_literal() {
        assert!(matches("a[b", "a[b"));
        assert!(!matches("a[b", "ab"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        assert!(matches("a.b+(c)", "a.b+(c)"));
        assert!(!matches("a.b", "axb"));
    }

    #[test]
    fn test_prefix_pattern() {
        let p = GlobPattern::prefix("convXXX").unwrap();
        assert!(p.matches("convXXX/Conv2D"));
        assert!(!p.matches("poolXXX"));
        assert_eq!(p.as_str(), "convXXX");
    }

    #[test]
    fn test_range_starting_with_hyphen() {
        // '-'..'0' covers '.' and '/'
        assert!(matches("a[--0]", "a."));
        assert!(matches("a[--0]", "a/"));
        assert!(matches("a[--0]", "a-"));
        assert!(!matches("a[--0]", "a1"));
    }

    #[test]
    fn test_reversed_range_matches_nothing() {
        assert!(!matches("a[z-a]", "az"));
        assert!(!matches("a[z-a]", "a"));
        assert!(matches("a[!z-a]", "ax"));
    }
}
