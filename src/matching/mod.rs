//! Whitelist / blacklist matching of names against wildcard patterns.
//!
//! Used to validate compute set, vertex and program names. Whitelist and
//! blacklist entries carry an implicit trailing `*`. None of these functions
//! fail: a pattern that cannot be compiled is logged and matches nothing.

pub mod glob;

pub use glob::GlobPattern;

use log::warn;
use serde::{Deserialize, Serialize};

/// Result of checking names against a whitelist in both directions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistCheck {
    /// Names matching no whitelist entry
    pub unmatched_names: Vec<String>,
    /// Whitelist entries matching no name
    pub unmatched_entries: Vec<String>,
}

impl WhitelistCheck {
    pub fn is_ok(&self) -> bool {
        self.unmatched_names.is_empty() && self.unmatched_entries.is_empty()
    }
}

fn compile_prefix_patterns<P: AsRef<str>>(patterns: &[P]) -> Vec<GlobPattern> {
    patterns
        .iter()
        .filter_map(|p| match GlobPattern::prefix(p.as_ref()) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!("Ignoring invalid pattern '{}': {}", p.as_ref(), e);
                None
            }
        })
        .collect()
}

/// Items matching at least one pattern (patterns get an implicit `*`)
pub fn items_matching_at_least_one_pattern<S: AsRef<str>, P: AsRef<str>>(
    items: &[S],
    patterns: &[P],
) -> Vec<String> {
    let patterns = compile_prefix_patterns(patterns);

    items
        .iter()
        .map(AsRef::as_ref)
        .filter(|item| patterns.iter().any(|p| p.matches(item)))
        .map(str::to_string)
        .collect()
}

/// Names caught by a blacklist
pub fn names_in_blacklist<S: AsRef<str>, P: AsRef<str>>(names: &[S], blacklist: &[P]) -> Vec<String> {
    items_matching_at_least_one_pattern(names, blacklist)
}

/// Non-empty names that match no whitelist entry
pub fn missing_names_in_whitelist_entries<S: AsRef<str>, P: AsRef<str>>(
    names: &[S],
    whitelist: &[P],
) -> Vec<String> {
    let patterns = compile_prefix_patterns(whitelist);

    names
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| !name.is_empty() && !patterns.iter().any(|p| p.matches(name)))
        .map(str::to_string)
        .collect()
}

/// Whitelist entries that match none of the names
pub fn missing_whitelist_entries_in_names<S: AsRef<str>, P: AsRef<str>>(
    names: &[S],
    whitelist: &[P],
) -> Vec<String> {
    whitelist
        .iter()
        .map(AsRef::as_ref)
        .filter(|entry| match GlobPattern::prefix(entry) {
            Ok(pattern) => !names.iter().any(|n| pattern.matches(n.as_ref())),
            Err(e) => {
                warn!("Invalid whitelist entry '{}': {}", entry, e);
                true
            }
        })
        .map(str::to_string)
        .collect()
}

/// Check that every name is whitelisted and every entry is used
pub fn check_whitelist<S: AsRef<str>, P: AsRef<str>>(names: &[S], whitelist: &[P]) -> WhitelistCheck {
    WhitelistCheck {
        unmatched_names: missing_names_in_whitelist_entries(names, whitelist),
        unmatched_entries: missing_whitelist_entries_in_names(names, whitelist),
    }
}

/// Number of items matching `pattern` exactly (no implicit `*`)
pub fn count_matches_in_list<S: AsRef<str>>(items: &[S], pattern: &str) -> usize {
    match GlobPattern::new(pattern) {
        Ok(pattern) => items.iter().filter(|i| pattern.matches(i.as_ref())).count(),
        Err(e) => {
            warn!("Ignoring invalid pattern '{}': {}", pattern, e);
            0
        }
    }
}
