//! Glob-style pattern matching for symbolic names, topics, and step ids.
//!
//! `*` spans any run of characters, `?` matches exactly one. Patterns come
//! from configuration, so compiled forms are memoised process-wide.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;

static COMPILED: Lazy<DashMap<String, Regex>> = Lazy::new(DashMap::new);

/// Matches `value` against one glob pattern.
pub fn wildcard(value: &str, pattern: &str) -> bool {
    if !pattern.contains(['*', '?']) {
        return value == pattern;
    }
    match compiled(pattern) {
        Some(regex) => regex.is_match(value),
        None => value == pattern,
    }
}

/// Matches `value` against any of the given glob patterns.
pub fn wildcard_any<S: AsRef<str>>(value: &str, patterns: &[S]) -> bool {
    patterns.iter().any(|pattern| wildcard(value, pattern.as_ref()))
}

fn compiled(pattern: &str) -> Option<Regex> {
    if let Some(found) = COMPILED.get(pattern) {
        return Some(found.clone());
    }
    let regex = Regex::new(&to_regex(pattern)).ok()?;
    COMPILED.insert(pattern.to_string(), regex.clone());
    Some(regex)
}

fn to_regex(pattern: &str) -> String {
    let mut expression = String::with_capacity(pattern.len() + 8);
    expression.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expression.push_str(".*"),
            '?' => expression.push('.'),
            '\\' | '.' | '+' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$' => {
                expression.push('\\');
                expression.push(ch);
            }
            other => expression.push(other),
        }
    }
    expression.push('$');
    expression
}
