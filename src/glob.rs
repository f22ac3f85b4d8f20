//! Glob to regular expression translation
//!
//! Supports the restricted glob syntax used for package ids, paths and
//! version patterns, in this precedence order:
//! - `**/`, `**\` - any number of directories, including none
//! - `**` - any characters, path separators included
//! - `[!abc]` - one character that is not listed
//! - `.` - a literal dot
//! - `*` - any run of characters except path separators
//! - `?` - exactly one character except a path separator
//! - `/`, `\` - either path separator
//!
//! Everything else is matched literally.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use regex::Regex;

const SEPARATOR: &str = r"[\\/]";
const NOT_SEPARATOR: &str = r"[^\\/]";
const ANY_DIRECTORIES: &str = r"(?:.*[\\/])?";

/// A glob translated into a regular expression
#[derive(Debug, Clone)]
pub struct GlobPattern {
    original: String,
    expression: String,
    regex: Regex,
    is_pattern: bool,
}

impl GlobPattern {
    /// Translate `pattern` and compile it.
    ///
    /// With `match_lines` the regex must match the whole input; without it the
    /// regex matches anywhere and [`GlobPattern::expression`] can be embedded
    /// into a larger expression.
    pub fn new(pattern: &str, match_lines: bool) -> Result<Self, regex::Error> {
        let (expression, is_pattern) = translate(pattern);
        let regex = if match_lines {
            Regex::new(&format!("^{}$", expression))?
        } else {
            Regex::new(&expression)?
        };

        Ok(Self {
            original: pattern.to_string(),
            expression,
            regex,
            is_pattern,
        })
    }

    /// The glob text this pattern was created from
    pub fn original(&self) -> &str {
        &self.original
    }

    /// The translated, unanchored expression
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// True when the glob contained at least one token, the dot and separators included
    pub fn is_pattern(&self) -> bool {
        self.is_pattern
    }

    pub fn is_match(&self, input: &str) -> bool {
        self.regex.is_match(input)
    }
}

/// Translate a glob into a regular expression.
///
/// Returns the unanchored expression and whether any token was recognized.
/// A dot or a path separator counts as a token, so only text without
/// `* ? [! . / \` is reported as a literal.
pub fn translate(pattern: &str) -> (String, bool) {
    let chars: Vec<char> = pattern.chars().collect();
    let mut expression = String::with_capacity(pattern.len() * 2);
    let mut is_pattern = false;
    let mut i = 0;

    while i < chars.len() {
        match &chars[i..] {
            ['*', '*', '/' | '\\', ..] => {
                expression.push_str(ANY_DIRECTORIES);
                is_pattern = true;
                i += 3;
            }
            ['*', '*', ..] => {
                expression.push_str(".*");
                is_pattern = true;
                i += 2;
            }
            rest @ ['[', '!', ..] => match negated_range(rest) {
                Some((class, consumed)) => {
                    expression.push_str(&class);
                    is_pattern = true;
                    i += consumed;
                }
                None => {
                    expression.push_str(r"\[");
                    i += 1;
                }
            },
            ['.', ..] => {
                expression.push_str(r"\.");
                is_pattern = true;
                i += 1;
            }
            ['*', ..] => {
                expression.push_str(NOT_SEPARATOR);
                expression.push('*');
                is_pattern = true;
                i += 1;
            }
            ['?', ..] => {
                expression.push_str(NOT_SEPARATOR);
                is_pattern = true;
                i += 1;
            }
            ['/' | '\\', ..] => {
                expression.push_str(SEPARATOR);
                is_pattern = true;
                i += 1;
            }
            [c, ..] => {
                expression.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
                i += 1;
            }
            [] => break,
        }
    }

    (expression, is_pattern)
}

/// Translate `[!...]` at the start of `chars` into `[^...]`.
///
/// Returns the class and the number of glob characters consumed, or `None`
/// when the range is empty or unterminated.
fn negated_range(chars: &[char]) -> Option<(String, usize)> {
    let body_len = chars[2..].iter().position(|c| *c == ']')?;
    if body_len == 0 {
        return None;
    }

    let mut class = String::from("[^");
    for c in &chars[2..2 + body_len] {
        if matches!(c, '\\' | '[' | '&' | '~') {
            class.push('\\');
        }
        class.push(*c);
    }
    class.push(']');

    Some((class, body_len + 3))
}

/// Memoizes translated globs by their raw text.
#[derive(Debug, Default)]
pub struct GlobCache {
    patterns: Mutex<HashMap<(String, bool), Arc<GlobPattern>>>,
}

impl GlobCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(
        &self,
        pattern: &str,
        match_lines: bool,
    ) -> Result<Arc<GlobPattern>, regex::Error> {
        let key = (pattern.to_string(), match_lines);
        let mut patterns = self.patterns.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = patterns.get(&key) {
            return Ok(Arc::clone(existing));
        }

        let created = Arc::new(GlobPattern::new(pattern, match_lines)?);
        patterns.insert(key, Arc::clone(&created));
        Ok(created)
    }
}
