//! Query compilation and per-page matching over normalized text.
//!
//! Queries are compiled into a tolerant regex: metacharacters are escaped,
//! punctuation accepts optional surrounding spaces, whitespace runs match any
//! run of spaces, and letters optionally absorb trailing combining marks when
//! the page carries diacritics. Compilation never fails; anything the regex
//! engine rejects is treated as "no match".

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use regex::Regex;
use unicode_normalization::char::is_combining_mark;

use crate::normalize::is_diacritic_exception;

/// Options controlling query compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchOptions {
    /// Require diacritics in the query to match exactly instead of letting
    /// bare letters absorb marks in the haystack.
    pub match_diacritics: bool,
    pub case_sensitive: bool,
}

/// A compiled query. `None` inside means the query can never match.
#[derive(Debug, Clone)]
pub struct Query {
    pattern: Option<Regex>,
    reject_trailing_mark: bool,
}

impl Query {
    /// Whether the query is known to match nothing.
    pub fn never_matches(&self) -> bool {
        self.pattern.is_none()
    }
}

fn is_regex_meta(c: char) -> bool {
    matches!(
        c,
        '.' | '*' | '+' | '?' | '^' | '$' | '{' | '}' | '(' | ')' | '|' | '[' | ']' | '\\'
    )
}

/// Punctuation that tolerates surrounding spaces: ASCII punctuation plus the
/// general, CJK and full-width punctuation blocks.
fn is_tolerant_punct(c: char) -> bool {
    c.is_ascii_punctuation()
        || matches!(
            c as u32,
            0x2000..=0x206f | 0x3001..=0x303f | 0xff01..=0xff0f
            | 0xff1a..=0xff20 | 0xff3b..=0xff40 | 0xff5b..=0xff65
        )
}

/// Compile `text` into a [`Query`] against pages whose normalized text was
/// flagged with `has_diacritics`.
pub fn compile_query(text: &str, has_diacritics: bool, opts: SearchOptions) -> Query {
    let reject_trailing_mark = opts.match_diacritics && has_diacritics;
    if text.is_empty() {
        return Query {
            pattern: None,
            reject_trailing_mark,
        };
    }

    let mut pattern = String::new();
    if !opts.case_sensitive {
        pattern.push_str("(?i)");
    }
    let prefix_len = pattern.len();

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
            pattern.push_str("[ ]+");
        } else if c == '.' {
            // A dot is a single-character wildcard, space-tolerant like the
            // punctuation it usually stands in for.
            pattern.push_str("[ ]*.[ ]*");
        } else if is_regex_meta(c) {
            pattern.push_str("[ ]*\\");
            pattern.push(c);
            pattern.push_str("[ ]*");
        } else if is_combining_mark(c) {
            if opts.match_diacritics || is_diacritic_exception(c) {
                pattern.push(c);
            }
        } else if is_tolerant_punct(c) {
            pattern.push_str("[ ]*");
            pattern.push(c);
            pattern.push_str("[ ]*");
        } else if c.is_alphabetic() && has_diacritics && !opts.match_diacritics {
            pattern.push(c);
            pattern.push_str("\\p{M}*");
        } else {
            pattern.push(c);
        }
    }

    if pattern.ends_with("[ ]*") {
        let trimmed = pattern.len() - 4;
        pattern.truncate(trimmed);
    }
    if pattern.len() == prefix_len {
        return Query {
            pattern: None,
            reject_trailing_mark,
        };
    }

    Query {
        pattern: Regex::new(&pattern).ok(),
        reject_trailing_mark,
    }
}

fn memo() -> &'static Mutex<HashMap<(String, bool, SearchOptions), Query>> {
    static MEMO: OnceLock<Mutex<HashMap<(String, bool, SearchOptions), Query>>> = OnceLock::new();
    MEMO.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Memoized [`compile_query`], shared process-wide. Compiled patterns are
/// immutable once inserted, so reuse across pages and documents is safe.
pub fn compile_query_cached(text: &str, has_diacritics: bool, opts: SearchOptions) -> Query {
    let mut cache = memo().lock().unwrap_or_else(|e| e.into_inner());
    cache
        .entry((text.to_owned(), has_diacritics, opts))
        .or_insert_with(|| compile_query(text, has_diacritics, opts))
        .clone()
}

/// Run `query` over a page's normalized text, returning `(start, length)`
/// pairs in character offsets.
pub fn match_page(query: &Query, normalized: &str) -> Vec<(usize, usize)> {
    let Some(pattern) = &query.pattern else {
        return Vec::new();
    };
    if normalized.is_empty() {
        return Vec::new();
    }

    // Byte offset of every character, for translating match boundaries.
    let byte_of: Vec<usize> = normalized.char_indices().map(|(b, _)| b).collect();
    let char_at = |byte: usize| byte_of.partition_point(|&b| b < byte);
    let chars: Vec<char> = normalized.chars().collect();

    let mut matches = Vec::new();
    for m in pattern.find_iter(normalized) {
        let start = char_at(m.start());
        let end = char_at(m.end());
        if end == start {
            continue;
        }
        if query.reject_trailing_mark {
            if let Some(&next) = chars.get(end) {
                if is_combining_mark(next) && !is_diacritic_exception(next) {
                    continue;
                }
            }
        }
        matches.push((start, end - start));
    }
    matches
}
