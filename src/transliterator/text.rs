//! Editable text and the position window a transliteration runs over.

use crate::error::{Error, Result};
use std::fmt;

/// Four offsets into a text, in code points.
///
/// `context_start <= start <= limit <= context_limit <= len`. Text in
/// `start..limit` may be rewritten; the context on either side may only be
/// read. After an incremental call, `start` marks how far the text has been
/// committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub context_start: usize,
    pub start: usize,
    pub limit: usize,
    pub context_limit: usize,
}

impl Position {
    pub fn new(context_start: usize, start: usize, limit: usize, context_limit: usize) -> Self {
        Position { context_start, start, limit, context_limit }
    }

    /// The whole of a text of length `len`.
    pub fn full(len: usize) -> Self {
        Position { context_start: 0, start: 0, limit: len, context_limit: len }
    }

    /// Check the ordering invariant against a text of length `len`.
    pub fn validate(&self, len: usize) -> Result<()> {
        let ok = self.context_start <= self.start
            && self.start <= self.limit
            && self.limit <= self.context_limit
            && self.context_limit <= len;
        if ok { Ok(()) } else { Err(Error::InvalidPosition { position: *self, len }) }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[cs={}, s={}, l={}, cl={}]", self.context_start, self.start, self.limit, self.context_limit)
    }
}

/// A text buffer the engine can rewrite in place, indexed by code point.
pub trait Replaceable {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The character at `index`, or U+FFFF past the end.
    fn char_at(&self, index: usize) -> char;

    fn substring(&self, start: usize, limit: usize) -> String;

    /// Replace `start..limit` with `text`.
    fn replace(&mut self, start: usize, limit: usize, text: &str);

    /// Copy `start..limit` to `dest`, shifting later text right.
    fn copy(&mut self, start: usize, limit: usize, dest: usize) {
        let text = self.substring(start, limit);
        self.replace(dest, dest, &text);
    }
}

/// The provided [`Replaceable`]: a growable buffer of chars.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceableString {
    chars: Vec<char>,
}

impl ReplaceableString {
    pub fn new(text: &str) -> Self {
        ReplaceableString { chars: text.chars().collect() }
    }

    pub fn as_chars(&self) -> &[char] {
        &self.chars
    }
}

impl From<&str> for ReplaceableString {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl fmt::Display for ReplaceableString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.chars.iter().try_for_each(|c| fmt::Write::write_char(f, *c))
    }
}

impl Replaceable for ReplaceableString {
    fn len(&self) -> usize {
        self.chars.len()
    }

    fn char_at(&self, index: usize) -> char {
        self.chars.get(index).copied().unwrap_or(crate::unicode_set::ETHER)
    }

    fn substring(&self, start: usize, limit: usize) -> String {
        let limit = limit.min(self.chars.len());
        self.chars[start.min(limit)..limit].iter().collect()
    }

    fn replace(&mut self, start: usize, limit: usize, text: &str) {
        let limit = limit.min(self.chars.len());
        self.chars.splice(start.min(limit)..limit, text.chars());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_misordered_offsets() {
        assert!(Position::new(0, 1, 3, 4).validate(4).is_ok());
        let cases = vec![
            Position::new(2, 1, 3, 4),
            Position::new(0, 3, 2, 4),
            Position::new(0, 1, 5, 4),
            Position::new(0, 1, 3, 9),
        ];
        for pos in cases {
            match pos.validate(4) {
                Err(Error::InvalidPosition { position, len }) => {
                    assert_eq!(position, pos);
                    assert_eq!(len, 4);
                }
                other => panic!("{pos}: expected InvalidPosition, got {other:?}"),
            }
        }
    }

    #[test]
    fn display_lists_all_offsets() {
        assert_eq!(Position::full(5).to_string(), "[cs=0, s=0, l=5, cl=5]");
    }

    #[test]
    fn replace_and_copy_work_in_code_points() {
        let mut text = ReplaceableString::new("a\u{1F600}c");
        assert_eq!(text.len(), 3);
        assert_eq!(text.char_at(1), '\u{1F600}');
        text.replace(1, 2, "bb");
        assert_eq!(text.to_string(), "abbc");
        text.copy(0, 2, 4);
        assert_eq!(text.to_string(), "abbcab");
        assert_eq!(text.char_at(99), '\u{FFFF}');
    }
}
