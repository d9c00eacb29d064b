//! Bracket-pattern parsing for [`UnicodeSet`].
//!
//! Grammar, informally:
//!
//! ```text
//! set      := '[' '^'? item* ']' | '[:' '^'? prop ':]' | ('\p' | '\P') '{' prop '}'
//! item     := set | set ('&' | '-') set | char | char '-' char | '{' string '}' | '$' name
//! prop     := name | name '=' value
//! ```
//!
//! Unescaped whitespace is ignored. A `$` immediately before the closing
//! bracket stands for [`ETHER`](super::ETHER). The parser records a
//! normalized copy of the source text (whitespace dropped, variables
//! substituted) as the set's pattern.

use super::{ETHER, UnicodeSet};
use crate::error::{Error, Result};
use crate::properties;
use std::sync::Arc;

/// Value bound to a `$name` variable.
#[derive(Debug, Clone)]
pub enum SymbolValue {
    Set(Arc<UnicodeSet>),
    Text(String),
}

/// Resolves `$name` references while parsing.
pub trait SymbolTable {
    fn lookup(&self, name: &str) -> Option<SymbolValue>;
}

pub(crate) fn parse_pattern(pattern: &str, symbols: Option<&dyn SymbolTable>) -> Result<UnicodeSet> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut pos = skip_whitespace(&chars, 0);
    let set = parse_set(&chars, &mut pos, symbols)?;
    pos = skip_whitespace(&chars, pos);
    if pos != chars.len() {
        return Err(Error::pattern("Extra characters after set", pattern));
    }
    Ok(set)
}

/// Whether a set expression starts at `pos`.
pub(crate) fn is_set_start(chars: &[char], pos: usize) -> bool {
    match chars.get(pos) {
        Some('[') => true,
        Some('\\') => matches!(chars.get(pos + 1), Some('p' | 'P')),
        _ => false,
    }
}

pub(crate) fn skip_whitespace(chars: &[char], mut pos: usize) -> usize {
    while pos < chars.len() && chars[pos].is_whitespace() {
        pos += 1;
    }
    pos
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

pub(crate) fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn context(chars: &[char], start: usize, pos: usize) -> String {
    chars[start.min(chars.len())..(pos + 1).min(chars.len())].iter().collect()
}

/// Parse the escape sequence whose backslash is at `*pos`, advancing past it.
///
/// Returns `None` when the sequence is malformed (for example `\u12`).
pub(crate) fn parse_escape(chars: &[char], pos: &mut usize) -> Option<char> {
    let kind = *chars.get(*pos + 1)?;
    *pos += 2;
    let hex = |pos: &mut usize, min: usize, max: usize| -> Option<char> {
        let start = *pos;
        while *pos < chars.len() && *pos - start < max && chars[*pos].is_ascii_hexdigit() {
            *pos += 1;
        }
        if *pos - start < min {
            return None;
        }
        let text: String = chars[start..*pos].iter().collect();
        char::from_u32(u32::from_str_radix(&text, 16).ok()?)
    };
    match kind {
        'u' => hex(pos, 4, 4),
        'U' => hex(pos, 8, 8),
        'x' if chars.get(*pos) == Some(&'{') => {
            *pos += 1;
            let c = hex(pos, 1, 8)?;
            if chars.get(*pos) != Some(&'}') {
                return None;
            }
            *pos += 1;
            Some(c)
        }
        'x' => hex(pos, 1, 2),
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        'f' => Some('\u{000C}'),
        'v' => Some('\u{000B}'),
        'a' => Some('\u{0007}'),
        'e' => Some('\u{001B}'),
        other => Some(other),
    }
}

/// Push `c` to a normalized pattern, escaping pattern syntax.
fn push_literal(out: &mut String, c: char) {
    if super::is_unprintable(c) && c != ETHER {
        super::push_hex_escape(out, c);
        return;
    }
    if matches!(c, '[' | ']' | '-' | '^' | '&' | '\\' | '{' | '}' | '$' | ':' | '\'') {
        out.push('\\');
    }
    out.push(c);
}

/// Push `c` to the text of a variable spliced into a set. Only `-` stays
/// unescaped, so `a-z` in a variable still reads as a range.
pub(crate) fn push_spliced(out: &mut String, c: char) {
    if c == '-' {
        out.push(c);
    } else {
        push_literal(out, c);
    }
}

/// Parse one set expression starting at `*pos`.
pub(crate) fn parse_set(chars: &[char], pos: &mut usize, symbols: Option<&dyn SymbolTable>) -> Result<UnicodeSet> {
    let start = *pos;
    if chars.get(start) == Some(&'[') && chars.get(start + 1) == Some(&':') {
        return parse_posix_property(chars, pos);
    }
    if chars.get(start) == Some(&'\\') && matches!(chars.get(start + 1), Some('p' | 'P')) {
        return parse_perl_property(chars, pos);
    }
    if chars.get(start) != Some(&'[') {
        return Err(Error::pattern("Missing '['", context(chars, start, start)));
    }
    *pos += 1;

    let mut body = SetBody { set: UnicodeSet::new(), out: String::from("["), pending: None, last_was_set: false, op: None };
    *pos = skip_whitespace(chars, *pos);
    let negated = chars.get(*pos) == Some(&'^');
    if negated {
        *pos += 1;
        body.out.push('^');
    }

    body.parse_items(chars, pos, start, symbols, true)?;

    let SetBody { mut set, mut out, pending, .. } = body;
    if let Some(p) = pending {
        set.add(p)?;
    }
    if negated {
        set.complement()?;
    }
    out.push(']');
    set.set_pattern(out);
    Ok(set)
}

/// The items of one bracketed set, accumulated left to right.
struct SetBody {
    set: UnicodeSet,
    /// Normalized pattern text.
    out: String,
    /// Last single character, held back in case a `-` makes it a range start.
    pending: Option<char>,
    last_was_set: bool,
    op: Option<char>,
}

impl SetBody {
    fn hold(&mut self, c: char) -> Result<()> {
        if let Some(p) = self.pending.replace(c) {
            self.set.add(p)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(p) = self.pending.take() {
            self.set.add(p)?;
        }
        Ok(())
    }

    /// Parse items up to and including the closing `]` when `closed`, or to
    /// the end of `chars` for the text of a variable.
    fn parse_items(
        &mut self,
        chars: &[char],
        pos: &mut usize,
        start: usize,
        symbols: Option<&dyn SymbolTable>,
        closed: bool,
    ) -> Result<()> {
        loop {
            *pos = skip_whitespace(chars, *pos);
            let Some(&c) = chars.get(*pos) else {
                if closed {
                    return Err(Error::pattern("Unterminated set", context(chars, start, *pos)));
                }
                return Ok(());
            };

            if c == ']' {
                if !closed {
                    return Err(Error::pattern("Unbalanced ']'", context(chars, start, *pos)));
                }
                if self.op.is_some() {
                    return Err(Error::pattern("Missing operand after operator", context(chars, start, *pos)));
                }
                *pos += 1;
                return Ok(());
            }

            let nested = if is_set_start(chars, *pos) {
                Some(parse_set(chars, pos, symbols)?)
            } else if c == '$' && symbols.is_some() && chars.get(*pos + 1).is_some_and(|&n| is_ident_start(n)) {
                let name_start = *pos + 1;
                let mut end = name_start;
                while end < chars.len() && is_ident_part(chars[end]) {
                    end += 1;
                }
                let name: String = chars[name_start..end].iter().collect();
                match symbols.and_then(|s| s.lookup(&name)) {
                    Some(SymbolValue::Set(var)) => {
                        *pos = end;
                        Some((*var).clone_as_thawed())
                    }
                    Some(SymbolValue::Text(text)) => {
                        *pos = end;
                        let fragment: Vec<char> = text.chars().collect();
                        let mut at = 0;
                        self.parse_items(&fragment, &mut at, 0, symbols, false)?;
                        continue;
                    }
                    None => {
                        return Err(Error::pattern(format!("Undefined variable ${name}"), context(chars, start, end)));
                    }
                }
            } else {
                None
            };

            if let Some(operand) = nested {
                self.flush()?;
                match self.op.take() {
                    Some('&') => {
                        self.set.retain_all(&operand)?;
                        self.out.push('&');
                    }
                    Some('-') => {
                        self.set.remove_all(&operand)?;
                        self.out.push('-');
                    }
                    _ => self.set.add_all(&operand)?,
                }
                self.out.push_str(&operand.to_pattern(false));
                self.last_was_set = true;
                continue;
            }

            if self.op.is_some() {
                return Err(Error::pattern("Missing operand after operator", context(chars, start, *pos)));
            }

            if (c == '&' || c == '-') && self.last_was_set {
                let next = skip_whitespace(chars, *pos + 1);
                if is_set_start(chars, next) || (chars.get(next) == Some(&'$') && symbols.is_some()) {
                    self.op = Some(c);
                    *pos += 1;
                    continue;
                }
                if c == '&' {
                    return Err(Error::pattern("Dangling '&'", context(chars, start, *pos)));
                }
            }

            match c {
                '{' => {
                    self.flush()?;
                    let string_start = *pos;
                    *pos += 1;
                    let mut text = String::new();
                    loop {
                        match chars.get(*pos) {
                            None => {
                                return Err(Error::pattern("Unterminated string", context(chars, string_start, *pos)));
                            }
                            Some('}') => {
                                *pos += 1;
                                break;
                            }
                            Some('\\') => {
                                let esc = parse_escape(chars, pos)
                                    .ok_or_else(|| Error::pattern("Invalid escape", context(chars, string_start, *pos)))?;
                                text.push(esc);
                            }
                            Some(&ch) => {
                                text.push(ch);
                                *pos += 1;
                            }
                        }
                    }
                    self.set.add_str(&text)?;
                    self.out.push('{');
                    for ch in text.chars() {
                        push_literal(&mut self.out, ch);
                    }
                    self.out.push('}');
                    self.last_was_set = false;
                    continue;
                }
                '\'' => {
                    *pos += 1;
                    loop {
                        match chars.get(*pos) {
                            None => return Err(Error::pattern("Unterminated quote", context(chars, start, *pos))),
                            Some('\'') if chars.get(*pos + 1) == Some(&'\'') => {
                                *pos += 2;
                                self.hold('\'')?;
                                push_literal(&mut self.out, '\'');
                            }
                            Some('\'') => {
                                *pos += 1;
                                break;
                            }
                            Some(&ch) => {
                                *pos += 1;
                                self.hold(ch)?;
                                push_literal(&mut self.out, ch);
                            }
                        }
                    }
                    self.last_was_set = false;
                    continue;
                }
                _ => {}
            }

            // A single character, possibly the start of a range.
            let (ch, escaped) = read_char(chars, pos, start)?;
            if ch == '-' && !escaped {
                let next = skip_whitespace(chars, *pos);
                if let (Some(low), Some(&n)) = (self.pending, chars.get(next)) {
                    if n != ']' {
                        *pos = next;
                        if is_set_start(chars, *pos) {
                            return Err(Error::pattern("Invalid range", context(chars, start, *pos)));
                        }
                        let (high, _) = read_char(chars, pos, start)?;
                        if high < low {
                            return Err(Error::pattern("Invalid range", context(chars, start, *pos - 1)));
                        }
                        self.set.add_range(low, high)?;
                        self.pending = None;
                        self.out.push('-');
                        push_literal(&mut self.out, high);
                        self.last_was_set = false;
                        continue;
                    }
                }
            }
            if ch == '$' && !escaped && chars.get(skip_whitespace(chars, *pos)) == Some(&']') {
                self.hold(ETHER)?;
                self.out.push('$');
                self.last_was_set = false;
                continue;
            }
            self.hold(ch)?;
            push_literal(&mut self.out, ch);
            self.last_was_set = false;
        }
    }
}

/// Read one literal character, handling backslash escapes.
fn read_char(chars: &[char], pos: &mut usize, start: usize) -> Result<(char, bool)> {
    match chars.get(*pos) {
        Some('\\') => {
            let esc_start = *pos;
            let c = parse_escape(chars, pos)
                .ok_or_else(|| Error::pattern("Invalid escape", context(chars, esc_start, *pos)))?;
            Ok((c, true))
        }
        Some(&c) => {
            *pos += 1;
            Ok((c, false))
        }
        None => Err(Error::pattern("Unterminated set", context(chars, start, *pos))),
    }
}

fn parse_posix_property(chars: &[char], pos: &mut usize) -> Result<UnicodeSet> {
    let start = *pos;
    let mut end = start + 2;
    while end + 1 < chars.len() && !(chars[end] == ':' && chars[end + 1] == ']') {
        end += 1;
    }
    if end + 1 >= chars.len() {
        return Err(Error::pattern("Unterminated property", context(chars, start, end)));
    }
    let body: String = chars[start + 2..end].iter().collect();
    *pos = end + 2;
    let (negated, body) = match body.trim().strip_prefix('^') {
        Some(rest) => (true, rest.to_string()),
        None => (false, body.trim().to_string()),
    };
    let mut set = resolve_property(&body, chars, start, end + 1)?;
    if negated {
        set.complement()?;
    }
    set.set_pattern(format!("[:{}{}:]", if negated { "^" } else { "" }, body));
    Ok(set)
}

fn parse_perl_property(chars: &[char], pos: &mut usize) -> Result<UnicodeSet> {
    let start = *pos;
    let negated = chars[start + 1] == 'P';
    if chars.get(start + 2) != Some(&'{') {
        return Err(Error::pattern("Missing '{' after \\p", context(chars, start, start + 2)));
    }
    let body_start = start + 3;
    let mut end = body_start;
    while end < chars.len() && chars[end] != '}' {
        end += 1;
    }
    if end >= chars.len() {
        return Err(Error::pattern("Unterminated property", context(chars, start, end)));
    }
    let body: String = chars[body_start..end].iter().collect();
    *pos = end + 1;
    let body = body.trim().to_string();
    let mut set = resolve_property(&body, chars, start, end)?;
    if negated {
        set.complement()?;
    }
    set.set_pattern(format!("\\{}{{{}}}", if negated { 'P' } else { 'p' }, body));
    Ok(set)
}

fn resolve_property(body: &str, chars: &[char], start: usize, end: usize) -> Result<UnicodeSet> {
    let (name, value) = match body.split_once('=') {
        Some((n, v)) => (n.trim(), Some(v.trim())),
        None => (body, None),
    };
    let shared = properties::property_set(name, value)
        .map_err(|err| match err {
            Error::Pattern { message, .. } => Error::pattern(message, context(chars, start, end)),
            other => other,
        })?;
    Ok(shared.clone_as_thawed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn set(p: &str) -> UnicodeSet {
        UnicodeSet::from_pattern(p).unwrap()
    }

    #[test]
    fn basic_patterns() {
        let s = set("[a-c x {ab}]");
        assert!(s.contains('b'));
        assert!(s.contains('x'));
        assert!(!s.contains(' '));
        assert!(s.contains_str("ab"));
        assert_eq!(s.to_pattern(false), "[a-cx{ab}]");
    }

    #[test]
    fn negation_and_literal_dash() {
        let s = set("[^a]");
        assert!(!s.contains('a'));
        assert!(s.contains('b'));

        let dash = set("[-a]");
        assert!(dash.contains('-'));
        let trailing = set("[a-]");
        assert!(trailing.contains('-'));
        assert!(trailing.contains('a'));
    }

    #[test]
    fn set_operations() {
        let s = set("[[a-z]-[aeiou]]");
        assert!(s.contains('b'));
        assert!(!s.contains('e'));

        let i = set("[[a-m]&[h-z]]");
        assert!(i.contains('h'));
        assert!(!i.contains('a'));
        assert!(!i.contains('z'));
    }

    #[test]
    fn property_forms() {
        let s = set("[[:Lu:][:script=Greek:]]");
        assert!(s.contains('A'));
        assert!(s.contains('\u{03B1}'));
        assert!(!s.contains('a'));

        let p = set("\\p{Ll}");
        assert!(p.contains('a'));
        let np = set("\\P{Ll}");
        assert!(!np.contains('a'));

        let neg = set("[:^Lu:]");
        assert!(neg.contains('a'));
        assert!(!neg.contains('A'));
    }

    #[test]
    fn escapes() {
        let s = set("[\\u0041\\x{42}\\x43\\n\\-]");
        for c in ['A', 'B', 'C', '\n', '-'] {
            assert!(s.contains(c), "missing {c:?}");
        }
        assert_eq!(s.len(), 5);
    }

    #[test]
    fn dollar_before_bracket_is_ether() {
        let s = set("[a$]");
        assert!(s.contains(ETHER));
        assert!(!s.contains('$'));
    }

    #[test]
    fn variables_resolve_through_symbols() {
        struct Table(HashMap<String, SymbolValue>);
        impl SymbolTable for Table {
            fn lookup(&self, name: &str) -> Option<SymbolValue> {
                self.0.get(name).cloned()
            }
        }
        let mut vars = HashMap::new();
        vars.insert("vowel".to_string(), SymbolValue::Set(Arc::new(set("[aeiou]"))));
        vars.insert("xs".to_string(), SymbolValue::Text("xy".to_string()));
        let table = Table(vars.clone());

        let s = UnicodeSet::from_pattern_with("[$vowel $xs]", &table).unwrap();
        assert!(s.contains('e'));
        assert!(s.contains('y'));
        assert_eq!(s.to_pattern(false), "[[aeiou]xy]");

        let d = UnicodeSet::from_pattern_with("[[a-z] - $vowel]", &table).unwrap();
        assert!(!d.contains('a'));
        assert!(d.contains('b'));

        vars.insert("range".to_string(), SymbolValue::Text("a-c[xy]".to_string()));
        let table = Table(vars);
        let spliced = UnicodeSet::from_pattern_with("[$range z]", &table).unwrap();
        assert_eq!(spliced, set("[a-cxyz]"));
        assert!(!spliced.contains('-'));

        let err = UnicodeSet::from_pattern_with("[$nope]", &table).unwrap_err();
        assert!(err.to_string().contains("$nope"));
    }

    #[test]
    fn malformed_patterns_report_context() {
        let cases: Vec<(&str, &str)> = vec![
            ("[abc", "Unterminated set"),
            ("[z-a]", "Invalid range"),
            ("[:Bogus:]", "Unknown property"),
            ("[[a]&]", "Dangling"),
            ("[a]x", "Extra characters"),
            ("[{ab]", "Unterminated string"),
        ];
        for (pattern, message) in cases {
            match UnicodeSet::from_pattern(pattern) {
                Err(Error::Pattern { message: got, .. }) => {
                    assert!(got.contains(message), "{pattern}: got {got:?}")
                }
                other => panic!("{pattern}: expected pattern error, got {other:?}"),
            }
        }
    }
}
