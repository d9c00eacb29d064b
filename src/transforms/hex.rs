//! `Any-Hex` escapes and `Hex-Any` unescapes.

use super::replace_in;
use crate::transliterator::{Position, Replaceable};
use std::fmt::Write;

/// Escape notations, named as in `Any-Hex/<Variant>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HexForm {
    /// `\uXXXX`, supplementary code points as a UTF-16 surrogate pair.
    #[default]
    Java,
    /// `U+XXXX`.
    Unicode,
    /// `\uXXXX` or `\UXXXXXXXX`.
    C,
    /// `&#xX;`.
    Xml,
    /// `&#D;`.
    Xml10,
    /// `\x{X}`.
    Perl,
    /// Bare `XXXX`; escape only.
    Plain,
}

/// One accepted escape syntax.
struct Syntax {
    prefix: &'static str,
    suffix: &'static str,
    radix: u32,
    min_digits: usize,
    max_digits: usize,
}

const fn syntax(prefix: &'static str, suffix: &'static str, radix: u32, min_digits: usize, max_digits: usize) -> Syntax {
    Syntax { prefix, suffix, radix, min_digits, max_digits }
}

const JAVA: &[Syntax] = &[syntax("\\u", "", 16, 4, 4)];
const UNICODE: &[Syntax] = &[syntax("U+", "", 16, 4, 6)];
const C: &[Syntax] = &[syntax("\\u", "", 16, 4, 4), syntax("\\U", "", 16, 8, 8)];
const XML: &[Syntax] = &[syntax("&#x", ";", 16, 1, 6)];
const XML10: &[Syntax] = &[syntax("&#", ";", 10, 1, 7)];
const PERL: &[Syntax] = &[syntax("\\x{", "}", 16, 1, 6)];

/// Forms `Hex-Any` tries, in order.
const UNESCAPE_ORDER: [HexForm; 6] =
    [HexForm::Unicode, HexForm::Java, HexForm::C, HexForm::Xml, HexForm::Xml10, HexForm::Perl];

enum Scan {
    Value(u32, usize),
    NoMatch,
    /// Input ended inside a possible escape.
    Wait,
}

impl Syntax {
    fn scan(&self, text: &dyn Replaceable, at: usize, limit: usize, incremental: bool) -> Scan {
        let mut s = at;
        for expected in self.prefix.chars() {
            if s >= limit {
                return if s > at && incremental { Scan::Wait } else { Scan::NoMatch };
            }
            if text.char_at(s) != expected {
                return Scan::NoMatch;
            }
            s += 1;
        }

        let mut value = 0u32;
        let mut digits = 0;
        while digits < self.max_digits {
            if s >= limit {
                if incremental {
                    return Scan::Wait;
                }
                break;
            }
            let Some(digit) = text.char_at(s).to_digit(self.radix) else {
                break;
            };
            value = value.saturating_mul(self.radix).saturating_add(digit);
            digits += 1;
            s += 1;
        }
        if digits < self.min_digits {
            return Scan::NoMatch;
        }

        for expected in self.suffix.chars() {
            if s >= limit {
                return if incremental { Scan::Wait } else { Scan::NoMatch };
            }
            if text.char_at(s) != expected {
                return Scan::NoMatch;
            }
            s += 1;
        }
        Scan::Value(value, s)
    }
}

enum Decoded {
    Char(char, usize),
    None,
    Wait,
}

fn decode_at(syntaxes: &[&Syntax], text: &dyn Replaceable, at: usize, limit: usize, incremental: bool) -> Decoded {
    for syntax in syntaxes {
        let (value, end) = match syntax.scan(text, at, limit, incremental) {
            Scan::Wait => return Decoded::Wait,
            Scan::NoMatch => continue,
            Scan::Value(value, end) => (value, end),
        };
        if let Some(c) = char::from_u32(value) {
            return Decoded::Char(c, end);
        }
        if !(0xD800..0xDC00).contains(&value) {
            continue;
        }
        // A high surrogate only decodes together with the low half after it.
        for low_syntax in syntaxes {
            match low_syntax.scan(text, end, limit, incremental) {
                Scan::Wait => return Decoded::Wait,
                Scan::Value(low, low_end) if (0xDC00..0xE000).contains(&low) => {
                    let combined = 0x10000 + ((value - 0xD800) << 10) + (low - 0xDC00);
                    if let Some(c) = char::from_u32(combined) {
                        return Decoded::Char(c, low_end);
                    }
                }
                _ => {}
            }
        }
    }
    Decoded::None
}

impl HexForm {
    pub const ALL: [HexForm; 7] =
        [HexForm::Java, HexForm::Unicode, HexForm::C, HexForm::Xml, HexForm::Xml10, HexForm::Perl, HexForm::Plain];

    /// The variant name used in IDs.
    pub fn name(self) -> &'static str {
        match self {
            HexForm::Java => "Java",
            HexForm::Unicode => "Unicode",
            HexForm::C => "C",
            HexForm::Xml => "XML",
            HexForm::Xml10 => "XML10",
            HexForm::Perl => "Perl",
            HexForm::Plain => "Plain",
        }
    }

    fn syntaxes(self) -> &'static [Syntax] {
        match self {
            HexForm::Java => JAVA,
            HexForm::Unicode => UNICODE,
            HexForm::C => C,
            HexForm::Xml => XML,
            HexForm::Xml10 => XML10,
            HexForm::Perl => PERL,
            HexForm::Plain => &[],
        }
    }

    /// Append the escape for `c`.
    pub fn push_escaped(self, out: &mut String, c: char) {
        let cp = c as u32;
        // Writing to a String cannot fail.
        let _ = match self {
            HexForm::Java => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{unit:04X}");
                }
                Ok(())
            }
            HexForm::C if cp > 0xFFFF => write!(out, "\\U{cp:08X}"),
            HexForm::C => write!(out, "\\u{cp:04X}"),
            HexForm::Unicode => write!(out, "U+{cp:04X}"),
            HexForm::Xml => write!(out, "&#x{cp:X};"),
            HexForm::Xml10 => write!(out, "&#{cp};"),
            HexForm::Perl => write!(out, "\\x{{{cp:X}}}"),
            HexForm::Plain => write!(out, "{cp:04X}"),
        };
    }

    /// Escape every code point of the run.
    pub(crate) fn escape(self, text: &mut dyn Replaceable, pos: &mut Position) {
        while pos.start < pos.limit {
            let mut escaped = String::new();
            self.push_escaped(&mut escaped, text.char_at(pos.start));
            let start = pos.start;
            pos.start += replace_in(text, pos, start, start + 1, &escaped);
        }
    }

    /// Decode escapes in the run; `form == None` accepts every notation
    /// except `Plain`.
    pub(crate) fn unescape(form: Option<HexForm>, text: &mut dyn Replaceable, pos: &mut Position, incremental: bool) {
        let syntaxes: Vec<&Syntax> = match form {
            Some(form) => form.syntaxes().iter().collect(),
            None => UNESCAPE_ORDER.iter().flat_map(|f| f.syntaxes()).collect(),
        };
        while pos.start < pos.limit {
            match decode_at(&syntaxes, text, pos.start, pos.limit, incremental) {
                Decoded::Wait => return,
                Decoded::None => pos.start += 1,
                Decoded::Char(c, end) => {
                    let start = pos.start;
                    replace_in(text, pos, start, end, c.encode_utf8(&mut [0; 4]));
                    pos.start += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::apply_whole;
    use crate::transliterator::ReplaceableString;

    #[test]
    fn escape_forms() {
        let cases = vec![
            (HexForm::Java, "\\u0061\\u00E9\\uD83D\\uDE00"),
            (HexForm::C, "\\u0061\\u00E9\\U0001F600"),
            (HexForm::Unicode, "U+0061U+00E9U+1F600"),
            (HexForm::Xml, "&#x61;&#xE9;&#x1F600;"),
            (HexForm::Xml10, "&#97;&#233;&#128512;"),
            (HexForm::Perl, "\\x{61}\\x{E9}\\x{1F600}"),
            (HexForm::Plain, "006100E91F600"),
        ];
        for (form, expected) in cases {
            assert_eq!(apply_whole("aé😀", |t, p| form.escape(t, p)), expected, "{form:?}");
        }
    }

    #[test]
    fn unescape_every_form() {
        let input = "\\u0041&#x42;&#67;U+0044\\x{45}\\U0001F600\\uD83D\\uDE00 \\q";
        let out = apply_whole(input, |t, p| HexForm::unescape(None, t, p, false));
        assert_eq!(out, "ABCDE😀😀 \\q");
    }

    #[test]
    fn unescape_one_form_leaves_others() {
        let out = apply_whole("&#x41;\\u0042", |t, p| HexForm::unescape(Some(HexForm::Xml), t, p, false));
        assert_eq!(out, "A\\u0042");
    }

    #[test]
    fn lone_high_surrogate_is_left_alone() {
        let out = apply_whole("\\uD83Dx", |t, p| HexForm::unescape(None, t, p, false));
        assert_eq!(out, "\\uD83Dx");
    }

    #[test]
    fn incremental_waits_inside_an_escape() {
        let mut text = ReplaceableString::new("ab\\u00");
        let mut pos = Position::full(6);
        HexForm::unescape(None, &mut text, &mut pos, true);
        assert_eq!(pos.start, 2);

        let mut text = ReplaceableString::new("ab\\u0063");
        let mut pos = Position::full(8);
        HexForm::unescape(None, &mut text, &mut pos, true);
        assert_eq!(text.to_string(), "abc");
        assert_eq!((pos.start, pos.limit), (3, 3));
    }
}
