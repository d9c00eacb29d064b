//! `Any-Lower`, `Any-Upper`, `Any-Title` and `Any-CaseFold`.
//!
//! Mappings are full (one code point may become several) and come from the
//! ICU4X case data in `icu_casemap`, applied one code point at a time with
//! the root locale. Two mappings read context: lowercasing `Σ` depends on
//! whether it ends a word, and titlecasing depends on whether the previous
//! non-ignorable character is cased.

use super::replace_in;
use crate::properties::{is_case_ignorable, is_cased};
use crate::transliterator::{Position, Replaceable};
use icu_casemap::{CaseMapper, CaseMapperBorrowed};
use icu_locale_core::LanguageIdentifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseMapping {
    Lower,
    Upper,
    Title,
    Fold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaseType {
    Uncased,
    Cased,
    Ignorable,
}

fn case_type(c: char) -> CaseType {
    if is_case_ignorable(c) {
        CaseType::Ignorable
    } else if is_cased(c) {
        CaseType::Cased
    } else {
        CaseType::Uncased
    }
}

/// The nearest case type before `index`, skipping case-ignorables.
fn preceding_type(text: &dyn Replaceable, context_start: usize, index: usize) -> CaseType {
    (context_start..index)
        .rev()
        .map(|i| case_type(text.char_at(i)))
        .find(|t| *t != CaseType::Ignorable)
        .unwrap_or(CaseType::Uncased)
}

/// Whether the `Σ` at `pos.start` ends a word. `None` when the answer
/// depends on text past the end of the context.
fn is_final_sigma(text: &dyn Replaceable, pos: &Position, incremental: bool) -> Option<bool> {
    if preceding_type(text, pos.context_start, pos.start) != CaseType::Cased {
        return Some(false);
    }
    for i in pos.start + 1..pos.context_limit {
        match case_type(text.char_at(i)) {
            CaseType::Ignorable => {}
            found => return Some(found != CaseType::Cased),
        }
    }
    if incremental { None } else { Some(true) }
}

fn mapper() -> CaseMapperBorrowed<'static> {
    CaseMapper::new()
}

fn root() -> LanguageIdentifier {
    LanguageIdentifier::UNKNOWN
}

fn upper(c: char) -> String {
    String::from(mapper().uppercase_to_string(c.encode_utf8(&mut [0; 4]), &root()))
}

fn lower(c: char) -> String {
    String::from(mapper().lowercase_to_string(c.encode_utf8(&mut [0; 4]), &root()))
}

fn fold(c: char) -> String {
    String::from(mapper().fold_string(c.encode_utf8(&mut [0; 4])))
}

/// Full titlecase: the simple mapping unless uppercasing expands, in which
/// case the first character is kept upper and the rest lowered (`ß` to `Ss`).
fn titlecase(c: char) -> String {
    let upper = upper(c);
    let mut chars = upper.chars();
    match (chars.next(), chars.next()) {
        (Some(_), None) | (None, _) => mapper().simple_titlecase(c).to_string(),
        (Some(first), Some(second)) => {
            let mut out = first.to_string();
            for rest in std::iter::once(second).chain(chars) {
                out.push_str(&lower(rest));
            }
            out
        }
    }
}

impl CaseMapping {
    pub fn name(self) -> &'static str {
        match self {
            CaseMapping::Lower => "Lower",
            CaseMapping::Upper => "Upper",
            CaseMapping::Title => "Title",
            CaseMapping::Fold => "CaseFold",
        }
    }

    pub fn max_context_length(self) -> usize {
        match self {
            CaseMapping::Title => 2,
            _ => 0,
        }
    }

    fn lower_in_context(text: &dyn Replaceable, pos: &Position, c: char, incremental: bool) -> Option<String> {
        if c != 'Σ' {
            return Some(lower(c));
        }
        is_final_sigma(text, pos, incremental).map(|last| if last { "ς" } else { "σ" }.to_string())
    }

    pub(crate) fn transliterate(self, text: &mut dyn Replaceable, pos: &mut Position, incremental: bool) {
        let mut title_next = preceding_type(text, pos.context_start, pos.start) != CaseType::Cased;
        while pos.start < pos.limit {
            let c = text.char_at(pos.start);
            let kind = case_type(c);
            let mapped = match self {
                CaseMapping::Upper => Some(upper(c)),
                CaseMapping::Fold => Some(fold(c)),
                CaseMapping::Lower => Self::lower_in_context(text, pos, c, incremental),
                CaseMapping::Title => match kind {
                    CaseType::Ignorable => Some(c.to_string()),
                    _ if title_next => Some(titlecase(c)),
                    _ => Self::lower_in_context(text, pos, c, incremental),
                },
            };
            let Some(mapped) = mapped else {
                return;
            };
            if kind != CaseType::Ignorable {
                title_next = kind == CaseType::Uncased;
            }

            let mut chars = mapped.chars();
            if chars.next() == Some(c) && chars.next().is_none() {
                pos.start += 1;
            } else {
                let start = pos.start;
                pos.start += replace_in(text, pos, start, start + 1, &mapped);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::apply_whole;

    fn map(mapping: CaseMapping, text: &str) -> String {
        apply_whole(text, |t, p| mapping.transliterate(t, p, false))
    }

    #[test]
    fn full_mappings() {
        let cases = vec![
            (CaseMapping::Upper, "straße", "STRASSE"),
            (CaseMapping::Lower, "HELLO World", "hello world"),
            (CaseMapping::Fold, "Straße ΣΑΣ", "strasse σασ"),
            (CaseMapping::Upper, "ﬁne", "FINE"),
            (CaseMapping::Lower, "İ", "i\u{307}"),
            (CaseMapping::Fold, "ıİ", "ıi\u{307}"),
        ];
        for (mapping, input, expected) in cases {
            assert_eq!(map(mapping, input), expected, "{mapping:?} {input}");
        }
    }

    #[test]
    fn final_sigma_depends_on_context() {
        assert_eq!(map(CaseMapping::Lower, "ΟΔΟΣ ΣΑΣ"), "οδος σας");
        assert_eq!(map(CaseMapping::Lower, "Σ"), "σ");
        assert_eq!(map(CaseMapping::Lower, "ΑΣ'Α"), "ασ'α");
    }

    #[test]
    fn final_sigma_waits_at_the_end_of_input() {
        let mut text = crate::transliterator::ReplaceableString::new("ΑΣ");
        let mut pos = Position::full(2);
        CaseMapping::Lower.transliterate(&mut text, &mut pos, true);
        assert_eq!(text.to_string(), "αΣ");
        assert_eq!(pos.start, 1);
    }

    #[test]
    fn title_case_words() {
        let cases = vec![
            ("hello wORLD", "Hello World"),
            ("can't stop", "Can't Stop"),
            ("ǆemal ǉubav", "ǅemal ǈubav"),
            ("ßa x", "Ssa X"),
        ];
        for (input, expected) in cases {
            assert_eq!(map(CaseMapping::Title, input), expected, "{input}");
        }
    }

    #[test]
    fn title_case_reads_ante_context() {
        let mut text = crate::transliterator::ReplaceableString::new("abc def");
        let mut pos = Position::new(0, 1, 7, 7);
        CaseMapping::Title.transliterate(&mut text, &mut pos, false);
        assert_eq!(text.to_string(), "abc Def");
    }
}
