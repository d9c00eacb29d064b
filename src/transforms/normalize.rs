//! `Any-NFC`, `Any-NFD`, `Any-NFKC` and `Any-NFKD`.
//!
//! A run is normalized as a whole. In incremental mode the last segment (a
//! starter and the marks after it) is held back, since a combining mark typed
//! next could still reorder or compose with it.

use super::replace_in;
use crate::properties::{GeneralCategory, general_category};
use crate::transliterator::{Position, Replaceable};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::canonical_combining_class;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormalizationForm {
    Nfc,
    Nfd,
    Nfkc,
    Nfkd,
}

/// Whether normalization never looks across a boundary just before `c`.
fn starts_segment(c: char) -> bool {
    use GeneralCategory::*;
    canonical_combining_class(c) == 0
        && !matches!(general_category(c), NonspacingMark | SpacingMark | EnclosingMark)
        && !('\u{1161}'..='\u{11FF}').contains(&c)
        && !matches!(c, '\u{FF9E}' | '\u{FF9F}')
}

impl NormalizationForm {
    pub fn name(self) -> &'static str {
        match self {
            NormalizationForm::Nfc => "NFC",
            NormalizationForm::Nfd => "NFD",
            NormalizationForm::Nfkc => "NFKC",
            NormalizationForm::Nfkd => "NFKD",
        }
    }

    pub fn normalize(self, text: &str) -> String {
        match self {
            NormalizationForm::Nfc => text.nfc().collect(),
            NormalizationForm::Nfd => text.nfd().collect(),
            NormalizationForm::Nfkc => text.nfkc().collect(),
            NormalizationForm::Nfkd => text.nfkd().collect(),
        }
    }

    pub(crate) fn transliterate(self, text: &mut dyn Replaceable, pos: &mut Position, incremental: bool) {
        let start = pos.start;
        let end = if incremental {
            match (start + 1..pos.limit).rev().find(|&i| starts_segment(text.char_at(i))) {
                Some(boundary) => boundary,
                None => return,
            }
        } else {
            pos.limit
        };

        let input = text.substring(start, end);
        let output = self.normalize(&input);
        pos.start = if output == input { end } else { start + replace_in(text, pos, start, end, &output) };
    }
}
