//! Transliterator ID grammar.
//!
//! ```text
//! compound := [global ';'] element (';' element)* [';' '(' filter ')']
//! element  := single ['(' [single] ')']  |  '(' [single] ')'
//! single   := [filter] basic  |  basic filter  |  filter
//! basic    := [source '-'] target ['/' variant]
//! ```
//!
//! The parenthesized part of an element names the step to use in the reverse
//! direction. Without it, the reverse step is derived from the forward one by
//! swapping source and target (or through a special inverse such as
//! `Upper` ⇄ `Lower` when the source is `Any`).

use crate::error::{Error, Result};
use crate::unicode_set::UnicodeSet;
use crate::unicode_set::pattern::{is_set_start, parse_set, skip_whitespace};
use std::fmt;

pub(crate) const ANY: &str = "Any";

/// `Source-Target/Variant`, spelled as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicId {
    /// `None` when the ID omitted it; the source is then `Any`.
    pub source: Option<String>,
    pub target: String,
    pub variant: Option<String>,
}

impl BasicId {
    pub fn new(source: &str, target: &str, variant: Option<&str>) -> Self {
        BasicId { source: Some(source.to_string()), target: target.to_string(), variant: variant.map(str::to_string) }
    }

    /// Parse a bare `S-T/V`, `T/V`, `S-T` or `T`.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = regex!(r"^(?:(\w+)\s*-\s*)?(\w+)(?:\s*/\s*(\w+))?$").captures(text.trim())?;
        Some(BasicId {
            source: caps.get(1).map(|m| m.as_str().to_string()),
            target: caps.get(2)?.as_str().to_string(),
            variant: caps.get(3).map(|m| m.as_str().to_string()),
        })
    }

    pub fn source(&self) -> &str {
        self.source.as_deref().unwrap_or(ANY)
    }

    /// `Source-Target[/Variant]` with the implicit `Any` filled in.
    pub fn canonical(&self) -> String {
        let mut id = format!("{}-{}", self.source(), self.target);
        if let Some(variant) = &self.variant {
            id.push('/');
            id.push_str(variant);
        }
        id
    }

    /// The reverse-direction ID.
    ///
    /// `special` maps a target to its special inverse target; it is only
    /// consulted when the source is `Any`.
    pub(crate) fn inverse(&self, special: &dyn Fn(&str) -> Option<String>) -> BasicId {
        if self.source().eq_ignore_ascii_case(ANY) {
            if let Some(target) = special(&self.target) {
                return BasicId { source: self.source.clone(), target, variant: self.variant.clone() };
            }
        }
        BasicId {
            source: Some(self.target.clone()),
            target: self.source().to_string(),
            variant: self.variant.clone(),
        }
    }
}

impl fmt::Display for BasicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "{source}-")?;
        }
        f.write_str(&self.target)?;
        if let Some(variant) = &self.variant {
            write!(f, "/{variant}")?;
        }
        Ok(())
    }
}

/// One step: an optional inline filter and an optional basic ID.
#[derive(Debug, Clone)]
pub(crate) struct SingleId {
    pub filter: Option<UnicodeSet>,
    pub basic: Option<BasicId>,
}

impl SingleId {
    fn is_filter_only(&self) -> bool {
        self.filter.is_some() && self.basic.is_none()
    }
}

impl fmt::Display for SingleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(filter) = &self.filter {
            f.write_str(&filter.to_pattern(false))?;
        }
        if let Some(basic) = &self.basic {
            write!(f, "{basic}")?;
        }
        Ok(())
    }
}

/// A forward step and, when parenthesized, an explicit reverse step.
#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub forward: Option<SingleId>,
    pub reverse: Option<SingleId>,
    pub parens: bool,
}

impl Element {
    /// The element as seen from the other direction.
    pub(crate) fn reversed(&self, special: &dyn Fn(&str) -> Option<String>) -> Element {
        if self.parens {
            return Element { forward: self.reverse.clone(), reverse: self.forward.clone(), parens: true };
        }
        let forward = self.forward.as_ref().map(|single| SingleId {
            filter: single.filter.clone(),
            basic: single.basic.as_ref().map(|b| b.inverse(special)),
        });
        Element { forward, reverse: None, parens: false }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(forward) = &self.forward {
            write!(f, "{forward}")?;
        }
        if self.parens {
            f.write_str("(")?;
            if let Some(reverse) = &self.reverse {
                write!(f, "{reverse}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// A full, possibly compound, ID.
#[derive(Debug, Clone)]
pub(crate) struct CompoundId {
    pub global_filter: Option<UnicodeSet>,
    pub elements: Vec<Element>,
    /// `([filter])` as the last element: the global filter of the inverse.
    pub reverse_filter: Option<UnicodeSet>,
}

impl CompoundId {
    pub(crate) fn parse(id: &str) -> Result<Self> {
        let chars: Vec<char> = id.chars().collect();
        let mut pos = 0;
        let mut elements = Vec::new();
        loop {
            let element = parse_element(&chars, &mut pos).map_err(|_| Error::InvalidId(id.to_string()))?;
            pos = skip_whitespace(&chars, pos);
            if let Some(element) = element {
                elements.push(element);
            }
            match chars.get(pos).copied() {
                None => break,
                Some(';') => pos += 1,
                Some(_) => return Err(Error::InvalidId(id.to_string())),
            }
        }

        let mut global_filter = None;
        let mut reverse_filter = None;
        if let Some(first) = elements.first() {
            if !first.parens && first.forward.as_ref().is_some_and(SingleId::is_filter_only) {
                global_filter = elements.remove(0).forward.and_then(|s| s.filter);
            }
        }
        if let Some(last) = elements.last() {
            if last.parens && last.forward.is_none() && last.reverse.as_ref().is_some_and(SingleId::is_filter_only) {
                reverse_filter = elements.pop().and_then(|e| e.reverse).and_then(|s| s.filter);
            }
        }
        let stray_filter = elements.iter().any(|e| {
            e.forward.as_ref().is_some_and(SingleId::is_filter_only)
                || e.reverse.as_ref().is_some_and(SingleId::is_filter_only)
        });
        if stray_filter {
            return Err(Error::InvalidId(id.to_string()));
        }
        Ok(CompoundId { global_filter, elements, reverse_filter })
    }

    /// The ID of the inverse: elements reversed and each one inverted.
    pub(crate) fn reversed(&self, special: &dyn Fn(&str) -> Option<String>) -> CompoundId {
        CompoundId {
            global_filter: self.reverse_filter.clone(),
            elements: self.elements.iter().rev().map(|e| e.reversed(special)).collect(),
            reverse_filter: self.global_filter.clone(),
        }
    }
}

impl fmt::Display for CompoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if let Some(filter) = &self.global_filter {
            parts.push(filter.to_pattern(false));
        }
        parts.extend(self.elements.iter().map(Element::to_string));
        if let Some(filter) = &self.reverse_filter {
            parts.push(format!("({})", filter.to_pattern(false)));
        }
        f.write_str(&parts.join(";"))
    }
}

fn is_id_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '/'
}

/// Parse `[filter] basic` at `pos`. Returns `None` when neither is present.
pub(crate) fn parse_single(chars: &[char], pos: &mut usize) -> Result<Option<SingleId>> {
    *pos = skip_whitespace(chars, *pos);
    let mut filter = None;
    if is_set_start(chars, *pos) {
        filter = Some(parse_set(chars, pos, None)?.frozen());
        *pos = skip_whitespace(chars, *pos);
    }

    let begin = *pos;
    let mut end = begin;
    let mut scan = begin;
    while let Some(&c) = chars.get(scan) {
        if is_id_char(c) {
            scan += 1;
            end = scan;
        } else if c.is_whitespace() {
            scan += 1;
        } else {
            break;
        }
    }
    let basic = if end > begin {
        let text: String = chars[begin..end].iter().collect();
        match BasicId::parse(&text) {
            Some(basic) => Some(basic),
            None => return Err(Error::InvalidId(text)),
        }
    } else {
        None
    };
    *pos = end;

    // The filter may also follow the ID, as in `Remove[aeiou]`, but only once.
    let after = skip_whitespace(chars, *pos);
    if basic.is_some() && is_set_start(chars, after) {
        if filter.is_some() {
            return Err(Error::InvalidId(chars.iter().collect()));
        }
        *pos = after;
        filter = Some(parse_set(chars, pos, None)?.frozen());
    }

    if filter.is_none() && basic.is_none() {
        return Ok(None);
    }
    Ok(Some(SingleId { filter, basic }))
}

/// Parse one element of a compound ID, up to (not including) `;`.
pub(crate) fn parse_element(chars: &[char], pos: &mut usize) -> Result<Option<Element>> {
    let forward = parse_single(chars, pos)?;
    *pos = skip_whitespace(chars, *pos);
    if chars.get(*pos) != Some(&'(') {
        return Ok(forward.map(|single| Element { forward: Some(single), reverse: None, parens: false }));
    }
    *pos += 1;
    let reverse = parse_single(chars, pos)?;
    *pos = skip_whitespace(chars, *pos);
    if chars.get(*pos) != Some(&')') {
        let text: String = chars.iter().collect();
        return Err(Error::InvalidId(text));
    }
    *pos += 1;
    Ok(Some(Element { forward, reverse, parens: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specials(target: &str) -> Option<String> {
        match target.to_ascii_lowercase().as_str() {
            "upper" => Some("Lower".into()),
            "lower" => Some("Upper".into()),
            "nfkc" => Some("NFKD".into()),
            "nfkd" => Some("NFKC".into()),
            "title" => Some("Lower".into()),
            _ => None,
        }
    }

    #[test]
    fn basic_ids_fill_in_any() {
        let cases = vec![
            ("Greek-Latin", "Greek-Latin", "Greek-Latin"),
            ("Lower", "Any-Lower", "Lower"),
            ("Any-Hex/XML", "Any-Hex/XML", "Any-Hex/XML"),
            (" Hex / C ", "Any-Hex/C", "Hex/C"),
        ];
        for (input, canonical, display) in cases {
            let id = BasicId::parse(input).unwrap();
            assert_eq!(id.canonical(), canonical, "{input}");
            assert_eq!(id.to_string(), display, "{input}");
        }
        assert!(BasicId::parse("a-b-c").is_none());
        assert!(BasicId::parse("").is_none());
    }

    #[test]
    fn inverse_ids_follow_the_grammar() {
        let cases = vec![
            ("Upper(Lower);(NFKC)", "NFKC();Lower(Upper)"),
            ("Greek-Latin; Title()", "(Title);Latin-Greek"),
            ("Any-Upper", "Any-Lower"),
            ("NFKD", "NFKC"),
            ("[abc]Latin-Greek/UNGEGN", "[abc]Greek-Latin/UNGEGN"),
            ("[a-z];Lower", "Upper;([a-z])"),
        ];
        for (input, expected) in cases {
            let inverse = CompoundId::parse(input).unwrap().reversed(&specials);
            assert_eq!(inverse.to_string(), expected, "{input}");
        }
    }

    #[test]
    fn filter_may_follow_the_id() {
        let id = CompoundId::parse("Remove[aeiou]").unwrap();
        let single = id.elements[0].forward.as_ref().unwrap();
        assert!(single.filter.as_ref().is_some_and(|f| f.contains('e')));
        assert_eq!(single.basic.as_ref().map(BasicId::canonical), Some("Any-Remove".to_string()));
        assert_eq!(id.to_string(), "[aeiou]Remove");
        assert!(id.global_filter.is_none());
    }

    #[test]
    fn global_filters_only_at_the_ends() {
        let id = CompoundId::parse("[:Ll:]; Upper; ([:Lu:])").unwrap();
        assert!(id.global_filter.is_some());
        assert!(id.reverse_filter.is_some());
        assert_eq!(id.elements.len(), 1);

        for bad in ["Upper;[abc];Lower", "Greek-Latin(", "Lower Upper", "a-b-c", "Lower)", "[a]Lower[b]"] {
            assert!(matches!(CompoundId::parse(bad), Err(Error::InvalidId(_))), "{bad}");
        }
    }
}
