//! Sets of code points and strings.
//!
//! A [`UnicodeSet`] holds a sorted list of disjoint, non-adjacent closed code
//! point ranges plus a sorted set of multi-character strings. Sets are built
//! programmatically or parsed from the bracket syntax in
//! [`pattern`](self::pattern), and can be frozen for sharing.
//!
//! Storage is copy-on-write: clones share the same data until one of them
//! mutates.

#[path = "unicode_set/pattern.rs"]
pub(crate) mod pattern;

use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

pub use pattern::{SymbolTable, SymbolValue};

/// Highest Unicode code point.
pub(crate) const MAX_CODE_POINT: u32 = 0x10FFFF;

/// The non-character used to mark context boundaries inside sets.
pub const ETHER: char = '\u{FFFF}';

#[derive(Debug, Clone, Default)]
struct SetData {
    ranges: Vec<(u32, u32)>,
    strings: BTreeSet<String>,
    /// Pattern text this set was parsed from, if unmodified since.
    pattern: Option<String>,
}

/// A mutable or frozen set of code points and strings.
#[derive(Clone, Default)]
pub struct UnicodeSet {
    data: Arc<SetData>,
    frozen: bool,
}

impl UnicodeSet {
    /// The empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a set pattern such as `[a-z[:Lu:]{ch}]`.
    pub fn from_pattern(pattern: &str) -> Result<Self> {
        pattern::parse_pattern(pattern, None)
    }

    /// Parse a set pattern, resolving `$name` references through `symbols`.
    pub fn from_pattern_with(pattern: &str, symbols: &dyn SymbolTable) -> Result<Self> {
        pattern::parse_pattern(pattern, Some(symbols))
    }

    /// Build a set from ranges that are already sorted by start.
    pub(crate) fn from_sorted_ranges(ranges: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let mut out: Vec<(u32, u32)> = Vec::new();
        for (a, b) in ranges {
            push_range(&mut out, a, b);
        }
        UnicodeSet { data: Arc::new(SetData { ranges: out, ..SetData::default() }), frozen: false }
    }

    /// Replace the contents of this set with the parsed `pattern`.
    pub fn apply_pattern(&mut self, pattern: &str) -> Result<()> {
        if self.frozen {
            return Err(Error::Frozen);
        }
        let parsed = Self::from_pattern(pattern)?;
        self.data = parsed.data;
        Ok(())
    }

    // --- Lifecycle ----------------------------------------------------------

    /// Make the set immutable. Further mutation returns [`Error::Frozen`].
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Builder-style [`freeze`](Self::freeze).
    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// A mutable copy. The data itself is copied lazily on first mutation.
    pub fn clone_as_thawed(&self) -> Self {
        UnicodeSet { data: Arc::clone(&self.data), frozen: false }
    }

    fn data_mut(&mut self) -> Result<&mut SetData> {
        if self.frozen {
            return Err(Error::Frozen);
        }
        let data = Arc::make_mut(&mut self.data);
        data.pattern = None;
        Ok(data)
    }

    pub(crate) fn set_pattern(&mut self, pattern: String) {
        Arc::make_mut(&mut self.data).pattern = Some(pattern);
    }

    // --- Mutation -----------------------------------------------------------

    pub fn add(&mut self, c: char) -> Result<()> {
        self.add_range(c, c)
    }

    /// Add `start..=end`. An inverted range adds nothing.
    pub fn add_range(&mut self, start: char, end: char) -> Result<()> {
        self.add_cp_range(start as u32, end as u32)
    }

    pub(crate) fn add_cp_range(&mut self, start: u32, end: u32) -> Result<()> {
        let data = self.data_mut()?;
        if start <= end {
            data.ranges = union(&data.ranges, &[(start, end)]);
        }
        Ok(())
    }

    /// Add a string. A one-character string is added as a code point.
    pub fn add_str(&mut self, s: &str) -> Result<()> {
        match single_char(s) {
            Some(c) => self.add(c),
            None => {
                self.data_mut()?.strings.insert(s.to_string());
                Ok(())
            }
        }
    }

    pub fn remove(&mut self, c: char) -> Result<()> {
        self.remove_range(c, c)
    }

    pub fn remove_range(&mut self, start: char, end: char) -> Result<()> {
        let data = self.data_mut()?;
        if start <= end {
            data.ranges = difference(&data.ranges, &[(start as u32, end as u32)]);
        }
        Ok(())
    }

    pub fn remove_str(&mut self, s: &str) -> Result<()> {
        match single_char(s) {
            Some(c) => self.remove(c),
            None => {
                self.data_mut()?.strings.remove(s);
                Ok(())
            }
        }
    }

    /// Union.
    pub fn add_all(&mut self, other: &UnicodeSet) -> Result<()> {
        let data = self.data_mut()?;
        data.ranges = union(&data.ranges, &other.data.ranges);
        data.strings.extend(other.data.strings.iter().cloned());
        Ok(())
    }

    /// Intersection.
    pub fn retain_all(&mut self, other: &UnicodeSet) -> Result<()> {
        let data = self.data_mut()?;
        data.ranges = intersection(&data.ranges, &other.data.ranges);
        data.strings.retain(|s| other.data.strings.contains(s));
        Ok(())
    }

    /// Difference.
    pub fn remove_all(&mut self, other: &UnicodeSet) -> Result<()> {
        let data = self.data_mut()?;
        data.ranges = difference(&data.ranges, &other.data.ranges);
        data.strings.retain(|s| !other.data.strings.contains(s));
        Ok(())
    }

    /// Complement the code points. Strings are unaffected.
    pub fn complement(&mut self) -> Result<()> {
        let data = self.data_mut()?;
        data.ranges = invert(&data.ranges);
        Ok(())
    }

    /// Complement a set that is known to be unfrozen.
    pub(crate) fn complement_in_place(&mut self) {
        let data = Arc::make_mut(&mut self.data);
        data.pattern = None;
        data.ranges = invert(&data.ranges);
    }

    /// Symmetric difference.
    pub fn complement_all(&mut self, other: &UnicodeSet) -> Result<()> {
        let data = self.data_mut()?;
        let ours_only = difference(&data.ranges, &other.data.ranges);
        let theirs_only = difference(&other.data.ranges, &data.ranges);
        data.ranges = union(&ours_only, &theirs_only);
        for s in &other.data.strings {
            if !data.strings.remove(s) {
                data.strings.insert(s.clone());
            }
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        let data = self.data_mut()?;
        data.ranges.clear();
        data.strings.clear();
        Ok(())
    }

    // --- Queries ------------------------------------------------------------

    pub fn contains(&self, c: char) -> bool {
        self.contains_cp(c as u32)
    }

    pub(crate) fn contains_cp(&self, cp: u32) -> bool {
        let ranges = &self.data.ranges;
        let idx = ranges.partition_point(|&(_, end)| end < cp);
        idx < ranges.len() && ranges[idx].0 <= cp
    }

    /// Whether every code point in `start..=end` is a member.
    pub fn contains_range(&self, start: char, end: char) -> bool {
        let (a, b) = (start as u32, end as u32);
        if a > b {
            return true;
        }
        let ranges = &self.data.ranges;
        let idx = ranges.partition_point(|&(_, e)| e < a);
        idx < ranges.len() && ranges[idx].0 <= a && b <= ranges[idx].1
    }

    /// Membership of a code point (one-character string) or string.
    pub fn contains_str(&self, s: &str) -> bool {
        match single_char(s) {
            Some(c) => self.contains(c),
            None => self.data.strings.contains(s),
        }
    }

    /// Whether `other` is a subset of this set.
    pub fn contains_all(&self, other: &UnicodeSet) -> bool {
        difference(&other.data.ranges, &self.data.ranges).is_empty()
            && other.data.strings.iter().all(|s| self.data.strings.contains(s))
    }

    /// Whether `s` can be covered by members of this set, where
    /// multi-character members may cover several characters at once.
    pub fn contains_all_str(&self, s: &str) -> bool {
        let chars: Vec<char> = s.chars().collect();
        let mut reachable = vec![false; chars.len() + 1];
        reachable[0] = true;
        for i in 0..chars.len() {
            if !reachable[i] {
                continue;
            }
            if self.contains(chars[i]) {
                reachable[i + 1] = true;
            }
            for member in &self.data.strings {
                let len = member.chars().count();
                if len > 0 && i + len <= chars.len() && member.chars().eq(chars[i..i + len].iter().copied()) {
                    reachable[i + len] = true;
                }
            }
        }
        reachable[chars.len()]
    }

    /// Whether the two sets share no element.
    pub fn contains_none(&self, other: &UnicodeSet) -> bool {
        intersection(&self.data.ranges, &other.data.ranges).is_empty()
            && !other.data.strings.iter().any(|s| self.data.strings.contains(s))
    }

    pub fn contains_some(&self, other: &UnicodeSet) -> bool {
        !self.contains_none(other)
    }

    /// Whether no character of `s`, and no string member, occurs in `s`.
    pub fn contains_none_str(&self, s: &str) -> bool {
        !s.chars().any(|c| self.contains(c)) && !self.data.strings.iter().any(|m| !m.is_empty() && s.contains(m.as_str()))
    }

    pub fn contains_some_str(&self, s: &str) -> bool {
        !self.contains_none_str(s)
    }

    /// Number of code points plus number of strings.
    pub fn len(&self) -> usize {
        let cps: usize = self.data.ranges.iter().map(|&(a, b)| (b - a + 1) as usize).sum();
        cps + self.data.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.ranges.is_empty() && self.data.strings.is_empty()
    }

    /// The code point ranges, inclusive, ascending.
    pub fn ranges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.data.ranges.iter().copied()
    }

    /// The multi-character string members, sorted.
    pub fn strings(&self) -> impl Iterator<Item = &str> + '_ {
        self.data.strings.iter().map(String::as_str)
    }

    pub(crate) fn has_strings(&self) -> bool {
        !self.data.strings.is_empty()
    }

    /// Whether any member could start with a character whose low byte is `v`.
    pub(crate) fn matches_index_value(&self, v: u8) -> bool {
        let v = u32::from(v);
        let by_range = self.data.ranges.iter().any(|&(a, b)| {
            if b - a >= 0xFF {
                return true;
            }
            let (lo, hi) = (a & 0xFF, b & 0xFF);
            if lo <= hi { (lo..=hi).contains(&v) } else { v >= lo || v <= hi }
        });
        by_range
            || self
                .data
                .strings
                .iter()
                .any(|s| match s.chars().next() {
                    Some(c) => (c as u32) & 0xFF == v,
                    None => true,
                })
    }

    /// Render as a pattern. Parsed sets return their normalized source text.
    pub fn to_pattern(&self, escape_unprintable: bool) -> String {
        if let Some(pattern) = &self.data.pattern {
            if !escape_unprintable {
                return pattern.clone();
            }
            let mut out = String::new();
            for c in pattern.chars() {
                if is_unprintable(c) {
                    push_hex_escape(&mut out, c);
                } else {
                    out.push(c);
                }
            }
            return out;
        }
        self.generate_pattern(escape_unprintable)
    }

    fn generate_pattern(&self, escape_unprintable: bool) -> String {
        let mut out = String::from("[");
        for &(a, b) in &self.data.ranges {
            push_pattern_cp(&mut out, a, escape_unprintable);
            if b != a {
                if b != a + 1 {
                    out.push('-');
                }
                push_pattern_cp(&mut out, b, escape_unprintable);
            }
        }
        for s in &self.data.strings {
            out.push('{');
            for c in s.chars() {
                push_pattern_char(&mut out, c, escape_unprintable);
            }
            out.push('}');
        }
        out.push(']');
        out
    }
}

impl PartialEq for UnicodeSet {
    fn eq(&self, other: &Self) -> bool {
        self.data.ranges == other.data.ranges && self.data.strings == other.data.strings
    }
}

impl Eq for UnicodeSet {}

impl fmt::Debug for UnicodeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnicodeSet({})", self.to_pattern(true))
    }
}

impl fmt::Display for UnicodeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_pattern(false))
    }
}

impl std::str::FromStr for UnicodeSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_pattern(s)
    }
}

// --- Pattern rendering helpers ----------------------------------------------

pub(crate) fn is_unprintable(c: char) -> bool {
    !(' '..='~').contains(&c)
}

pub(crate) fn push_hex_escape(out: &mut String, c: char) {
    let cp = c as u32;
    if cp > 0xFFFF {
        out.push_str(&format!("\\U{cp:08X}"));
    } else {
        out.push_str(&format!("\\u{cp:04X}"));
    }
}

fn push_pattern_cp(out: &mut String, cp: u32, escape_unprintable: bool) {
    match char::from_u32(cp) {
        Some(c) => push_pattern_char(out, c, escape_unprintable),
        None => out.push_str(&format!("\\u{cp:04X}")),
    }
}

fn push_pattern_char(out: &mut String, c: char, escape_unprintable: bool) {
    if escape_unprintable && is_unprintable(c) {
        push_hex_escape(out, c);
        return;
    }
    if matches!(c, '[' | ']' | '-' | '^' | '&' | '\\' | '{' | '}' | '$' | ':' | '\'') || c.is_whitespace() {
        out.push('\\');
    }
    out.push(c);
}

fn single_char(s: &str) -> Option<char> {
    let mut it = s.chars();
    match (it.next(), it.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

// --- Range algebra ----------------------------------------------------------

/// Append a range to a list sorted by start, merging overlap and adjacency.
fn push_range(out: &mut Vec<(u32, u32)>, a: u32, b: u32) {
    if let Some(last) = out.last_mut() {
        if a <= last.1.saturating_add(1) {
            last.1 = last.1.max(b);
            return;
        }
    }
    out.push((a, b));
}

fn union(x: &[(u32, u32)], y: &[(u32, u32)]) -> Vec<(u32, u32)> {
    let mut out = Vec::with_capacity(x.len() + y.len());
    let (mut i, mut j) = (0, 0);
    while i < x.len() || j < y.len() {
        let next = if j >= y.len() || (i < x.len() && x[i].0 <= y[j].0) {
            i += 1;
            x[i - 1]
        } else {
            j += 1;
            y[j - 1]
        };
        push_range(&mut out, next.0, next.1);
    }
    out
}

fn intersection(x: &[(u32, u32)], y: &[(u32, u32)]) -> Vec<(u32, u32)> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < x.len() && j < y.len() {
        let lo = x[i].0.max(y[j].0);
        let hi = x[i].1.min(y[j].1);
        if lo <= hi {
            out.push((lo, hi));
        }
        if x[i].1 < y[j].1 {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

fn invert(x: &[(u32, u32)]) -> Vec<(u32, u32)> {
    let mut out = Vec::with_capacity(x.len() + 1);
    let mut next = 0u32;
    for &(a, b) in x {
        if a > next {
            out.push((next, a - 1));
        }
        next = b + 1;
    }
    if next <= MAX_CODE_POINT {
        out.push((next, MAX_CODE_POINT));
    }
    out
}

fn difference(x: &[(u32, u32)], y: &[(u32, u32)]) -> Vec<(u32, u32)> {
    intersection(x, &invert(y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(p: &str) -> UnicodeSet {
        UnicodeSet::from_pattern(p).unwrap()
    }

    #[test]
    fn ranges_merge_when_adjacent() {
        let mut s = UnicodeSet::new();
        s.add_range('a', 'c').unwrap();
        s.add_range('d', 'f').unwrap();
        s.add('x').unwrap();
        assert_eq!(s.ranges().collect::<Vec<_>>(), vec![(0x61, 0x66), (0x78, 0x78)]);
        assert_eq!(s.len(), 7);
        assert_eq!(s.to_pattern(false), "[a-fx]");
    }

    #[test]
    fn strings_are_separate_members() {
        let mut s = UnicodeSet::new();
        s.add_str("ch").unwrap();
        s.add_str("a").unwrap();
        assert!(s.contains_str("ch"));
        assert!(s.contains('a'));
        assert!(!s.contains('c'));
        assert_eq!(s.len(), 2);
        assert_eq!(s.to_pattern(false), "[a{ch}]");
    }

    #[test]
    fn complement_leaves_strings_alone() {
        let mut s = set("[a{xy}]");
        s.complement().unwrap();
        assert!(!s.contains('a'));
        assert!(s.contains('b'));
        assert!(s.contains_str("xy"));
    }

    #[test]
    fn frozen_sets_reject_mutation() {
        let mut s = set("[abc]").frozen();
        assert!(matches!(s.add('d'), Err(Error::Frozen)));
        assert!(matches!(s.clear(), Err(Error::Frozen)));
        assert!(matches!(s.apply_pattern("[x]"), Err(Error::Frozen)));

        let mut thawed = s.clone_as_thawed();
        thawed.add('d').unwrap();
        assert!(thawed.contains('d'));
        assert!(!s.contains('d'));
    }

    #[test]
    fn string_aware_containment() {
        let s = set("[a{bc}]");
        assert!(s.contains_all_str("abca"));
        assert!(!s.contains_all_str("ab"));
        assert!(s.contains_some_str("xbcx"));
        assert!(s.contains_none_str("xyz"));
    }

    #[test]
    fn symmetric_difference() {
        let mut s = set("[a-e{ab}]");
        s.complement_all(&set("[d-g{ab}{cd}]")).unwrap();
        assert_eq!(s, set("[a-cfg{cd}]"));
    }

    #[test]
    fn index_values_cover_wrapping_ranges() {
        let s = set("[\\u00FE-\\u0101]");
        assert!(s.matches_index_value(0xFE));
        assert!(s.matches_index_value(0x01));
        assert!(!s.matches_index_value(0x02));
    }

    fn small_set() -> impl Strategy<Value = UnicodeSet> {
        prop::collection::vec((0x20u32..0x80, 0u32..6), 0..5).prop_map(|pairs| {
            let mut s = UnicodeSet::new();
            for (a, w) in pairs {
                s.add_cp_range(a, a + w).unwrap();
            }
            s
        })
    }

    proptest! {
        #[test]
        fn de_morgan(a in small_set(), b in small_set()) {
            let mut lhs = a.clone();
            lhs.add_all(&b).unwrap();
            lhs.complement().unwrap();

            let mut na = a.clone();
            na.complement().unwrap();
            let mut nb = b.clone();
            nb.complement().unwrap();
            na.retain_all(&nb).unwrap();

            prop_assert_eq!(lhs, na);
        }

        #[test]
        fn difference_is_intersection_with_complement(a in small_set(), b in small_set()) {
            let mut lhs = a.clone();
            lhs.remove_all(&b).unwrap();

            let mut nb = b.clone();
            nb.complement().unwrap();
            let mut rhs = a.clone();
            rhs.retain_all(&nb).unwrap();

            prop_assert_eq!(lhs, rhs);
        }

        #[test]
        fn generated_pattern_reparses(a in small_set()) {
            let reparsed = UnicodeSet::from_pattern(&a.to_pattern(true)).unwrap();
            prop_assert_eq!(reparsed, a);
        }
    }
}
