//! Backtracking pattern matcher.
//!
//! Matching is written in continuation-passing style: each element matches
//! itself and hands the remaining elements to `k`. An element with several
//! ways to match (a set with string members, a quantifier) tries them in
//! preference order and stops at the first one whose continuation does not
//! report [`Degree::Mismatch`]. This lets a greedy quantifier give back
//! repetitions when the rest of the rule would otherwise fail.
//!
//! Forward matching can be *incremental*: reaching `limit` while elements are
//! still pending reports [`Degree::Partial`], since more text may arrive.

use super::compiled_rules::Matcher;
use crate::transliterator::Replaceable;
use crate::unicode_set::{ETHER, UnicodeSet};

/// Outcome of a match attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Degree {
    Mismatch,
    /// Matched up to the limit and needs more text to decide.
    Partial,
    Match,
}

/// Capture spans of segments `$1..$9`, as `(start, limit)` code point offsets.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Captures([Option<(usize, usize)>; 9]);

impl Captures {
    pub(crate) fn get(&self, index: usize) -> Option<(usize, usize)> {
        self.0.get(index).copied().flatten()
    }

    fn set(&mut self, index: usize, span: (usize, usize)) {
        if let Some(slot) = self.0.get_mut(index) {
            *slot = Some(span);
        }
    }
}

pub(crate) type Continuation<'k> = dyn FnMut(usize, Captures) -> Degree + 'k;

/// A read-only view of the text with the bound to match against.
pub(crate) struct Scan<'t> {
    pub text: &'t dyn Replaceable,
    /// Upper bound for forward matching, lower bound for backward matching.
    pub bound: usize,
    pub incremental: bool,
}

impl Scan<'_> {
    /// Match `elements` forward from `pos`, up to `self.bound`.
    pub(crate) fn forward(&self, elements: &[Matcher], pos: usize, caps: Captures, k: &mut Continuation<'_>) -> Degree {
        let Some((first, rest)) = elements.split_first() else {
            return k(pos, caps);
        };
        if self.incremental && pos == self.bound {
            return Degree::Partial;
        }
        match first {
            Matcher::Char(c) => {
                if pos < self.bound && self.text.char_at(pos) == *c {
                    self.forward(rest, pos + 1, caps, k)
                } else {
                    Degree::Mismatch
                }
            }
            Matcher::Set(set) => {
                if pos >= self.bound {
                    return if set.contains(ETHER) { self.forward(rest, pos, caps, k) } else { Degree::Mismatch };
                }
                let mut ends = Vec::new();
                if set.has_strings() {
                    match self.string_ends_forward(set, pos) {
                        Some(found) => ends = found,
                        None => return Degree::Partial,
                    }
                }
                if set.contains(self.text.char_at(pos)) {
                    ends.push(pos + 1);
                }
                for end in ends {
                    let degree = self.forward(rest, end, caps, k);
                    if degree != Degree::Mismatch {
                        return degree;
                    }
                }
                Degree::Mismatch
            }
            Matcher::Segment(index, body) => {
                let index = *index;
                self.forward(body, pos, caps, &mut |end, mut caps| {
                    caps.set(index, (pos, end));
                    self.forward(rest, end, caps, k)
                })
            }
            Matcher::Quantified { body, min, max } => {
                let mut stack: Vec<(usize, Captures)> = vec![(pos, caps)];
                let (mut cur, mut cur_caps) = (pos, caps);
                while stack.len() - 1 < *max {
                    let mut found = None;
                    let degree = self.forward(body, cur, cur_caps, &mut |end, caps| {
                        found = Some((end, caps));
                        Degree::Match
                    });
                    match (degree, found) {
                        (Degree::Match, Some((end, caps))) => {
                            stack.push((end, caps));
                            if end == cur {
                                break;
                            }
                            cur = end;
                            cur_caps = caps;
                        }
                        (Degree::Partial, _) if self.incremental => return Degree::Partial,
                        _ => break,
                    }
                }
                if self.incremental && cur == self.bound {
                    return Degree::Partial;
                }
                for count in (*min..stack.len()).rev() {
                    let (end, caps) = stack[count];
                    let degree = self.forward(rest, end, caps, k);
                    if degree != Degree::Mismatch {
                        return degree;
                    }
                }
                Degree::Mismatch
            }
        }
    }

    /// Ends of string members matching at `pos`, longest first.
    ///
    /// Returns `None` when an incremental match runs into the bound.
    fn string_ends_forward(&self, set: &UnicodeSet, pos: usize) -> Option<Vec<usize>> {
        let available = self.bound - pos;
        let mut ends = Vec::new();
        for member in set.strings() {
            let len = member.chars().count();
            let matched = member.chars().zip(pos..self.bound).take_while(|&(c, i)| self.text.char_at(i) == c).count();
            if self.incremental && matched == available && len >= available {
                return None;
            }
            if matched == len && len > 0 {
                ends.push(pos + len);
            }
        }
        ends.sort_unstable_by(|a, b| b.cmp(a));
        Some(ends)
    }

    /// Match `elements` backward, ending at `pos`, down to `self.bound`.
    ///
    /// The continuation receives the offset where the match begins.
    pub(crate) fn backward(&self, elements: &[Matcher], pos: usize, caps: Captures, k: &mut Continuation<'_>) -> Degree {
        let Some((last, init)) = elements.split_last() else {
            return k(pos, caps);
        };
        match last {
            Matcher::Char(c) => {
                if pos > self.bound && self.text.char_at(pos - 1) == *c {
                    self.backward(init, pos - 1, caps, k)
                } else {
                    Degree::Mismatch
                }
            }
            Matcher::Set(set) => {
                if pos <= self.bound {
                    return if set.contains(ETHER) { self.backward(init, pos, caps, k) } else { Degree::Mismatch };
                }
                let mut begins: Vec<usize> = set
                    .strings()
                    .filter_map(|member| {
                        let len = member.chars().count();
                        let begin = pos.checked_sub(len).filter(|&b| b >= self.bound && len > 0)?;
                        member.chars().zip(begin..pos).all(|(c, i)| self.text.char_at(i) == c).then_some(begin)
                    })
                    .collect();
                begins.sort_unstable();
                if set.contains(self.text.char_at(pos - 1)) {
                    begins.push(pos - 1);
                }
                for begin in begins {
                    let degree = self.backward(init, begin, caps, k);
                    if degree != Degree::Mismatch {
                        return degree;
                    }
                }
                Degree::Mismatch
            }
            Matcher::Segment(index, body) => {
                let index = *index;
                self.backward(body, pos, caps, &mut |begin, mut caps| {
                    if caps.get(index).is_none() {
                        caps.set(index, (begin, pos));
                    }
                    self.backward(init, begin, caps, k)
                })
            }
            Matcher::Quantified { body, min, max } => {
                let mut stack: Vec<(usize, Captures)> = vec![(pos, caps)];
                let (mut cur, mut cur_caps) = (pos, caps);
                while stack.len() - 1 < *max {
                    let mut found = None;
                    let degree = self.backward(body, cur, cur_caps, &mut |begin, caps| {
                        found = Some((begin, caps));
                        Degree::Match
                    });
                    match (degree, found) {
                        (Degree::Match, Some((begin, caps))) => {
                            stack.push((begin, caps));
                            if begin == cur {
                                break;
                            }
                            cur = begin;
                            cur_caps = caps;
                        }
                        _ => break,
                    }
                }
                for count in (*min..stack.len()).rev() {
                    let (begin, caps) = stack[count];
                    let degree = self.backward(init, begin, caps, k);
                    if degree != Degree::Mismatch {
                        return degree;
                    }
                }
                Degree::Mismatch
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::compiled_rules::UNBOUNDED;
    use crate::transliterator::ReplaceableString;
    use std::sync::Arc;

    fn chars(s: &str) -> Vec<Matcher> {
        s.chars().map(Matcher::Char).collect()
    }

    fn end_of(scan: &Scan<'_>, elements: &[Matcher], pos: usize) -> (Degree, Option<usize>) {
        let mut end = None;
        let degree = scan.forward(elements, pos, Captures::default(), &mut |e, _| {
            end = Some(e);
            Degree::Match
        });
        (degree, end)
    }

    #[test]
    fn greedy_quantifier_gives_back_for_the_rest() {
        let text = ReplaceableString::new("aaab");
        let scan = Scan { text: &text, bound: 4, incremental: false };
        let mut pattern = vec![Matcher::Quantified { body: chars("a"), min: 0, max: UNBOUNDED }];
        pattern.extend(chars("ab"));
        assert_eq!(end_of(&scan, &pattern, 0), (Degree::Match, Some(4)));
    }

    #[test]
    fn incremental_match_at_bound_is_partial() {
        let text = ReplaceableString::new("ab");
        let scan = Scan { text: &text, bound: 2, incremental: true };
        assert_eq!(end_of(&scan, &chars("abc"), 0).0, Degree::Partial);
        assert_eq!(end_of(&scan, &chars("ax"), 0).0, Degree::Mismatch);

        let batch = Scan { text: &text, bound: 2, incremental: false };
        assert_eq!(end_of(&batch, &chars("abc"), 0).0, Degree::Mismatch);
    }

    #[test]
    fn string_members_prefer_the_longest() {
        let set = Arc::new(UnicodeSet::from_pattern("[a{ab}{abc}]").unwrap());
        let text = ReplaceableString::new("abcd");
        let scan = Scan { text: &text, bound: 4, incremental: false };
        assert_eq!(end_of(&scan, &[Matcher::Set(Arc::clone(&set))], 0), (Degree::Match, Some(3)));

        let mut then_b = vec![Matcher::Set(set)];
        then_b.extend(chars("b"));
        assert_eq!(end_of(&scan, &then_b, 0), (Degree::Match, Some(2)));
    }

    #[test]
    fn backward_segments_keep_the_rightmost_capture() {
        let text = ReplaceableString::new("xyxy");
        let scan = Scan { text: &text, bound: 0, incremental: false };
        let pattern = vec![Matcher::Quantified {
            body: vec![Matcher::Segment(0, chars("xy"))],
            min: 1,
            max: UNBOUNDED,
        }];
        let mut seen = None;
        let degree = scan.backward(&pattern, 4, Captures::default(), &mut |begin, caps| {
            seen = Some((begin, caps.get(0)));
            Degree::Match
        });
        assert_eq!(degree, Degree::Match);
        assert_eq!(seen, Some((0, Some((2, 4)))));
    }

    #[test]
    fn ether_matches_at_the_bound_without_consuming() {
        let set = Arc::new(UnicodeSet::from_pattern("[a$]").unwrap());
        let text = ReplaceableString::new("b");
        let scan = Scan { text: &text, bound: 1, incremental: false };
        assert_eq!(end_of(&scan, &[Matcher::Set(set)], 1), (Degree::Match, Some(1)));
    }
}
