//! Compiled rules and the rule set index.
//!
//! This module holds the *static* side of the engine: the structures the
//! parser produces for one block of rules, plus the first-character index that
//! keeps each step from trying every rule.
//!
//! ## Index
//!
//! Each rule is listed under every low byte (`char as u32 & 0xFF`) its key (or,
//! with an empty key, its post-context) could start with. Rules whose first
//! element can match the empty string are listed under every byte. Lists keep
//! declaration order, so "first rule wins" survives indexing.
//!
//! ## Invariants
//!
//! - `RuleId` is an index into `RuleSet::rules`.
//! - `RuleIndex::by_value` always has 256 entries.

use crate::api::Options;
use crate::error::{Error, Result};
use crate::transliterator::Transliterator;
use crate::unicode_set::{UnicodeSet, is_unprintable, push_hex_escape};
use std::sync::Arc;

/// Rule identifier (index into the rules vector).
pub(crate) type RuleId = usize;

/// Upper bound used for unbounded quantifiers.
pub(crate) const UNBOUNDED: usize = usize::MAX;

bitflags::bitflags! {
    /// Anchors attached to the match side of a rule.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RuleFlags: u8 {
        const ANCHOR_START = 1 << 0;
        const ANCHOR_END   = 1 << 1;
    }
}

/// One element of a match pattern.
#[derive(Debug, Clone)]
pub(crate) enum Matcher {
    Char(char),
    Set(Arc<UnicodeSet>),
    /// Capture group (0-based). Referenced as `$1..$9` from the output.
    Segment(usize, Vec<Matcher>),
    Quantified { body: Vec<Matcher>, min: usize, max: usize },
}

impl Matcher {
    /// Whether a match of this element could start with a char whose low byte is `v`.
    fn matches_index_value(&self, v: u8) -> bool {
        match self {
            Matcher::Char(c) => (*c as u32) & 0xFF == u32::from(v),
            Matcher::Set(set) => set.matches_index_value(v),
            Matcher::Segment(_, body) => sequence_matches_index_value(body, v),
            Matcher::Quantified { body, min, .. } => *min == 0 || sequence_matches_index_value(body, v),
        }
    }
}

fn sequence_matches_index_value(elements: &[Matcher], v: u8) -> bool {
    match elements.first() {
        Some(first) => first.matches_index_value(v),
        None => true,
    }
}

/// One piece of a rule's replacement.
#[derive(Debug, Clone)]
pub(crate) enum OutputPart {
    Literal(String),
    /// `$n`, 1-based.
    BackRef(usize),
    /// `&ID( … )`: the nested output, run through another transliterator.
    Call(Transliterator, Vec<OutputPart>),
    /// `|`: where `start` lands after the replacement.
    Cursor,
}

/// A compiled rule: `ante { key } post > output`.
#[derive(Debug, Clone)]
pub(crate) struct Rule {
    pub ante: Vec<Matcher>,
    pub key: Vec<Matcher>,
    pub post: Vec<Matcher>,
    pub flags: RuleFlags,
    pub output: Vec<OutputPart>,
    /// Code points the cursor moves past the `|` marker (`@` signs).
    pub cursor_offset: isize,
    /// Statement text the rule was compiled from, for diagnostics.
    pub source: String,
}

/// Element of a rule pattern compared for masking.
#[derive(Clone)]
enum Atom<'a> {
    Char(char),
    Set(&'a Arc<UnicodeSet>),
}

impl PartialEq for Atom<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Atom::Char(a), Atom::Char(b)) => a == b,
            (Atom::Set(a), Atom::Set(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn atoms(elements: &[Matcher]) -> Option<Vec<Atom<'_>>> {
    elements
        .iter()
        .map(|m| match m {
            Matcher::Char(c) => Some(Atom::Char(*c)),
            Matcher::Set(s) => Some(Atom::Set(s)),
            _ => None,
        })
        .collect()
}

impl Rule {
    /// Longest ante context this rule can look back over, in code points.
    pub(crate) fn ante_context_length(&self) -> usize {
        self.ante.iter().map(max_width).fold(0, usize::saturating_add)
    }

    fn matches_index_value(&self, v: u8) -> bool {
        if self.key.is_empty() {
            sequence_matches_index_value(&self.post, v)
        } else {
            sequence_matches_index_value(&self.key, v)
        }
    }

    /// Whether this rule, placed first, prevents `later` from ever matching.
    ///
    /// Only rules made of plain characters and sets take part. Anchored rules
    /// mask only rules carrying the same or stronger anchors.
    fn masks(&self, later: &Rule) -> bool {
        let (Some(ante1), Some(key1), Some(post1)) = (atoms(&self.ante), atoms(&self.key), atoms(&self.post)) else {
            return false;
        };
        let (Some(ante2), Some(key2), Some(post2)) = (atoms(&later.ante), atoms(&later.key), atoms(&later.post)) else {
            return false;
        };
        let pattern1: Vec<Atom> = ante1.iter().chain(&key1).chain(&post1).cloned().collect();
        let pattern2: Vec<Atom> = ante2.iter().chain(&key2).chain(&post2).cloned().collect();
        let (left1, left2) = (ante1.len(), ante2.len());
        let (right1, right2) = (pattern1.len() - left1, pattern2.len() - left2);

        if left1 == left2 && right1 == right2 && key1.len() <= key2.len() && pattern1 == pattern2[..pattern1.len()] {
            let anchors_both = RuleFlags::ANCHOR_START | RuleFlags::ANCHOR_END;
            return self.flags == later.flags || self.flags.is_empty() || later.flags.contains(anchors_both);
        }

        left1 <= left2
            && (right1 < right2 || (right1 == right2 && key1.len() <= key2.len()))
            && pattern2[left2 - left1..].starts_with(&pattern1)
    }

    /// Render as `ante{key}post > output;`.
    pub(crate) fn to_rule_text(&self, escape_unprintable: bool) -> String {
        let mut out = String::new();
        if self.flags.contains(RuleFlags::ANCHOR_START) {
            out.push('^');
        }
        if !self.ante.is_empty() {
            render_matchers(&mut out, &self.ante, escape_unprintable);
            out.push('{');
        }
        render_matchers(&mut out, &self.key, escape_unprintable);
        if !self.post.is_empty() {
            out.push('}');
            render_matchers(&mut out, &self.post, escape_unprintable);
        }
        if self.flags.contains(RuleFlags::ANCHOR_END) {
            out.push('$');
        }
        out.push_str(" > ");
        let tokens = render_output(&self.output, self.cursor_offset, escape_unprintable);
        out.push_str(&tokens.join(" "));
        out.push(';');
        out
    }
}

fn max_width(m: &Matcher) -> usize {
    match m {
        Matcher::Char(_) => 1,
        Matcher::Set(set) => set.strings().map(|s| s.chars().count()).max().unwrap_or(1).max(1),
        Matcher::Segment(_, body) => body.iter().map(max_width).fold(0, usize::saturating_add),
        Matcher::Quantified { body, max, .. } => {
            body.iter().map(max_width).fold(0, usize::saturating_add).saturating_mul(*max)
        }
    }
}

// --- Rendering --------------------------------------------------------------

fn needs_quote(c: char) -> bool {
    (c.is_ascii() && !c.is_ascii_alphanumeric()) || c.is_whitespace()
}

/// Append literal chars, quoting syntax characters and escaping on request.
pub(crate) fn push_literal_run(out: &mut String, run: &[char], escape_unprintable: bool, force_quote: bool) {
    let mut in_quote = false;
    if force_quote && run.len() > 1 && !(escape_unprintable && run.iter().any(|&c| is_unprintable(c))) {
        out.push('\'');
        in_quote = true;
    }
    for &c in run {
        if escape_unprintable && is_unprintable(c) {
            if in_quote {
                out.push('\'');
                in_quote = false;
            }
            push_hex_escape(out, c);
        } else if needs_quote(c) {
            if !in_quote {
                out.push('\'');
                in_quote = true;
            }
            if c == '\'' {
                out.push_str("''");
            } else {
                out.push(c);
            }
        } else {
            out.push(c);
        }
    }
    if in_quote {
        out.push('\'');
    }
}

pub(crate) fn render_matchers(out: &mut String, elements: &[Matcher], escape_unprintable: bool) {
    let mut run: Vec<char> = Vec::new();
    for m in elements {
        if let Matcher::Char(c) = m {
            run.push(*c);
            continue;
        }
        if !run.is_empty() {
            push_literal_run(out, &run, escape_unprintable, false);
            run.clear();
        }
        match m {
            Matcher::Char(_) => {}
            Matcher::Set(set) => out.push_str(&set.to_pattern(escape_unprintable)),
            Matcher::Segment(_, body) => {
                out.push('(');
                render_matchers(out, body, escape_unprintable);
                out.push(')');
            }
            Matcher::Quantified { body, min, max } => {
                let literal: Option<Vec<char>> =
                    body.iter().map(|b| if let Matcher::Char(c) = b { Some(*c) } else { None }).collect();
                match literal {
                    Some(chars) => push_literal_run(out, &chars, escape_unprintable, true),
                    None => render_matchers(out, body, escape_unprintable),
                }
                out.push_str(match (*min, *max) {
                    (0, 1) => "?",
                    (1, UNBOUNDED) => "+",
                    _ => "*",
                });
            }
        }
    }
    if !run.is_empty() {
        push_literal_run(out, &run, escape_unprintable, false);
    }
}

fn render_output(parts: &[OutputPart], cursor_offset: isize, escape_unprintable: bool) -> Vec<String> {
    let mut tokens = Vec::new();
    for part in parts {
        match part {
            OutputPart::Literal(text) => {
                let mut token = String::new();
                let chars: Vec<char> = text.chars().collect();
                push_literal_run(&mut token, &chars, escape_unprintable, false);
                tokens.push(token);
            }
            OutputPart::BackRef(n) => tokens.push(format!("${n}")),
            OutputPart::Call(t, inner) => {
                let inner = render_output(inner, 0, escape_unprintable);
                tokens.push(format!("&{}( {} )", t.id(), inner.join(" ")));
            }
            OutputPart::Cursor => {
                let marks = "@".repeat(cursor_offset.unsigned_abs());
                if cursor_offset < 0 {
                    tokens.push(format!("|{marks}"));
                } else {
                    tokens.push(format!("{marks}|"));
                }
            }
        }
    }
    tokens
}

// --- Rule set ---------------------------------------------------------------

#[derive(Debug)]
pub(crate) struct RuleIndex {
    pub by_value: Vec<Vec<RuleId>>,
}

impl Default for RuleIndex {
    fn default() -> Self {
        RuleIndex { by_value: vec![Vec::new(); 256] }
    }
}

/// An ordered, indexed block of rules.
#[derive(Debug)]
pub struct RuleSet {
    pub(crate) rules: Vec<Rule>,
    pub(crate) index: RuleIndex,
    max_context_length: usize,
    /// Steps allowed per code point of the run before the loop guard trips.
    pub(crate) max_loop_factor: usize,
}

impl RuleSet {
    /// Create an indexed rule set, rejecting masked rules when configured.
    pub(crate) fn new(rules: Vec<Rule>, options: &Options) -> Result<Self> {
        if options.reject_masked_rules {
            for (i, earlier) in rules.iter().enumerate() {
                for later in &rules[i + 1..] {
                    if earlier.masks(later) {
                        return Err(Error::rule(format!("Masked by earlier rule \"{}\"", earlier.source), &later.source));
                    }
                }
            }
        }

        let mut index = RuleIndex::default();
        for (id, rule) in rules.iter().enumerate() {
            for v in 0..=255u8 {
                if rule.matches_index_value(v) {
                    index.by_value[usize::from(v)].push(id);
                }
            }
        }

        let max_context_length = rules.iter().map(Rule::ante_context_length).max().unwrap_or(0);
        Ok(RuleSet { rules, index, max_context_length, max_loop_factor: options.max_loop_factor })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn max_context_length(&self) -> usize {
        self.max_context_length
    }

    /// Rules that may match text starting with `c`, in declaration order.
    pub(crate) fn candidates(&self, c: char) -> impl Iterator<Item = &Rule> + '_ {
        self.index.by_value[(c as u32 & 0xFF) as usize].iter().map(move |&id| &self.rules[id])
    }

    pub(crate) fn to_rules(&self, escape_unprintable: bool) -> String {
        self.rules.iter().map(|r| r.to_rule_text(escape_unprintable)).collect::<Vec<_>>().join("\n")
    }
}
