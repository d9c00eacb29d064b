//! Rule text parser.
//!
//! Turns rule text into blocks of [`Rule`]s and `::` steps, for one
//! direction. Statements end at an unquoted `;` outside brackets:
//!
//! ```text
//! # comment to end of line
//! $vowel = [aeiou] ;                   variable definition
//! use variable range 0xE000 0xE0FF ;   pragma
//! ::NFD ;  ::Upper(Lower) ;            step (splits the rules into a pipeline)
//! ::[a-z] ;  ::([a-z]) ;               global filter, forward / reverse
//! ^ ante { key } post $ > out | put ;  rule (also < <> → ← ↔)
//! ```
//!
//! Each half of a rule is read into a flat list of [`Item`]s plus the
//! positions of its markers (`{`, `}`, `|`, `@`). Once both halves are read
//! the rule is checked against the operator and direction, swapped when
//! compiling in reverse, and lowered to matchers on the input side and
//! output parts on the other.
//!
//! ## Invariants
//!
//! - Marker positions index into the top-level item list of their half.
//! - Segments are numbered 0-based in the order their `(` appears.
//! - Variables persist across `::` blocks.

use super::compiled_rules::{Matcher, OutputPart, Rule, RuleFlags, UNBOUNDED};
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::registry::id;
use crate::transliterator::{Direction, Transliterator};
use crate::unicode_set::UnicodeSet;
use crate::unicode_set::pattern::{
    SymbolTable, SymbolValue, is_ident_part, is_ident_start, is_set_start, parse_escape, parse_set, push_spliced,
    skip_whitespace,
};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;

/// Characters that end a rule half.
const HALF_ENDERS: [char; 7] = ['=', '>', '<', '←', '→', '↔', ';'];

/// Maximum number of segments one rule may capture (`$1..$9`).
const MAX_SEGMENTS: usize = 9;

/// `.`: anything except line and paragraph separators.
static DOT: Lazy<Arc<UnicodeSet>> = Lazy::new(|| {
    let set = UnicodeSet::from_pattern(r"[^[:Zp:][:Zl:]\r\n$]").unwrap_or_default();
    Arc::new(set.frozen())
});

/// A block of rules or a `::` step, in application order.
#[derive(Debug)]
pub(crate) enum Section {
    Rules(Vec<Rule>),
    Step(Transliterator),
}

#[derive(Debug)]
pub(crate) struct ParsedRules {
    pub sections: Vec<Section>,
    pub global_filter: Option<UnicodeSet>,
    /// Rules dropped because they only apply in the other direction.
    pub skipped: usize,
}

/// One element of a rule half before lowering.
#[derive(Debug, Clone)]
enum Item {
    Char(char),
    Set(Arc<UnicodeSet>),
    Segment(usize, Vec<Item>),
    Quantified(Vec<Item>, usize, usize),
    /// `$n`, 1-based.
    BackRef(usize),
    Call(Transliterator, Vec<Item>),
}

#[derive(Debug, Default)]
struct Half {
    items: Vec<Item>,
    ante: Option<usize>,
    post: Option<usize>,
    cursor: Option<usize>,
    cursor_offset: isize,
    cursor_offset_pos: usize,
    anchor_start: bool,
    anchor_end: bool,
    segments: usize,
}

impl Half {
    fn markers(&self) -> impl Iterator<Item = usize> + '_ {
        let offset = (self.cursor_offset > 0).then_some(self.cursor_offset_pos);
        [self.ante, self.post, self.cursor, offset].into_iter().flatten()
    }

    /// Keep only the key of an output half, for the unused side of `<>`.
    fn remove_context(&mut self) {
        let len = self.items.len();
        let ante = self.ante.unwrap_or(0).min(len);
        let post = self.post.unwrap_or(len).clamp(ante, len);
        self.items.truncate(post);
        self.items.drain(..ante);
        self.cursor = self.cursor.map(|c| c.saturating_sub(ante).min(self.items.len()));
        self.ante = None;
        self.post = None;
        self.anchor_start = false;
        self.anchor_end = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Top,
    Segment,
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Forward,
    Reverse,
    Both,
}

/// Variables as seen from inside a set pattern.
struct Variables<'a>(&'a HashMap<String, Vec<Item>>);

impl SymbolTable for Variables<'_> {
    fn lookup(&self, name: &str) -> Option<SymbolValue> {
        let items = self.0.get(name)?;
        if let [Item::Set(set)] = items.as_slice() {
            return Some(SymbolValue::Set(Arc::clone(set)));
        }
        let mut text = String::new();
        for item in items {
            match item {
                Item::Char(c) => push_spliced(&mut text, *c),
                Item::Set(set) => text.push_str(&set.to_pattern(false)),
                _ => return None,
            }
        }
        Some(SymbolValue::Text(text))
    }
}

struct RuleParser<'a> {
    chars: Vec<char>,
    direction: Direction,
    registry: &'a Registry,
    variables: HashMap<String, Vec<Item>>,
    reserved: Option<(u32, u32)>,
    sections: Vec<Section>,
    block: Vec<Rule>,
    global_filter: Option<UnicodeSet>,
    /// Statement index and text of the reverse global filter, if one applies.
    reverse_filter_at: Option<(usize, String)>,
    statements: usize,
    skipped: usize,
}

/// Parse `text` for `direction`, resolving `::` steps and `&` calls through
/// `registry`.
pub(crate) fn parse(text: &str, direction: Direction, registry: &Registry) -> Result<ParsedRules> {
    let mut parser = RuleParser {
        chars: text.chars().collect(),
        direction,
        registry,
        variables: HashMap::new(),
        reserved: None,
        sections: Vec::new(),
        block: Vec::new(),
        global_filter: None,
        reverse_filter_at: None,
        statements: 0,
        skipped: 0,
    };
    parser.run()?;

    if let Some((at, rule)) = &parser.reverse_filter_at {
        if *at + 1 != parser.statements {
            return Err(Error::rule("Compound filters misplaced", rule.as_str()));
        }
    }
    parser.flush_block();
    let mut sections = parser.sections;
    if direction == Direction::Reverse {
        sections.reverse();
    }
    Ok(ParsedRules { sections, global_filter: parser.global_filter, skipped: parser.skipped })
}

impl RuleParser<'_> {
    fn run(&mut self) -> Result<()> {
        let len = self.chars.len();
        let mut pos = 0;
        loop {
            pos = skip_whitespace(&self.chars, pos);
            if pos >= len {
                return Ok(());
            }
            match self.chars[pos] {
                '#' => {
                    while pos < len && !matches!(self.chars[pos], '\n' | '\r' | '\u{2028}' | '\u{2029}') {
                        pos += 1;
                    }
                    continue;
                }
                ';' => {
                    pos += 1;
                    continue;
                }
                _ => {}
            }

            let end = self.statement_end(pos);
            let rule: String = self.chars[pos..end].iter().collect::<String>().trim().to_string();
            if self.chars[pos..].starts_with(&[':', ':']) {
                self.parse_id_statement(pos + 2, end, &rule)?;
            } else if regex!(r"^use\s").is_match(&rule) {
                self.parse_pragma(&rule)?;
            } else if let Some((name, value_start)) = self.variable_definition(pos, end) {
                self.parse_variable(name, value_start, end, &rule)?;
            } else {
                self.parse_rule(pos, end, &rule)?;
            }
            self.statements += 1;
            pos = end + 1;
        }
    }

    /// Offset of the `;` ending the statement at `pos`, or the text length.
    fn statement_end(&self, mut pos: usize) -> usize {
        let mut quoted = false;
        let mut depth = 0usize;
        while let Some(&c) = self.chars.get(pos) {
            match c {
                '\'' => quoted = !quoted,
                '\\' if !quoted => pos += 1,
                '[' if !quoted => depth += 1,
                ']' if !quoted => depth = depth.saturating_sub(1),
                ';' if !quoted && depth == 0 => return pos,
                _ => {}
            }
            pos += 1;
        }
        self.chars.len()
    }

    fn flush_block(&mut self) {
        if !self.block.is_empty() {
            let rules = std::mem::take(&mut self.block);
            self.sections.push(Section::Rules(rules));
        }
    }

    fn check_reserved(&self, c: char, rule: &str) -> Result<()> {
        match self.reserved {
            Some((start, end)) if (start..=end).contains(&(c as u32)) => {
                Err(Error::rule("Variable range character in rule", rule))
            }
            _ => Ok(()),
        }
    }

    // --- Statements ---------------------------------------------------------

    fn parse_id_statement(&mut self, start: usize, end: usize, rule: &str) -> Result<()> {
        let chars = &self.chars[..end];
        let mut pos = start;
        let element =
            id::parse_element(chars, &mut pos).map_err(|_| Error::rule("Invalid ::ID", rule))?;
        if skip_whitespace(chars, pos) != end {
            return Err(Error::rule("Invalid ::ID", rule));
        }
        let Some(element) = element else {
            return Err(Error::rule("Invalid ::ID", rule));
        };

        let filter_only = |single: &Option<id::SingleId>| single.as_ref().is_some_and(|s| s.basic.is_none());
        let forward_filter = !element.parens && filter_only(&element.forward);
        let reverse_filter = element.parens && element.forward.is_none() && filter_only(&element.reverse);
        if forward_filter || reverse_filter {
            if (self.direction == Direction::Forward) != forward_filter {
                return Ok(());
            }
            if self.global_filter.is_some() {
                return Err(Error::rule("Multiple global filters", rule));
            }
            let single = if forward_filter { element.forward } else { element.reverse };
            if forward_filter {
                if self.statements != 0 {
                    return Err(Error::rule("Compound filters misplaced", rule));
                }
            } else {
                self.reverse_filter_at = Some((self.statements, rule.to_string()));
            }
            self.global_filter = single.and_then(|s| s.filter);
            return Ok(());
        }

        let registry = self.registry;
        let element = match self.direction {
            Direction::Forward => element,
            Direction::Reverse => element.reversed(&|target| registry.special_inverse(target)),
        };
        let Some(single) = element.forward else {
            return Ok(());
        };
        let step = registry.instantiate_single(&single).map_err(|_| Error::rule("Invalid ::ID", rule))?;
        self.flush_block();
        self.sections.push(Section::Step(step));
        Ok(())
    }

    fn parse_pragma(&mut self, rule: &str) -> Result<()> {
        if let Some(caps) = regex!(r"^use\s+variable\s+range\s+(0[xX][0-9A-Fa-f]+|\d+)\s+(0[xX][0-9A-Fa-f]+|\d+)$")
            .captures(rule)
        {
            let start = parse_number(&caps[1]);
            let end = parse_number(&caps[2]);
            return match (start, end) {
                (Some(start), Some(end)) if start <= end && end <= 0x10FFFF => {
                    self.reserved = Some((start, end));
                    Ok(())
                }
                _ => Err(Error::rule("Invalid variable range", rule)),
            };
        }
        let accepted = regex!(r"^use\s+maximum\s+backup\s+(0[xX][0-9A-Fa-f]+|\d+)$").is_match(rule)
            || regex!(r"^use\s+nf[cd]\s+rules$").is_match(rule);
        if accepted { Ok(()) } else { Err(Error::rule("Unrecognized pragma", rule)) }
    }

    /// `$name =` at the start of a statement: the name and the offset after `=`.
    fn variable_definition(&self, pos: usize, end: usize) -> Option<(String, usize)> {
        if self.chars.get(pos) != Some(&'$') || !self.chars.get(pos + 1).is_some_and(|&c| is_ident_start(c)) {
            return None;
        }
        let mut p = pos + 1;
        while p < end && is_ident_part(self.chars[p]) {
            p += 1;
        }
        let name: String = self.chars[pos + 1..p].iter().collect();
        let p = skip_whitespace(&self.chars, p);
        (p < end && self.chars[p] == '=').then_some((name, p + 1))
    }

    fn parse_variable(&mut self, name: String, start: usize, end: usize, rule: &str) -> Result<()> {
        if self.variables.contains_key(&name) {
            return Err(Error::rule(format!("Duplicate variable definition ${name}"), rule));
        }
        let mut pos = start;
        let value = self.parse_half(&mut pos, end, rule)?;
        if pos < end {
            return Err(Error::rule("Unquoted operator", rule));
        }
        let has_markers = value.markers().next().is_some() || value.cursor_offset != 0;
        if has_markers || value.anchor_start || value.anchor_end || value.segments > 0 || max_back_ref(&value.items) > 0 {
            return Err(Error::rule("Malformed variable def", rule));
        }
        self.variables.insert(name, value.items);
        Ok(())
    }

    fn parse_rule(&mut self, start: usize, end: usize, rule: &str) -> Result<()> {
        let mut pos = start;
        let mut left = self.parse_half(&mut pos, end, rule)?;
        let operator = match self.chars.get(pos).copied().filter(|_| pos < end) {
            Some('>' | '→') => Operator::Forward,
            Some('↔') => Operator::Both,
            Some('<') if self.chars.get(pos + 1) == Some(&'>') => {
                pos += 1;
                Operator::Both
            }
            Some('<' | '←') => Operator::Reverse,
            Some('=') => return Err(Error::rule("Malformed LHS", rule)),
            _ => return Err(Error::rule("No operator", rule)),
        };
        pos += 1;
        let mut right = self.parse_half(&mut pos, end, rule)?;
        if pos < end {
            return Err(Error::rule("Unquoted operator", rule));
        }

        if left.segments + right.segments > MAX_SEGMENTS {
            return Err(Error::rule("More than nine segments", rule));
        }
        if max_back_ref(&left.items).max(max_back_ref(&right.items)) > left.segments + right.segments {
            return Err(Error::rule("Undefined segment reference", rule));
        }

        let applies = match operator {
            Operator::Both => true,
            Operator::Forward => self.direction == Direction::Forward,
            Operator::Reverse => self.direction == Direction::Reverse,
        };
        if !applies {
            self.skipped += 1;
            return Ok(());
        }
        if self.direction == Direction::Reverse {
            std::mem::swap(&mut left, &mut right);
        }
        if operator == Operator::Both {
            right.remove_context();
            left.cursor = None;
            left.cursor_offset = 0;
        }

        let len = left.items.len();
        let ante = left.ante.unwrap_or(0);
        let post = left.post.unwrap_or(len);
        let malformed = right.ante.is_some()
            || right.post.is_some()
            || left.cursor.is_some()
            || (right.cursor_offset != 0 && right.cursor.is_none())
            || right.anchor_start
            || right.anchor_end
            || !left.items.iter().all(is_valid_input)
            || !right.items.iter().all(is_valid_output)
            || ante > post;
        if malformed {
            return Err(Error::rule("Malformed rule", rule));
        }

        let mut flags = RuleFlags::empty();
        flags.set(RuleFlags::ANCHOR_START, left.anchor_start);
        flags.set(RuleFlags::ANCHOR_END, left.anchor_end);

        let mut items = left.items;
        let post_items = items.split_off(post);
        let key_items = items.split_off(ante);
        let output = lower_output(&right.items, right.cursor);
        self.block.push(Rule {
            ante: lower_input(&items),
            key: lower_input(&key_items),
            post: lower_input(&post_items),
            flags,
            output,
            cursor_offset: if right.cursor.is_some() { right.cursor_offset } else { 0 },
            source: rule.to_string(),
        });
        Ok(())
    }

    // --- Rule halves --------------------------------------------------------

    fn parse_half(&self, pos: &mut usize, limit: usize, rule: &str) -> Result<Half> {
        let mut half = Half::default();
        let items = self.parse_items(pos, limit, &mut half, Scope::Top, rule)?;
        half.items = items;
        if half.cursor_offset > 0 && half.cursor != Some(half.cursor_offset_pos) {
            return Err(Error::rule("Misplaced |", rule));
        }
        Ok(half)
    }

    /// Read items up to a half ender (top level) or the closing `)`.
    fn parse_items(&self, pos: &mut usize, limit: usize, half: &mut Half, scope: Scope, rule: &str) -> Result<Vec<Item>> {
        let chars = &self.chars;
        let mut items: Vec<Item> = Vec::new();
        // Start of the last element a quantifier would apply to.
        let mut unit: Option<usize> = None;

        while *pos < limit {
            let c = chars[*pos];
            if c.is_whitespace() {
                *pos += 1;
                continue;
            }
            if HALF_ENDERS.contains(&c) {
                if scope != Scope::Top {
                    return Err(Error::rule("Unclosed segment", rule));
                }
                return Ok(items);
            }
            if half.anchor_end {
                return Err(Error::rule("Malformed variable reference", rule));
            }
            if is_set_start(chars, *pos) {
                let set = parse_set(chars, pos, Some(&Variables(&self.variables)))?;
                unit = Some(items.len());
                items.push(Item::Set(Arc::new(set.frozen())));
                continue;
            }
            *pos += 1;

            let illegal = match scope {
                Scope::Top => ")".contains(c),
                Scope::Segment => "{}|@".contains(c),
                Scope::Function => "^(.*+?{}|@".contains(c),
            };
            if illegal {
                return Err(Error::rule(format!("Illegal character '{c}'"), rule));
            }

            match c {
                '\\' => {
                    if *pos >= limit {
                        return Err(Error::rule("Trailing backslash", rule));
                    }
                    let mut p = *pos - 1;
                    let escaped = parse_escape(chars, &mut p).ok_or_else(|| Error::rule("Malformed escape", rule))?;
                    *pos = p;
                    self.check_reserved(escaped, rule)?;
                    unit = Some(items.len());
                    items.push(Item::Char(escaped));
                }
                '\'' => {
                    unit = Some(items.len());
                    if *pos < limit && chars[*pos] == '\'' {
                        items.push(Item::Char('\''));
                        *pos += 1;
                        continue;
                    }
                    loop {
                        let close = (*pos..limit)
                            .find(|&i| chars[i] == '\'')
                            .ok_or_else(|| Error::rule("Unterminated quote", rule))?;
                        for &q in &chars[*pos..close] {
                            self.check_reserved(q, rule)?;
                            items.push(Item::Char(q));
                        }
                        *pos = close + 1;
                        if *pos < limit && chars[*pos] == '\'' {
                            items.push(Item::Char('\''));
                            *pos += 1;
                        } else {
                            break;
                        }
                    }
                }
                '^' => {
                    if scope != Scope::Top || !items.is_empty() || half.anchor_start {
                        return Err(Error::rule("Misplaced anchor start", rule));
                    }
                    half.anchor_start = true;
                }
                '(' => {
                    let number = half.segments;
                    half.segments += 1;
                    let body = self.parse_items(pos, limit, half, Scope::Segment, rule)?;
                    unit = Some(items.len());
                    items.push(Item::Segment(number, body));
                }
                ')' => return Ok(items),
                '&' | '∆' => {
                    let mut p = *pos;
                    let single = id::parse_single(&chars[..limit], &mut p)
                        .ok()
                        .flatten()
                        .filter(|s| s.basic.is_some());
                    p = skip_whitespace(&chars[..limit], p);
                    let Some(single) = single.filter(|_| chars.get(p) == Some(&'(')) else {
                        return Err(Error::rule("Invalid function", rule));
                    };
                    let translit = self
                        .registry
                        .instantiate_single(&single)
                        .map_err(|_| Error::rule("Invalid function ID", rule))?;
                    *pos = p + 1;
                    let body = self.parse_items(pos, limit, half, Scope::Function, rule)?;
                    unit = Some(items.len());
                    items.push(Item::Call(translit, body));
                }
                '$' => match chars.get(*pos).copied().filter(|_| *pos < limit) {
                    Some(d) if ('1'..='9').contains(&d) => {
                        let begin = *pos;
                        while *pos < limit && chars[*pos].is_ascii_digit() {
                            *pos += 1;
                        }
                        let digits: String = chars[begin..*pos].iter().collect();
                        let n = digits.parse().map_err(|_| Error::rule("Undefined segment reference", rule))?;
                        unit = Some(items.len());
                        items.push(Item::BackRef(n));
                    }
                    Some(s) if is_ident_start(s) => {
                        let begin = *pos;
                        while *pos < limit && is_ident_part(chars[*pos]) {
                            *pos += 1;
                        }
                        let name: String = chars[begin..*pos].iter().collect();
                        let value = self
                            .variables
                            .get(&name)
                            .ok_or_else(|| Error::rule(format!("Undefined variable ${name}"), rule))?;
                        unit = Some(items.len());
                        items.extend(value.iter().cloned());
                    }
                    _ if scope == Scope::Top => half.anchor_end = true,
                    _ => return Err(Error::rule("Malformed variable reference", rule)),
                },
                '.' => {
                    unit = Some(items.len());
                    items.push(Item::Set(Arc::clone(&DOT)));
                }
                '*' | '+' | '?' => {
                    let start = unit
                        .filter(|&u| u < items.len())
                        .filter(|&u| scope != Scope::Top || half.markers().all(|m| m <= u))
                        .ok_or_else(|| Error::rule("Misplaced quantifier", rule))?;
                    let (min, max) = match c {
                        '*' => (0, UNBOUNDED),
                        '+' => (1, UNBOUNDED),
                        _ => (0, 1),
                    };
                    let body: Vec<Item> = items.drain(start..).collect();
                    items.push(Item::Quantified(body, min, max));
                    unit = Some(start);
                }
                '{' => {
                    if half.ante.replace(items.len()).is_some() {
                        return Err(Error::rule("Multiple ante contexts", rule));
                    }
                }
                '}' => {
                    if half.post.replace(items.len()).is_some() {
                        return Err(Error::rule("Multiple post contexts", rule));
                    }
                }
                '|' => {
                    if half.cursor.replace(items.len()).is_some() {
                        return Err(Error::rule("Multiple cursors", rule));
                    }
                }
                '@' => cursor_offset(half, items.len(), rule)?,
                _ => {
                    if ('\u{21}'..='\u{7E}').contains(&c) && !c.is_ascii_alphanumeric() {
                        return Err(Error::rule(format!("Unquoted {c}"), rule));
                    }
                    self.check_reserved(c, rule)?;
                    unit = Some(items.len());
                    items.push(Item::Char(c));
                }
            }
        }

        if scope != Scope::Top {
            return Err(Error::rule("Unclosed segment", rule));
        }
        Ok(items)
    }
}

/// `@` before the output (cursor left of it) or after it (cursor right of it).
fn cursor_offset(half: &mut Half, len: usize, rule: &str) -> Result<()> {
    let misplaced = || Error::rule("Misplaced @", rule);
    if half.cursor_offset < 0 {
        if len > 0 {
            return Err(misplaced());
        }
        half.cursor_offset -= 1;
    } else if half.cursor_offset > 0 {
        if len != half.cursor_offset_pos || half.cursor.is_some() {
            return Err(misplaced());
        }
        half.cursor_offset += 1;
    } else if half.cursor == Some(0) && len == 0 {
        half.cursor_offset = -1;
    } else if half.cursor.is_none() {
        half.cursor_offset_pos = len;
        half.cursor_offset = 1;
    } else {
        return Err(misplaced());
    }
    Ok(())
}

fn parse_number(text: &str) -> Option<u32> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn max_back_ref(items: &[Item]) -> usize {
    items
        .iter()
        .map(|item| match item {
            Item::BackRef(n) => *n,
            Item::Segment(_, body) | Item::Quantified(body, ..) | Item::Call(_, body) => max_back_ref(body),
            Item::Char(_) | Item::Set(_) => 0,
        })
        .max()
        .unwrap_or(0)
}

fn is_valid_input(item: &Item) -> bool {
    match item {
        Item::Char(_) | Item::Set(_) => true,
        Item::Segment(_, body) | Item::Quantified(body, ..) => body.iter().all(is_valid_input),
        Item::BackRef(_) | Item::Call(..) => false,
    }
}

fn is_valid_output(item: &Item) -> bool {
    match item {
        Item::Char(_) | Item::BackRef(_) => true,
        Item::Call(_, body) => body.iter().all(is_valid_output),
        Item::Set(_) | Item::Segment(..) | Item::Quantified(..) => false,
    }
}

fn lower_input(items: &[Item]) -> Vec<Matcher> {
    items
        .iter()
        .filter_map(|item| match item {
            Item::Char(c) => Some(Matcher::Char(*c)),
            Item::Set(set) => Some(Matcher::Set(Arc::clone(set))),
            Item::Segment(n, body) => Some(Matcher::Segment(*n, lower_input(body))),
            Item::Quantified(body, min, max) => {
                Some(Matcher::Quantified { body: lower_input(body), min: *min, max: *max })
            }
            Item::BackRef(_) | Item::Call(..) => None,
        })
        .collect()
}

fn lower_output(items: &[Item], cursor: Option<usize>) -> Vec<OutputPart> {
    fn push_char(parts: &mut Vec<OutputPart>, c: char) {
        if let Some(OutputPart::Literal(text)) = parts.last_mut() {
            text.push(c);
        } else {
            parts.push(OutputPart::Literal(c.to_string()));
        }
    }

    let mut parts = Vec::new();
    for (i, item) in items.iter().enumerate() {
        if cursor == Some(i) {
            parts.push(OutputPart::Cursor);
        }
        match item {
            Item::Char(c) => push_char(&mut parts, *c),
            Item::BackRef(n) => parts.push(OutputPart::BackRef(*n)),
            Item::Call(translit, body) => parts.push(OutputPart::Call(translit.clone(), lower_output(body, None))),
            Item::Set(_) | Item::Segment(..) | Item::Quantified(..) => {}
        }
    }
    if cursor == Some(items.len()) {
        parts.push(OutputPart::Cursor);
    }
    parts
}
