//! The transliterator value and its public entry points.
//!
//! A [`Transliterator`] is an ID, an optional filter and a [`Kind`]. It is
//! cheap to clone (every kind is `Copy` or behind an `Arc`) and holds no
//! mutable matching state, so one instance can serve many threads.
//!
//! Every entry point funnels into the filtered driver in `driver.rs`, which
//! splits the text into runs of filtered characters and, for keystroke input,
//! feeds each run one code point at a time.

#[path = "transliterator/driver.rs"]
mod driver;
#[path = "transliterator/text.rs"]
mod text;

#[cfg(test)]
#[path = "transliterator/tests.rs"]
mod tests;

pub use text::{Position, Replaceable, ReplaceableString};

use crate::engine::{self, RuleSet};
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::transforms::{AnyScript, CaseMapping, HexForm, NormalizationForm};
use crate::unicode_set::UnicodeSet;
use std::fmt;
use std::sync::Arc;

/// Which way a rule set or ID is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

/// A user-supplied transliteration step.
///
/// Implementations rewrite `pos.start..pos.limit`, may read
/// `pos.context_start..pos.context_limit`, and must leave `pos.start` after
/// the committed text with `limit` and `context_limit` adjusted for any
/// change in length. In incremental mode they may stop early to wait for more
/// text.
pub trait Transliterate: Send + Sync + fmt::Debug {
    fn transliterate(&self, text: &mut dyn Replaceable, pos: &mut Position, incremental: bool);

    /// Code points of ante context the step looks back over.
    fn max_context_length(&self) -> usize {
        0
    }
}

/// What a transliterator does.
#[derive(Debug, Clone)]
pub enum Kind {
    RuleBased(Arc<RuleSet>),
    Compound(Arc<[Transliterator]>),
    AnyScript(Arc<AnyScript>),
    Normalization(NormalizationForm),
    CaseMap(CaseMapping),
    Hex(HexForm),
    /// Unescape hex forms; `None` accepts every form.
    HexToAny(Option<HexForm>),
    Null,
    Remove,
    Custom(Arc<dyn Transliterate>),
}

/// Where a transliterator came from, for `inverse`.
#[derive(Debug, Clone)]
pub(crate) enum Origin {
    Rules { text: Arc<str>, direction: Direction },
    Registry,
}

#[derive(Debug, Clone)]
pub struct Transliterator {
    id: Arc<str>,
    filter: Option<UnicodeSet>,
    kind: Kind,
    origin: Origin,
}

impl Transliterator {
    pub(crate) fn new(id: &str, kind: Kind) -> Self {
        Transliterator { id: Arc::from(id), filter: None, kind, origin: Origin::Registry }
    }

    pub(crate) fn rule_based(id: &str, rules: RuleSet) -> Self {
        Self::new(id, Kind::RuleBased(Arc::new(rules)))
    }

    /// A pipeline applying `children` left to right.
    pub fn compound(id: &str, children: Vec<Transliterator>) -> Self {
        Self::new(id, Kind::Compound(children.into()))
    }

    pub fn null(id: &str) -> Self {
        Self::new(id, Kind::Null)
    }

    /// Wrap a user implementation.
    pub fn custom(id: &str, step: impl Transliterate + 'static) -> Self {
        Self::new(id, Kind::Custom(Arc::new(step)))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn with_id(mut self, id: &str) -> Self {
        self.id = Arc::from(id);
        self
    }

    pub(crate) fn set_origin(&mut self, origin: Origin) {
        self.origin = origin;
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn filter(&self) -> Option<&UnicodeSet> {
        self.filter.as_ref()
    }

    /// Replace the filter. Only characters in the filter are touched.
    pub fn set_filter(&mut self, filter: Option<UnicodeSet>) {
        self.filter = filter.map(UnicodeSet::frozen);
    }

    /// Narrow the filter to its intersection with `filter`.
    pub(crate) fn restrict_filter(&mut self, filter: &UnicodeSet) {
        let narrowed = match &self.filter {
            Some(current) => {
                let mut both = current.clone_as_thawed();
                both.retain_all(filter).map(|()| both).unwrap_or_else(|_| filter.clone())
            }
            None => filter.clone(),
        };
        self.set_filter(Some(narrowed));
    }

    /// Steps of a compound; empty for every other kind.
    pub fn children(&self) -> &[Transliterator] {
        match &self.kind {
            Kind::Compound(children) => &children[..],
            _ => &[],
        }
    }

    /// The longest ante context any step looks back over.
    pub fn max_context_length(&self) -> usize {
        match &self.kind {
            Kind::RuleBased(rules) => rules.max_context_length(),
            Kind::Compound(children) => children.iter().map(Transliterator::max_context_length).max().unwrap_or(0),
            Kind::CaseMap(mapping) => mapping.max_context_length(),
            Kind::Custom(step) => step.max_context_length(),
            _ => 0,
        }
    }

    // --- Entry points -------------------------------------------------------

    /// Transliterate a whole string.
    pub fn transliterate_str(&self, text: &str) -> String {
        let mut buffer = ReplaceableString::new(text);
        let mut pos = Position::full(buffer.len());
        self.filtered(&mut buffer, &mut pos, false, true);
        buffer.to_string()
    }

    /// Transliterate `start..limit` of `text` and return the new limit.
    pub fn transliterate_range(&self, text: &mut dyn Replaceable, start: usize, limit: usize) -> Result<usize> {
        let mut pos = Position::new(start, start, limit, limit);
        pos.validate(text.len())?;
        self.filtered(text, &mut pos, false, true);
        Ok(pos.limit)
    }

    /// Keystroke entry point: append `insertion` at `pos.limit` and commit
    /// whatever can no longer change. Call
    /// [`finish_transliteration`](Self::finish_transliteration) when input ends.
    pub fn transliterate(&self, text: &mut dyn Replaceable, pos: &mut Position, insertion: Option<&str>) -> Result<()> {
        pos.validate(text.len())?;
        if let Some(insertion) = insertion {
            text.replace(pos.limit, pos.limit, insertion);
            let added = insertion.chars().count();
            pos.limit += added;
            pos.context_limit += added;
        }
        self.filtered(text, pos, true, true);
        Ok(())
    }

    /// Resolve everything left pending by incremental calls.
    pub fn finish_transliteration(&self, text: &mut dyn Replaceable, pos: &mut Position) -> Result<()> {
        pos.validate(text.len())?;
        self.filtered(text, pos, false, true);
        Ok(())
    }

    /// One filtered pass over `pos`, without pass-by-pass rollback.
    pub fn filtered_transliterate(&self, text: &mut dyn Replaceable, pos: &mut Position, incremental: bool) -> Result<()> {
        pos.validate(text.len())?;
        self.filtered(text, pos, incremental, false);
        Ok(())
    }

    /// The unfiltered step for one run.
    pub(crate) fn handle(&self, text: &mut dyn Replaceable, pos: &mut Position, incremental: bool) {
        match &self.kind {
            Kind::RuleBased(rules) => rules.run(&self.id, text, pos, incremental),
            Kind::Compound(children) => driver::run_compound(children, text, pos, incremental),
            Kind::AnyScript(any) => any.transliterate(text, pos, incremental),
            Kind::Normalization(form) => form.transliterate(text, pos, incremental),
            Kind::CaseMap(mapping) => mapping.transliterate(text, pos, incremental),
            Kind::Hex(form) => form.escape(text, pos),
            Kind::HexToAny(form) => HexForm::unescape(*form, text, pos, incremental),
            Kind::Null => pos.start = pos.limit,
            Kind::Remove => {
                let removed = pos.limit - pos.start;
                text.replace(pos.start, pos.limit, "");
                pos.limit -= removed;
                pos.context_limit -= removed;
            }
            Kind::Custom(step) => step.transliterate(text, pos, incremental),
        }
    }

    // --- Inverse and rules --------------------------------------------------

    /// The reverse-direction transliterator.
    ///
    /// Rule-based transliterators recompile their source text in the other
    /// direction; everything else is looked up by its inverse ID.
    pub fn inverse(&self, registry: &Registry) -> Result<Transliterator> {
        match &self.origin {
            Origin::Rules { text, direction } => {
                let id = registry.inverse_id(&self.id);
                engine::compile(&id, text, direction.reversed(), registry, registry.options())
            }
            Origin::Registry => registry.get_instance(&self.id, Direction::Reverse).map_err(|e| match e {
                Error::InvalidId(_) => Error::NotInvertible(self.id.to_string()),
                other => other,
            }),
        }
    }

    fn is_anonymous_pass(&self) -> bool {
        self.id.starts_with("%Pass") && matches!(self.kind, Kind::RuleBased(_))
    }

    fn step_rule(&self, escape_unprintable: bool) -> String {
        let filter = self.filter.as_ref().map(|f| f.to_pattern(escape_unprintable)).unwrap_or_default();
        format!("::{filter}{};", self.id)
    }

    /// Rule text that recompiles to an equivalent transliterator.
    pub fn to_rules(&self, escape_unprintable: bool) -> String {
        let mut lines = Vec::new();
        let global_filter = || self.filter.as_ref().map(|f| format!("::{};", f.to_pattern(escape_unprintable)));
        match &self.kind {
            Kind::RuleBased(rules) => {
                lines.extend(global_filter());
                lines.push(rules.to_rules(escape_unprintable));
            }
            Kind::Compound(children) => {
                lines.extend(global_filter());
                let anonymous = children.iter().filter(|c| c.is_anonymous_pass()).count();
                let mut after_pass = false;
                for child in children.iter() {
                    if child.is_anonymous_pass() {
                        if anonymous > 1 && after_pass {
                            lines.push("::Null;".to_string());
                        }
                        lines.push(child.to_rules(escape_unprintable));
                        after_pass = true;
                    } else {
                        lines.push(child.step_rule(escape_unprintable));
                        after_pass = false;
                    }
                }
            }
            _ => lines.push(self.step_rule(escape_unprintable)),
        }
        lines.retain(|line| !line.is_empty());
        lines.join("\n")
    }
}

impl fmt::Display for Transliterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
