//! Rule compilation and application engine.
//!
//! This module is the entry point for turning rule text into a
//! [`Transliterator`] and holds the machinery that runs compiled rules over a
//! [`Replaceable`](crate::Replaceable) buffer.
//!
//! ## How the parts work together
//!
//! ```text
//! rule text ── parser::parse            (parser.rs)
//!                - statements, variables, pragmas
//!                - `::` steps resolved through the registry
//!                - blocks of Rule in application order
//!                     │
//!                     v
//!              RuleSet::new              (compiled_rules.rs)
//!                - masking check
//!                - first-character index
//!                     │
//!                     v
//!              RuleSet::run / transliterate   (apply.rs)
//!                - candidate rules at `start`
//!                - Rule::match_and_replace
//!                    ante ◀── Scan::backward  (matcher.rs)
//!                    key, post ──▶ Scan::forward
//!                    replacer::replace         (replacer.rs)
//! ```
//!
//! A rule text with a single block compiles to a rule-based transliterator;
//! text with `::` steps compiles to a compound whose anonymous rule blocks
//! are named `%Pass1`, `%Pass2`, …
//!
//! ## Responsibilities by module
//!
//! - `parser.rs`: rule text grammar, variables, `::` statements and
//!   validation.
//! - `compiled_rules.rs`: `Rule`, `RuleSet`, masking and `to_rules` rendering.
//! - `matcher.rs`: backtracking matcher with incremental partial matches.
//! - `replacer.rs`: output production (back references, calls, cursor).
//! - `apply.rs`: one engine step and the per-run loop.

#[path = "engine/apply.rs"]
mod apply;
#[path = "engine/compiled_rules.rs"]
mod compiled_rules;
#[path = "engine/matcher.rs"]
mod matcher;
#[path = "engine/parser.rs"]
mod parser;
#[path = "engine/replacer.rs"]
mod replacer;

#[cfg(test)]
#[path = "engine/tests.rs"]
mod tests;

pub use compiled_rules::RuleSet;

use crate::api::Options;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::transliterator::{Direction, Origin, Transliterator};
use parser::Section;
use std::sync::Arc;

/// Compile `text` in `direction` into a transliterator named `id`.
///
/// Fails with [`Error::NotInvertible`] when compiling in reverse finds only
/// forward rules.
pub(crate) fn compile(
    id: &str,
    text: &str,
    direction: Direction,
    registry: &Registry,
    options: &Options,
) -> Result<Transliterator> {
    let parsed = parser::parse(text, direction, registry)?;
    if direction == Direction::Reverse && parsed.sections.is_empty() && parsed.skipped > 0 {
        return Err(Error::NotInvertible(id.to_string()));
    }

    let rule_count: usize =
        parsed.sections.iter().map(|s| if let Section::Rules(rules) = s { rules.len() } else { 0 }).sum();
    tracing::debug!(id, ?direction, rules = rule_count, sections = parsed.sections.len(), "compiled rule set");

    let origin = Origin::Rules { text: Arc::from(text), direction };
    let mut sections = parsed.sections;
    let mut translit = match sections.len() {
        0 => Transliterator::rule_based(id, RuleSet::new(Vec::new(), options)?),
        1 if matches!(sections[0], Section::Rules(_)) => match sections.remove(0) {
            Section::Rules(rules) => Transliterator::rule_based(id, RuleSet::new(rules, options)?),
            Section::Step(step) => step,
        },
        _ => {
            let mut passes = 0;
            let mut children = Vec::with_capacity(sections.len());
            for section in sections {
                match section {
                    Section::Rules(rules) => {
                        passes += 1;
                        children.push(Transliterator::rule_based(&format!("%Pass{passes}"), RuleSet::new(rules, options)?));
                    }
                    Section::Step(step) => children.push(step),
                }
            }
            Transliterator::compound(id, children)
        }
    };
    translit.set_origin(origin);
    translit.set_filter(parsed.global_filter);
    Ok(translit)
}
