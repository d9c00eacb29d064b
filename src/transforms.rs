//! Built-in transforms that are not written as rules.
//!
//! Each one works on a single run (`pos.start..pos.limit`) the way a compiled
//! rule set does: it rewrites text in place, keeps `limit` and
//! `context_limit` in step with length changes, and in incremental mode stops
//! where more input could still change the result.

#[path = "transforms/any_script.rs"]
mod any_script;
#[path = "transforms/case.rs"]
mod case;
#[path = "transforms/hex.rs"]
mod hex;
#[path = "transforms/normalize.rs"]
mod normalize;

pub use any_script::AnyScript;
pub use case::CaseMapping;
pub use hex::HexForm;
pub use normalize::NormalizationForm;

use crate::transliterator::{Position, Replaceable};

/// Replace `start..limit` with `output` and shift the end of the window.
/// Returns the output length in code points.
pub(crate) fn replace_in(text: &mut dyn Replaceable, pos: &mut Position, start: usize, limit: usize, output: &str) -> usize {
    let len = output.chars().count();
    text.replace(start, limit, output);
    let delta = len as isize - (limit - start) as isize;
    pos.limit = (pos.limit as isize + delta) as usize;
    pos.context_limit = (pos.context_limit as isize + delta) as usize;
    len
}

#[cfg(test)]
pub(crate) fn apply_whole(text: &str, step: impl Fn(&mut dyn Replaceable, &mut Position)) -> String {
    let mut buffer = crate::transliterator::ReplaceableString::new(text);
    let mut pos = Position::full(crate::transliterator::Replaceable::len(&buffer));
    step(&mut buffer, &mut pos);
    buffer.to_string()
}
