//! `Any-<Script>`: split text into script runs and send each run through the
//! registered `<Source>-<Script>` transliterator.
//!
//! Common and inherited characters (spaces, digits, combining marks) join the
//! runs on both sides of them, so a rule for the source script still sees
//! them as context.

use crate::properties::{Script, script};
use crate::registry::WeakRegistry;
use crate::transliterator::{Direction, Position, Replaceable, Transliterator};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;

/// Maximal runs of a single script within `text_start..text_limit`.
#[derive(Debug)]
struct ScriptRuns {
    text_start: usize,
    text_limit: usize,
    start: usize,
    limit: usize,
    /// `None` for a run of only common and inherited characters.
    script: Option<Script>,
}

impl ScriptRuns {
    fn new(text_start: usize, text_limit: usize) -> Self {
        ScriptRuns { text_start, text_limit, start: text_start, limit: text_start, script: None }
    }

    fn next(&mut self, text: &dyn Replaceable) -> bool {
        if self.limit == self.text_limit {
            return false;
        }
        self.script = None;
        self.start = self.limit;
        while self.start > self.text_start && script(text.char_at(self.start - 1)).is_common_or_inherited() {
            self.start -= 1;
        }
        while self.limit < self.text_limit {
            let s = script(text.char_at(self.limit));
            if !s.is_common_or_inherited() {
                match self.script {
                    None => self.script = Some(s),
                    Some(current) if current != s => break,
                    Some(_) => {}
                }
            }
            self.limit += 1;
        }
        true
    }

    /// Account for a change in length inside the current run.
    fn adjust_limit(&mut self, delta: isize) {
        self.limit = (self.limit as isize + delta) as usize;
        self.text_limit = (self.text_limit as isize + delta) as usize;
    }
}

pub struct AnyScript {
    target: Script,
    variant: Option<String>,
    registry: WeakRegistry,
    cache: Mutex<HashMap<Script, Option<Transliterator>>>,
}

impl fmt::Debug for AnyScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyScript").field("target", &self.target).field("variant", &self.variant).finish()
    }
}

impl AnyScript {
    pub(crate) fn new(target: Script, variant: Option<&str>, registry: WeakRegistry) -> Self {
        AnyScript { target, variant: variant.map(str::to_string), registry, cache: Mutex::new(HashMap::new()) }
    }

    pub fn target(&self) -> Script {
        self.target
    }

    /// The transliterator for runs of `source`, looked up once per script.
    fn step_for(&self, source: Option<Script>) -> Option<Transliterator> {
        let source = source.filter(|s| *s != self.target && *s != Script::Unknown)?;
        let mut cache = self.cache.lock();
        if let Some(cached) = cache.get(&source) {
            return cached.clone();
        }
        let mut id = format!("{}-{}", source.name(), self.target.name());
        if let Some(variant) = &self.variant {
            id.push('/');
            id.push_str(variant);
        }
        let step = self.registry.upgrade().and_then(|registry| registry.get_instance(&id, Direction::Forward).ok());
        tracing::debug!(%id, found = step.is_some(), "resolved script run transliterator");
        cache.insert(source, step.clone());
        step
    }

    pub(crate) fn transliterate(&self, text: &mut dyn Replaceable, pos: &mut Position, incremental: bool) {
        let all_start = pos.start;
        let mut all_limit = pos.limit;
        let mut runs = ScriptRuns::new(pos.context_start, pos.context_limit);

        while runs.next(text) {
            if runs.limit <= all_start {
                continue;
            }
            let Some(step) = self.step_for(runs.script) else {
                pos.start = runs.limit.min(all_limit);
                if runs.limit >= all_limit {
                    break;
                }
                continue;
            };

            let run_incremental = incremental && runs.limit >= all_limit;
            pos.start = all_start.max(runs.start);
            pos.limit = all_limit.min(runs.limit);
            let limit = pos.limit;
            step.filtered(text, pos, run_incremental, false);
            let delta = pos.limit as isize - limit as isize;
            all_limit = (all_limit as isize + delta) as usize;
            runs.adjust_limit(delta);
            if runs.limit >= all_limit {
                break;
            }
        }
        pos.limit = all_limit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transliterator::ReplaceableString;

    fn runs(text: &str) -> Vec<(usize, usize, Option<Script>)> {
        let buffer = ReplaceableString::new(text);
        let mut runs = ScriptRuns::new(0, buffer.len());
        let mut out = Vec::new();
        while runs.next(&buffer) {
            out.push((runs.start, runs.limit, runs.script));
        }
        out
    }

    #[test]
    fn common_characters_join_both_neighbors() {
        assert_eq!(
            runs("ab αβ 12"),
            vec![(0, 3, Some(Script::Latin)), (2, 8, Some(Script::Greek))]
        );
        assert_eq!(runs("12 "), vec![(0, 3, None)]);
        assert_eq!(runs(""), vec![]);
    }
}
