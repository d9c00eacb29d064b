//! One engine step: try candidate rules at `start`, apply the first match.

use super::compiled_rules::{Rule, RuleFlags, RuleSet};
use super::matcher::{Captures, Degree, Scan};
use super::replacer;
use crate::transliterator::{Position, Replaceable};

/// Where a successful match landed.
struct Found {
    ante_start: usize,
    key_end: usize,
    post_end: usize,
    caps: Captures,
}

impl Rule {
    /// Try this rule at `pos.start`. On a match, rewrite the key and advance
    /// `pos`.
    pub(crate) fn match_and_replace(&self, text: &mut dyn Replaceable, pos: &mut Position, incremental: bool) -> Degree {
        let mut found = None;
        let degree = {
            let view: &dyn Replaceable = &*text;
            let ante = Scan { text: view, bound: pos.context_start, incremental: false };
            let key = Scan { text: view, bound: pos.limit, incremental };
            let post = Scan { text: view, bound: pos.context_limit, incremental };

            ante.backward(&self.ante, pos.start, Captures::default(), &mut |ante_start, caps| {
                if self.flags.contains(RuleFlags::ANCHOR_START) && ante_start != pos.context_start {
                    return Degree::Mismatch;
                }
                key.forward(&self.key, pos.start, caps, &mut |key_end, caps| {
                    if !self.post.is_empty() && incremental && key_end == pos.limit {
                        return Degree::Partial;
                    }
                    post.forward(&self.post, key_end, caps, &mut |post_end, caps| {
                        if self.flags.contains(RuleFlags::ANCHOR_END) {
                            if post_end != pos.context_limit {
                                return Degree::Mismatch;
                            }
                            if incremental {
                                return Degree::Partial;
                            }
                        }
                        found = Some(Found { ante_start, key_end, post_end, caps });
                        Degree::Match
                    })
                })
            })
        };

        let Some(found) = found.filter(|_| degree == Degree::Match) else {
            return degree;
        };

        let (new_start, out_len) =
            replacer::replace(&self.output, self.cursor_offset, text, pos.start, found.key_end, &found.caps);
        let delta = out_len as isize - (found.key_end - pos.start) as isize;
        pos.limit = (pos.limit as isize + delta) as usize;
        pos.context_limit = (pos.context_limit as isize + delta) as usize;

        let upper = ((found.post_end as isize + delta) as usize).min(pos.limit);
        let clamped = new_start.clamp(0, upper as isize) as usize;
        pos.start = clamped.max(found.ante_start);
        tracing::trace!(rule = %self.source, position = %pos, "rule matched");
        Degree::Match
    }
}

impl RuleSet {
    /// Apply one step at `pos.start`.
    ///
    /// Returns `false` only when a rule partially matched in incremental
    /// mode, meaning the caller should wait for more text. When no rule
    /// matches, the code point at `start` is left as is and skipped.
    pub(crate) fn transliterate(&self, text: &mut dyn Replaceable, pos: &mut Position, incremental: bool) -> bool {
        let first = text.char_at(pos.start);
        for rule in self.candidates(first) {
            match rule.match_and_replace(text, pos, incremental) {
                Degree::Match => return true,
                Degree::Partial => return false,
                Degree::Mismatch => {}
            }
        }
        pos.start += 1;
        true
    }

    /// Run steps until `start` reaches `limit`, a partial match blocks, or the
    /// loop guard trips.
    pub(crate) fn run(&self, id: &str, text: &mut dyn Replaceable, pos: &mut Position, incremental: bool) {
        let budget = (pos.limit - pos.start).saturating_mul(self.max_loop_factor);
        let mut steps = 0usize;
        while pos.start < pos.limit && steps <= budget && self.transliterate(text, pos, incremental) {
            steps += 1;
        }
        if steps > budget {
            tracing::warn!(id, steps, position = %pos, "rule loop guard tripped");
        }
        if !incremental && pos.start < pos.limit {
            pos.start = pos.limit;
        }
    }
}
