//! Filter runs, keystroke passes and compound sequencing.
//!
//! ## Runs
//!
//! With a filter, the window is split into maximal runs of characters the
//! filter contains. Text outside a run is context only. Only the last run may
//! be incremental; earlier runs are followed by filtered text, so they are
//! completed eagerly.
//!
//! ## Passes
//!
//! A keystroke run is fed to the step in passes of growing length: the first
//! code point, then the first two, and so on. A pass that finishes
//! (`start == limit`) is committed; one that blocks is rolled back to its
//! input text and extended by one code point. Without this, a step that
//! partially rewrote text into characters outside the filter would hide them
//! from the rest of the run.

use super::{Position, Replaceable, Transliterator};

fn shift(value: usize, delta: isize) -> usize {
    (value as isize + delta) as usize
}

impl Transliterator {
    pub(crate) fn filtered(&self, text: &mut dyn Replaceable, pos: &mut Position, incremental: bool, rollback: bool) {
        let filter = self.filter();
        if filter.is_none() && !rollback {
            self.handle(text, pos, incremental);
            return;
        }

        let mut global_limit = pos.limit;
        loop {
            if let Some(filter) = filter {
                while pos.start < global_limit && !filter.contains(text.char_at(pos.start)) {
                    pos.start += 1;
                }
                pos.limit = pos.start;
                while pos.limit < global_limit && filter.contains(text.char_at(pos.limit)) {
                    pos.limit += 1;
                }
            }
            if pos.start == pos.limit {
                break;
            }

            let incremental_run = incremental && pos.limit >= global_limit;
            if rollback && incremental_run {
                let delta = self.run_passes(text, pos);
                global_limit = shift(global_limit, delta);
            } else {
                let limit = pos.limit;
                self.handle(text, pos, incremental_run);
                if !incremental_run && pos.start != pos.limit {
                    tracing::warn!(id = self.id(), position = %pos, "incomplete non-incremental run");
                    pos.start = pos.limit;
                }
                global_limit = shift(global_limit, pos.limit as isize - limit as isize);
            }

            if filter.is_none() || incremental_run {
                break;
            }
        }
        pos.limit = global_limit;
    }

    /// Feed the run at `pos` one code point at a time and return the change
    /// in length of the committed text.
    fn run_passes(&self, text: &mut dyn Replaceable, pos: &mut Position) -> isize {
        let run_start = pos.start;
        let mut run_limit = pos.limit;
        let original: Vec<char> = (run_start..run_limit).map(|i| text.char_at(i)).collect();

        // Code points of `original` already committed, and the pending ones after them.
        let mut committed = 0;
        let mut uncommitted = 0;
        let mut pass_start = run_start;
        let mut pass_limit = run_start;
        let mut total_delta = 0;

        loop {
            pass_limit += 1;
            if pass_limit > run_limit {
                break;
            }
            uncommitted += 1;
            pos.limit = pass_limit;
            self.handle(text, pos, true);
            let delta = pos.limit as isize - pass_limit as isize;

            if pos.start != pos.limit {
                let input: String = original[committed..committed + uncommitted].iter().collect();
                text.replace(pass_start, pos.limit, &input);
                pos.start = pass_start;
                pos.limit = pass_limit;
                pos.context_limit = shift(pos.context_limit, -delta);
                tracing::trace!(id = self.id(), position = %pos, "rolled back pass");
            } else {
                pass_start = pos.start;
                pass_limit = pos.start;
                committed += uncommitted;
                uncommitted = 0;
                run_limit = shift(run_limit, delta);
                total_delta += delta;
            }
        }

        pos.start = pass_start;
        total_delta
    }
}

/// Apply `children` in order over the same window.
///
/// In incremental mode each child only sees what the previous one committed.
pub(super) fn run_compound(children: &[Transliterator], text: &mut dyn Replaceable, pos: &mut Position, incremental: bool) {
    if children.is_empty() {
        pos.start = pos.limit;
        return;
    }
    let compound_start = pos.start;
    let compound_limit = pos.limit;
    let mut delta = 0;
    for child in children {
        pos.start = compound_start;
        if pos.start == pos.limit {
            break;
        }
        let limit = pos.limit;
        child.filtered(text, pos, incremental, false);
        delta += pos.limit as isize - limit as isize;
        if incremental {
            pos.limit = pos.start;
        }
    }
    pos.limit = shift(compound_limit, delta);
}
