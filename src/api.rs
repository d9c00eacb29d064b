use crate::error::Result;
use crate::registry::Registry;
use crate::transliterator::{Direction, Position, ReplaceableString, Transliterator};
use std::time::{Duration, Instant};

/// Options that affect rule compilation and application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Reject a rule that an earlier rule in the same block always shadows.
    pub reject_masked_rules: bool,
    /// Rule steps allowed per code point of a run before the loop guard stops
    /// the run.
    pub max_loop_factor: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options { reject_masked_rules: true, max_loop_factor: 16 }
    }
}

/// Transliterate `text` with a built-in ID.
///
/// # Example
/// ```
/// let out = scriptshift::transliterate("Greek-Latin", "Αθήνα").unwrap();
/// assert_eq!(out, "Athḗna");
/// ```
pub fn transliterate(id: &str, text: &str) -> Result<String> {
    let registry = Registry::with_builtins(Options::default())?;
    Ok(registry.get_instance(id, Direction::Forward)?.transliterate_str(text))
}

/// Compile `rules` against the built-ins and apply them to `text`.
pub fn transliterate_rules(rules: &str, text: &str) -> Result<String> {
    let registry = Registry::with_builtins(Options::default())?;
    Ok(registry.create_from_rules("Rules", rules, Direction::Forward)?.transliterate_str(text))
}

/// The buffer after one keystroke of an incremental run.
#[derive(Debug, Clone)]
pub struct Keystroke {
    pub input: char,
    pub text: String,
    /// Code points that can no longer change.
    pub committed: usize,
}

/// Additional details returned by [`transliterate_verbose`].
#[derive(Debug, Clone)]
pub struct TransliterationDetails {
    pub id: String,
    pub output: String,
    /// IDs of the steps of a compound, in order.
    pub steps: Vec<String>,
    /// Filled only for incremental runs.
    pub keystrokes: Vec<Keystroke>,
    pub total: Duration,
}

/// Run `translit` over `text` and record what happened.
///
/// With `incremental`, the text is typed one code point at a time through
/// [`Transliterator::transliterate`] and then finished.
pub fn transliterate_verbose(translit: &Transliterator, text: &str, incremental: bool) -> Result<TransliterationDetails> {
    let started = Instant::now();
    let mut keystrokes = Vec::new();
    let output = if incremental {
        let mut buffer = ReplaceableString::default();
        let mut pos = Position::default();
        for c in text.chars() {
            translit.transliterate(&mut buffer, &mut pos, Some(c.encode_utf8(&mut [0; 4])))?;
            keystrokes.push(Keystroke { input: c, text: buffer.to_string(), committed: pos.start });
        }
        translit.finish_transliteration(&mut buffer, &mut pos)?;
        buffer.to_string()
    } else {
        translit.transliterate_str(text)
    };

    Ok(TransliterationDetails {
        id: translit.id().to_string(),
        output,
        steps: translit.children().iter().map(|c| c.id().to_string()).collect(),
        keystrokes,
        total: started.elapsed(),
    })
}
