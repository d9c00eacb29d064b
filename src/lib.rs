//! Rule-based, incremental transliteration.
//!
//! Text is rewritten by [`Transliterator`]s: compiled rule sets
//! (`ante { key } post > output ;`), built-in transforms (case mapping,
//! normalization, hex escapes, script runs) and compound pipelines of both.
//! A [`Registry`] maps IDs such as `Greek-Latin` or `[:Latin:]; NFD; Lower`
//! to transliterators and knows how to invert them.
//!
//! ```
//! use scriptshift::{Direction, Options, Registry};
//!
//! let registry = Registry::with_builtins(Options::default()).unwrap();
//! let t = registry.get_instance("Any-Upper; Any-Hex/XML", Direction::Forward).unwrap();
//! assert_eq!(t.transliterate_str("hi"), "&#x48;&#x49;");
//! ```

extern crate self as scriptshift;

#[macro_use]
mod macros;
mod api;
mod engine;
mod error;
pub mod properties;
mod registry;
mod rules;
mod transforms;
mod transliterator;
mod unicode_set;

pub use api::{
    Keystroke, Options, TransliterationDetails, transliterate, transliterate_rules, transliterate_verbose,
};
pub use engine::RuleSet;
pub use error::{Error, Result};
pub use registry::{BasicId, Registry, WeakRegistry};
pub use transforms::{AnyScript, CaseMapping, HexForm, NormalizationForm};
pub use transliterator::{
    Direction, Kind, Position, Replaceable, ReplaceableString, Transliterate, Transliterator,
};
pub use unicode_set::{ETHER, SymbolTable, SymbolValue, UnicodeSet};
