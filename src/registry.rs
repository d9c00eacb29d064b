//! The ID → transliterator table.
//!
//! A [`Registry`] is an explicit value: construct one, register what you
//! need (or start from [`Registry::with_builtins`]) and pass it wherever
//! transliterators are built. Clones share one table.
//!
//! ## Lookup
//!
//! IDs are matched case-insensitively on `Source-Target/Variant`. A missing
//! source means `Any`. When the exact ID is not registered, lookup drops the
//! variant, then walks locale-style fallbacks (`de_CH` → `de`) on the source
//! and then on the target.
//!
//! ## Locking
//!
//! The table sits behind a `parking_lot::RwLock`. Entries are cloned out of
//! the table before they are compiled or called, so rule compilation (which
//! resolves `::` steps through this same registry) never runs under the lock.

#[path = "registry/id.rs"]
pub(crate) mod id;

#[cfg(test)]
#[path = "registry/tests.rs"]
mod tests;

pub use id::BasicId;

use crate::api::Options;
use crate::engine;
use crate::error::{Error, Result};
use crate::properties::Script;
use crate::transforms::{AnyScript, CaseMapping, HexForm, NormalizationForm};
use crate::transliterator::{Direction, Kind, Transliterator};
use id::{CompoundId, SingleId};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};

/// Aliases may point at aliases, up to this depth.
const MAX_ALIAS_DEPTH: usize = 16;

type Factory = Arc<dyn Fn(&Registry) -> Result<Transliterator> + Send + Sync>;

#[derive(Clone)]
enum Entry {
    Rules { text: Arc<str>, direction: Direction, compiled: Arc<OnceCell<Transliterator>> },
    Instance(Transliterator),
    Factory(Factory),
    Alias(String),
}

impl Entry {
    fn kind_name(&self) -> &'static str {
        match self {
            Entry::Rules { .. } => "rules",
            Entry::Instance(_) => "instance",
            Entry::Factory(_) => "factory",
            Entry::Alias(_) => "alias",
        }
    }
}

/// An entry with the ID spelled as it was registered.
#[derive(Clone)]
struct Record {
    id: BasicId,
    entry: Entry,
}

#[derive(Default)]
struct Table {
    entries: HashMap<String, Record>,
    /// Lowercased target → inverse target, for `Any-` IDs.
    special_inverses: HashMap<String, String>,
}

struct Inner {
    table: RwLock<Table>,
    options: Options,
}

#[derive(Clone)]
pub struct Registry {
    inner: Arc<Inner>,
}

/// A non-owning handle, for transliterators that look steps up lazily.
#[derive(Clone)]
pub struct WeakRegistry {
    inner: Weak<Inner>,
}

impl WeakRegistry {
    pub fn upgrade(&self) -> Option<Registry> {
        self.inner.upgrade().map(|inner| Registry { inner })
    }
}

impl fmt::Debug for WeakRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakRegistry")
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.inner.table.read().entries.len())
            .field("options", &self.inner.options)
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn key(source: &str, target: &str, variant: Option<&str>) -> String {
    let mut key = format!("{source}-{target}");
    if let Some(variant) = variant.filter(|v| !v.is_empty()) {
        key.push('/');
        key.push_str(variant);
    }
    key.to_lowercase()
}

/// `de_CH_1901`, `de_CH`, `de`.
fn locale_fallbacks(name: &str) -> Vec<&str> {
    let mut out = vec![name];
    let mut rest = name;
    while let Some(cut) = rest.rfind('_') {
        rest = &rest[..cut];
        out.push(rest);
    }
    out
}

fn parse_basic(id: &str) -> Result<BasicId> {
    BasicId::parse(id).ok_or_else(|| Error::InvalidId(id.to_string()))
}

impl Registry {
    /// An empty registry with default options.
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    /// An empty registry.
    pub fn with_options(options: Options) -> Self {
        Registry { inner: Arc::new(Inner { table: RwLock::new(Table::default()), options }) }
    }

    /// A registry holding the built-in transforms and script rules.
    pub fn with_builtins(options: Options) -> Result<Self> {
        let registry = Self::with_options(options);
        registry.register_builtins()?;
        Ok(registry)
    }

    pub fn options(&self) -> &Options {
        &self.inner.options
    }

    pub fn downgrade(&self) -> WeakRegistry {
        WeakRegistry { inner: Arc::downgrade(&self.inner) }
    }

    fn insert(&self, id: BasicId, entry: Entry) {
        tracing::debug!(id = %id.canonical(), kind = entry.kind_name(), "registered transliterator");
        let key = key(id.source(), &id.target, id.variant.as_deref());
        self.inner.table.write().entries.insert(key, Record { id, entry });
    }

    // --- Registration -------------------------------------------------------

    /// Register a ready-made transliterator under its own ID.
    pub fn register_instance(&self, translit: Transliterator) -> Result<()> {
        let id = parse_basic(translit.id())?;
        self.insert(id, Entry::Instance(translit));
        Ok(())
    }

    /// Register a constructor called on every lookup of `id`.
    pub fn register_factory(
        &self,
        id: &str,
        factory: impl Fn(&Registry) -> Result<Transliterator> + Send + Sync + 'static,
    ) -> Result<()> {
        self.insert(parse_basic(id)?, Entry::Factory(Arc::new(factory)));
        Ok(())
    }

    /// Register rule text, compiled on first lookup. With `bidirectional`,
    /// the inverse ID (`Target-Source`) is registered too, reading the same
    /// text in the other direction.
    pub fn register_rules(&self, id: &str, text: &str, direction: Direction, bidirectional: bool) -> Result<()> {
        let basic = parse_basic(id)?;
        let text: Arc<str> = Arc::from(text);
        if bidirectional {
            let inverse = basic.inverse(&|_| None);
            let compiled = Arc::new(OnceCell::new());
            self.insert(inverse, Entry::Rules { text: text.clone(), direction: direction.reversed(), compiled });
        }
        self.insert(basic, Entry::Rules { text, direction, compiled: Arc::new(OnceCell::new()) });
        Ok(())
    }

    /// Make `id` resolve to `target`, which may be a compound ID.
    pub fn register_alias(&self, id: &str, target: &str) -> Result<()> {
        CompoundId::parse(target)?;
        self.insert(parse_basic(id)?, Entry::Alias(target.to_string()));
        Ok(())
    }

    /// Declare that the inverse of `Any-<target>` is `Any-<inverse>`.
    pub fn register_special_inverse(&self, target: &str, inverse: &str, bidirectional: bool) {
        let mut table = self.inner.table.write();
        table.special_inverses.insert(target.to_lowercase(), inverse.to_string());
        if bidirectional {
            table.special_inverses.insert(inverse.to_lowercase(), target.to_string());
        }
    }

    /// Remove `id`. Returns whether anything was registered under it.
    pub fn unregister(&self, id: &str) -> bool {
        let Some(basic) = BasicId::parse(id) else {
            return false;
        };
        let key = key(basic.source(), &basic.target, basic.variant.as_deref());
        let removed = self.inner.table.write().entries.remove(&key).is_some();
        tracing::debug!(id = %basic.canonical(), removed, "unregistered transliterator");
        removed
    }

    // --- Lookup -------------------------------------------------------------

    /// Build the transliterator for a (possibly compound) ID.
    pub fn get_instance(&self, id: &str, direction: Direction) -> Result<Transliterator> {
        self.resolve(id, direction, 0)
    }

    /// Compile rule text without registering it.
    pub fn create_from_rules(&self, id: &str, text: &str, direction: Direction) -> Result<Transliterator> {
        engine::compile(id, text, direction, self, self.options())
    }

    fn resolve(&self, id: &str, direction: Direction, depth: usize) -> Result<Transliterator> {
        let mut compound = CompoundId::parse(id)?;
        if direction == Direction::Reverse {
            compound = compound.reversed(&|target| self.special_inverse(target));
        }
        if compound.elements.is_empty() && compound.global_filter.is_none() {
            return Err(Error::InvalidId(id.to_string()));
        }

        let mut steps = Vec::with_capacity(compound.elements.len());
        for single in compound.elements.iter().filter_map(|e| e.forward.as_ref()) {
            steps.push(self.single(single, depth)?);
        }
        let display = compound.to_string();
        let mut translit = match steps.len() {
            0 => Transliterator::null(&display),
            1 if compound.global_filter.is_none() => steps.remove(0),
            _ => Transliterator::compound(&display, steps),
        };
        if let Some(filter) = &compound.global_filter {
            translit.restrict_filter(filter);
        }
        Ok(translit)
    }

    fn single(&self, single: &SingleId, depth: usize) -> Result<Transliterator> {
        let basic = single.basic.as_ref().ok_or_else(|| Error::InvalidId(single.to_string()))?;
        let (record_id, entry) = self.find(basic).ok_or_else(|| Error::InvalidId(basic.to_string()))?;
        let mut translit = match entry {
            Entry::Instance(translit) => translit,
            Entry::Factory(factory) => factory(self)?,
            Entry::Rules { text, direction, compiled } => compiled
                .get_or_try_init(|| engine::compile(&record_id.canonical(), &text, direction, self, self.options()))?
                .clone(),
            Entry::Alias(target) => {
                if depth >= MAX_ALIAS_DEPTH {
                    return Err(Error::InvalidId(basic.to_string()));
                }
                self.resolve(&target, Direction::Forward, depth + 1)?.with_id(&record_id.canonical())
            }
        };
        if let Some(filter) = &single.filter {
            translit.restrict_filter(filter);
        }
        Ok(translit)
    }

    /// Resolve one `::` step or function-call ID.
    pub(crate) fn instantiate_single(&self, single: &SingleId) -> Result<Transliterator> {
        self.single(single, 0)
    }

    fn find(&self, basic: &BasicId) -> Option<(BasicId, Entry)> {
        let table = self.inner.table.read();
        for target in locale_fallbacks(&basic.target) {
            for source in locale_fallbacks(basic.source()) {
                let mut keys = Vec::with_capacity(2);
                if let Some(variant) = &basic.variant {
                    keys.push(key(source, target, Some(variant)));
                }
                keys.push(key(source, target, None));
                if let Some(record) = keys.iter().find_map(|k| table.entries.get(k)) {
                    return Some((record.id.clone(), record.entry.clone()));
                }
            }
        }
        None
    }

    /// Inverse target for `Any-<target>`, if one was declared.
    pub(crate) fn special_inverse(&self, target: &str) -> Option<String> {
        self.inner.table.read().special_inverses.get(&target.to_lowercase()).cloned()
    }

    /// The ID of the inverse of `id`, or `id` itself when it does not parse.
    pub(crate) fn inverse_id(&self, id: &str) -> String {
        match CompoundId::parse(id) {
            Ok(compound) => compound.reversed(&|target| self.special_inverse(target)).to_string(),
            Err(_) => id.to_string(),
        }
    }

    // --- Enumeration --------------------------------------------------------

    fn ids(&self) -> Vec<BasicId> {
        self.inner.table.read().entries.values().map(|r| r.id.clone()).collect()
    }

    /// Every registered ID as `Source-Target[/Variant]`, sorted.
    pub fn available_ids(&self) -> Vec<String> {
        let ids: BTreeSet<String> = self.ids().iter().map(BasicId::canonical).collect();
        ids.into_iter().collect()
    }

    pub fn available_sources(&self) -> Vec<String> {
        let sources: BTreeSet<String> = self.ids().iter().map(|id| id.source().to_string()).collect();
        sources.into_iter().collect()
    }

    pub fn available_targets(&self, source: &str) -> Vec<String> {
        let targets: BTreeSet<String> = self
            .ids()
            .into_iter()
            .filter(|id| id.source().eq_ignore_ascii_case(source))
            .map(|id| id.target)
            .collect();
        targets.into_iter().collect()
    }

    /// Variants registered for `source-target`; `""` stands for the bare ID.
    pub fn available_variants(&self, source: &str, target: &str) -> Vec<String> {
        let variants: BTreeSet<String> = self
            .ids()
            .into_iter()
            .filter(|id| id.source().eq_ignore_ascii_case(source) && id.target.eq_ignore_ascii_case(target))
            .map(|id| id.variant.unwrap_or_default())
            .collect();
        variants.into_iter().collect()
    }

    // --- Built-ins ----------------------------------------------------------

    fn register_kind(&self, id: &str, kind: Kind) -> Result<()> {
        self.register_instance(Transliterator::new(id, kind))
    }

    fn register_builtins(&self) -> Result<()> {
        self.register_kind("Any-Null", Kind::Null)?;
        self.register_kind("Any-Remove", Kind::Remove)?;
        for mapping in [CaseMapping::Lower, CaseMapping::Upper, CaseMapping::Title, CaseMapping::Fold] {
            self.register_kind(&format!("Any-{}", mapping.name()), Kind::CaseMap(mapping))?;
        }
        for form in [NormalizationForm::Nfc, NormalizationForm::Nfd, NormalizationForm::Nfkc, NormalizationForm::Nfkd] {
            self.register_kind(&format!("Any-{}", form.name()), Kind::Normalization(form))?;
        }

        self.register_kind("Any-Hex", Kind::Hex(HexForm::default()))?;
        self.register_kind("Hex-Any", Kind::HexToAny(None))?;
        for form in HexForm::ALL {
            self.register_kind(&format!("Any-Hex/{}", form.name()), Kind::Hex(form))?;
            if form != HexForm::Plain {
                self.register_kind(&format!("Hex-Any/{}", form.name()), Kind::HexToAny(Some(form)))?;
            }
        }

        self.register_special_inverse("Null", "Null", false);
        self.register_special_inverse("Remove", "Null", false);
        self.register_special_inverse("Upper", "Lower", true);
        self.register_special_inverse("Title", "Lower", false);
        self.register_special_inverse("CaseFold", "Upper", false);
        self.register_special_inverse("NFC", "NFD", true);
        self.register_special_inverse("NFKC", "NFKD", true);

        crate::rules::register(self)?;
        self.register_any_scripts()
    }

    /// `Any-<Script>` for every script some rule set targets.
    fn register_any_scripts(&self) -> Result<()> {
        let mut targets = BTreeSet::new();
        for source in self.available_sources() {
            for target in self.available_targets(&source) {
                if let Some(script) = Script::from_name(&target) {
                    for variant in self.available_variants(&source, &target) {
                        targets.insert((script, variant));
                    }
                }
            }
        }
        for (script, variant) in targets {
            let variant = Some(variant.as_str()).filter(|v| !v.is_empty());
            let any = AnyScript::new(script, variant, self.downgrade());
            let id = BasicId::new(id::ANY, script.name(), variant).canonical();
            self.register_instance(Transliterator::new(&id, Kind::AnyScript(Arc::new(any))))?;
            self.register_special_inverse(script.name(), "Null", false);
        }
        Ok(())
    }
}
