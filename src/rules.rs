//! Rule text for the built-in script transliterators.
//!
//! Each resource is two-way: registering `Greek-Latin` also registers
//! `Latin-Greek`, which reads the same text right to left.

use crate::error::Result;
use crate::registry::Registry;
use crate::transliterator::Direction;

static GREEK_LATIN: &str = include_str!("rules/greek_latin.txt");
static CYRILLIC_LATIN: &str = include_str!("rules/cyrillic_latin.txt");

const RESOURCES: [(&str, &str); 2] = [("Greek-Latin", GREEK_LATIN), ("Cyrillic-Latin", CYRILLIC_LATIN)];

pub(crate) fn register(registry: &Registry) -> Result<()> {
    for (id, text) in RESOURCES {
        registry.register_rules(id, text, Direction::Forward, true)?;
    }
    Ok(())
}
