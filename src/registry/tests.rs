use super::*;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

static BUILTINS: Lazy<Registry> = Lazy::new(|| Registry::with_builtins(Options::default()).unwrap());

fn run(id: &str, text: &str) -> String {
    match BUILTINS.get_instance(id, Direction::Forward) {
        Ok(t) => t.transliterate_str(text),
        Err(e) => panic!("{id}: {e}"),
    }
}

#[test]
fn builtin_ids() {
    let cases = vec![
        ("Any-Upper", "straße", "STRASSE"),
        ("lower", "ABC", "abc"),
        ("Title", "hello world", "Hello World"),
        ("Any-Hex", "a\u{1F600}", "\\u0061\\uD83D\\uDE00"),
        ("Any-Hex/Unicode", "é", "U+00E9"),
        ("Hex-Any", "\\u0061&#x62;U+0063", "abc"),
        ("Hex-Any/XML", "\\u0061&#x62;", "\\u0061b"),
        ("Any-Hex; Hex-Any", "abcde\u{1F600}", "abcde\u{1F600}"),
        ("[a-c]; Upper", "abcd", "ABCd"),
        ("Remove[aeiou]", "The quick brown fox.", "Th qck brwn fx."),
        ("NFD; [:Mn:] Remove; NFC", "crème brûlée", "creme brulee"),
        ("Any-Latin", "Москва Αθήνα", "Moskva Athḗna"),
        ("Any-Latin", "plain text", "plain text"),
        ("Any-Greek", "Athḗna", "Αθήνα"),
    ];
    for (id, input, expected) in cases {
        assert_eq!(run(id, input), expected, "{id}");
    }
}

#[test]
fn lookup_is_case_insensitive_and_canonical() {
    let upper = BUILTINS.get_instance("any-UPPER", Direction::Forward).unwrap();
    assert!(matches!(upper.kind(), Kind::CaseMap(CaseMapping::Upper)));
    assert_eq!(upper.id(), "Any-Upper");
    assert!(upper.children().is_empty());

    let greek = BUILTINS.get_instance("greek-latin", Direction::Forward).unwrap();
    assert_eq!(greek.id(), "Greek-Latin");
}

#[test]
fn bad_ids_are_rejected() {
    for id in ["", "  ", "No-Such", "Any-Hex/Bogus-Thing", "a-b-c", "Upper;;["] {
        assert!(matches!(BUILTINS.get_instance(id, Direction::Forward), Err(Error::InvalidId(_))), "{id:?}");
    }
}

#[test]
fn reverse_lookup_uses_special_inverses() {
    let cases = vec![
        ("Any-Upper", "Any-Lower"),
        ("Lower", "Upper"),
        ("Title", "Lower"),
        ("NFD", "NFC"),
        ("Greek-Latin; NFD", "NFC;Latin-Greek"),
        ("Any-Latin", "Any-Null"),
        ("Foo-Bar/V", "Bar-Foo/V"),
    ];
    for (id, expected) in cases {
        assert_eq!(BUILTINS.inverse_id(id), expected, "{id}");
    }

    let reverse = |id: &str| BUILTINS.get_instance(id, Direction::Reverse).unwrap();
    assert!(matches!(reverse("Any-Upper").kind(), Kind::CaseMap(CaseMapping::Lower)));
    assert!(matches!(reverse("CaseFold").kind(), Kind::CaseMap(CaseMapping::Upper)));
    assert!(matches!(reverse("Any-Remove").kind(), Kind::Null));
    assert!(matches!(reverse("Any-Latin").kind(), Kind::Null));
    assert_eq!(reverse("Greek-Latin").transliterate_str("Athḗna"), "Αθήνα");
    // the special inverse applies only to Any sources
    assert!(BUILTINS.get_instance("Latin-Upper", Direction::Reverse).is_err());
}

#[test]
fn enumeration_is_sorted() {
    assert_eq!(BUILTINS.available_variants("Any", "Hex"), vec!["", "C", "Java", "Perl", "Plain", "Unicode", "XML", "XML10"]);
    assert_eq!(BUILTINS.available_variants("hex", "any"), vec!["", "C", "Java", "Perl", "Unicode", "XML", "XML10"]);
    assert_eq!(BUILTINS.available_targets("Latin"), vec!["Cyrillic", "Greek"]);

    let sources = BUILTINS.available_sources();
    for source in ["Any", "Cyrillic", "Greek", "Hex", "Latin"] {
        assert!(sources.iter().any(|s| s == source), "{source}");
    }

    let ids = BUILTINS.available_ids();
    for id in ["Any-Latin", "Any-Greek", "Any-Cyrillic", "Greek-Latin", "Latin-Cyrillic", "Any-NFKD", "Any-Null"] {
        assert!(ids.iter().any(|s| s == id), "{id}");
    }
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

#[test]
fn register_and_unregister() {
    let registry = Registry::new();
    registry.register_rules("Foo-Bar", "a <> b ;", Direction::Forward, true).unwrap();
    assert_eq!(registry.available_ids(), vec!["Bar-Foo", "Foo-Bar"]);
    assert_eq!(registry.get_instance("Bar-Foo", Direction::Forward).unwrap().transliterate_str("abc"), "aac");

    assert!(registry.unregister("foo-bar"));
    assert!(!registry.unregister("Foo-Bar"));
    assert!(!registry.unregister("a-b-c"));
    assert!(matches!(registry.get_instance("Foo-Bar", Direction::Forward), Err(Error::InvalidId(_))));
    assert!(registry.get_instance("Bar-Foo", Direction::Forward).is_ok());
}

#[test]
fn rules_compile_on_first_lookup() {
    let registry = Registry::new();
    registry.register_rules("Any-Broken", "a > ;; b c ;", Direction::Forward, false).unwrap();
    assert!(matches!(registry.get_instance("Broken", Direction::Forward), Err(Error::Rule { .. })));
    assert!(matches!(registry.register_rules("a-b-c", "a > b ;", Direction::Forward, false), Err(Error::InvalidId(_))));
}

#[test]
fn locale_and_variant_fallback() {
    let registry = Registry::new();
    registry.register_rules("de-ASCII", "ä > ae ; ö > oe ;", Direction::Forward, false).unwrap();
    for id in ["de-ASCII", "de_CH-ASCII", "de_CH_1901-ASCII", "de-ASCII/Strict", "DE-ascii"] {
        let translit = registry.get_instance(id, Direction::Forward).unwrap();
        assert_eq!(translit.transliterate_str("Öl ä"), "Öl ae", "{id}");
        assert_eq!(translit.id(), "de-ASCII", "{id}");
    }
    assert!(registry.get_instance("fr-ASCII", Direction::Forward).is_err());

    registry.register_rules("de-ASCII/Strict", "ä > a ;", Direction::Forward, false).unwrap();
    assert_eq!(registry.get_instance("de_AT-ASCII/Strict", Direction::Forward).unwrap().transliterate_str("ä"), "a");
}

#[test]
fn aliases_resolve_to_their_target() {
    let registry = Registry::with_builtins(Options::default()).unwrap();
    registry.register_alias("Any-Shout", "Any-Upper; Any-Hex/XML").unwrap();
    let shout = registry.get_instance("Shout", Direction::Forward).unwrap();
    assert_eq!(shout.id(), "Any-Shout");
    assert_eq!(shout.transliterate_str("a"), "&#x41;");
    assert_eq!(shout.children().len(), 2);

    registry.register_alias("Any-Loop1", "Any-Loop2").unwrap();
    registry.register_alias("Any-Loop2", "Loop1").unwrap();
    assert!(matches!(registry.get_instance("Loop1", Direction::Forward), Err(Error::InvalidId(_))));
    assert!(registry.register_alias("Any-Bad", "Upper;;[").is_err());
}

#[test]
fn factories_run_on_every_lookup() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    let registry = Registry::with_builtins(Options::default()).unwrap();
    registry
        .register_factory("Any-Counted", |registry| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(registry.get_instance("Any-Upper", Direction::Forward)?.with_id("Any-Counted"))
        })
        .unwrap();
    for _ in 0..3 {
        assert_eq!(registry.get_instance("Counted", Direction::Forward).unwrap().transliterate_str("x"), "X");
    }
    assert_eq!(CALLS.load(Ordering::SeqCst), 3);
}

#[test]
fn weak_handle_follows_the_registry() {
    let registry = Registry::new();
    let weak = registry.downgrade();
    assert!(weak.upgrade().is_some());
    let clone = registry.clone();
    drop(registry);
    assert!(weak.upgrade().is_some());
    drop(clone);
    assert!(weak.upgrade().is_none());
}

#[test]
fn shared_across_threads() {
    let registry = Registry::with_builtins(Options::default()).unwrap();
    let handles: Vec<_> = (0..4)
        .map(|n| {
            let registry = registry.clone();
            thread::spawn(move || {
                let id = format!("Any-Tag{n}");
                registry.register_rules(&id, "x > y ;", Direction::Forward, false).unwrap();
                let greek = registry.get_instance("Greek-Latin", Direction::Forward).unwrap();
                let tagged = registry.get_instance(&id, Direction::Forward).unwrap();
                (greek.transliterate_str("Αθήνα"), tagged.transliterate_str("xx"))
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), ("Athḗna".to_string(), "yy".to_string()));
    }
    assert_eq!(registry.available_ids().iter().filter(|id| id.starts_with("Any-Tag")).count(), 4);
}
