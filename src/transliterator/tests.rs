use super::*;
use crate::api::Options;
use once_cell::sync::Lazy;
use proptest::prelude::*;

static REGISTRY: Lazy<Registry> = Lazy::new(|| Registry::with_builtins(Options::default()).unwrap());

fn get(id: &str) -> Transliterator {
    match REGISTRY.get_instance(id, Direction::Forward) {
        Ok(t) => t,
        Err(e) => panic!("{id}: {e}"),
    }
}

fn typed(translit: &Transliterator, input: &str) -> String {
    let mut text = ReplaceableString::default();
    let mut pos = Position::default();
    for c in input.chars() {
        translit.transliterate(&mut text, &mut pos, Some(c.encode_utf8(&mut [0; 4]))).unwrap();
        assert!(pos.validate(text.len()).is_ok(), "{pos} after {c:?}");
    }
    translit.finish_transliteration(&mut text, &mut pos).unwrap();
    assert_eq!(pos.start, pos.limit);
    text.to_string()
}

#[derive(Debug)]
struct Rot13;

impl Transliterate for Rot13 {
    fn transliterate(&self, text: &mut dyn Replaceable, pos: &mut Position, _incremental: bool) {
        for i in pos.start..pos.limit {
            let c = text.char_at(i);
            let rotated = match c {
                'a'..='z' => (((c as u8 - b'a') + 13) % 26 + b'a') as char,
                'A'..='Z' => (((c as u8 - b'A') + 13) % 26 + b'A') as char,
                _ => continue,
            };
            text.replace(i, i + 1, rotated.encode_utf8(&mut [0; 4]));
        }
        pos.start = pos.limit;
    }
}

#[test]
fn entry_points_reject_bad_positions() {
    let translit = get("Any-Upper");
    let mut text = ReplaceableString::new("abc");

    let mut bad = Position::new(0, 2, 1, 3);
    assert!(matches!(translit.transliterate(&mut text, &mut bad, Some("d")), Err(Error::InvalidPosition { .. })));
    assert!(matches!(translit.finish_transliteration(&mut text, &mut bad), Err(Error::InvalidPosition { .. })));
    assert!(matches!(translit.filtered_transliterate(&mut text, &mut bad, false), Err(Error::InvalidPosition { .. })));
    assert!(matches!(translit.transliterate_range(&mut text, 1, 9), Err(Error::InvalidPosition { len: 3, .. })));
    assert_eq!(text.to_string(), "abc");
}

#[test]
fn range_keeps_text_outside() {
    let translit = get("Any-Upper");
    let mut text = ReplaceableString::new("abcdef");
    assert_eq!(translit.transliterate_range(&mut text, 2, 4).unwrap(), 4);
    assert_eq!(text.to_string(), "abCDef");

    let remove = get("Any-Remove");
    let mut text = ReplaceableString::new("abcdef");
    assert_eq!(remove.transliterate_range(&mut text, 1, 5).unwrap(), 1);
    assert_eq!(text.to_string(), "af");
}

#[test]
fn null_and_remove() {
    let cases = vec![
        ("Any-Null", "banana", "banana"),
        ("Any-Remove", "banana", ""),
        ("[aeiou] Remove", "banana", "bnn"),
        ("[^aeiou]; Remove", "banana", "aaa"),
    ];
    for (id, input, expected) in cases {
        let translit = get(id);
        assert_eq!(translit.transliterate_str(input), expected, "{id}");
        assert_eq!(typed(&translit, input), expected, "{id} typed");
    }
    assert!(matches!(get("Any-Null").kind(), Kind::Null));
    assert!(matches!(get("Remove").kind(), Kind::Remove));
}

#[test]
fn filter_runs_see_their_own_output() {
    let translit = REGISTRY.create_from_rules("T", ":: [a] ; a > bb ;", Direction::Forward).unwrap();
    assert_eq!(translit.transliterate_str("xaxa"), "xbbxbb");
    assert_eq!(typed(&translit, "xaxa"), "xbbxbb");
}

#[test]
fn insertion_is_optional() {
    let translit = get("Any-Upper");
    let mut text = ReplaceableString::new("ab");
    let mut pos = Position::full(2);
    translit.transliterate(&mut text, &mut pos, None).unwrap();
    assert_eq!(text.to_string(), "AB");
    assert_eq!((pos.start, pos.limit, pos.context_limit), (2, 2, 2));
}

#[test]
fn custom_steps_compose() {
    let registry = Registry::with_builtins(Options::default()).unwrap();
    registry.register_instance(Transliterator::custom("Any-Rot13", Rot13)).unwrap();
    let translit = registry.get_instance("Rot13; Upper", Direction::Forward).unwrap();
    assert_eq!(translit.transliterate_str("hello, world"), "URYYB, JBEYQ");
    assert_eq!(translit.children().len(), 2);

    let rot = registry.get_instance("Any-Rot13", Direction::Forward).unwrap();
    assert!(matches!(rot.kind(), Kind::Custom(_)));
    assert!(matches!(rot.inverse(&registry), Err(Error::NotInvertible(id)) if id == "Any-Rot13"));
}

#[test]
fn inverse_of_compound_reverses_steps() {
    let forward = get("Any-Upper; Any-NFD");
    let inverse = forward.inverse(&REGISTRY).unwrap();
    let kinds: Vec<&Kind> = inverse.children().iter().map(Transliterator::kind).collect();
    assert!(matches!(kinds[..], [Kind::Normalization(NormalizationForm::Nfc), Kind::CaseMap(CaseMapping::Lower)]));
    assert_eq!(inverse.transliterate_str(&forward.transliterate_str("école")), "école");
}

#[test]
fn inverse_of_rules_recompiles() {
    let forward = REGISTRY.create_from_rules("Foo-Bar", "a <> b ; c > d ;", Direction::Forward).unwrap();
    let inverse = forward.inverse(&REGISTRY).unwrap();
    assert_eq!(inverse.id(), "Bar-Foo");
    assert_eq!(inverse.transliterate_str("bd"), "ad");
    assert_eq!(inverse.inverse(&REGISTRY).unwrap().transliterate_str("ac"), "bd");
}

#[test]
fn max_context_length_covers_children() {
    let rules = REGISTRY.create_from_rules("T", "ab { c > d ; x > y ;", Direction::Forward).unwrap();
    assert_eq!(rules.max_context_length(), 2);
    assert_eq!(get("Any-Upper").max_context_length(), 0);
    assert_eq!(get("Any-Upper; Any-Title").max_context_length(), 2);
}

#[test]
fn to_rules_lists_steps() {
    assert_eq!(get("Any-Upper").to_rules(false), "::Any-Upper;");
    let translit = REGISTRY.create_from_rules("T", "a > b ; :: Lower ; c > d ;", Direction::Forward).unwrap();
    assert_eq!(translit.to_rules(false), "a > b;\n::Any-Lower;\nc > d;");
    assert_eq!(translit.to_string(), "T");
}

proptest! {
    #[test]
    fn compound_matches_sequential(s in "[a-zα-ω ]{0,12}") {
        let compound = get("Any-Upper; Any-Hex/XML");
        let sequential = get("Any-Hex/XML").transliterate_str(&get("Any-Upper").transliterate_str(&s));
        prop_assert_eq!(compound.transliterate_str(&s), sequential);
    }

    #[test]
    fn filter_leaves_other_text_alone(s in "[a-z ]{0,24}") {
        let translit = get("[a-m] Upper");
        let out = translit.transliterate_str(&s);
        prop_assert_eq!(out.chars().count(), s.chars().count());
        for (before, after) in s.chars().zip(out.chars()) {
            if ('a'..='m').contains(&before) {
                prop_assert_eq!(after, before.to_ascii_uppercase());
            } else {
                prop_assert_eq!(after, before);
            }
        }
    }

    #[test]
    fn typing_matches_batch(s in "[абвгдеёжзийклмнопрстуфхцчшщъыьэюя ]{0,12}") {
        let translit = get("Cyrillic-Latin");
        prop_assert_eq!(typed(&translit, &s), translit.transliterate_str(&s));
    }

    #[test]
    fn typing_matches_batch_with_filter(s in "[abc1 ]{0,12}") {
        let translit = REGISTRY.create_from_rules("T", ":: [abc] ; ab > x ; b } c > y ; a > z ;", Direction::Forward).unwrap();
        prop_assert_eq!(typed(&translit, &s), translit.transliterate_str(&s));
    }
}
