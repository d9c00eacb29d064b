use super::*;
use crate::transforms::CaseMapping;
use crate::transliterator::{Kind, Position, ReplaceableString};
use once_cell::sync::Lazy;
use proptest::prelude::*;

static REGISTRY: Lazy<Registry> = Lazy::new(|| Registry::with_builtins(Options::default()).unwrap());

fn rules(text: &str) -> Transliterator {
    match REGISTRY.create_from_rules("Test", text, Direction::Forward) {
        Ok(t) => t,
        Err(e) => panic!("{text}: {e}"),
    }
}

fn run(text: &str, input: &str) -> String {
    rules(text).transliterate_str(input)
}

fn rule_error(text: &str) -> String {
    match REGISTRY.create_from_rules("Test", text, Direction::Forward) {
        Err(Error::Rule { message, .. }) => message,
        other => panic!("{text}: expected a rule error, got {other:?}"),
    }
}

#[test]
fn rule_scenarios() {
    let cases = vec![
        // cursor, then the rewritten text is matched again
        ("ab > x | y ; yc > z ;", "eabcd", "exzd"),
        // segments and back references
        ("([a-z]) '.' ([0-9]) > $2 '-' $1 ;", "abc.123.xyz.456", "ab1-c23.xy4-z56"),
        // ante and post contexts
        ("a { t > SS ; t } b > UU ; t > TT ;", "xtat txtb", "xTTaSS TTxUUb"),
        // first match wins, no match passes through
        ("ab > X ; b > Y ;", "abbc", "XYc"),
        ("$vowel = [aeiou] ; $vowel > V ;", "cat dog", "cVt dVg"),
        ("[{ch}] > č ; c > k ;", "chc", "čk"),
        ("[0-9]+ > N ;", "a12b3", "aNbN"),
        ("x a+ > Y ;", "xaaab xb", "Yb xb"),
        ("c a? t > Z ;", "ct cat caat", "Z Z caat"),
        ("'-' > ;", "a-b-c", "abc"),
        ("\\u0041 > a ; '' > Q ;", "A'B", "aQB"),
        ("([a-z]+) > &Any-Upper($1) ;", "ab 12 cd", "AB 12 CD"),
        ("a } b > x @| ; b > y ;", "abb ab", "xby xb"),
        ("a > | b ; b > c ;", "ab", "cc"),
        (". > X ;", "a b", "XXX"),
    ];
    for (text, input, expected) in cases {
        assert_eq!(run(text, input), expected, "{text}");
    }
}

#[test]
fn anchors() {
    let cases = vec![
        ("^a > Q ; a > q ;", "aaa", "Qqq"),
        ("a $ > E ; a > e ;", "aaa", "eeE"),
        ("^ a $ > W ; a > w ;", "a", "W"),
        ("^ a $ > W ; a > w ;", "aa", "ww"),
    ];
    for (text, input, expected) in cases {
        assert_eq!(run(text, input), expected, "{text} on {input}");
    }

    // a range is its own context
    let translit = rules("^a > Q ; a > q ;");
    let mut text = ReplaceableString::new("aaa");
    let limit = translit.transliterate_range(&mut text, 1, 3).unwrap();
    assert_eq!((text.to_string(), limit), ("aQq".to_string(), 3));
}

#[test]
fn variables_hold_any_sequence() {
    let text = "$abe = ab ; $pat = x[yY]z ; $ll = 'a-z' ; $llZ = [$ll] ; $llY = [$ll$pat] ; $emp = ;
        $abe > ABE ; $pat > END ; $llZ > 1 ; $llY > 2 ; 7$emp 8 > 9 ;";
    assert_eq!(run(text, "ab xYzxyz stY78"), "ABE ENDEND 1129");
}

#[test]
fn masked_rules_are_rejected() {
    let masked = ["a > x ; ab > y ;", "a > x ; a > y ;", "a > x ; ^a > y ;", "$s = [abc] ; $s > x ; $s d > y ;"];
    for text in masked {
        assert!(rule_error(text).starts_with("Masked by earlier rule"), "{text}");
    }
    for legal in ["ab > y ; a > x ;", "^a > Q ; a > q ;", "a { b > x ; b > y ;", "b } a > x ; b > y ;"] {
        rules(legal);
    }

    let options = Options { reject_masked_rules: false, ..Options::default() };
    let lenient = Registry::with_options(options.clone());
    let translit = compile("Test", "a > x ; ab > y ;", Direction::Forward, &lenient, &options).unwrap();
    assert_eq!(translit.transliterate_str("ab"), "xb");
}

#[test]
fn parse_errors() {
    let cases = vec![
        ("a b", "No operator"),
        ("a = b ;", "Malformed LHS"),
        ("$x = a ; $x = b ;", "Duplicate variable definition $x"),
        ("$x = a { b ;", "Malformed variable def"),
        ("a > b { c ;", "Malformed rule"),
        ("a - > c ;", "Unquoted -"),
        ("{ * a } > b ;", "Misplaced quantifier"),
        ("( a > b ;", "Unclosed segment"),
        ("a ) > b ;", "Illegal character ')'"),
        ("a > $1 ;", "Undefined segment reference"),
        ("$nope > b ;", "Undefined variable $nope"),
        ("a > b | c | d ;", "Multiple cursors"),
        ("a { b { c > d ;", "Multiple ante contexts"),
        ("a 'b > c ;", "Unterminated quote"),
        ("use magic ;", "Unrecognized pragma"),
        ("use variable range 0xF000 0xE000 ;", "Invalid variable range"),
        (":: Bogus-Thing ;", "Invalid ::ID"),
        ("a > &Bogus-Thing( b ) ;", "Invalid function ID"),
        ("a > b ; :: [abc] ;", "Compound filters misplaced"),
        ("use variable range 0xE000 0xE0FF ; a > \\uE001 ;", "Variable range character in rule"),
    ];
    for (text, expected) in cases {
        assert_eq!(rule_error(text), expected, "{text}");
    }
}

#[test]
fn error_carries_rule_text() {
    let err = REGISTRY.create_from_rules("Test", "a > x ;\nb c ;", Direction::Forward).unwrap_err();
    assert_eq!(err.to_string(), "No operator in rule \"b c\"");
}

#[test]
fn comments_pragmas_and_quoting() {
    let text = "# leading comment
        use variable range 0xE000 0xE0FF ;
        use maximum backup 4 ;
        use nfd rules ;
        a > '#' ;  # trailing
        b > ';' ;
        ";
    assert_eq!(run(text, "abc"), "#;c");
}

#[test]
fn direction_selects_rules() {
    let text = "a > x ; y < b ; c <> z ; d → w ; v ← e ; f ↔ u ;";
    let forward = REGISTRY.create_from_rules("Fwd", text, Direction::Forward).unwrap();
    let reverse = REGISTRY.create_from_rules("Rev", text, Direction::Reverse).unwrap();
    assert_eq!(forward.transliterate_str("abcdef"), "xbzweu");
    assert_eq!(reverse.transliterate_str("abzeu"), "aycvf");
}

#[test]
fn reverse_of_forward_only_rules_fails() {
    let err = REGISTRY.create_from_rules("Oneway", "a > b ; c > d ;", Direction::Reverse).unwrap_err();
    assert!(matches!(err, Error::NotInvertible(id) if id == "Oneway"));
}

#[test]
fn two_way_contexts_apply_only_forward() {
    let text = "a { b } c <> x ;";
    assert_eq!(run(text, "abc b"), "axc b");
    let reverse = REGISTRY.create_from_rules("Rev", text, Direction::Reverse).unwrap();
    assert_eq!(reverse.transliterate_str("axc x"), "abc b");
}

#[test]
fn steps_split_into_passes() {
    let translit = rules("a > b ; :: Upper ; B > c ;");
    let ids: Vec<&str> = translit.children().iter().map(Transliterator::id).collect();
    assert_eq!(ids, vec!["%Pass1", "Any-Upper", "%Pass2"]);
    assert_eq!(translit.transliterate_str("abz"), "ccZ");

    let single = rules(":: Lower ;");
    assert_eq!(single.children().len(), 1);
    assert!(matches!(single.children()[0].kind(), Kind::CaseMap(CaseMapping::Lower)));
}

#[test]
fn global_filters() {
    let translit = rules(":: [a-c] ; . > X ;");
    assert_eq!(translit.transliterate_str("abcdef"), "XXXdef");

    let text = ":: [a-c] ; a <> y ; :: ([x-z]) ;";
    let forward = REGISTRY.create_from_rules("F", text, Direction::Forward).unwrap();
    let reverse = REGISTRY.create_from_rules("F", text, Direction::Reverse).unwrap();
    assert_eq!(forward.transliterate_str("ab y"), "yb y");
    assert_eq!(reverse.transliterate_str("yb y"), "ab a");
    assert!(reverse.filter().is_some_and(|f| f.contains('y') && !f.contains('a')));
}

#[test]
fn inline_step_filters() {
    let translit = rules(":: [aeiou] Upper ; ");
    assert_eq!(translit.transliterate_str("banana"), "bAnAnA");
}

#[test]
fn loop_guard_stops_runaway_rules() {
    let translit = rules("a > | b ; b > | a ;");
    let out = translit.transliterate_str("a");
    assert!(out == "a" || out == "b", "{out}");

    let growing = rules("a > a | a ;");
    let out = growing.transliterate_str("a");
    assert!(out.chars().all(|c| c == 'a'));
    assert!(out.len() > 1 && out.len() < 64, "{}", out.len());
}

#[test]
fn to_rules_recompiles_to_equivalent() {
    let sources = [
        "ab > x | y ; yc > z ;",
        "([a-z]) '.' ([0-9]) > $2 '-' $1 ;",
        "a { t > SS ; t } b > UU ; t > TT ;",
        "^a > Q ; a $ > E ; a > q ;",
        ":: [a-z] ; [aeiou] > '*' ; :: Upper ; X > '#' ;",
        "a } b > x @| ; [{ch}] > č ;",
    ];
    for source in sources {
        let original = rules(source);
        let text = original.to_rules(false);
        let again = rules(&text);
        for input in ["eabcd", "abc.123", "xtat txtb", "aaa", "axe bxb", "abb chx"] {
            assert_eq!(again.transliterate_str(input), original.transliterate_str(input), "{source} => {text}");
        }
    }
}

#[test]
fn to_rules_escapes_unprintable() {
    let translit = rules("\\u0007 > x ;");
    assert!(translit.to_rules(true).contains("\\u0007"));
}

#[test]
fn incremental_waits_on_partial_matches() {
    let translit = rules("ab > x ; a > y ;");
    let mut text = ReplaceableString::default();
    let mut pos = Position::default();
    translit.transliterate(&mut text, &mut pos, Some("a")).unwrap();
    assert_eq!((text.to_string(), pos.start), ("a".to_string(), 0));
    translit.transliterate(&mut text, &mut pos, Some("b")).unwrap();
    assert_eq!((text.to_string(), pos.start), ("x".to_string(), 1));
    translit.transliterate(&mut text, &mut pos, Some("a")).unwrap();
    translit.finish_transliteration(&mut text, &mut pos).unwrap();
    assert_eq!((text.to_string(), pos.start), ("xy".to_string(), 2));
}

proptest! {
    #[test]
    fn unmatched_text_passes_through(s in "[d-z ]{0,24}") {
        let translit = rules("a > x ; b } c > y ;");
        prop_assert_eq!(translit.transliterate_str(&s), s);
    }

    #[test]
    fn keystrokes_match_batch(s in "[abc ]{0,16}") {
        let translit = rules("ab > x ; a > y ; c } a > z ;");
        let mut text = ReplaceableString::default();
        let mut pos = Position::default();
        for c in s.chars() {
            translit.transliterate(&mut text, &mut pos, Some(c.encode_utf8(&mut [0; 4]))).unwrap();
        }
        translit.finish_transliteration(&mut text, &mut pos).unwrap();
        prop_assert_eq!(text.to_string(), translit.transliterate_str(&s));
    }
}
