//! Unicode character properties.
//!
//! A thin layer over the ICU4X property data in `icu_properties`. The set
//! patterns and the script-aware transforms consult it through three
//! entry points:
//!
//! - [`general_category`]: the UCD General_Category of a character.
//! - [`script`]: the UCD Script of a character, for the scripts modeled by
//!   [`Script`].
//! - [`property_set`]: resolution of a property name (and optional value) into
//!   a frozen [`UnicodeSet`], cached for the life of the process.
//!
//! Aliases resolve before the cache is consulted, so `Lu` and
//! `Uppercase_Letter` share one set.

use crate::error::{Error, Result};
use crate::unicode_set::UnicodeSet;
use icu_properties::props;
use icu_properties::{CodePointMapData, CodePointSetData};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

// --- General category -------------------------------------------------------

/// Unicode General_Category values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum GeneralCategory {
    UppercaseLetter = 0,
    LowercaseLetter,
    TitlecaseLetter,
    ModifierLetter,
    OtherLetter,
    NonspacingMark,
    SpacingMark,
    EnclosingMark,
    DecimalNumber,
    LetterNumber,
    OtherNumber,
    ConnectorPunctuation,
    DashPunctuation,
    OpenPunctuation,
    ClosePunctuation,
    InitialPunctuation,
    FinalPunctuation,
    OtherPunctuation,
    MathSymbol,
    CurrencySymbol,
    ModifierSymbol,
    OtherSymbol,
    SpaceSeparator,
    LineSeparator,
    ParagraphSeparator,
    Control,
    Format,
    Surrogate,
    PrivateUse,
    Unassigned,
}

impl GeneralCategory {
    const ALL: [GeneralCategory; 30] = [
        GeneralCategory::UppercaseLetter,
        GeneralCategory::LowercaseLetter,
        GeneralCategory::TitlecaseLetter,
        GeneralCategory::ModifierLetter,
        GeneralCategory::OtherLetter,
        GeneralCategory::NonspacingMark,
        GeneralCategory::SpacingMark,
        GeneralCategory::EnclosingMark,
        GeneralCategory::DecimalNumber,
        GeneralCategory::LetterNumber,
        GeneralCategory::OtherNumber,
        GeneralCategory::ConnectorPunctuation,
        GeneralCategory::DashPunctuation,
        GeneralCategory::OpenPunctuation,
        GeneralCategory::ClosePunctuation,
        GeneralCategory::InitialPunctuation,
        GeneralCategory::FinalPunctuation,
        GeneralCategory::OtherPunctuation,
        GeneralCategory::MathSymbol,
        GeneralCategory::CurrencySymbol,
        GeneralCategory::ModifierSymbol,
        GeneralCategory::OtherSymbol,
        GeneralCategory::SpaceSeparator,
        GeneralCategory::LineSeparator,
        GeneralCategory::ParagraphSeparator,
        GeneralCategory::Control,
        GeneralCategory::Format,
        GeneralCategory::Surrogate,
        GeneralCategory::PrivateUse,
        GeneralCategory::Unassigned,
    ];

    /// Two-letter alias, e.g. `"Lu"`.
    pub fn short_name(self) -> &'static str {
        CATEGORY_NAMES[self as usize].0
    }

    /// Long alias, e.g. `"Uppercase_Letter"`.
    pub fn long_name(self) -> &'static str {
        CATEGORY_NAMES[self as usize].1
    }

    pub fn mask(self) -> CategoryMask {
        CategoryMask::from_bits_truncate(1 << self as u32)
    }
}

const CATEGORY_NAMES: [(&str, &str); 30] = [
    ("Lu", "Uppercase_Letter"),
    ("Ll", "Lowercase_Letter"),
    ("Lt", "Titlecase_Letter"),
    ("Lm", "Modifier_Letter"),
    ("Lo", "Other_Letter"),
    ("Mn", "Nonspacing_Mark"),
    ("Mc", "Spacing_Mark"),
    ("Me", "Enclosing_Mark"),
    ("Nd", "Decimal_Number"),
    ("Nl", "Letter_Number"),
    ("No", "Other_Number"),
    ("Pc", "Connector_Punctuation"),
    ("Pd", "Dash_Punctuation"),
    ("Ps", "Open_Punctuation"),
    ("Pe", "Close_Punctuation"),
    ("Pi", "Initial_Punctuation"),
    ("Pf", "Final_Punctuation"),
    ("Po", "Other_Punctuation"),
    ("Sm", "Math_Symbol"),
    ("Sc", "Currency_Symbol"),
    ("Sk", "Modifier_Symbol"),
    ("So", "Other_Symbol"),
    ("Zs", "Space_Separator"),
    ("Zl", "Line_Separator"),
    ("Zp", "Paragraph_Separator"),
    ("Cc", "Control"),
    ("Cf", "Format"),
    ("Cs", "Surrogate"),
    ("Co", "Private_Use"),
    ("Cn", "Unassigned"),
];

bitflags::bitflags! {
    /// A set of general categories, one bit per [`GeneralCategory`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CategoryMask: u32 {
        const LU = 1 << 0;
        const LL = 1 << 1;
        const LT = 1 << 2;
        const LM = 1 << 3;
        const LO = 1 << 4;
        const MN = 1 << 5;
        const MC = 1 << 6;
        const ME = 1 << 7;
        const ND = 1 << 8;
        const NL = 1 << 9;
        const NO = 1 << 10;
        const PC = 1 << 11;
        const PD = 1 << 12;
        const PS = 1 << 13;
        const PE = 1 << 14;
        const PI = 1 << 15;
        const PF = 1 << 16;
        const PO = 1 << 17;
        const SM = 1 << 18;
        const SC = 1 << 19;
        const SK = 1 << 20;
        const SO = 1 << 21;
        const ZS = 1 << 22;
        const ZL = 1 << 23;
        const ZP = 1 << 24;
        const CC = 1 << 25;
        const CF = 1 << 26;
        const CS = 1 << 27;
        const CO = 1 << 28;
        const CN = 1 << 29;

        const CASED_LETTER = Self::LU.bits() | Self::LL.bits() | Self::LT.bits();
        const LETTER = Self::CASED_LETTER.bits() | Self::LM.bits() | Self::LO.bits();
        const MARK = Self::MN.bits() | Self::MC.bits() | Self::ME.bits();
        const NUMBER = Self::ND.bits() | Self::NL.bits() | Self::NO.bits();
        const PUNCTUATION = Self::PC.bits() | Self::PD.bits() | Self::PS.bits() | Self::PE.bits()
            | Self::PI.bits() | Self::PF.bits() | Self::PO.bits();
        const SYMBOL = Self::SM.bits() | Self::SC.bits() | Self::SK.bits() | Self::SO.bits();
        const SEPARATOR = Self::ZS.bits() | Self::ZL.bits() | Self::ZP.bits();
        const OTHER = Self::CC.bits() | Self::CF.bits() | Self::CS.bits() | Self::CO.bits() | Self::CN.bits();
    }
}

const CATEGORY_GROUPS: [(&str, &str, CategoryMask); 8] = [
    ("L", "Letter", CategoryMask::LETTER),
    ("LC", "Cased_Letter", CategoryMask::CASED_LETTER),
    ("M", "Mark", CategoryMask::MARK),
    ("N", "Number", CategoryMask::NUMBER),
    ("P", "Punctuation", CategoryMask::PUNCTUATION),
    ("S", "Symbol", CategoryMask::SYMBOL),
    ("Z", "Separator", CategoryMask::SEPARATOR),
    ("C", "Other", CategoryMask::OTHER),
];

impl From<props::GeneralCategory> for GeneralCategory {
    #[allow(unreachable_patterns)]
    fn from(gc: props::GeneralCategory) -> Self {
        use props::GeneralCategory as Icu;
        match gc {
            Icu::UppercaseLetter => GeneralCategory::UppercaseLetter,
            Icu::LowercaseLetter => GeneralCategory::LowercaseLetter,
            Icu::TitlecaseLetter => GeneralCategory::TitlecaseLetter,
            Icu::ModifierLetter => GeneralCategory::ModifierLetter,
            Icu::OtherLetter => GeneralCategory::OtherLetter,
            Icu::NonspacingMark => GeneralCategory::NonspacingMark,
            Icu::SpacingMark => GeneralCategory::SpacingMark,
            Icu::EnclosingMark => GeneralCategory::EnclosingMark,
            Icu::DecimalNumber => GeneralCategory::DecimalNumber,
            Icu::LetterNumber => GeneralCategory::LetterNumber,
            Icu::OtherNumber => GeneralCategory::OtherNumber,
            Icu::ConnectorPunctuation => GeneralCategory::ConnectorPunctuation,
            Icu::DashPunctuation => GeneralCategory::DashPunctuation,
            Icu::OpenPunctuation => GeneralCategory::OpenPunctuation,
            Icu::ClosePunctuation => GeneralCategory::ClosePunctuation,
            Icu::InitialPunctuation => GeneralCategory::InitialPunctuation,
            Icu::FinalPunctuation => GeneralCategory::FinalPunctuation,
            Icu::OtherPunctuation => GeneralCategory::OtherPunctuation,
            Icu::MathSymbol => GeneralCategory::MathSymbol,
            Icu::CurrencySymbol => GeneralCategory::CurrencySymbol,
            Icu::ModifierSymbol => GeneralCategory::ModifierSymbol,
            Icu::OtherSymbol => GeneralCategory::OtherSymbol,
            Icu::SpaceSeparator => GeneralCategory::SpaceSeparator,
            Icu::LineSeparator => GeneralCategory::LineSeparator,
            Icu::ParagraphSeparator => GeneralCategory::ParagraphSeparator,
            Icu::Control => GeneralCategory::Control,
            Icu::Format => GeneralCategory::Format,
            Icu::Surrogate => GeneralCategory::Surrogate,
            Icu::PrivateUse => GeneralCategory::PrivateUse,
            _ => GeneralCategory::Unassigned,
        }
    }
}

/// Classify `c` into a general category.
pub fn general_category(c: char) -> GeneralCategory {
    CodePointMapData::<props::GeneralCategory>::new().get(c).into()
}

fn category_set(mask: CategoryMask) -> UnicodeSet {
    let ranges = CodePointMapData::<props::GeneralCategory>::new()
        .iter_ranges()
        .filter(|run| mask.contains(GeneralCategory::from(run.value).mask()))
        .map(|run| (*run.range.start(), *run.range.end()));
    UnicodeSet::from_sorted_ranges(ranges)
}

/// Whether `c` is cased (Lowercase, Uppercase or Lt).
pub(crate) fn is_cased(c: char) -> bool {
    CodePointSetData::new::<props::Cased>().contains(c)
}

/// Whether `c` is skipped when looking for a cased neighbor.
pub(crate) fn is_case_ignorable(c: char) -> bool {
    CodePointSetData::new::<props::CaseIgnorable>().contains(c)
}

// --- Scripts ----------------------------------------------------------------

/// Unicode script classification.
///
/// `Common` covers script-neutral characters (spaces, digits, punctuation) and
/// `Inherited` covers combining marks that take the script of their base.
/// Characters of scripts not listed here classify as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Script {
    Common = 0,
    Inherited,
    Latin,
    Greek,
    Cyrillic,
    Armenian,
    Hebrew,
    Arabic,
    Syriac,
    Thaana,
    Devanagari,
    Bengali,
    Gurmukhi,
    Gujarati,
    Oriya,
    Tamil,
    Telugu,
    Kannada,
    Malayalam,
    Sinhala,
    Thai,
    Lao,
    Tibetan,
    Myanmar,
    Georgian,
    Hangul,
    Ethiopic,
    Han,
    Hiragana,
    Katakana,
    Bopomofo,
    Unknown,
}

const SCRIPT_NAMES: [(Script, &str, &str, props::Script); 32] = [
    (Script::Common, "Zyyy", "Common", props::Script::Common),
    (Script::Inherited, "Zinh", "Inherited", props::Script::Inherited),
    (Script::Latin, "Latn", "Latin", props::Script::Latin),
    (Script::Greek, "Grek", "Greek", props::Script::Greek),
    (Script::Cyrillic, "Cyrl", "Cyrillic", props::Script::Cyrillic),
    (Script::Armenian, "Armn", "Armenian", props::Script::Armenian),
    (Script::Hebrew, "Hebr", "Hebrew", props::Script::Hebrew),
    (Script::Arabic, "Arab", "Arabic", props::Script::Arabic),
    (Script::Syriac, "Syrc", "Syriac", props::Script::Syriac),
    (Script::Thaana, "Thaa", "Thaana", props::Script::Thaana),
    (Script::Devanagari, "Deva", "Devanagari", props::Script::Devanagari),
    (Script::Bengali, "Beng", "Bengali", props::Script::Bengali),
    (Script::Gurmukhi, "Guru", "Gurmukhi", props::Script::Gurmukhi),
    (Script::Gujarati, "Gujr", "Gujarati", props::Script::Gujarati),
    (Script::Oriya, "Orya", "Oriya", props::Script::Oriya),
    (Script::Tamil, "Taml", "Tamil", props::Script::Tamil),
    (Script::Telugu, "Telu", "Telugu", props::Script::Telugu),
    (Script::Kannada, "Knda", "Kannada", props::Script::Kannada),
    (Script::Malayalam, "Mlym", "Malayalam", props::Script::Malayalam),
    (Script::Sinhala, "Sinh", "Sinhala", props::Script::Sinhala),
    (Script::Thai, "Thai", "Thai", props::Script::Thai),
    (Script::Lao, "Laoo", "Lao", props::Script::Lao),
    (Script::Tibetan, "Tibt", "Tibetan", props::Script::Tibetan),
    (Script::Myanmar, "Mymr", "Myanmar", props::Script::Myanmar),
    (Script::Georgian, "Geor", "Georgian", props::Script::Georgian),
    (Script::Hangul, "Hang", "Hangul", props::Script::Hangul),
    (Script::Ethiopic, "Ethi", "Ethiopic", props::Script::Ethiopian),
    (Script::Han, "Hani", "Han", props::Script::Han),
    (Script::Hiragana, "Hira", "Hiragana", props::Script::Hiragana),
    (Script::Katakana, "Kana", "Katakana", props::Script::Katakana),
    (Script::Bopomofo, "Bopo", "Bopomofo", props::Script::Bopomofo),
    (Script::Unknown, "Zzzz", "Unknown", props::Script::Unknown),
];

impl Script {
    /// Whether this is a weak script resolved from its neighbors.
    #[inline]
    pub const fn is_common_or_inherited(self) -> bool {
        matches!(self, Script::Common | Script::Inherited)
    }

    /// Long script name, used to build IDs such as `Greek-Latin`.
    pub fn name(self) -> &'static str {
        SCRIPT_NAMES[self as usize].2
    }

    /// ISO 15924 code.
    pub fn code(self) -> &'static str {
        SCRIPT_NAMES[self as usize].1
    }

    fn icu(self) -> props::Script {
        SCRIPT_NAMES[self as usize].3
    }

    fn from_icu(value: props::Script) -> Script {
        SCRIPT_NAMES.iter().find(|entry| entry.3 == value).map_or(Script::Unknown, |entry| entry.0)
    }

    /// Look a script up by long name or ISO 15924 code, loosely.
    pub fn from_name(name: &str) -> Option<Script> {
        let key = loose(name);
        SCRIPT_NAMES
            .iter()
            .find(|(_, code, long, _)| loose(code) == key || loose(long) == key)
            .map(|entry| entry.0)
    }
}

/// Classify `c` into its script.
pub fn script(c: char) -> Script {
    Script::from_icu(CodePointMapData::<props::Script>::new().get(c))
}

fn script_set(target: Script) -> UnicodeSet {
    let value = target.icu();
    let ranges = CodePointMapData::<props::Script>::new()
        .iter_ranges()
        .filter(|run| run.value == value)
        .map(|run| (*run.range.start(), *run.range.end()));
    UnicodeSet::from_sorted_ranges(ranges)
}

// --- Property resolution ----------------------------------------------------

/// A property lookup after alias resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PropertyKey {
    Category(CategoryMask),
    Script(Script),
    Any,
    Ascii,
    Assigned,
    Alphabetic,
    Uppercase,
    Lowercase,
    WhiteSpace,
}

static PROPERTY_CACHE: Lazy<Mutex<HashMap<PropertyKey, Arc<UnicodeSet>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Loose property-name matching: case, spaces, hyphens and underscores are ignored.
fn loose(name: &str) -> String {
    name.chars().filter(|c| !matches!(c, ' ' | '_' | '-')).flat_map(char::to_lowercase).collect()
}

fn resolve(name: &str, value: Option<&str>) -> Result<PropertyKey> {
    let display = || match value {
        Some(v) => format!("{name}={v}"),
        None => name.to_string(),
    };
    let Some(value) = value else {
        return category_by_name(name)
            .map(PropertyKey::Category)
            .or_else(|| Script::from_name(name).map(PropertyKey::Script))
            .or_else(|| binary_property(name))
            .ok_or_else(|| Error::pattern("Unknown property", display()));
    };
    match loose(name).as_str() {
        "gc" | "generalcategory" => category_by_name(value)
            .map(PropertyKey::Category)
            .ok_or_else(|| Error::pattern("Unknown general category", display())),
        "sc" | "script" | "scx" | "scriptextensions" => Script::from_name(value)
            .map(PropertyKey::Script)
            .ok_or_else(|| Error::pattern("Unknown script", display())),
        _ => Err(Error::pattern("Unknown property", display())),
    }
}

/// Resolve `name` (or `name=value`) into a frozen set.
///
/// Accepted forms: general categories and their groups (`Lu`, `Letter`),
/// `gc=…`/`General_Category=…`, scripts (`Greek`, `Grek`), `sc=…`/`script=…`,
/// and the binary properties `Any`, `ASCII`, `Assigned`, `Alphabetic`,
/// `Uppercase`, `Lowercase`, `White_Space`.
pub fn property_set(name: &str, value: Option<&str>) -> Result<Arc<UnicodeSet>> {
    let key = resolve(name, value)?;
    if let Some(set) = PROPERTY_CACHE.lock().get(&key) {
        return Ok(Arc::clone(set));
    }

    let mut set = build(key);
    set.freeze();
    let set = Arc::new(set);
    // Two threads may race to build the same set; the first insert wins.
    let mut cache = PROPERTY_CACHE.lock();
    Ok(Arc::clone(cache.entry(key).or_insert(set)))
}

fn build(key: PropertyKey) -> UnicodeSet {
    fn binary(set: icu_properties::CodePointSetDataBorrowed<'static>) -> UnicodeSet {
        UnicodeSet::from_sorted_ranges(set.iter_ranges().map(|r| (*r.start(), *r.end())))
    }
    match key {
        PropertyKey::Category(mask) => category_set(mask),
        PropertyKey::Script(script) => script_set(script),
        PropertyKey::Any => UnicodeSet::from_sorted_ranges([(0, 0x10FFFF)]),
        PropertyKey::Ascii => UnicodeSet::from_sorted_ranges([(0, 0x7F)]),
        PropertyKey::Assigned => {
            let mut set = category_set(CategoryMask::CN);
            set.complement_in_place();
            set
        }
        PropertyKey::Alphabetic => binary(CodePointSetData::new::<props::Alphabetic>()),
        PropertyKey::Uppercase => binary(CodePointSetData::new::<props::Uppercase>()),
        PropertyKey::Lowercase => binary(CodePointSetData::new::<props::Lowercase>()),
        PropertyKey::WhiteSpace => binary(CodePointSetData::new::<props::WhiteSpace>()),
    }
}

fn category_by_name(name: &str) -> Option<CategoryMask> {
    let key = loose(name);
    if let Some(gc) = GeneralCategory::ALL
        .iter()
        .find(|gc| loose(gc.short_name()) == key || loose(gc.long_name()) == key)
    {
        return Some(gc.mask());
    }
    CATEGORY_GROUPS
        .iter()
        .find(|(short, long, _)| loose(short) == key || loose(long) == key)
        .map(|(_, _, mask)| *mask)
}

fn binary_property(name: &str) -> Option<PropertyKey> {
    let key = match loose(name).as_str() {
        "any" => PropertyKey::Any,
        "ascii" => PropertyKey::Ascii,
        "assigned" => PropertyKey::Assigned,
        "alphabetic" | "alpha" => PropertyKey::Alphabetic,
        "uppercase" | "upper" => PropertyKey::Uppercase,
        "lowercase" | "lower" => PropertyKey::Lowercase,
        "whitespace" | "wspace" | "space" => PropertyKey::WhiteSpace,
        _ => return None,
    };
    Some(key)
}
