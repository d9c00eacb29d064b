//! Output production: back references, function calls and cursor placement.

use super::compiled_rules::OutputPart;
use super::matcher::Captures;
use crate::transliterator::Replaceable;

/// Text produced by an output template, plus where its cursor marker fell.
struct Produced {
    text: String,
    len: usize,
    cursor: Option<usize>,
}

fn produce(parts: &[OutputPart], text: &dyn Replaceable, caps: &Captures, out: &mut Produced) {
    for part in parts {
        match part {
            OutputPart::Literal(s) => {
                out.text.push_str(s);
                out.len += s.chars().count();
            }
            OutputPart::BackRef(n) => {
                if let Some((start, limit)) = caps.get(n - 1) {
                    let captured = text.substring(start, limit);
                    out.len += limit - start;
                    out.text.push_str(&captured);
                }
            }
            OutputPart::Call(translit, inner) => {
                let mut nested = Produced { text: String::new(), len: 0, cursor: None };
                produce(inner, text, caps, &mut nested);
                let result = translit.transliterate_str(&nested.text);
                out.len += result.chars().count();
                out.text.push_str(&result);
            }
            OutputPart::Cursor => out.cursor = Some(out.len),
        }
    }
}

/// Replace `start..limit` with the output and return the new cursor offset
/// and the output length.
///
/// The cursor is not clamped here; it may point before `start` or past the
/// replacement when `@` offsets are used.
pub(crate) fn replace(
    parts: &[OutputPart],
    cursor_offset: isize,
    text: &mut dyn Replaceable,
    start: usize,
    limit: usize,
    caps: &Captures,
) -> (isize, usize) {
    let mut produced = Produced { text: String::new(), len: 0, cursor: None };
    produce(parts, &*text, caps, &mut produced);
    text.replace(start, limit, &produced.text);

    let new_start = match produced.cursor {
        Some(at) => start as isize + at as isize + cursor_offset,
        None => (start + produced.len) as isize,
    };
    (new_start, produced.len)
}
