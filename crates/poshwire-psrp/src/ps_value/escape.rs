//! CLIXML text escaping.
//!
//! String payloads travel as UTF-16 code units. Units that XML cannot
//! carry — control characters and lone surrogate halves — are written as
//! `_xHHHH_` with exactly four uppercase hex digits, and a literal
//! `_xHHHH_` span in the source text gets its leading underscore escaped
//! (`_x005F_`) so the decoder cannot misread it. Decoding only treats a
//! span as an escape when its middle is exactly four hex digits; anything
//! else passes through verbatim.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

static ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_[xX]([0-9a-fA-F]{4})_").unwrap());

fn is_escaped_unit(unit: u16) -> bool {
    // Controls (C0 and DEL) and lone surrogates; paired surrogates are
    // recombined before this check.
    unit < 0x20 || unit == 0x7F || (0xD800..=0xDFFF).contains(&unit)
}

fn starts_escape_span(units: &[u16]) -> bool {
    units.len() >= 7
        && units[0] == u16::from(b'_')
        && (units[1] == u16::from(b'x') || units[1] == u16::from(b'X'))
        && units[2..6]
            .iter()
            .all(|&u| u < 0x80 && (u as u8).is_ascii_hexdigit())
        && units[6] == u16::from(b'_')
}

/// Encodes UTF-16 code units into XML-safe text (before entity escaping).
pub fn encode_units(units: &[u16]) -> String {
    let mut out = String::with_capacity(units.len());
    let mut i = 0;
    while i < units.len() {
        let unit = units[i];

        // Well-formed surrogate pair: pass the astral character through.
        if (0xD800..=0xDBFF).contains(&unit)
            && i + 1 < units.len()
            && (0xDC00..=0xDFFF).contains(&units[i + 1])
        {
            let high = u32::from(unit - 0xD800);
            let low = u32::from(units[i + 1] - 0xDC00);
            let code = 0x10000 + (high << 10) + low;
            if let Some(ch) = char::from_u32(code) {
                out.push(ch);
                i += 2;
                continue;
            }
        }

        if is_escaped_unit(unit) {
            let _ = write!(out, "_x{unit:04X}_");
            i += 1;
            continue;
        }

        // A literal `_xHHHH_` span: escape the underscore itself.
        if unit == u16::from(b'_') && starts_escape_span(&units[i..]) {
            out.push_str("_x005F_");
            i += 1;
            continue;
        }

        match char::from_u32(u32::from(unit)) {
            Some(ch) => out.push(ch),
            // Unreachable: BMP non-surrogates always convert.
            None => {
                let _ = write!(out, "_x{unit:04X}_");
            }
        }
        i += 1;
    }
    out
}

/// Convenience for `&str` sources (property names, ToString values).
pub fn encode_str(text: &str) -> String {
    let units: Vec<u16> = text.encode_utf16().collect();
    encode_units(&units)
}

/// Decodes element text back into UTF-16 code units, resolving `_xHHHH_`
/// spans and leaving malformed look-alikes untouched.
pub fn decode_to_units(text: &str) -> Vec<u16> {
    let mut out: Vec<u16> = Vec::with_capacity(text.len());
    let mut last = 0;
    for caps in ESCAPE.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        out.extend(text[last..whole.start()].encode_utf16());
        let unit = u16::from_str_radix(&caps[1], 16).unwrap();
        out.push(unit);
        last = whole.end();
    }
    out.extend(text[last..].encode_utf16());
    out
}

/// Decodes element text into a `String`, replacing units that do not form
/// well-formed UTF-16 (useful for property names and protocol strings).
pub fn decode_to_string_lossy(text: &str) -> String {
    String::from_utf16_lossy(&decode_to_units(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(encode_str("hello world"), "hello world");
        assert_eq!(decode_to_units("hello world"), units("hello world"));
    }

    #[test]
    fn control_characters_are_escaped() {
        assert_eq!(encode_str("a\nb\tc"), "a_x000A_b_x0009_c");
        assert_eq!(decode_to_units("a_x000A_b"), units("a\nb"));
    }

    #[test]
    fn lone_surrogate_round_trips() {
        let lone = vec![0xD800u16];
        assert_eq!(encode_units(&lone), "_xD800_");
        assert_eq!(decode_to_units("_xD800_"), lone);
    }

    #[test]
    fn surrogate_pair_stays_literal() {
        let emoji = units("🙂");
        assert_eq!(encode_units(&emoji), "🙂");
    }

    #[test]
    fn literal_escape_pattern_is_guarded() {
        assert_eq!(encode_str("_x0041_"), "_x005F_x0041_");
        assert_eq!(decode_to_units("_x005F_x0041_"), units("_x0041_"));
    }

    #[test]
    fn non_hex_lookalike_passes_verbatim() {
        assert_eq!(decode_to_units("_xZZZZ_"), units("_xZZZZ_"));
        assert_eq!(decode_to_units("_x041_"), units("_x041_"));
        // four alphanumerics that are not hex must not decode (the old
        // behaviour matched [0-9a-zA-Z]{4} and corrupted text like this)
        assert_eq!(decode_to_units("_xTRUE_"), units("_xTRUE_"));
    }

    #[test]
    fn lowercase_hex_decodes() {
        assert_eq!(decode_to_units("_xd800_"), vec![0xD800u16]);
    }

    #[test]
    fn guard_only_fires_on_real_spans() {
        // `_x00` alone is not a span; no guard needed
        assert_eq!(encode_str("_x00"), "_x00");
        assert_eq!(decode_to_units("_x00"), units("_x00"));
    }
}
