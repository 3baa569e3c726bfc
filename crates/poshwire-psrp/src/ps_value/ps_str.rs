use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A .NET string: a sequence of UTF-16 code units.
///
/// Stored as code units rather than a Rust `String` so that lone surrogate
/// halves — legal in .NET strings and representable in CLIXML via
/// `_xHHHH_` escapes — survive a decode/encode round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct PsString {
    units: Vec<u16>,
}

impl PsString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_units(units: Vec<u16>) -> Self {
        Self { units }
    }

    pub fn units(&self) -> &[u16] {
        &self.units
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Number of UTF-16 code units (the .NET `String.Length`).
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Exact conversion; `None` when the string contains a lone surrogate.
    pub fn to_string_exact(&self) -> Option<String> {
        String::from_utf16(&self.units).ok()
    }

    /// Lossy conversion, replacing lone surrogates with U+FFFD.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.units)
    }
}

impl From<&str> for PsString {
    fn from(s: &str) -> Self {
        Self {
            units: s.encode_utf16().collect(),
        }
    }
}

impl From<String> for PsString {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<&String> for PsString {
    fn from(s: &String) -> Self {
        Self::from(s.as_str())
    }
}

impl PartialEq<str> for PsString {
    fn eq(&self, other: &str) -> bool {
        self.units.iter().copied().eq(other.encode_utf16())
    }
}

impl PartialEq<&str> for PsString {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl Display for PsString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_well_formed_text() {
        let s = PsString::from("héllo 🙂");
        assert_eq!(s.to_string_exact().as_deref(), Some("héllo 🙂"));
        assert_eq!(s, "héllo 🙂");
    }

    #[test]
    fn holds_lone_surrogates() {
        let s = PsString::from_units(vec![0xD800]);
        assert!(s.to_string_exact().is_none());
        assert_eq!(s.to_string_lossy(), "\u{FFFD}");
        assert_eq!(s.len(), 1);
    }
}
