use std::fmt::Display;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PsDateTime, PsDuration, PsString};

/// The primitive types of the PowerShell serialization dialect.
///
/// https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-psrp/c8c85974-ffd7-4455-84a8-e49016c20683
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PsPrimitiveValue {
    /// `<S>`
    Str(PsString),
    /// `<C>` — a character, encoded as its numeric code point.
    Char(char),
    /// `<B>`
    Bool(bool),
    /// `<SB>`
    SByte(i8),
    /// `<By>`
    Byte(u8),
    /// `<I16>`
    I16(i16),
    /// `<U16>`
    U16(u16),
    /// `<I32>`
    I32(i32),
    /// `<U32>`
    U32(u32),
    /// `<I64>`
    I64(i64),
    /// `<U64>`
    U64(u64),
    /// `<Sg>`
    Single(f32),
    /// `<Db>`
    Double(f64),
    /// `<D>` — kept textual; .NET decimal has no native Rust equivalent.
    Decimal(String),
    /// `<DT>`
    DateTime(PsDateTime),
    /// `<TS>`
    Duration(PsDuration),
    /// `<BA>`
    Bytes(Vec<u8>),
    /// `<G>`
    Guid(Uuid),
    /// `<URI>`
    Uri(String),
    /// `<Version>`
    Version(String),
    /// `<XD>` — opaque XML document text.
    XmlDocument(String),
    /// `<SBK>` — opaque script text.
    ScriptBlock(String),
    /// `<SS>` — plaintext held in memory, ciphertext on the wire.
    SecureString(PsSecureString),
    /// `<Nil>`
    Nil,
}

impl Display for PsPrimitiveValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::Char(c) => write!(f, "{c}"),
            Self::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Self::SByte(v) => write!(f, "{v}"),
            Self::Byte(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::Single(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::DateTime(v) => write!(f, "{v}"),
            Self::Duration(v) => write!(f, "{v}"),
            Self::Bytes(_) => write!(f, "System.Byte[]"),
            Self::Guid(v) => write!(f, "{v}"),
            Self::Uri(v) => write!(f, "{v}"),
            Self::Version(v) => write!(f, "{v}"),
            Self::XmlDocument(v) => write!(f, "{v}"),
            Self::ScriptBlock(v) => write!(f, "{v}"),
            Self::SecureString(_) => write!(f, "System.Security.SecureString"),
            // PowerShell $null stringifies to the empty string
            Self::Nil => write!(f, ""),
        }
    }
}

impl From<&str> for PsPrimitiveValue {
    fn from(s: &str) -> Self {
        Self::Str(PsString::from(s))
    }
}

impl From<String> for PsPrimitiveValue {
    fn from(s: String) -> Self {
        Self::Str(PsString::from(s))
    }
}

impl From<PsString> for PsPrimitiveValue {
    fn from(s: PsString) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for PsPrimitiveValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for PsPrimitiveValue {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl From<i64> for PsPrimitiveValue {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<u32> for PsPrimitiveValue {
    fn from(v: u32) -> Self {
        Self::U32(v)
    }
}

impl From<u64> for PsPrimitiveValue {
    fn from(v: u64) -> Self {
        Self::U64(v)
    }
}

impl From<f32> for PsPrimitiveValue {
    fn from(v: f32) -> Self {
        Self::Single(v)
    }
}

impl From<f64> for PsPrimitiveValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<Vec<u8>> for PsPrimitiveValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<Uuid> for PsPrimitiveValue {
    fn from(v: Uuid) -> Self {
        Self::Guid(v)
    }
}

impl From<PsDateTime> for PsPrimitiveValue {
    fn from(v: PsDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl From<PsDuration> for PsPrimitiveValue {
    fn from(v: PsDuration) -> Self {
        Self::Duration(v)
    }
}

// Floats keep the enum from deriving Eq/Hash. Equality stays the derived
// IEEE comparison (NaN never equals itself, so NaN-bearing objects simply
// never deduplicate); hashing normalises -0.0 so equal floats hash equally.
impl Eq for PsPrimitiveValue {}

#[allow(clippy::derived_hash_with_manual_eq)]
impl std::hash::Hash for PsPrimitiveValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Str(s) => s.hash(state),
            Self::Char(c) => c.hash(state),
            Self::Bool(b) => b.hash(state),
            Self::SByte(v) => v.hash(state),
            Self::Byte(v) => v.hash(state),
            Self::I16(v) => v.hash(state),
            Self::U16(v) => v.hash(state),
            Self::I32(v) => v.hash(state),
            Self::U32(v) => v.hash(state),
            Self::I64(v) => v.hash(state),
            Self::U64(v) => v.hash(state),
            Self::Single(v) => normalize_f32(*v).hash(state),
            Self::Double(v) => normalize_f64(*v).hash(state),
            Self::Decimal(v) | Self::Uri(v) | Self::Version(v) | Self::XmlDocument(v)
            | Self::ScriptBlock(v) => v.hash(state),
            Self::DateTime(v) => v.hash(state),
            Self::Duration(v) => v.hash(state),
            Self::Bytes(v) => v.hash(state),
            Self::Guid(v) => v.hash(state),
            Self::SecureString(v) => v.hash(state),
            Self::Nil => {}
        }
    }
}

fn normalize_f32(v: f32) -> u32 {
    if v == 0.0 { 0.0f32.to_bits() } else { v.to_bits() }
}

fn normalize_f64(v: f64) -> u64 {
    if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }
}

/// A secure string's plaintext, kept out of `Debug` output.
///
/// It serialises to a `<SS>` element only through a [`crate::CryptoProvider`]
/// holding a negotiated session key, and never any other way.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct PsSecureString {
    plaintext: PsString,
}

impl PsSecureString {
    pub fn new(plaintext: impl Into<PsString>) -> Self {
        Self {
            plaintext: plaintext.into(),
        }
    }

    pub fn plaintext(&self) -> &PsString {
        &self.plaintext
    }
}

impl std::fmt::Debug for PsSecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PsSecureString(<redacted>)")
    }
}

impl From<&str> for PsSecureString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
