use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::PsValue;

/// Collection content carried by a complex object. The variants are
/// mutually exclusive; the `<TN>` on the owning object is what tells a
/// stack from a queue on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Container {
    /// https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-psrp/e9cf648e-38fe-42ba-9ca3-d89a9e0a856a
    Stack(Vec<PsValue>),
    /// https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-psrp/ade9f023-ac30-4b7e-be17-900c02a6f837
    Queue(Vec<PsValue>),
    /// https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-psrp/f4bdb166-cefc-4d49-848c-7d08680ae0a7
    List(Vec<PsValue>),
    /// Entries keep insertion order; key lookup is linear.
    /// https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-psrp/c4e000a2-21d8-46c0-a71b-0051365d8273
    Dictionary(Vec<(PsValue, PsValue)>),
    /// `<IE>` — a bare enumeration with no concrete collection type.
    Enumerable(Vec<PsValue>),
}

impl Container {
    pub fn len(&self) -> usize {
        match self {
            Self::Stack(v) | Self::Queue(v) | Self::List(v) | Self::Enumerable(v) => v.len(),
            Self::Dictionary(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates element values; dictionary entries yield their values.
    pub fn values(&self) -> Box<dyn Iterator<Item = &PsValue> + '_> {
        match self {
            Self::Stack(v) | Self::Queue(v) | Self::List(v) | Self::Enumerable(v) => {
                Box::new(v.iter())
            }
            Self::Dictionary(entries) => Box::new(entries.iter().map(|(_, v)| v)),
        }
    }
}

impl Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stack(_) => write!(f, "System.Collections.Stack"),
            Self::Queue(_) => write!(f, "System.Collections.Queue"),
            Self::List(items) | Self::Enumerable(items) => {
                let s: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", s.join(" "))
            }
            Self::Dictionary(_) => write!(f, "System.Collections.Hashtable"),
        }
    }
}

/// The numeric width a CLIXML enum was carried with. Enums default to a
/// 32-bit underlying type but any integral width is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EnumWidth {
    SByte,
    Byte,
    I16,
    U16,
    #[default]
    I32,
    U32,
    I64,
    U64,
}

/// An enumeration value: the underlying integral value plus the width tag
/// it rides in. Symbolic names live in the owning object's `ToString`
/// (comma-joined for flag enums) and its type-name list.
///
/// Example:
///
/// ```text
/// <Obj RefId="0">
///   <TN RefId="0">
///     <T>System.ConsoleColor</T>
///     <T>System.Enum</T>
///     <T>System.ValueType</T>
///     <T>System.Object</T>
///   </TN>
///   <ToString>Blue</ToString>
///   <I32>9</I32>
/// </Obj>
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PsEnum {
    pub value: i64,
    pub width: EnumWidth,
}

impl PsEnum {
    pub fn new(value: i64) -> Self {
        Self {
            value,
            width: EnumWidth::I32,
        }
    }

    pub fn with_width(value: i64, width: EnumWidth) -> Self {
        Self { value, width }
    }

    /// Flag-enum test: all bits of `flag` set in `value`.
    pub fn has_flag(&self, flag: i64) -> bool {
        self.value & flag == flag
    }

    /// Bitwise union for flag enums.
    pub fn or(&self, flag: i64) -> Self {
        Self {
            value: self.value | flag,
            width: self.width,
        }
    }
}

impl Display for PsEnum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The owning object's ToString carries the symbolic name; this is
        // the fallback.
        write!(f, "{}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_composition() {
        let flags = PsEnum::new(0b0101);
        assert!(flags.has_flag(0b0001));
        assert!(flags.has_flag(0b0101));
        assert!(!flags.has_flag(0b0010));
        assert_eq!(flags.or(0b0010).value, 0b0111);
    }

    #[test]
    fn dictionary_preserves_insertion_order() {
        let dict = Container::Dictionary(vec![
            (PsValue::from("z"), PsValue::from(1)),
            (PsValue::from("a"), PsValue::from(2)),
        ]);
        let keys: Vec<String> = match &dict {
            Container::Dictionary(entries) => {
                entries.iter().map(|(k, _)| k.to_string()).collect()
            }
            _ => unreachable!(),
        };
        assert_eq!(keys, ["z", "a"]);
    }
}
