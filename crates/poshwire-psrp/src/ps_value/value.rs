use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::{ComplexObject, ComplexObjectContent, Container, PsPrimitiveValue, PsString, PsType};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PsValue {
    Primitive(PsPrimitiveValue),
    Object(ComplexObject),
}

impl<IntoPrimitive> From<IntoPrimitive> for PsValue
where
    IntoPrimitive: Into<PsPrimitiveValue>,
{
    fn from(p: IntoPrimitive) -> Self {
        Self::Primitive(p.into())
    }
}

impl Display for PsValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primitive(p) => p.fmt(f),
            Self::Object(o) => o.fmt(f),
        }
    }
}

impl PsValue {
    pub const NULL: Self = Self::Primitive(PsPrimitiveValue::Nil);

    pub fn as_object(&self) -> Option<&ComplexObject> {
        if let Self::Object(obj) = self { Some(obj) } else { None }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Primitive(PsPrimitiveValue::I32(val)) => Some(*val),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Primitive(PsPrimitiveValue::I64(val)) => Some(*val),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Primitive(PsPrimitiveValue::Bool(val)) => Some(*val),
            _ => None,
        }
    }

    /// String content, exact; `None` for non-strings and strings with
    /// lone surrogates.
    pub fn as_string(&self) -> Option<String> {
        match self {
            Self::Primitive(PsPrimitiveValue::Str(val)) => val.to_string_exact(),
            _ => None,
        }
    }

    pub fn as_ps_string(&self) -> Option<&PsString> {
        match self {
            Self::Primitive(PsPrimitiveValue::Str(val)) => Some(val),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Primitive(PsPrimitiveValue::Nil))
    }

    /// Any integral primitive widened to i64.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Primitive(p) => match p {
                PsPrimitiveValue::SByte(v) => Some(i64::from(*v)),
                PsPrimitiveValue::Byte(v) => Some(i64::from(*v)),
                PsPrimitiveValue::I16(v) => Some(i64::from(*v)),
                PsPrimitiveValue::U16(v) => Some(i64::from(*v)),
                PsPrimitiveValue::I32(v) => Some(i64::from(*v)),
                PsPrimitiveValue::U32(v) => Some(i64::from(*v)),
                PsPrimitiveValue::I64(v) => Some(*v),
                PsPrimitiveValue::U64(v) => i64::try_from(*v).ok(),
                _ => None,
            },
            Self::Object(obj) => obj.as_enum().map(|e| e.value),
        }
    }

    /// The auto-promotion used for untyped native integers: `I32` when the
    /// value fits, `I64` otherwise.
    pub fn auto_int(value: i64) -> Self {
        if let Ok(v) = i32::try_from(value) {
            Self::Primitive(PsPrimitiveValue::I32(v))
        } else {
            Self::Primitive(PsPrimitiveValue::I64(value))
        }
    }

    /// An `ArrayList`-typed list object.
    pub fn list(values: impl IntoIterator<Item = impl Into<Self>>) -> Self {
        Self::Object(ComplexObject {
            type_def: Some(PsType::array_list()),
            to_string: None,
            content: ComplexObjectContent::Container(Container::List(
                values.into_iter().map(Into::into).collect(),
            )),
            adapted_properties: std::collections::BTreeMap::new(),
            extended_properties: std::collections::BTreeMap::new(),
        })
    }

    /// A `Hashtable`-typed dictionary object preserving entry order.
    pub fn dict(entries: impl IntoIterator<Item = (Self, Self)>) -> Self {
        Self::Object(ComplexObject {
            type_def: Some(PsType::hashtable()),
            to_string: None,
            content: ComplexObjectContent::Container(Container::Dictionary(
                entries.into_iter().collect(),
            )),
            adapted_properties: std::collections::BTreeMap::new(),
            extended_properties: std::collections::BTreeMap::new(),
        })
    }

    pub fn string_list(strings: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::list(strings.into_iter().map(|s| Self::from(s.into())))
    }

    /// Collection elements when this value is a container-bearing object.
    pub fn iter_collection(&self) -> Option<Box<dyn Iterator<Item = &Self> + '_>> {
        self.as_object()
            .and_then(ComplexObject::container)
            .map(Container::values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_int_promotion() {
        assert_eq!(PsValue::auto_int(7), PsValue::from(7));
        assert_eq!(
            PsValue::auto_int(i64::from(i32::MAX) + 1),
            PsValue::from(i64::from(i32::MAX) + 1)
        );
    }

    #[test]
    fn list_constructor_is_array_list() {
        let list = PsValue::list([1, 2, 3]);
        let obj = list.as_object().unwrap();
        assert_eq!(obj.type_def.as_ref().unwrap().leading(), Some("System.Collections.ArrayList"));
        assert_eq!(obj.container().unwrap().len(), 3);
    }

    #[test]
    fn collection_iteration() {
        let list = PsValue::list(["a", "b"]);
        let collected: Vec<String> = list
            .iter_collection()
            .unwrap()
            .map(ToString::to_string)
            .collect();
        assert_eq!(collected, ["a", "b"]);
    }
}
