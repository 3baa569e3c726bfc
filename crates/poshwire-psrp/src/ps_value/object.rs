use std::collections::BTreeMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::{Container, PsEnum, PsPrimitiveValue, PsProperty, PsType, PsValue};

/// The non-property content of a complex object. Exactly one of these per
/// object; collection variants never combine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ComplexObjectContent {
    /// Properties only.
    #[default]
    Standard,
    /// An object extending a primitive (string with ETS notes, etc.).
    ExtendedPrimitive(PsPrimitiveValue),
    /// A collection.
    Container(Container),
    /// An enumeration value.
    Enum(PsEnum),
}

/// A complex object: type names, an optional `ToString`, content, and the
/// two ETS property surfaces.
///
/// Property lookups are case-sensitive (a deliberate departure from
/// PowerShell's case-insensitive binder); [`Self::property_ci`] is the
/// escape hatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ComplexObject {
    pub type_def: Option<PsType>,
    pub to_string: Option<String>,
    pub content: ComplexObjectContent,
    /// `<Props>` — properties the adapter found on the native object.
    pub adapted_properties: BTreeMap<String, PsProperty>,
    /// `<MS>` — properties added by the Extended Type System.
    pub extended_properties: BTreeMap<String, PsProperty>,
}

impl ComplexObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(type_def: PsType) -> Self {
        Self {
            type_def: Some(type_def),
            ..Self::default()
        }
    }

    /// Case-sensitive lookup; extended properties shadow adapted ones.
    pub fn property(&self, name: &str) -> Option<&PsValue> {
        self.extended_properties
            .get(name)
            .or_else(|| self.adapted_properties.get(name))
            .map(|p| &p.value)
    }

    /// Case-insensitive lookup helper; first match in name order wins.
    pub fn property_ci(&self, name: &str) -> Option<&PsValue> {
        let find = |map: &'_ BTreeMap<String, PsProperty>| {
            map.iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, p)| p.name.clone())
        };
        if let Some(key) = find(&self.extended_properties) {
            return self.extended_properties.get(&key).map(|p| &p.value);
        }
        find(&self.adapted_properties)
            .and_then(|key| self.adapted_properties.get(&key).map(|p| &p.value))
    }

    pub fn insert_extended(&mut self, name: impl Into<String>, value: impl Into<PsValue>) {
        let name = name.into();
        self.extended_properties
            .insert(name.clone(), PsProperty::new(name, value));
    }

    pub fn insert_adapted(&mut self, name: impl Into<String>, value: impl Into<PsValue>) {
        let name = name.into();
        self.adapted_properties
            .insert(name.clone(), PsProperty::new(name, value));
    }

    pub fn container(&self) -> Option<&Container> {
        match &self.content {
            ComplexObjectContent::Container(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&PsEnum> {
        match &self.content {
            ComplexObjectContent::Enum(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for ComplexObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(to_string) = &self.to_string {
            return write!(f, "{to_string}");
        }
        match &self.content {
            ComplexObjectContent::ExtendedPrimitive(p) => write!(f, "{p}"),
            ComplexObjectContent::Container(c) => write!(f, "{c}"),
            ComplexObjectContent::Enum(e) => write!(f, "{e}"),
            ComplexObjectContent::Standard => match &self.type_def {
                Some(t) => write!(f, "{}", t.leading().unwrap_or_default()),
                None => write!(f, "System.Object"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_shadows_adapted() {
        let mut obj = ComplexObject::new();
        obj.insert_adapted("Name", "native");
        obj.insert_extended("Name", "ets");
        assert_eq!(
            obj.property("Name"),
            Some(&PsValue::from("ets"))
        );
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let mut obj = ComplexObject::new();
        obj.insert_extended("Name", "x");
        assert!(obj.property("name").is_none());
        assert_eq!(obj.property_ci("NAME"), Some(&PsValue::from("x")));
    }
}
