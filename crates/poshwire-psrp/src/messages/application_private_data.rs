use crate::MessageType;
use crate::ps_value::{
    ComplexObject, ComplexObjectContent, Container, PsType, PsValue,
};

use super::PsObjectWithType;

/// APPLICATION_PRIVATE_DATA: server → client key/value data the higher
/// layers interpret (PS version table and friends). Carried as a
/// PSPrimitiveDictionary under the `ApplicationPrivateData` property.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApplicationPrivateData {
    pub data: Vec<(PsValue, PsValue)>,
}

impl ApplicationPrivateData {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Value for a string key, if present.
    pub fn get(&self, key: &str) -> Option<&PsValue> {
        self.data.iter().find_map(|(k, v)| {
            k.as_ps_string()
                .is_some_and(|s| *s == *key)
                .then_some(v)
        })
    }
}

impl PsObjectWithType for ApplicationPrivateData {
    fn message_type(&self) -> MessageType {
        MessageType::ApplicationPrivateData
    }

    fn to_ps_object(&self) -> PsValue {
        let dict = ComplexObject {
            type_def: Some(PsType::ps_primitive_dictionary()),
            content: ComplexObjectContent::Container(Container::Dictionary(self.data.clone())),
            ..ComplexObject::default()
        };
        let mut obj = ComplexObject::new();
        obj.insert_extended("ApplicationPrivateData", PsValue::Object(dict));
        PsValue::Object(obj)
    }
}

impl TryFrom<ComplexObject> for ApplicationPrivateData {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        let data = match value.property("ApplicationPrivateData") {
            Some(PsValue::Object(dict)) => match dict.container() {
                Some(Container::Dictionary(entries)) => entries.clone(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        Ok(Self { data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_and_lookup() {
        let data = ApplicationPrivateData {
            data: vec![(PsValue::from("BashVersion"), PsValue::from("none"))],
        };
        let PsValue::Object(obj) = data.to_ps_object() else {
            panic!("expected object");
        };
        let parsed = ApplicationPrivateData::try_from(obj).unwrap();
        assert_eq!(parsed, data);
        assert_eq!(parsed.get("BashVersion"), Some(&PsValue::from("none")));
        assert_eq!(parsed.get("missing"), None);
    }
}
