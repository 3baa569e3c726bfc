use crate::MessageType;
use crate::ps_value::{ComplexObject, PsValue};

use super::PsObjectWithType;

/// GET_COMMAND_METADATA: client asking the server to enumerate commands
/// (the Get-Command fast path used for tab completion).
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct GetCommandMetadata {
    #[builder(default)]
    pub name: Vec<String>,
    /// `System.Management.Automation.CommandTypes` flags; 0x0F covers
    /// aliases, functions, filters, and cmdlets.
    #[builder(default = 0x0F)]
    pub command_type: i32,
    #[builder(default)]
    pub namespace: Vec<String>,
    #[builder(default)]
    pub argument_list: Vec<PsValue>,
}

impl PsObjectWithType for GetCommandMetadata {
    fn message_type(&self) -> MessageType {
        MessageType::GetCommandMetadata
    }

    fn to_ps_object(&self) -> PsValue {
        let mut obj = ComplexObject::new();
        obj.insert_extended("Name", PsValue::string_list(self.name.clone()));
        obj.insert_extended(
            "CommandType",
            PsValue::Object(ComplexObject {
                type_def: Some(crate::ps_value::PsType::enum_type(
                    "System.Management.Automation.CommandTypes",
                )),
                content: crate::ps_value::ComplexObjectContent::Enum(
                    crate::ps_value::PsEnum::new(i64::from(self.command_type)),
                ),
                ..ComplexObject::default()
            }),
        );
        obj.insert_extended("Namespace", PsValue::string_list(self.namespace.clone()));
        obj.insert_extended("ArgumentList", PsValue::list(self.argument_list.clone()));
        PsValue::Object(obj)
    }
}

impl TryFrom<ComplexObject> for GetCommandMetadata {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        let strings = |name: &str| -> Vec<String> {
            value
                .property(name)
                .and_then(PsValue::iter_collection)
                .map(|iter| iter.filter_map(PsValue::as_string).collect())
                .unwrap_or_default()
        };
        let command_type = value
            .property("CommandType")
            .and_then(PsValue::as_integer)
            .map_or(0x0F, |v| v as i32);
        let argument_list = value
            .property("ArgumentList")
            .and_then(PsValue::iter_collection)
            .map(|iter| iter.cloned().collect())
            .unwrap_or_default();

        Ok(Self {
            name: strings("Name"),
            command_type,
            namespace: strings("Namespace"),
            argument_list,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let msg = GetCommandMetadata::builder()
            .name(vec!["Get-Item".to_string(), "Get-ChildItem".to_string()])
            .build();
        let PsValue::Object(obj) = msg.to_ps_object() else {
            panic!("expected object");
        };
        assert_eq!(GetCommandMetadata::try_from(obj).unwrap(), msg);
        assert_eq!(msg.message_type().value(), 0x0002100A);
    }
}
