use crate::MessageType;
use crate::ps_value::{ComplexObject, PsValue};

use super::{PsObjectWithType, decode};

/// USER_EVENT: server → client notification raised by an engine event
/// subscription (Register-EngineEvent and friends).
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct UserEvent {
    pub event_identifier: i32,
    #[builder(setter(into))]
    pub source_identifier: String,
    #[builder(default = PsValue::NULL)]
    pub time_generated: PsValue,
    #[builder(default = PsValue::NULL)]
    pub sender: PsValue,
    #[builder(default = PsValue::NULL)]
    pub source_args: PsValue,
    #[builder(default = PsValue::NULL)]
    pub message_data: PsValue,
    #[builder(default, setter(into))]
    pub computer_name: Option<String>,
    #[builder(default)]
    pub runspace_id: Option<uuid::Uuid>,
}

impl PsObjectWithType for UserEvent {
    fn message_type(&self) -> MessageType {
        MessageType::UserEvent
    }

    fn to_ps_object(&self) -> PsValue {
        let mut obj = ComplexObject::new();
        obj.insert_extended("PSEventArgs.EventIdentifier", self.event_identifier);
        obj.insert_extended(
            "PSEventArgs.SourceIdentifier",
            self.source_identifier.clone(),
        );
        obj.insert_extended("PSEventArgs.TimeGenerated", self.time_generated.clone());
        obj.insert_extended("PSEventArgs.Sender", self.sender.clone());
        obj.insert_extended("PSEventArgs.SourceArgs", self.source_args.clone());
        obj.insert_extended("PSEventArgs.MessageData", self.message_data.clone());
        obj.insert_extended(
            "PSEventArgs.ComputerName",
            match &self.computer_name {
                Some(name) => PsValue::from(name.clone()),
                None => PsValue::NULL,
            },
        );
        obj.insert_extended(
            "PSEventArgs.RunspaceId",
            match self.runspace_id {
                Some(id) => PsValue::from(id),
                None => PsValue::NULL,
            },
        );
        PsValue::Object(obj)
    }
}

impl TryFrom<ComplexObject> for UserEvent {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        let optional = |name: &str| value.property(name).cloned().unwrap_or(PsValue::NULL);
        Ok(Self {
            event_identifier: decode::required_i32(&value, "PSEventArgs.EventIdentifier")?,
            source_identifier: decode::required_str(&value, "PSEventArgs.SourceIdentifier")?,
            time_generated: optional("PSEventArgs.TimeGenerated"),
            sender: optional("PSEventArgs.Sender"),
            source_args: optional("PSEventArgs.SourceArgs"),
            message_data: optional("PSEventArgs.MessageData"),
            computer_name: value
                .property("PSEventArgs.ComputerName")
                .and_then(PsValue::as_string),
            runspace_id: match value.property("PSEventArgs.RunspaceId") {
                Some(PsValue::Primitive(crate::ps_value::PsPrimitiveValue::Guid(id))) => Some(*id),
                _ => None,
            },
        })
    }
}
