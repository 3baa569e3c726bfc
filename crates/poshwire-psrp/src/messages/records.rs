//! Out-of-band record streams: DEBUG_RECORD / VERBOSE_RECORD /
//! WARNING_RECORD (informational records distinguished only by message
//! type), PROGRESS_RECORD, and INFORMATION_RECORD.

use crate::MessageType;
use crate::ps_value::{ComplexObject, PsType, PsValue};

use super::{PsObjectWithType, decode};

/// The three message-text streams that share the InformationalRecord
/// wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InformationalKind {
    Debug,
    Verbose,
    Warning,
}

/// A debug/verbose/warning record: a message string plus an optional
/// InvocationInfo payload.
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct InformationalRecord {
    pub kind: InformationalKind,
    #[builder(setter(into))]
    pub message: String,
    #[builder(default)]
    pub invocation_info: Option<PsValue>,
}

impl InformationalRecord {
    pub fn debug(message: impl Into<String>) -> Self {
        Self::builder()
            .kind(InformationalKind::Debug)
            .message(message)
            .build()
    }

    pub fn verbose(message: impl Into<String>) -> Self {
        Self::builder()
            .kind(InformationalKind::Verbose)
            .message(message)
            .build()
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::builder()
            .kind(InformationalKind::Warning)
            .message(message)
            .build()
    }

    /// Parses a record body whose stream is implied by the message type.
    pub fn try_from_object(
        kind: InformationalKind,
        value: ComplexObject,
    ) -> Result<Self, crate::PsrpError> {
        Ok(Self {
            kind,
            message: decode::required_str(&value, "InformationalRecord_Message")?,
            invocation_info: value.property("InvocationInfo").cloned(),
        })
    }
}

impl PsObjectWithType for InformationalRecord {
    fn message_type(&self) -> MessageType {
        match self.kind {
            InformationalKind::Debug => MessageType::DebugRecord,
            InformationalKind::Verbose => MessageType::VerboseRecord,
            InformationalKind::Warning => MessageType::WarningRecord,
        }
    }

    fn to_ps_object(&self) -> PsValue {
        let mut obj = ComplexObject::with_type(PsType::new([
            "System.Management.Automation.InformationalRecord",
            "System.Object",
        ]));
        obj.insert_extended("InformationalRecord_Message", self.message.clone());
        obj.insert_extended("InformationalRecord_SerializeInvocationInfo", false);
        if let Some(info) = &self.invocation_info {
            obj.insert_extended("InvocationInfo", info.clone());
        }
        PsValue::Object(obj)
    }
}

/// PROGRESS_RECORD: Write-Progress state.
///
/// https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-psrp/435132db-5d07-4b1e-b867-f47a4a221f96
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct ProgressRecord {
    #[builder(setter(into))]
    pub activity: String,
    #[builder(default = 0)]
    pub activity_id: i32,
    #[builder(default, setter(into))]
    pub current_operation: Option<String>,
    #[builder(default = -1)]
    pub parent_activity_id: i32,
    #[builder(default = -1)]
    pub percent_complete: i32,
    /// `ProgressRecordType`: 0 = Processing, 1 = Completed.
    #[builder(default = 0)]
    pub record_type: i32,
    #[builder(default = -1)]
    pub seconds_remaining: i32,
    #[builder(default, setter(into))]
    pub status_description: Option<String>,
}

impl PsObjectWithType for ProgressRecord {
    fn message_type(&self) -> MessageType {
        MessageType::ProgressRecord
    }

    fn to_ps_object(&self) -> PsValue {
        let mut obj = ComplexObject::new();
        obj.insert_extended("Activity", self.activity.clone());
        obj.insert_extended("ActivityId", self.activity_id);
        obj.insert_extended(
            "CurrentOperation",
            self.current_operation
                .clone()
                .map_or(PsValue::NULL, PsValue::from),
        );
        obj.insert_extended("ParentActivityId", self.parent_activity_id);
        obj.insert_extended("PercentComplete", self.percent_complete);
        obj.insert_extended("Type", self.record_type);
        obj.insert_extended("SecondsRemaining", self.seconds_remaining);
        obj.insert_extended(
            "StatusDescription",
            self.status_description
                .clone()
                .map_or(PsValue::NULL, PsValue::from),
        );
        PsValue::Object(obj)
    }
}

impl TryFrom<ComplexObject> for ProgressRecord {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        Ok(Self {
            activity: decode::required_str(&value, "Activity")?,
            activity_id: decode::required_i32(&value, "ActivityId")?,
            current_operation: value
                .property("CurrentOperation")
                .and_then(PsValue::as_string),
            parent_activity_id: decode::required_i32(&value, "ParentActivityId")?,
            percent_complete: decode::required_i32(&value, "PercentComplete")?,
            record_type: decode::required_enum(&value, "Type")? as i32,
            seconds_remaining: decode::required_i32(&value, "SecondsRemaining")?,
            status_description: value
                .property("StatusDescription")
                .and_then(PsValue::as_string),
        })
    }
}

/// INFORMATION_RECORD: Write-Information payloads (protocol 2.3+).
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct InformationRecord {
    #[builder(default = PsValue::NULL)]
    pub message_data: PsValue,
    #[builder(default, setter(into))]
    pub source: Option<String>,
    #[builder(default)]
    pub time_generated: Option<crate::ps_value::PsDateTime>,
    #[builder(default)]
    pub tags: Vec<String>,
    #[builder(default, setter(into))]
    pub user: Option<String>,
    #[builder(default, setter(into))]
    pub computer: Option<String>,
    #[builder(default = 0)]
    pub process_id: u32,
    #[builder(default = 0)]
    pub native_thread_id: u32,
    #[builder(default = 0)]
    pub managed_thread_id: u32,
}

impl PsObjectWithType for InformationRecord {
    fn message_type(&self) -> MessageType {
        MessageType::InformationRecord
    }

    fn to_ps_object(&self) -> PsValue {
        let mut obj = ComplexObject::with_type(PsType::new([
            "System.Management.Automation.InformationRecord",
            "System.Object",
        ]));
        obj.insert_extended("MessageData", self.message_data.clone());
        obj.insert_extended(
            "Source",
            self.source.clone().map_or(PsValue::NULL, PsValue::from),
        );
        obj.insert_extended(
            "TimeGenerated",
            self.time_generated.map_or(PsValue::NULL, PsValue::from),
        );
        obj.insert_extended("Tags", PsValue::string_list(self.tags.clone()));
        obj.insert_extended(
            "User",
            self.user.clone().map_or(PsValue::NULL, PsValue::from),
        );
        obj.insert_extended(
            "Computer",
            self.computer.clone().map_or(PsValue::NULL, PsValue::from),
        );
        obj.insert_extended("ProcessId", self.process_id);
        obj.insert_extended("NativeThreadId", self.native_thread_id);
        obj.insert_extended("ManagedThreadId", self.managed_thread_id);
        PsValue::Object(obj)
    }
}

impl TryFrom<ComplexObject> for InformationRecord {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        let tags = value
            .property("Tags")
            .and_then(PsValue::iter_collection)
            .map(|iter| iter.filter_map(PsValue::as_string).collect())
            .unwrap_or_default();
        let time_generated = match value.property("TimeGenerated") {
            Some(PsValue::Primitive(crate::ps_value::PsPrimitiveValue::DateTime(dt))) => Some(*dt),
            _ => None,
        };
        let uint = |name: &str| -> u32 {
            value
                .property(name)
                .and_then(PsValue::as_integer)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(0)
        };

        Ok(Self {
            message_data: value
                .property("MessageData")
                .cloned()
                .unwrap_or(PsValue::NULL),
            source: value.property("Source").and_then(PsValue::as_string),
            time_generated,
            tags,
            user: value.property("User").and_then(PsValue::as_string),
            computer: value.property("Computer").and_then(PsValue::as_string),
            process_id: uint("ProcessId"),
            native_thread_id: uint("NativeThreadId"),
            managed_thread_id: uint("ManagedThreadId"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn informational_kinds_map_to_message_types() {
        assert_eq!(
            InformationalRecord::debug("d").message_type().value(),
            0x00041007
        );
        assert_eq!(
            InformationalRecord::verbose("v").message_type().value(),
            0x00041008
        );
        assert_eq!(
            InformationalRecord::warning("w").message_type().value(),
            0x00041009
        );
    }

    #[test]
    fn informational_round_trip() {
        let record = InformationalRecord::warning("disk almost full");
        let PsValue::Object(obj) = record.to_ps_object() else {
            panic!("expected object");
        };
        let parsed =
            InformationalRecord::try_from_object(InformationalKind::Warning, obj).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn progress_round_trip() {
        let record = ProgressRecord::builder()
            .activity("Copying")
            .activity_id(1)
            .percent_complete(40)
            .status_description("40 of 100".to_string())
            .build();
        let PsValue::Object(obj) = record.to_ps_object() else {
            panic!("expected object");
        };
        assert_eq!(ProgressRecord::try_from(obj).unwrap(), record);
        assert_eq!(record.message_type().value(), 0x00041010);
    }

    #[test]
    fn information_round_trip() {
        let record = InformationRecord::builder()
            .message_data(PsValue::from("hello"))
            .source("Write-Information".to_string())
            .tags(vec!["PSHOST".to_string()])
            .build();
        let PsValue::Object(obj) = record.to_ps_object() else {
            panic!("expected object");
        };
        assert_eq!(InformationRecord::try_from(obj).unwrap(), record);
    }
}
