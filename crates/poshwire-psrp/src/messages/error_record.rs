use crate::MessageType;
use crate::ps_value::{ComplexObject, PsType, PsValue};

use super::{PsObjectWithType, decode};

/// ERROR_RECORD: a structured PowerShell error.
///
/// The wire shape nests an exception object, the fully-qualified error
/// id, category info, and optional invocation details; everything beyond
/// the identity fields is kept as raw values because callers mostly
/// relay them.
///
/// https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-psrp/0fe855a7-d13c-44e2-aa88-291e2054ae3a
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct ErrorRecord {
    /// Exception message (`Exception.Message` on the nested object).
    #[builder(setter(into))]
    pub exception_message: String,
    #[builder(setter(into))]
    pub fully_qualified_error_id: String,
    /// `System.Management.Automation.ErrorCategory` value.
    #[builder(default = 0)]
    pub error_category: i32,
    #[builder(default, setter(into))]
    pub error_category_message: Option<String>,
    /// The object the error concerns, verbatim.
    #[builder(default = PsValue::NULL)]
    pub target_object: PsValue,
    /// Raw `InvocationInfo` object when the sender attached one.
    #[builder(default)]
    pub invocation_info: Option<PsValue>,
    #[builder(default, setter(into))]
    pub error_details_message: Option<String>,
}

impl ErrorRecord {
    pub fn new(message: impl Into<String>, error_id: impl Into<String>) -> Self {
        Self::builder()
            .exception_message(message)
            .fully_qualified_error_id(error_id)
            .build()
    }
}

impl PsObjectWithType for ErrorRecord {
    fn message_type(&self) -> MessageType {
        MessageType::ErrorRecord
    }

    fn to_ps_object(&self) -> PsValue {
        PsValue::Object(ComplexObject::from(self.clone()))
    }
}

impl From<ErrorRecord> for ComplexObject {
    fn from(record: ErrorRecord) -> Self {
        let mut exception = Self::with_type(PsType::new([
            "System.Exception",
            "System.Object",
        ]));
        exception.to_string = Some(record.exception_message.clone());
        exception.insert_adapted("Message", record.exception_message.clone());

        let mut obj = Self::with_type(PsType::new([
            "System.Management.Automation.ErrorRecord",
            "System.Object",
        ]));
        obj.to_string = Some(record.exception_message);
        obj.insert_extended("Exception", PsValue::Object(exception));
        obj.insert_extended("FullyQualifiedErrorId", record.fully_qualified_error_id);
        obj.insert_extended("ErrorCategory_Category", record.error_category);
        if let Some(message) = record.error_category_message {
            obj.insert_extended("ErrorCategory_Message", message);
        }
        obj.insert_extended("TargetObject", record.target_object);
        if let Some(info) = record.invocation_info {
            obj.insert_extended("InvocationInfo", info);
            obj.insert_extended("SerializeExtendedInfo", true);
        } else {
            obj.insert_extended("SerializeExtendedInfo", false);
        }
        if let Some(message) = record.error_details_message {
            obj.insert_extended("ErrorDetails_Message", message);
        }
        obj
    }
}

impl TryFrom<ComplexObject> for ErrorRecord {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        let exception_message = match value.property("Exception") {
            Some(PsValue::Object(exception)) => exception
                .property("Message")
                .and_then(PsValue::as_string)
                .or_else(|| exception.to_string.clone())
                .unwrap_or_default(),
            _ => value.to_string.clone().unwrap_or_default(),
        };

        Ok(Self {
            exception_message,
            fully_qualified_error_id: decode::required_str(&value, "FullyQualifiedErrorId")?,
            error_category: value
                .property("ErrorCategory_Category")
                .and_then(PsValue::as_integer)
                .map_or(0, |v| v as i32),
            error_category_message: value
                .property("ErrorCategory_Message")
                .and_then(PsValue::as_string),
            target_object: value
                .property("TargetObject")
                .cloned()
                .unwrap_or(PsValue::NULL),
            invocation_info: value.property("InvocationInfo").cloned(),
            error_details_message: value
                .property("ErrorDetails_Message")
                .and_then(PsValue::as_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let record = ErrorRecord::builder()
            .exception_message("Attempted to divide by zero.")
            .fully_qualified_error_id("RuntimeException")
            .error_category(7)
            .target_object(PsValue::from(0))
            .build();
        let obj = ComplexObject::from(record.clone());
        assert_eq!(ErrorRecord::try_from(obj).unwrap(), record);
    }

    #[test]
    fn exception_message_rides_the_nested_object() {
        let record = ErrorRecord::new("boom", "Full.Boom");
        let obj = ComplexObject::from(record);
        let PsValue::Object(exception) = obj.property("Exception").unwrap() else {
            panic!("expected exception object");
        };
        assert_eq!(
            exception.property("Message"),
            Some(&PsValue::from("boom"))
        );
    }

    #[test]
    fn message_type_value() {
        assert_eq!(
            ErrorRecord::new("x", "y").message_type().value(),
            0x00041005
        );
    }
}
