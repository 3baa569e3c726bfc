//! Host calls: the server asking the client's host to do something
//! (write to the console, prompt, resize the window) and the client's
//! response. Pipeline- and pool-scoped variants share one body shape and
//! differ only in message type.
//!
//! https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-psrp/3a4c94e3-4b49-4a39-a380-e7b6bce68d3f

use crate::MessageType;
use crate::ps_value::{
    ComplexObject, ComplexObjectContent, Container, PsType, PsValue,
};

use super::{PsObjectWithType, decode};

/// A host method invocation: correlation id, method identity, arguments.
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct HostMethodCall {
    /// Unique per scope; the response echoes it.
    pub call_id: i64,
    /// `RemoteHostMethodId` value.
    pub method_id: i32,
    #[builder(setter(into))]
    pub method_name: String,
    #[builder(default)]
    pub parameters: Vec<PsValue>,
}

impl HostMethodCall {
    fn to_object(&self) -> ComplexObject {
        let mut obj = ComplexObject::new();
        obj.insert_extended("ci", self.call_id);

        let method_id = ComplexObject {
            type_def: Some(PsType::remote_host_method_id()),
            to_string: Some(self.method_name.clone()),
            content: ComplexObjectContent::Enum(crate::ps_value::PsEnum::new(i64::from(
                self.method_id,
            ))),
            ..ComplexObject::default()
        };
        obj.insert_extended("mi", PsValue::Object(method_id));

        let parameters = ComplexObject {
            type_def: Some(PsType::array_list()),
            content: ComplexObjectContent::Container(Container::List(self.parameters.clone())),
            ..ComplexObject::default()
        };
        obj.insert_extended("mp", PsValue::Object(parameters));
        obj
    }

    fn from_object(value: &ComplexObject) -> Result<Self, crate::PsrpError> {
        let method = decode::required(value, "mi")?;
        let method_id = method
            .as_integer()
            .ok_or_else(|| crate::PsrpError::InvalidMessage("mi must be an enum".to_string()))?
            as i32;
        let method_name = method
            .as_object()
            .and_then(|obj| obj.to_string.clone())
            .unwrap_or_default();
        let parameters = value
            .property("mp")
            .and_then(PsValue::iter_collection)
            .map(|iter| iter.cloned().collect())
            .unwrap_or_default();

        Ok(Self {
            call_id: decode::required_i64(value, "ci")?,
            method_id,
            method_name,
            parameters,
        })
    }
}

/// A host method's outcome: return value or transported exception.
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct HostMethodResponse {
    pub call_id: i64,
    pub method_id: i32,
    #[builder(setter(into))]
    pub method_name: String,
    #[builder(default)]
    pub return_value: Option<PsValue>,
    /// Error record describing a failed host call.
    #[builder(default)]
    pub exception: Option<PsValue>,
}

impl HostMethodResponse {
    fn to_object(&self) -> ComplexObject {
        let mut obj = ComplexObject::new();
        obj.insert_extended("ci", self.call_id);

        let method_id = ComplexObject {
            type_def: Some(PsType::remote_host_method_id()),
            to_string: Some(self.method_name.clone()),
            content: ComplexObjectContent::Enum(crate::ps_value::PsEnum::new(i64::from(
                self.method_id,
            ))),
            ..ComplexObject::default()
        };
        obj.insert_extended("mi", PsValue::Object(method_id));

        if let Some(value) = &self.return_value {
            obj.insert_extended("mr", value.clone());
        }
        if let Some(exception) = &self.exception {
            obj.insert_extended("me", exception.clone());
        }
        obj
    }

    fn from_object(value: &ComplexObject) -> Result<Self, crate::PsrpError> {
        let method = decode::required(value, "mi")?;
        Ok(Self {
            call_id: decode::required_i64(value, "ci")?,
            method_id: method.as_integer().ok_or_else(|| {
                crate::PsrpError::InvalidMessage("mi must be an enum".to_string())
            })? as i32,
            method_name: method
                .as_object()
                .and_then(|obj| obj.to_string.clone())
                .unwrap_or_default(),
            return_value: value.property("mr").cloned(),
            exception: value.property("me").cloned(),
        })
    }
}

macro_rules! host_call_message {
    ($name:ident, $inner:ident, $message_type:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(pub $inner);

        impl PsObjectWithType for $name {
            fn message_type(&self) -> MessageType {
                $message_type
            }

            fn to_ps_object(&self) -> PsValue {
                PsValue::Object(self.0.to_object())
            }
        }

        impl TryFrom<ComplexObject> for $name {
            type Error = crate::PsrpError;

            fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
                Ok(Self($inner::from_object(&value)?))
            }
        }

        impl std::ops::Deref for $name {
            type Target = $inner;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
    };
}

host_call_message!(
    PipelineHostCall,
    HostMethodCall,
    MessageType::PipelineHostCall
);
host_call_message!(
    RunspacePoolHostCall,
    HostMethodCall,
    MessageType::RunspacePoolHostCall
);
host_call_message!(
    PipelineHostResponse,
    HostMethodResponse,
    MessageType::PipelineHostResponse
);
host_call_message!(
    RunspacePoolHostResponse,
    HostMethodResponse,
    MessageType::RunspacePoolHostResponse
);

/// Well-known `RemoteHostMethodId` values the state machines care about.
pub mod host_methods {
    pub const READ_LINE: i32 = 11;
    pub const READ_LINE_AS_SECURE_STRING: i32 = 12;
    pub const WRITE1: i32 = 13;
    pub const WRITE_LINE2: i32 = 16;
    pub const WRITE_ERROR_LINE: i32 = 18;
    pub const PROMPT: i32 = 23;
    pub const PROMPT_FOR_CREDENTIAL1: i32 = 24;
    pub const PROMPT_FOR_CREDENTIAL2: i32 = 25;

    /// Methods whose results carry secrets and therefore require the
    /// session key before they can be answered.
    pub fn needs_session_key(method_id: i32) -> bool {
        matches!(
            method_id,
            READ_LINE_AS_SECURE_STRING | PROMPT_FOR_CREDENTIAL1 | PROMPT_FOR_CREDENTIAL2
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_round_trip() {
        let call = PipelineHostCall(
            HostMethodCall::builder()
                .call_id(1)
                .method_id(host_methods::WRITE_LINE2)
                .method_name("WriteLine2")
                .parameters(vec![PsValue::from("hello")])
                .build(),
        );
        let PsValue::Object(obj) = call.to_ps_object() else {
            panic!("expected object");
        };
        assert_eq!(PipelineHostCall::try_from(obj).unwrap(), call);
        assert_eq!(call.message_type().value(), 0x00041100);
    }

    #[test]
    fn response_round_trip() {
        let response = PipelineHostResponse(
            HostMethodResponse::builder()
                .call_id(1)
                .method_id(host_methods::READ_LINE)
                .method_name("ReadLine")
                .return_value(Some(PsValue::from("typed text")))
                .build(),
        );
        let PsValue::Object(obj) = response.to_ps_object() else {
            panic!("expected object");
        };
        assert_eq!(PipelineHostResponse::try_from(obj).unwrap(), response);
        assert_eq!(response.message_type().value(), 0x00041101);
    }

    #[test]
    fn pool_scope_uses_pool_message_types() {
        let call = RunspacePoolHostCall(
            HostMethodCall::builder()
                .call_id(9)
                .method_id(host_methods::WRITE1)
                .method_name("Write1")
                .build(),
        );
        assert_eq!(call.message_type().value(), 0x00021100);
    }

    #[test]
    fn secure_methods_are_flagged() {
        assert!(host_methods::needs_session_key(
            host_methods::READ_LINE_AS_SECURE_STRING
        ));
        assert!(!host_methods::needs_session_key(host_methods::READ_LINE));
    }
}
