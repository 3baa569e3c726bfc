pub mod application_private_data;
pub mod availability;
pub mod connect;
pub mod create_pipeline;
pub mod error_record;
pub mod get_command_metadata;
pub mod host_call;
pub mod init_runspace_pool;
pub mod key_exchange;
pub mod pipeline_io;
pub mod pipeline_state;
pub mod records;
pub mod runspace_pool_state;
pub mod session_capability;
pub mod user_event;

pub use application_private_data::*;
pub use availability::*;
pub use connect::*;
pub use create_pipeline::*;
pub use error_record::*;
pub use get_command_metadata::*;
pub use host_call::*;
pub use init_runspace_pool::*;
pub use key_exchange::*;
pub use pipeline_io::*;
pub use pipeline_state::*;
pub use records::*;
pub use runspace_pool_state::*;
pub use session_capability::*;
pub use user_event::*;

// Re-export the value model alongside the message types; almost every
// consumer of one needs the other.
pub use crate::ps_value::{
    ComplexObject, ComplexObjectContent, Container, EnumWidth, PsDateTime, PsDuration, PsEnum,
    PsPrimitiveValue, PsProperty, PsSecureString, PsString, PsType, PsValue,
};

use crate::cores::MessageType;
use crate::PsrpError;

/// A typed PSRP message body: knows its message type and serialises
/// itself into the value model.
pub trait PsObjectWithType {
    fn message_type(&self) -> MessageType;
    fn to_ps_object(&self) -> PsValue;
}

/// Shared `TryFrom<ComplexObject>` plumbing for the message parsers.
pub(crate) mod decode {
    use super::{ComplexObject, PsPrimitiveValue, PsValue, PsrpError};

    pub fn required<'a>(obj: &'a ComplexObject, name: &str) -> Result<&'a PsValue, PsrpError> {
        obj.property(name)
            .ok_or_else(|| PsrpError::InvalidMessage(format!("missing property: {name}")))
    }

    pub fn required_str(obj: &ComplexObject, name: &str) -> Result<String, PsrpError> {
        match required(obj, name)? {
            PsValue::Primitive(PsPrimitiveValue::Str(s)) => Ok(s.to_string_lossy()),
            other => Err(PsrpError::InvalidMessage(format!(
                "{name} must be a string, got {other:?}"
            ))),
        }
    }

    pub fn required_version(obj: &ComplexObject, name: &str) -> Result<String, PsrpError> {
        match required(obj, name)? {
            PsValue::Primitive(PsPrimitiveValue::Version(v)) => Ok(v.clone()),
            // PowerShell is loose here; accept a plain string too
            PsValue::Primitive(PsPrimitiveValue::Str(s)) => Ok(s.to_string_lossy()),
            other => Err(PsrpError::InvalidMessage(format!(
                "{name} must be a version, got {other:?}"
            ))),
        }
    }

    pub fn required_bool(obj: &ComplexObject, name: &str) -> Result<bool, PsrpError> {
        required(obj, name)?.as_bool().ok_or_else(|| {
            PsrpError::InvalidMessage(format!("{name} must be a bool"))
        })
    }

    pub fn required_i32(obj: &ComplexObject, name: &str) -> Result<i32, PsrpError> {
        match required(obj, name)? {
            PsValue::Primitive(PsPrimitiveValue::I32(v)) => Ok(*v),
            other => other
                .as_integer()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| PsrpError::InvalidMessage(format!("{name} must be an I32"))),
        }
    }

    pub fn required_i64(obj: &ComplexObject, name: &str) -> Result<i64, PsrpError> {
        required(obj, name)?.as_integer().ok_or_else(|| {
            PsrpError::InvalidMessage(format!("{name} must be an integer"))
        })
    }

    /// The numeric payload of an enum-shaped property, tolerating both a
    /// real enum object and a bare integer.
    pub fn required_enum(obj: &ComplexObject, name: &str) -> Result<i64, PsrpError> {
        required(obj, name)?.as_integer().ok_or_else(|| {
            PsrpError::InvalidMessage(format!("{name} must be an enum value"))
        })
    }

    pub fn expect_object(value: PsValue, what: &'static str) -> Result<ComplexObject, PsrpError> {
        match value {
            PsValue::Object(obj) => Ok(obj),
            other => Err(PsrpError::InvalidMessage(format!(
                "expected {what} as a complex object, got {other:?}"
            ))),
        }
    }
}
