use crate::MessageType;
use crate::ps_value::{ComplexObject, PsValue};

use super::{PsObjectWithType, decode};

/// Pool states as they appear on the wire.
///
/// https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-psrp/b05495bc-a9b2-4794-9f43-4bf1f3633900
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum RunspacePoolStateValue {
    BeforeOpen = 0,
    Opening = 1,
    Opened = 2,
    Closed = 3,
    Closing = 4,
    Broken = 5,
    NegotiationSent = 6,
    NegotiationSucceeded = 7,
    Connecting = 8,
    Disconnected = 9,
}

impl RunspacePoolStateValue {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i64> for RunspacePoolStateValue {
    type Error = crate::PsrpError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::BeforeOpen),
            1 => Ok(Self::Opening),
            2 => Ok(Self::Opened),
            3 => Ok(Self::Closed),
            4 => Ok(Self::Closing),
            5 => Ok(Self::Broken),
            6 => Ok(Self::NegotiationSent),
            7 => Ok(Self::NegotiationSucceeded),
            8 => Ok(Self::Connecting),
            9 => Ok(Self::Disconnected),
            _ => Err(crate::PsrpError::InvalidMessage(format!(
                "invalid RunspacePoolState value: {value}"
            ))),
        }
    }
}

/// RUNSPACEPOOL_STATE: the server announcing a pool state transition,
/// with an error record when the pool broke.
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct RunspacePoolStateMessage {
    pub runspace_state: RunspacePoolStateValue,
    #[builder(default)]
    pub exception_as_error_record: Option<PsValue>,
}

impl RunspacePoolStateMessage {
    pub fn opened() -> Self {
        Self::builder()
            .runspace_state(RunspacePoolStateValue::Opened)
            .build()
    }

    pub fn closed() -> Self {
        Self::builder()
            .runspace_state(RunspacePoolStateValue::Closed)
            .build()
    }

    pub fn broken(error_record: PsValue) -> Self {
        Self::builder()
            .runspace_state(RunspacePoolStateValue::Broken)
            .exception_as_error_record(Some(error_record))
            .build()
    }
}

impl PsObjectWithType for RunspacePoolStateMessage {
    fn message_type(&self) -> MessageType {
        MessageType::RunspacePoolState
    }

    fn to_ps_object(&self) -> PsValue {
        PsValue::Object(ComplexObject::from(self.clone()))
    }
}

impl From<RunspacePoolStateMessage> for ComplexObject {
    fn from(state: RunspacePoolStateMessage) -> Self {
        let mut obj = Self::new();
        obj.insert_extended("RunspaceState", state.runspace_state.as_i32());
        if let Some(exception) = state.exception_as_error_record {
            obj.insert_extended("ExceptionAsErrorRecord", exception);
        }
        obj
    }
}

impl TryFrom<ComplexObject> for RunspacePoolStateMessage {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        Ok(Self {
            runspace_state: RunspacePoolStateValue::try_from(decode::required_i64(
                &value,
                "RunspaceState",
            )?)?,
            exception_as_error_record: value.property("ExceptionAsErrorRecord").cloned(),
        })
    }
}
