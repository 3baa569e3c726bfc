use crate::MessageType;
use crate::ps_value::{ComplexObject, PsValue};

use super::{PsObjectWithType, decode};

/// Pipeline invocation states as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum PsInvocationState {
    NotStarted = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
    Completed = 4,
    Failed = 5,
    Disconnected = 6,
}

impl PsInvocationState {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Completed | Self::Failed)
    }
}

impl TryFrom<i64> for PsInvocationState {
    type Error = crate::PsrpError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::NotStarted),
            1 => Ok(Self::Running),
            2 => Ok(Self::Stopping),
            3 => Ok(Self::Stopped),
            4 => Ok(Self::Completed),
            5 => Ok(Self::Failed),
            6 => Ok(Self::Disconnected),
            _ => Err(crate::PsrpError::InvalidMessage(format!(
                "invalid PSInvocationState value: {value}"
            ))),
        }
    }
}

/// PIPELINE_STATE: the server announcing a pipeline transition, with the
/// terminating error when there is one.
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct PipelineStateMessage {
    pub pipeline_state: PsInvocationState,
    #[builder(default)]
    pub exception_as_error_record: Option<PsValue>,
}

impl PipelineStateMessage {
    pub fn running() -> Self {
        Self::builder()
            .pipeline_state(PsInvocationState::Running)
            .build()
    }

    pub fn completed() -> Self {
        Self::builder()
            .pipeline_state(PsInvocationState::Completed)
            .build()
    }

    pub fn stopped() -> Self {
        Self::builder()
            .pipeline_state(PsInvocationState::Stopped)
            .build()
    }

    pub fn failed(error_record: PsValue) -> Self {
        Self::builder()
            .pipeline_state(PsInvocationState::Failed)
            .exception_as_error_record(Some(error_record))
            .build()
    }

    pub fn is_terminal(&self) -> bool {
        self.pipeline_state.is_terminal()
    }
}

impl PsObjectWithType for PipelineStateMessage {
    fn message_type(&self) -> MessageType {
        MessageType::PipelineState
    }

    fn to_ps_object(&self) -> PsValue {
        PsValue::Object(ComplexObject::from(self.clone()))
    }
}

impl From<PipelineStateMessage> for ComplexObject {
    fn from(state: PipelineStateMessage) -> Self {
        let mut obj = Self::new();
        obj.insert_extended("PipelineState", state.pipeline_state.as_i32());
        if let Some(exception) = state.exception_as_error_record {
            obj.insert_extended("ExceptionAsErrorRecord", exception);
        }
        obj
    }
}

impl TryFrom<ComplexObject> for PipelineStateMessage {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        Ok(Self {
            pipeline_state: PsInvocationState::try_from(decode::required_i64(
                &value,
                "PipelineState",
            )?)?,
            exception_as_error_record: value.property("ExceptionAsErrorRecord").cloned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_round_trip() {
        let state = PipelineStateMessage::completed();
        let obj = ComplexObject::from(state.clone());
        assert_eq!(PipelineStateMessage::try_from(obj).unwrap(), state);
        assert!(state.is_terminal());
    }

    #[test]
    fn failed_round_trip_keeps_error() {
        let state = PipelineStateMessage::failed(PsValue::from("Test error"));
        let parsed = PipelineStateMessage::try_from(ComplexObject::from(state.clone())).unwrap();
        assert_eq!(parsed, state);
        assert_eq!(parsed.pipeline_state, PsInvocationState::Failed);
    }

    #[test]
    fn terminal_states() {
        assert!(!PsInvocationState::NotStarted.is_terminal());
        assert!(!PsInvocationState::Running.is_terminal());
        assert!(!PsInvocationState::Stopping.is_terminal());
        assert!(PsInvocationState::Stopped.is_terminal());
        assert!(PsInvocationState::Completed.is_terminal());
        assert!(PsInvocationState::Failed.is_terminal());
        assert!(!PsInvocationState::Disconnected.is_terminal());
    }

    #[test]
    fn message_type_value() {
        assert_eq!(
            PipelineStateMessage::completed().message_type().value(),
            0x00041006
        );
    }
}
