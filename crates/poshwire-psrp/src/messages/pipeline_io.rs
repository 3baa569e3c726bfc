//! Pipeline data plane: PIPELINE_INPUT, END_OF_PIPELINE_INPUT, and
//! PIPELINE_OUTPUT. All three bodies are a bare serialized value (or
//! nothing at all for the end-of-input marker).

use crate::MessageType;
use crate::ps_value::PsValue;

use super::PsObjectWithType;

/// One input object streamed into a running pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineInput {
    pub value: PsValue,
}

impl From<PsValue> for PipelineInput {
    fn from(value: PsValue) -> Self {
        Self { value }
    }
}

impl PsObjectWithType for PipelineInput {
    fn message_type(&self) -> MessageType {
        MessageType::PipelineInput
    }

    fn to_ps_object(&self) -> PsValue {
        self.value.clone()
    }
}

/// Marks the input stream closed. The body is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndOfPipelineInput;

impl PsObjectWithType for EndOfPipelineInput {
    fn message_type(&self) -> MessageType {
        MessageType::EndOfPipelineInput
    }

    fn to_ps_object(&self) -> PsValue {
        PsValue::NULL
    }
}

/// One object produced by the pipeline's output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    pub value: PsValue,
}

impl From<PsValue> for PipelineOutput {
    fn from(value: PsValue) -> Self {
        Self { value }
    }
}

impl PipelineOutput {
    /// Flattened display text, the way `Out-String` would show it.
    pub fn display_text(&self) -> String {
        self.value.to_string()
    }
}

impl PsObjectWithType for PipelineOutput {
    fn message_type(&self) -> MessageType {
        MessageType::PipelineOutput
    }

    fn to_ps_object(&self) -> PsValue {
        self.value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_values() {
        assert_eq!(
            PipelineInput::from(PsValue::from(1)).message_type().value(),
            0x00041002
        );
        assert_eq!(EndOfPipelineInput.message_type().value(), 0x00041003);
        assert_eq!(
            PipelineOutput::from(PsValue::from(1)).message_type().value(),
            0x00041004
        );
    }

    #[test]
    fn output_display_text() {
        let output = PipelineOutput::from(PsValue::from("hello"));
        assert_eq!(output.display_text(), "hello");
    }
}
