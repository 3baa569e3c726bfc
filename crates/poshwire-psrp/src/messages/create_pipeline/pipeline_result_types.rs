use crate::ps_value::{ComplexObject, ComplexObjectContent, PsEnum, PsType};

/// Stream-merge targets for a command's result streams.
///
/// https://learn.microsoft.com/en-us/dotnet/api/system.management.automation.runspaces.pipelineresulttypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum PipelineResultTypes {
    #[default]
    None = 0,
    Output = 1,
    Error = 2,
    Warning = 3,
    Verbose = 4,
    Debug = 5,
    Information = 6,
    All = 7,
    Null = 8,
}

impl PipelineResultTypes {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Output => "Output",
            Self::Error => "Error",
            Self::Warning => "Warning",
            Self::Verbose => "Verbose",
            Self::Debug => "Debug",
            Self::Information => "Information",
            Self::All => "All",
            Self::Null => "Null",
        }
    }
}

impl TryFrom<i64> for PipelineResultTypes {
    type Error = crate::PsrpError;

    fn try_from(value: i64) -> Result<Self, <Self as TryFrom<i64>>::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Output),
            2 => Ok(Self::Error),
            3 => Ok(Self::Warning),
            4 => Ok(Self::Verbose),
            5 => Ok(Self::Debug),
            6 => Ok(Self::Information),
            7 => Ok(Self::All),
            8 => Ok(Self::Null),
            _ => Err(crate::PsrpError::InvalidMessage(format!(
                "invalid PipelineResultTypes value: {value}"
            ))),
        }
    }
}

impl From<PipelineResultTypes> for ComplexObject {
    fn from(value: PipelineResultTypes) -> Self {
        Self {
            type_def: Some(PsType::pipeline_result_types()),
            to_string: Some(value.name().to_string()),
            content: ComplexObjectContent::Enum(PsEnum::new(i64::from(value.as_i32()))),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_string_matches_value() {
        let obj = ComplexObject::from(PipelineResultTypes::Error);
        assert_eq!(obj.to_string.as_deref(), Some("Error"));
        assert_eq!(obj.as_enum().unwrap().value, 2);
    }

    #[test]
    fn try_from_rejects_out_of_range() {
        assert!(PipelineResultTypes::try_from(9).is_err());
        assert_eq!(
            PipelineResultTypes::try_from(4).unwrap(),
            PipelineResultTypes::Verbose
        );
    }
}
