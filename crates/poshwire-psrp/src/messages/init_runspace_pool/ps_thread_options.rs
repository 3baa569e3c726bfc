use crate::ps_value::{ComplexObject, ComplexObjectContent, PsEnum, PsType};

/// How the server assigns threads to pipeline invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PsThreadOptions {
    #[default]
    Default = 0,
    UseNewThread = 1,
    ReuseThread = 2,
    UseCurrentThread = 3,
}

impl PsThreadOptions {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i64> for PsThreadOptions {
    type Error = crate::PsrpError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Default),
            1 => Ok(Self::UseNewThread),
            2 => Ok(Self::ReuseThread),
            3 => Ok(Self::UseCurrentThread),
            _ => Err(crate::PsrpError::InvalidMessage(format!(
                "invalid PSThreadOptions value: {value}"
            ))),
        }
    }
}

impl From<PsThreadOptions> for ComplexObject {
    fn from(options: PsThreadOptions) -> Self {
        Self {
            type_def: Some(PsType::enum_type(
                "System.Management.Automation.Runspaces.PSThreadOptions",
            )),
            to_string: None,
            content: ComplexObjectContent::Enum(PsEnum::new(i64::from(options.as_i32()))),
            ..Self::default()
        }
    }
}
