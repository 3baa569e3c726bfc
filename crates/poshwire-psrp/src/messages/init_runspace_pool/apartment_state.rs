use crate::ps_value::{ComplexObject, ComplexObjectContent, PsEnum, PsType};

/// COM apartment state requested for the pool's threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApartmentState {
    Sta = 0,
    Mta = 1,
    #[default]
    Unknown = 2,
}

impl ApartmentState {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i64> for ApartmentState {
    type Error = crate::PsrpError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Sta),
            1 => Ok(Self::Mta),
            2 => Ok(Self::Unknown),
            _ => Err(crate::PsrpError::InvalidMessage(format!(
                "invalid ApartmentState value: {value}"
            ))),
        }
    }
}

impl From<ApartmentState> for ComplexObject {
    fn from(state: ApartmentState) -> Self {
        Self {
            type_def: Some(PsType::enum_type("System.Threading.ApartmentState")),
            to_string: None,
            content: ComplexObjectContent::Enum(PsEnum::new(i64::from(state.as_i32()))),
            ..Self::default()
        }
    }
}
