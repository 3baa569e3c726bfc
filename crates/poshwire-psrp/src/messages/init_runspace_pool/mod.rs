pub mod apartment_state;
pub mod host_info;
pub mod ps_thread_options;

pub use apartment_state::ApartmentState;
pub use host_info::{Coordinates, HostDefaultData, HostInfo, Size};
pub use ps_thread_options::PsThreadOptions;

use crate::MessageType;
use crate::ps_value::{ComplexObject, ComplexObjectContent, Container, PsType, PsValue};

use super::{PsObjectWithType, decode};

/// Caller-supplied data made available to the server session, carried as
/// a PSPrimitiveDictionary (or Nil when empty).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApplicationArguments {
    pub entries: Vec<(PsValue, PsValue)>,
}

impl ApplicationArguments {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<PsValue>, value: impl Into<PsValue>) {
        self.entries.push((key.into(), value.into()));
    }

    fn to_ps_value(&self) -> PsValue {
        if self.entries.is_empty() {
            return PsValue::NULL;
        }
        PsValue::Object(ComplexObject {
            type_def: Some(PsType::ps_primitive_dictionary()),
            content: ComplexObjectContent::Container(Container::Dictionary(self.entries.clone())),
            ..ComplexObject::default()
        })
    }

    fn from_ps_value(value: &PsValue) -> Self {
        match value.as_object().and_then(ComplexObject::container) {
            Some(Container::Dictionary(entries)) => Self {
                entries: entries.clone(),
            },
            _ => Self::default(),
        }
    }
}

/// INIT_RUNSPACEPOOL: the pool configuration the client opens with.
///
/// https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-psrp/c867589a-0b43-47ab-9c5b-dc9b9bdd9b3a
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct InitRunspacePool {
    #[builder(default = 1)]
    pub min_runspaces: i32,
    #[builder(default = 1)]
    pub max_runspaces: i32,
    #[builder(default)]
    pub thread_options: PsThreadOptions,
    #[builder(default)]
    pub apartment_state: ApartmentState,
    #[builder(default)]
    pub host_info: HostInfo,
    #[builder(default)]
    pub application_arguments: ApplicationArguments,
}

impl PsObjectWithType for InitRunspacePool {
    fn message_type(&self) -> MessageType {
        MessageType::InitRunspacePool
    }

    fn to_ps_object(&self) -> PsValue {
        PsValue::Object(ComplexObject::from(self.clone()))
    }
}

impl From<InitRunspacePool> for ComplexObject {
    fn from(init: InitRunspacePool) -> Self {
        let mut obj = Self::new();
        obj.insert_extended("MinRunspaces", init.min_runspaces);
        obj.insert_extended("MaxRunspaces", init.max_runspaces);
        obj.insert_extended(
            "PSThreadOptions",
            PsValue::Object(init.thread_options.into()),
        );
        obj.insert_extended(
            "ApartmentState",
            PsValue::Object(init.apartment_state.into()),
        );
        obj.insert_extended("HostInfo", PsValue::Object(init.host_info.into()));
        obj.insert_extended(
            "ApplicationArguments",
            init.application_arguments.to_ps_value(),
        );
        obj
    }
}

impl TryFrom<ComplexObject> for InitRunspacePool {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        let host_info = match decode::required(&value, "HostInfo")? {
            PsValue::Object(obj) => HostInfo::try_from(obj.clone())?,
            _ => HostInfo::default(),
        };

        Ok(Self {
            min_runspaces: decode::required_i32(&value, "MinRunspaces")?,
            max_runspaces: decode::required_i32(&value, "MaxRunspaces")?,
            thread_options: PsThreadOptions::try_from(decode::required_enum(
                &value,
                "PSThreadOptions",
            )?)?,
            apartment_state: ApartmentState::try_from(decode::required_enum(
                &value,
                "ApartmentState",
            )?)?,
            host_info,
            application_arguments: ApplicationArguments::from_ps_value(decode::required(
                &value,
                "ApplicationArguments",
            )?),
        })
    }
}
