pub mod command;
pub mod command_parameter;
pub mod pipeline_result_types;

pub use command::{Command, MergeStream};
pub use command_parameter::CommandParameter;
pub use pipeline_result_types::PipelineResultTypes;

use crate::MessageType;
use crate::ps_value::{
    ComplexObject, ComplexObjectContent, Container, PsType, PsValue,
};

use super::init_runspace_pool::{ApartmentState, HostInfo};
use super::{PsObjectWithType, decode};

/// `RemoteStreamOptions` flags: attach invocation info to the given
/// record streams.
pub mod remote_stream_options {
    pub const NONE: i32 = 0;
    pub const ADD_INVOCATION_INFO_TO_ERROR_RECORD: i32 = 1;
    pub const ADD_INVOCATION_INFO_TO_WARNING_RECORD: i32 = 2;
    pub const ADD_INVOCATION_INFO_TO_DEBUG_RECORD: i32 = 4;
    pub const ADD_INVOCATION_INFO_TO_VERBOSE_RECORD: i32 = 8;
    pub const ADD_INVOCATION_INFO: i32 = 15;
}

/// The ordered command chain inside CREATE_PIPELINE.
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct PowerShellPipeline {
    #[builder(default = false)]
    pub is_nested: bool,
    #[builder(setter(into))]
    pub cmds: Vec<Command>,
    #[builder(default, setter(into))]
    pub history: String,
    #[builder(default = false)]
    pub redirect_shell_error_output_pipe: bool,
}

impl From<PowerShellPipeline> for ComplexObject {
    fn from(pipeline: PowerShellPipeline) -> Self {
        let mut obj = Self::new();
        obj.insert_extended("IsNested", pipeline.is_nested);

        let cmds: Vec<PsValue> = pipeline
            .cmds
            .into_iter()
            .map(|cmd| PsValue::Object(Self::from(cmd)))
            .collect();
        obj.insert_extended(
            "Cmds",
            PsValue::Object(Self {
                type_def: Some(PsType::array_list()),
                content: ComplexObjectContent::Container(Container::List(cmds)),
                ..Self::default()
            }),
        );

        obj.insert_extended(
            "History",
            if pipeline.history.is_empty() {
                PsValue::NULL
            } else {
                PsValue::from(pipeline.history)
            },
        );
        obj.insert_extended(
            "RedirectShellErrorOutputPipe",
            pipeline.redirect_shell_error_output_pipe,
        );
        obj
    }
}

impl TryFrom<ComplexObject> for PowerShellPipeline {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        let cmds = value
            .property("Cmds")
            .and_then(PsValue::iter_collection)
            .map(|iter| {
                iter.filter_map(PsValue::as_object)
                    .map(|obj| Command::try_from(obj.clone()))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .ok_or_else(|| {
                crate::PsrpError::InvalidMessage("Cmds must be a list".to_string())
            })?;

        Ok(Self {
            is_nested: decode::required_bool(&value, "IsNested")?,
            cmds,
            history: value
                .property("History")
                .and_then(PsValue::as_string)
                .unwrap_or_default(),
            redirect_shell_error_output_pipe: value
                .property("RedirectShellErrorOutputPipe")
                .and_then(PsValue::as_bool)
                .unwrap_or(false),
        })
    }
}

/// CREATE_PIPELINE: client → server request to run a command chain.
///
/// https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-psrp/2cf8cccb-4e26-4c80-8e41-54a8f5bf2a1a
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct CreatePipeline {
    #[builder(default = true)]
    pub no_input: bool,
    #[builder(default)]
    pub apartment_state: ApartmentState,
    #[builder(default = remote_stream_options::NONE)]
    pub remote_stream_options: i32,
    #[builder(default = false)]
    pub add_to_history: bool,
    #[builder(default)]
    pub host_info: HostInfo,
    pub pipeline: PowerShellPipeline,
    #[builder(default = false)]
    pub is_nested: bool,
}

impl PsObjectWithType for CreatePipeline {
    fn message_type(&self) -> MessageType {
        MessageType::CreatePipeline
    }

    fn to_ps_object(&self) -> PsValue {
        PsValue::Object(ComplexObject::from(self.clone()))
    }
}

impl From<CreatePipeline> for ComplexObject {
    fn from(create: CreatePipeline) -> Self {
        let mut obj = Self::new();
        obj.insert_extended("NoInput", create.no_input);
        obj.insert_extended(
            "ApartmentState",
            PsValue::Object(create.apartment_state.into()),
        );
        obj.insert_extended(
            "RemoteStreamOptions",
            PsValue::Object(Self {
                type_def: Some(PsType::enum_type(
                    "System.Management.Automation.RemoteStreamOptions",
                )),
                content: ComplexObjectContent::Enum(crate::ps_value::PsEnum::new(i64::from(
                    create.remote_stream_options,
                ))),
                ..Self::default()
            }),
        );
        obj.insert_extended("AddToHistory", create.add_to_history);
        obj.insert_extended("HostInfo", PsValue::Object(create.host_info.into()));
        obj.insert_extended("PowerShell", PsValue::Object(create.pipeline.into()));
        obj.insert_extended("IsNested", create.is_nested);
        obj
    }
}

impl TryFrom<ComplexObject> for CreatePipeline {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, Self::Error> {
        let pipeline = match decode::required(&value, "PowerShell")? {
            PsValue::Object(obj) => PowerShellPipeline::try_from(obj.clone())?,
            other => {
                return Err(crate::PsrpError::InvalidMessage(format!(
                    "PowerShell must be an object, got {other:?}"
                )));
            }
        };
        let host_info = match value.property("HostInfo") {
            Some(PsValue::Object(obj)) => HostInfo::try_from(obj.clone())?,
            _ => HostInfo::default(),
        };

        Ok(Self {
            no_input: decode::required_bool(&value, "NoInput")?,
            apartment_state: ApartmentState::try_from(decode::required_enum(
                &value,
                "ApartmentState",
            )?)?,
            remote_stream_options: decode::required_enum(&value, "RemoteStreamOptions")? as i32,
            add_to_history: value
                .property("AddToHistory")
                .and_then(PsValue::as_bool)
                .unwrap_or(false),
            host_info,
            pipeline,
            is_nested: value
                .property("IsNested")
                .and_then(PsValue::as_bool)
                .unwrap_or(false),
        })
    }
}
