use super::{CommandParameter, PipelineResultTypes};
use crate::ps_value::{
    ComplexObject, ComplexObjectContent, Container, PsType, PsValue,
};

use crate::messages::decode;

/// One command in a pipeline: its text, how to interpret it, its
/// arguments, and the merge policy for each result stream.
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct Command {
    #[builder(setter(into))]
    pub cmd: String,
    #[builder(default = false)]
    pub is_script: bool,
    #[builder(default)]
    pub args: Vec<CommandParameter>,
    #[builder(default)]
    pub use_local_scope: Option<bool>,
    #[builder(default)]
    pub merge_my_result: PipelineResultTypes,
    #[builder(default)]
    pub merge_to_result: PipelineResultTypes,
    #[builder(default)]
    pub merge_previous_results: PipelineResultTypes,
    #[builder(default)]
    pub merge_error: PipelineResultTypes,
    #[builder(default)]
    pub merge_warning: PipelineResultTypes,
    #[builder(default)]
    pub merge_verbose: PipelineResultTypes,
    #[builder(default)]
    pub merge_debug: PipelineResultTypes,
    #[builder(default)]
    pub merge_information: PipelineResultTypes,
}

impl Command {
    pub fn script(text: impl Into<String>) -> Self {
        Self::builder().cmd(text).is_script(true).build()
    }

    pub fn cmdlet(name: impl Into<String>) -> Self {
        Self::builder().cmd(name).build()
    }

    pub fn with_parameter(mut self, param: CommandParameter) -> Self {
        self.args.push(param);
        self
    }

    /// Per-stream merge policy, indexed the way the server applies it.
    pub fn merge_for_stream(&self, stream: MergeStream) -> PipelineResultTypes {
        match stream {
            MergeStream::Error => self.merge_error,
            MergeStream::Warning => self.merge_warning,
            MergeStream::Verbose => self.merge_verbose,
            MergeStream::Debug => self.merge_debug,
            MergeStream::Information => self.merge_information,
        }
    }
}

/// The five mergeable record streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStream {
    Error,
    Warning,
    Verbose,
    Debug,
    Information,
}

impl From<Command> for ComplexObject {
    fn from(command: Command) -> Self {
        let mut obj = Self::new();
        obj.insert_extended("Cmd", command.cmd.clone());
        obj.insert_extended("IsScript", command.is_script);

        let args: Vec<PsValue> = command
            .args
            .into_iter()
            .map(|param| PsValue::Object(param.into()))
            .collect();
        obj.insert_extended(
            "Args",
            PsValue::Object(Self {
                type_def: Some(PsType::array_list()),
                content: ComplexObjectContent::Container(Container::List(args)),
                ..Self::default()
            }),
        );

        obj.insert_extended(
            "UseLocalScope",
            match command.use_local_scope {
                Some(flag) => PsValue::from(flag),
                None => PsValue::NULL,
            },
        );

        obj.insert_extended(
            "MergeMyResult",
            PsValue::Object(command.merge_my_result.into()),
        );
        obj.insert_extended(
            "MergeToResult",
            PsValue::Object(command.merge_to_result.into()),
        );
        obj.insert_extended(
            "MergePreviousResults",
            PsValue::Object(command.merge_previous_results.into()),
        );
        obj.insert_extended("MergeError", PsValue::Object(command.merge_error.into()));
        obj.insert_extended(
            "MergeWarning",
            PsValue::Object(command.merge_warning.into()),
        );
        obj.insert_extended(
            "MergeVerbose",
            PsValue::Object(command.merge_verbose.into()),
        );
        obj.insert_extended("MergeDebug", PsValue::Object(command.merge_debug.into()));
        obj.insert_extended(
            "MergeInformation",
            PsValue::Object(command.merge_information.into()),
        );
        obj
    }
}

impl TryFrom<ComplexObject> for Command {
    type Error = crate::PsrpError;

    fn try_from(value: ComplexObject) -> Result<Self, <Self as TryFrom<ComplexObject>>::Error> {
        let merge = |name: &str| -> Result<PipelineResultTypes, crate::PsrpError> {
            match value.property(name) {
                Some(v) => v
                    .as_integer()
                    .map_or(Ok(PipelineResultTypes::None), PipelineResultTypes::try_from),
                None => Ok(PipelineResultTypes::None),
            }
        };

        let args = value
            .property("Args")
            .and_then(PsValue::iter_collection)
            .map(|iter| {
                iter.filter_map(PsValue::as_object)
                    .map(|obj| CommandParameter::try_from(obj.clone()))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            cmd: decode::required_str(&value, "Cmd")?,
            is_script: decode::required_bool(&value, "IsScript")?,
            args,
            use_local_scope: value.property("UseLocalScope").and_then(PsValue::as_bool),
            merge_my_result: merge("MergeMyResult")?,
            merge_to_result: merge("MergeToResult")?,
            merge_previous_results: merge("MergePreviousResults")?,
            merge_error: merge("MergeError")?,
            merge_warning: merge("MergeWarning")?,
            merge_verbose: merge("MergeVerbose")?,
            merge_debug: merge("MergeDebug")?,
            merge_information: merge("MergeInformation")?,
        })
    }
}
