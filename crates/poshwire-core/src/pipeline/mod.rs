//! Per-pipeline bookkeeping. A pipeline is owned by exactly one pool and
//! addressed through a copyable [`PipelineHandle`].

use std::collections::HashSet;

use uuid::Uuid;

pub use poshwire_psrp::PsInvocationState;

use poshwire_psrp::{Command, CreatePipeline, MergeStream, PipelineResultTypes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineHandle {
    pub(crate) id: Uuid,
}

impl PipelineHandle {
    /// Wraps a pipeline id received out of band (e.g. from a
    /// `PipelineCreated` event).
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// Client-side pipeline record.
#[derive(Debug)]
pub(crate) struct ClientPipeline {
    pub state: PsInvocationState,
    /// Held until `start()` sends it.
    pub request: Option<CreatePipeline>,
    pub no_input: bool,
    pub input_closed: bool,
    /// Host-call ids awaiting a response from the embedding host.
    pub open_host_calls: HashSet<i64>,
}

impl ClientPipeline {
    pub fn new(request: CreatePipeline) -> Self {
        let no_input = request.no_input;
        Self {
            state: PsInvocationState::NotStarted,
            request: Some(request),
            no_input,
            input_closed: false,
            open_host_calls: HashSet::new(),
        }
    }

    /// A pipeline that went on the wire without CREATE_PIPELINE
    /// (GET_COMMAND_METADATA requests).
    pub fn started_without_request() -> Self {
        Self {
            state: PsInvocationState::Running,
            request: None,
            no_input: true,
            input_closed: true,
            open_host_calls: HashSet::new(),
        }
    }
}

/// Server-side pipeline record.
#[derive(Debug)]
pub(crate) struct ServerPipeline {
    pub state: PsInvocationState,
    pub no_input: bool,
    pub input_closed: bool,
    /// Commands as created, for stream-merge policy.
    pub commands: Vec<Command>,
}

impl ServerPipeline {
    pub fn new(request: &CreatePipeline) -> Self {
        Self {
            state: PsInvocationState::Running,
            no_input: request.no_input,
            input_closed: request.no_input,
            commands: request.pipeline.cmds.clone(),
        }
    }

    /// The pseudo-pipeline backing a GET_COMMAND_METADATA request.
    pub fn metadata() -> Self {
        Self {
            state: PsInvocationState::Running,
            no_input: true,
            input_closed: true,
            commands: Vec::new(),
        }
    }

    /// The merge policy applied to a record stream: the last command in
    /// the chain decides where its records land.
    pub fn merge_target(&self, stream: MergeStream) -> PipelineResultTypes {
        self.commands
            .last()
            .map_or(PipelineResultTypes::None, |cmd| cmd.merge_for_stream(stream))
    }
}
