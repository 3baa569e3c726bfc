//! Events drained from a pool with `next_event()`.
//!
//! The core never calls back into the embedding application: decode
//! routines push onto an internal queue and the caller pulls between
//! transport reads.

use uuid::Uuid;

use poshwire_psrp::{
    ApplicationPrivateData, CreatePipeline, ErrorRecord, GetCommandMetadata, HostMethodCall,
    HostMethodResponse, InformationRecord, InformationalRecord, ProgressRecord, PsInvocationState,
    PsValue, SessionCapability, UserEvent,
};

use crate::runspace_pool::RunspacePoolState;

/// Where a host call (or its response) is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCallScope {
    Pool,
    Pipeline(Uuid),
}

/// An out-of-band record from one of the non-output streams.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamRecord {
    /// Debug, verbose, or warning text (the kind rides inside).
    Informational(InformationalRecord),
    Progress(ProgressRecord),
    Information(InformationRecord),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PoolEvent {
    /// Peer capabilities arrived and passed the version check.
    NegotiationSucceeded { capability: SessionCapability },
    /// The pool reached `Opened`.
    PoolOpened,
    PoolClosed,
    PoolBroken { reason: String },
    /// Any other pool state announcement.
    PoolStateChanged { state: RunspacePoolState },
    ApplicationPrivateDataReceived { data: ApplicationPrivateData },
    /// A session key is installed; secure strings may now flow.
    KeyExchanged,
    /// RUNSPACE_AVAILABILITY answering a min/max/get request.
    AvailabilityResponse { call_id: i64, response: PsValue },
    /// Server side: the client adjusted the runspace limits.
    RunspacesAdjusted { min_runspaces: i32, max_runspaces: i32 },
    UserEventReceived { event: UserEvent },
    /// The peer's host wants something done; answer with
    /// `host_response` quoting the call id.
    HostCall {
        scope: HostCallScope,
        call: HostMethodCall,
    },
    /// Server side: the client answered a host call.
    HostResponseReceived {
        scope: HostCallScope,
        response: HostMethodResponse,
    },
    /// Server side: CREATE_PIPELINE arrived and a pipeline now runs.
    PipelineCreated {
        pipeline_id: Uuid,
        request: CreatePipeline,
    },
    PipelineOutput {
        pipeline_id: Uuid,
        value: PsValue,
    },
    PipelineErrorRecord {
        pipeline_id: Uuid,
        record: ErrorRecord,
    },
    PipelineStreamRecord {
        pipeline_id: Uuid,
        record: StreamRecord,
    },
    /// Server side: one PIPELINE_INPUT object.
    PipelineInputReceived {
        pipeline_id: Uuid,
        value: PsValue,
    },
    /// Server side: END_OF_PIPELINE_INPUT.
    PipelineInputClosed { pipeline_id: Uuid },
    PipelineStateChanged {
        pipeline_id: Uuid,
        state: PsInvocationState,
        error: Option<PsValue>,
    },
    /// Client side: `stop()` was requested; the transport must deliver
    /// its out-of-band interrupt signal (no PSRP bytes are produced).
    StopRequested { pipeline_id: Uuid },
    /// Server side: GET_COMMAND_METADATA request for the host to answer.
    CommandMetadataRequested {
        pipeline_id: Uuid,
        request: GetCommandMetadata,
    },
    /// Server side: RESET_RUNSPACE_STATE request.
    RunspaceStateResetRequested { call_id: i64 },
    /// A message type this implementation has no handler for.
    UnknownMessage { message_type: u32, body: PsValue },
    /// A message was dropped; the pool carries on.
    ProtocolError { description: String },
}
