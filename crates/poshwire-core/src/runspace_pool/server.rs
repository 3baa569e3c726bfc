//! Server side of a runspace pool.
//!
//! The embedding host owns command execution: CREATE_PIPELINE and input
//! surface as events, and the host pushes results back through the
//! `write_*` / `complete` methods, which this machine turns into PSRP
//! messages for the transport.

use std::collections::HashMap;

use tracing::{debug, info, warn};
use uuid::Uuid;

use poshwire_psrp::{
    ComplexObject, ConnectRunspacePool, CreatePipeline, DefragmentResult, Destination,
    EncryptedSessionKey, ErrorRecord, GetAvailableRunspaces, GetCommandMetadata, HostMethodCall,
    InformationRecord, InformationalRecord, MergeStream, MessageType, PipelineHostCall,
    PipelineHostResponse, PipelineOutput, PipelineResultTypes, PipelineStateMessage,
    ProgressRecord, PsInvocationState, PsObjectWithType, PsValue, PsrpError, PublicKey,
    PublicKeyRequest, RemotingMessage, ResetRunspaceState, RunspaceAvailability,
    RunspacePoolHostCall, RunspacePoolHostResponse, RunspacePoolInitData,
    RunspacePoolStateMessage, SessionCapability, SetMaxRunspaces, SetMinRunspaces,
};

use crate::events::{HostCallScope, PoolEvent, StreamRecord};
use crate::keyx::{generate_session_key, parse_public_key_blob, wrap_session_key};
use crate::pipeline::{PipelineHandle, ServerPipeline};
use crate::PoolError;

use super::{check_peer_capability, own_capability, PoolCore, RunspacePoolState, ServerPoolConfig};

#[derive(Debug)]
pub struct ServerRunspacePool {
    /// Learned from the first inbound message header.
    id: Option<Uuid>,
    state: RunspacePoolState,
    config: ServerPoolConfig,
    core: PoolCore,
    client_capability: Option<SessionCapability>,
    min_runspaces: i32,
    max_runspaces: i32,
    pipelines: HashMap<Uuid, ServerPipeline>,
    next_call_id: i64,
    open_host_calls: HashMap<i64, HostCallScope>,
}

impl ServerRunspacePool {
    pub fn new(config: ServerPoolConfig) -> Self {
        let core = PoolCore::new(
            Destination::Client,
            config.max_fragment_size,
            config.type_registry.clone(),
        );
        Self {
            id: None,
            state: RunspacePoolState::BeforeOpen,
            config,
            core,
            client_capability: None,
            min_runspaces: 1,
            max_runspaces: 1,
            pipelines: HashMap::new(),
            next_call_id: 1,
            open_host_calls: HashMap::new(),
        }
    }

    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn state(&self) -> RunspacePoolState {
        self.state
    }

    pub fn min_runspaces(&self) -> i32 {
        self.min_runspaces
    }

    pub fn max_runspaces(&self) -> i32 {
        self.max_runspaces
    }

    pub fn client_capability(&self) -> Option<&SessionCapability> {
        self.client_capability.as_ref()
    }

    pub fn pipeline_state(&self, handle: &PipelineHandle) -> Option<PsInvocationState> {
        self.pipelines.get(&handle.id).map(|p| p.state)
    }

    pub fn data_to_send(&mut self) -> Vec<u8> {
        self.core.data_to_send()
    }

    pub fn next_event(&mut self) -> Option<PoolEvent> {
        self.core.next_event()
    }

    /// Feeds transport bytes in; mirrors the client's error policy.
    pub fn receive_data(&mut self, bytes: &[u8]) -> Result<(), PoolError> {
        if self.state.is_terminal() {
            return Err(PoolError::InvalidTransition(
                "receive_data() on a terminal pool",
            ));
        }

        let messages = match self.core.defragmenter.defragment(bytes) {
            Ok(DefragmentResult::Incomplete) => return Ok(()),
            Ok(DefragmentResult::Complete(messages)) => messages,
            Err(err) => {
                self.core.push(PoolEvent::ProtocolError {
                    description: err.to_string(),
                });
                return Ok(());
            }
        };

        for message in messages {
            if self.id.is_none() {
                self.id = Some(message.runspace_pool_id);
            }
            if let Err(err) = self.handle_message(&message) {
                match err {
                    PoolError::Psrp(inner) => self.core.push(PoolEvent::ProtocolError {
                        description: inner.to_string(),
                    }),
                    fatal => self.break_pool(&fatal),
                }
            }
        }
        Ok(())
    }

    /// Requests a client key exchange with PUBLIC_KEY_REQUEST.
    pub fn exchange_key(&mut self) -> Result<(), PoolError> {
        if self.state != RunspacePoolState::Opened {
            return Err(PoolError::InvalidTransition(
                "exchange_key() requires an opened pool",
            ));
        }
        let id = self.require_id()?;
        self.core.send(&PublicKeyRequest, id, None)
    }

    /// Invokes a method on the client's host.
    pub fn host_call(
        &mut self,
        scope: HostCallScope,
        method_id: i32,
        method_name: impl Into<String>,
        parameters: Vec<PsValue>,
    ) -> Result<i64, PoolError> {
        let id = self.require_id()?;
        let call_id = self.next_call_id;
        self.next_call_id += 1;

        let call = HostMethodCall::builder()
            .call_id(call_id)
            .method_id(method_id)
            .method_name(method_name)
            .parameters(parameters)
            .build();

        match scope {
            HostCallScope::Pool => {
                self.core.send(&RunspacePoolHostCall(call), id, None)?;
            }
            HostCallScope::Pipeline(pipeline_id) => {
                if !self.pipelines.contains_key(&pipeline_id) {
                    return Err(PoolError::UnknownPipeline(pipeline_id));
                }
                self.core
                    .send(&PipelineHostCall(call), id, Some(pipeline_id))?;
            }
        }
        self.open_host_calls.insert(call_id, scope);
        Ok(call_id)
    }

    /// Emits one output object for a running pipeline.
    pub fn write_output(
        &mut self,
        handle: &PipelineHandle,
        value: PsValue,
    ) -> Result<(), PoolError> {
        let id = self.require_id()?;
        self.require_running(handle)?;
        self.core
            .send(&PipelineOutput::from(value), id, Some(handle.id))
    }

    /// Emits an error record, honouring the pipeline's merge policy: a
    /// stream merged to Output is rewritten as PIPELINE_OUTPUT.
    pub fn write_error(
        &mut self,
        handle: &PipelineHandle,
        record: ErrorRecord,
    ) -> Result<(), PoolError> {
        let id = self.require_id()?;
        let pipeline = self.require_running(handle)?;
        if pipeline.merge_target(MergeStream::Error) == PipelineResultTypes::Output {
            let value = record.to_ps_object();
            return self.core.send(&PipelineOutput::from(value), id, Some(handle.id));
        }
        self.core.send(&record, id, Some(handle.id))
    }

    pub fn write_debug(
        &mut self,
        handle: &PipelineHandle,
        message: impl Into<String>,
    ) -> Result<(), PoolError> {
        self.write_informational(handle, InformationalRecord::debug(message), MergeStream::Debug)
    }

    pub fn write_verbose(
        &mut self,
        handle: &PipelineHandle,
        message: impl Into<String>,
    ) -> Result<(), PoolError> {
        self.write_informational(
            handle,
            InformationalRecord::verbose(message),
            MergeStream::Verbose,
        )
    }

    pub fn write_warning(
        &mut self,
        handle: &PipelineHandle,
        message: impl Into<String>,
    ) -> Result<(), PoolError> {
        self.write_informational(
            handle,
            InformationalRecord::warning(message),
            MergeStream::Warning,
        )
    }

    pub fn write_progress(
        &mut self,
        handle: &PipelineHandle,
        record: ProgressRecord,
    ) -> Result<(), PoolError> {
        let id = self.require_id()?;
        self.require_running(handle)?;
        self.core.send(&record, id, Some(handle.id))
    }

    pub fn write_information(
        &mut self,
        handle: &PipelineHandle,
        record: InformationRecord,
    ) -> Result<(), PoolError> {
        let id = self.require_id()?;
        let pipeline = self.require_running(handle)?;
        if pipeline.merge_target(MergeStream::Information) == PipelineResultTypes::Output {
            let value = record.to_ps_object();
            return self.core.send(&PipelineOutput::from(value), id, Some(handle.id));
        }
        self.core.send(&record, id, Some(handle.id))
    }

    /// Finishes a pipeline with PIPELINE_STATE and drops it.
    pub fn complete(
        &mut self,
        handle: &PipelineHandle,
        state: PsInvocationState,
        error: Option<PsValue>,
    ) -> Result<(), PoolError> {
        if !state.is_terminal() {
            return Err(PoolError::InvalidTransition(
                "complete() requires a terminal pipeline state",
            ));
        }
        let id = self.require_id()?;
        if self.pipelines.remove(&handle.id).is_none() {
            return Err(PoolError::UnknownPipeline(handle.id));
        }

        let message = PipelineStateMessage::builder()
            .pipeline_state(state)
            .exception_as_error_record(error)
            .build();
        info!(pipeline_id = %handle.id, ?state, "pipeline finished");
        self.core.send(&message, id, Some(handle.id))
    }

    /// Closes the pool, announcing RUNSPACEPOOL_STATE=Closed. Running
    /// pipelines are completed as `Stopped` first.
    pub fn close(&mut self) -> Result<(), PoolError> {
        if self.state.is_terminal() {
            return Err(PoolError::InvalidTransition(
                "close() on an already-terminal pool",
            ));
        }
        let id = self.require_id()?;
        self.state = RunspacePoolState::Closing;

        let ids: Vec<Uuid> = self.pipelines.keys().copied().collect();
        for pipeline_id in ids {
            self.pipelines.remove(&pipeline_id);
            self.core
                .send(&PipelineStateMessage::stopped(), id, Some(pipeline_id))?;
            self.core.push(PoolEvent::PipelineStateChanged {
                pipeline_id,
                state: PsInvocationState::Stopped,
                error: None,
            });
        }

        self.core
            .send(&RunspacePoolStateMessage::closed(), id, None)?;
        self.state = RunspacePoolState::Closed;
        self.core.push(PoolEvent::PoolClosed);
        Ok(())
    }

    fn break_pool(&mut self, err: &PoolError) {
        warn!(pool_id = ?self.id, error = %err, "pool broken");
        self.state = RunspacePoolState::Broken;
        self.core.push(PoolEvent::PoolBroken {
            reason: err.to_string(),
        });
    }

    fn require_id(&self) -> Result<Uuid, PoolError> {
        self.id.ok_or(PoolError::InvalidTransition(
            "no client has contacted this pool yet",
        ))
    }

    fn require_running(&self, handle: &PipelineHandle) -> Result<&ServerPipeline, PoolError> {
        let pipeline = self
            .pipelines
            .get(&handle.id)
            .ok_or(PoolError::UnknownPipeline(handle.id))?;
        if pipeline.state != PsInvocationState::Running {
            return Err(PoolError::InvalidTransition(
                "pipeline is not running",
            ));
        }
        Ok(pipeline)
    }

    fn write_informational(
        &mut self,
        handle: &PipelineHandle,
        record: InformationalRecord,
        stream: MergeStream,
    ) -> Result<(), PoolError> {
        let id = self.require_id()?;
        let pipeline = self.require_running(handle)?;
        if pipeline.merge_target(stream) == PipelineResultTypes::Output {
            let value = record.to_ps_object();
            return self.core.send(&PipelineOutput::from(value), id, Some(handle.id));
        }
        self.core.send(&record, id, Some(handle.id))
    }

    fn handle_message(&mut self, message: &RemotingMessage) -> Result<(), PoolError> {
        debug!(
            message_type = ?message.message_type,
            pipeline_id = ?message.pipeline_id,
            "server dispatching message"
        );
        match message.pipeline_id {
            Some(pipeline_id) => self.handle_pipeline_message(pipeline_id, message),
            None => self.handle_pool_message(message),
        }
    }

    fn handle_pool_message(&mut self, message: &RemotingMessage) -> Result<(), PoolError> {
        let id = self.require_id()?;
        let body = self.core.parse_body(message).map_err(PoolError::Psrp)?;

        match message.message_type {
            MessageType::SessionCapability => {
                let capability =
                    SessionCapability::try_from(expect_object(body)?).map_err(PoolError::Psrp)?;
                check_peer_capability(&capability)?;
                self.client_capability = Some(capability.clone());

                // answer with our own capability before anything else
                self.core.send(&own_capability(), id, None)?;
                self.state = RunspacePoolState::NegotiationSucceeded;
                self.core
                    .push(PoolEvent::NegotiationSucceeded { capability });
                Ok(())
            }
            MessageType::InitRunspacePool => {
                let init = poshwire_psrp::InitRunspacePool::try_from(expect_object(body)?)
                    .map_err(PoolError::Psrp)?;
                self.min_runspaces = init.min_runspaces;
                self.max_runspaces = init.max_runspaces;

                self.core
                    .send(&RunspacePoolStateMessage::opened(), id, None)?;
                let private_data = self.config.application_private_data.clone();
                self.core.send(&private_data, id, None)?;
                self.state = RunspacePoolState::Opened;
                info!(pool_id = %id, "runspace pool opened");
                self.core.push(PoolEvent::PoolOpened);
                Ok(())
            }
            MessageType::PublicKey => {
                let public_key =
                    PublicKey::try_from(expect_object(body)?).map_err(PoolError::Psrp)?;
                let client_key = parse_public_key_blob(&public_key.public_key)?;
                let session_key = generate_session_key();
                self.core.install_session_key(&session_key)?;
                let wrapped = wrap_session_key(&session_key, &client_key)?;
                self.core.send(
                    &EncryptedSessionKey {
                        encrypted_session_key: wrapped,
                    },
                    id,
                    None,
                )?;
                self.core.push(PoolEvent::KeyExchanged);
                Ok(())
            }
            MessageType::SetMinRunspaces => {
                let request =
                    SetMinRunspaces::try_from(expect_object(body)?).map_err(PoolError::Psrp)?;
                self.min_runspaces = request.min_runspaces;
                self.core
                    .send(&RunspaceAvailability::accepted(request.call_id), id, None)?;
                self.core.push(PoolEvent::RunspacesAdjusted {
                    min_runspaces: self.min_runspaces,
                    max_runspaces: self.max_runspaces,
                });
                Ok(())
            }
            MessageType::SetMaxRunspaces => {
                let request =
                    SetMaxRunspaces::try_from(expect_object(body)?).map_err(PoolError::Psrp)?;
                self.max_runspaces = request.max_runspaces;
                self.core
                    .send(&RunspaceAvailability::accepted(request.call_id), id, None)?;
                self.core.push(PoolEvent::RunspacesAdjusted {
                    min_runspaces: self.min_runspaces,
                    max_runspaces: self.max_runspaces,
                });
                Ok(())
            }
            MessageType::GetAvailableRunspaces => {
                let request = GetAvailableRunspaces::try_from(expect_object(body)?)
                    .map_err(PoolError::Psrp)?;
                let busy = self
                    .pipelines
                    .values()
                    .filter(|p| p.state == PsInvocationState::Running)
                    .count() as i64;
                let available = i64::from(self.max_runspaces).saturating_sub(busy).max(0);
                self.core.send(
                    &RunspaceAvailability::available_count(request.call_id, available),
                    id,
                    None,
                )?;
                Ok(())
            }
            MessageType::ResetRunspaceState => {
                let request =
                    ResetRunspaceState::try_from(expect_object(body)?).map_err(PoolError::Psrp)?;
                self.core
                    .send(&RunspaceAvailability::accepted(request.call_id), id, None)?;
                self.core.push(PoolEvent::RunspaceStateResetRequested {
                    call_id: request.call_id,
                });
                Ok(())
            }
            MessageType::ConnectRunspacePool => {
                let request =
                    ConnectRunspacePool::try_from(expect_object(body)?).map_err(PoolError::Psrp)?;
                if let Some(min) = request.min_runspaces {
                    self.min_runspaces = min;
                }
                if let Some(max) = request.max_runspaces {
                    self.max_runspaces = max;
                }
                self.core.send(&own_capability(), id, None)?;
                self.core.send(
                    &RunspacePoolInitData {
                        min_runspaces: self.min_runspaces,
                        max_runspaces: self.max_runspaces,
                    },
                    id,
                    None,
                )?;
                self.state = RunspacePoolState::Opened;
                self.core.push(PoolEvent::PoolStateChanged {
                    state: self.state,
                });
                Ok(())
            }
            MessageType::RunspacePoolHostResponse => {
                let response = RunspacePoolHostResponse::try_from(expect_object(body)?)
                    .map_err(PoolError::Psrp)?;
                self.accept_host_response(HostCallScope::Pool, response.0)
            }
            MessageType::Unknown(value) => {
                self.core.push(PoolEvent::UnknownMessage {
                    message_type: value,
                    body,
                });
                Ok(())
            }
            other => {
                self.core.push(PoolEvent::ProtocolError {
                    description: format!(
                        "unexpected pool-scoped message type {:?} (0x{:08x})",
                        other,
                        other.value()
                    ),
                });
                Ok(())
            }
        }
    }

    fn handle_pipeline_message(
        &mut self,
        pipeline_id: Uuid,
        message: &RemotingMessage,
    ) -> Result<(), PoolError> {
        let body = self.core.parse_body(message).map_err(PoolError::Psrp)?;

        match message.message_type {
            MessageType::CreatePipeline => {
                if self.state != RunspacePoolState::Opened {
                    return Err(PoolError::ProtocolViolation(
                        "CreatePipeline before the pool opened".to_string(),
                    ));
                }
                let request =
                    CreatePipeline::try_from(expect_object(body)?).map_err(PoolError::Psrp)?;
                self.pipelines
                    .insert(pipeline_id, ServerPipeline::new(&request));
                info!(pipeline_id = %pipeline_id, "pipeline created");
                self.core
                    .push(PoolEvent::PipelineCreated { pipeline_id, request });
                Ok(())
            }
            MessageType::PipelineInput => {
                let (no_input, input_closed) = {
                    let pipeline = self
                        .pipelines
                        .get(&pipeline_id)
                        .ok_or(PoolError::UnknownPipeline(pipeline_id))?;
                    (pipeline.no_input, pipeline.input_closed)
                };
                if no_input {
                    self.fail_pipeline(pipeline_id, "input sent to a no-input pipeline")?;
                    return Ok(());
                }
                if input_closed {
                    self.fail_pipeline(pipeline_id, "input after END_OF_PIPELINE_INPUT")?;
                    return Ok(());
                }
                self.core.push(PoolEvent::PipelineInputReceived {
                    pipeline_id,
                    value: body,
                });
                Ok(())
            }
            MessageType::EndOfPipelineInput => {
                let pipeline = self
                    .pipelines
                    .get_mut(&pipeline_id)
                    .ok_or(PoolError::UnknownPipeline(pipeline_id))?;
                pipeline.input_closed = true;
                self.core
                    .push(PoolEvent::PipelineInputClosed { pipeline_id });
                Ok(())
            }
            MessageType::PipelineHostResponse => {
                let response =
                    PipelineHostResponse::try_from(expect_object(body)?).map_err(PoolError::Psrp)?;
                self.accept_host_response(HostCallScope::Pipeline(pipeline_id), response.0)
            }
            MessageType::GetCommandMetadata => {
                let request =
                    GetCommandMetadata::try_from(expect_object(body)?).map_err(PoolError::Psrp)?;
                // metadata requests run as a pseudo-pipeline: the host
                // writes the command table as output and completes it
                self.pipelines
                    .entry(pipeline_id)
                    .or_insert_with(ServerPipeline::metadata);
                self.core.push(PoolEvent::CommandMetadataRequested {
                    pipeline_id,
                    request,
                });
                Ok(())
            }
            MessageType::Unknown(value) => {
                self.core.push(PoolEvent::UnknownMessage {
                    message_type: value,
                    body,
                });
                Ok(())
            }
            other => {
                self.core.push(PoolEvent::ProtocolError {
                    description: format!(
                        "unexpected pipeline-scoped message type {:?} (0x{:08x})",
                        other,
                        other.value()
                    ),
                });
                Ok(())
            }
        }
    }

    fn accept_host_response(
        &mut self,
        scope: HostCallScope,
        response: poshwire_psrp::HostMethodResponse,
    ) -> Result<(), PoolError> {
        if self.open_host_calls.remove(&response.call_id).is_none() {
            self.core.push(PoolEvent::ProtocolError {
                description: format!("host response for unknown call id {}", response.call_id),
            });
            return Ok(());
        }
        self.core
            .push(PoolEvent::HostResponseReceived { scope, response });
        Ok(())
    }

    /// A protocol violation on one pipeline fails that pipeline only.
    fn fail_pipeline(&mut self, pipeline_id: Uuid, reason: &str) -> Result<(), PoolError> {
        warn!(pipeline_id = %pipeline_id, reason, "pipeline protocol violation");
        let id = self.require_id()?;
        self.pipelines.remove(&pipeline_id);

        let record = ErrorRecord::new(reason, "PSRP.ProtocolViolation");
        let message = PipelineStateMessage::failed(record.to_ps_object());
        self.core.send(&message, id, Some(pipeline_id))?;
        self.core.push(PoolEvent::ProtocolError {
            description: format!("pipeline {pipeline_id}: {reason}"),
        });
        Ok(())
    }
}

fn expect_object(body: PsValue) -> Result<ComplexObject, PoolError> {
    match body {
        PsValue::Object(obj) => Ok(obj),
        other => Err(PoolError::Psrp(PsrpError::InvalidMessage(format!(
            "expected a complex object body, got {other:?}"
        )))),
    }
}
