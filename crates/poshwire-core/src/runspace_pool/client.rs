//! Client side of a runspace pool.
//!
//! Bytes in through [`ClientRunspacePool::receive_data`], bytes out
//! through [`ClientRunspacePool::data_to_send`], everything observable
//! through [`ClientRunspacePool::next_event`]. No I/O, no blocking, no
//! callbacks.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, info, warn};
use uuid::Uuid;

use poshwire_psrp::{
    ApartmentState, ComplexObject, CreatePipeline, DefragmentResult, Destination,
    EncryptedSessionKey, EndOfPipelineInput, ErrorRecord, GetAvailableRunspaces, HostMethodResponse,
    InformationRecord, InformationalKind, InformationalRecord, MessageType, PipelineHostCall,
    PipelineHostResponse, PipelineInput, PipelineStateMessage, PowerShellPipeline, ProgressRecord,
    PsInvocationState, PsValue, PsrpError, PublicKey, PublicKeyRequest, RemotingMessage,
    RunspaceAvailability, RunspacePoolHostCall, RunspacePoolHostResponse, RunspacePoolStateMessage,
    RunspacePoolStateValue, SessionCapability, SetMaxRunspaces, SetMinRunspaces, UserEvent,
    host_methods, ApplicationPrivateData, InitRunspacePool,
};

use crate::events::{HostCallScope, PoolEvent, StreamRecord};
use crate::keyx::KeyExchange;
use crate::pipeline::{ClientPipeline, PipelineHandle};
use crate::PoolError;

use super::{check_peer_capability, own_capability, PoolConfig, PoolCore, RunspacePoolState};

#[derive(Debug, Clone)]
struct PendingHostCall {
    scope: HostCallScope,
    method_id: i32,
    method_name: String,
}

#[derive(Debug)]
pub struct ClientRunspacePool {
    id: Uuid,
    state: RunspacePoolState,
    config: PoolConfig,
    core: PoolCore,
    peer_capability: Option<SessionCapability>,
    application_private_data: Option<ApplicationPrivateData>,
    /// RUNSPACEPOOL_STATE=Opened seen before the capability arrived.
    opened_announced: bool,
    pipelines: HashMap<Uuid, ClientPipeline>,
    key_exchange: Option<KeyExchange>,
    key_exchange_pending: bool,
    deferred_host_calls: VecDeque<(HostCallScope, poshwire_psrp::HostMethodCall)>,
    pending_host_calls: HashMap<i64, PendingHostCall>,
    pending_availability: HashMap<i64, ()>,
    next_call_id: i64,
}

impl ClientRunspacePool {
    pub fn new(config: PoolConfig) -> Self {
        let core = PoolCore::new(
            Destination::Server,
            config.max_fragment_size,
            config.type_registry.clone(),
        );
        Self {
            id: Uuid::new_v4(),
            state: RunspacePoolState::BeforeOpen,
            config,
            core,
            peer_capability: None,
            application_private_data: None,
            opened_announced: false,
            pipelines: HashMap::new(),
            key_exchange: None,
            key_exchange_pending: false,
            deferred_host_calls: VecDeque::new(),
            pending_host_calls: HashMap::new(),
            pending_availability: HashMap::new(),
            next_call_id: 1,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> RunspacePoolState {
        self.state
    }

    pub fn peer_capability(&self) -> Option<&SessionCapability> {
        self.peer_capability.as_ref()
    }

    pub fn application_private_data(&self) -> Option<&ApplicationPrivateData> {
        self.application_private_data.as_ref()
    }

    pub fn pipeline_state(&self, handle: &PipelineHandle) -> Option<PsInvocationState> {
        self.pipelines.get(&handle.id).map(|p| p.state)
    }

    /// Queues SESSION_CAPABILITY then INIT_RUNSPACEPOOL, both
    /// pool-scoped, and moves to `NegotiationSent`.
    pub fn open(&mut self) -> Result<(), PoolError> {
        if self.state != RunspacePoolState::BeforeOpen {
            return Err(PoolError::InvalidTransition(
                "open() requires the pool to be in BeforeOpen",
            ));
        }

        let init = InitRunspacePool::builder()
            .min_runspaces(self.config.min_runspaces)
            .max_runspaces(self.config.max_runspaces)
            .host_info(self.config.host_info.clone())
            .application_arguments(self.config.application_arguments.clone())
            .build();

        debug!(
            pool_id = %self.id,
            min = self.config.min_runspaces,
            max = self.config.max_runspaces,
            "opening runspace pool"
        );

        self.core.send(&own_capability(), self.id, None)?;
        self.core.send(&init, self.id, None)?;
        self.state = RunspacePoolState::NegotiationSent;
        Ok(())
    }

    /// Closes the pool. Pending pipelines are forcibly completed as
    /// `Stopped`; the transport tears the shell down out of band.
    pub fn close(&mut self) -> Result<(), PoolError> {
        if self.state.is_terminal() {
            return Err(PoolError::InvalidTransition(
                "close() on an already-terminal pool",
            ));
        }
        self.state = RunspacePoolState::Closing;

        let ids: Vec<Uuid> = self.pipelines.keys().copied().collect();
        for pipeline_id in ids {
            self.pipelines.remove(&pipeline_id);
            self.core.push(PoolEvent::PipelineStateChanged {
                pipeline_id,
                state: PsInvocationState::Stopped,
                error: None,
            });
        }

        self.state = RunspacePoolState::Closed;
        self.core.push(PoolEvent::PoolClosed);
        Ok(())
    }

    /// Starts a client-initiated key exchange by sending PUBLIC_KEY.
    pub fn exchange_key(&mut self) -> Result<(), PoolError> {
        if self.state != RunspacePoolState::Opened {
            return Err(PoolError::InvalidTransition(
                "exchange_key() requires an opened pool",
            ));
        }
        if self.key_exchange_pending {
            return Ok(());
        }
        self.send_public_key()
    }

    pub fn set_min_runspaces(&mut self, count: i32) -> Result<i64, PoolError> {
        self.require_opened("set_min_runspaces() requires an opened pool")?;
        let call_id = self.take_call_id();
        self.core.send(
            &SetMinRunspaces {
                min_runspaces: count,
                call_id,
            },
            self.id,
            None,
        )?;
        self.pending_availability.insert(call_id, ());
        Ok(call_id)
    }

    pub fn set_max_runspaces(&mut self, count: i32) -> Result<i64, PoolError> {
        self.require_opened("set_max_runspaces() requires an opened pool")?;
        let call_id = self.take_call_id();
        self.core.send(
            &SetMaxRunspaces {
                max_runspaces: count,
                call_id,
            },
            self.id,
            None,
        )?;
        self.pending_availability.insert(call_id, ());
        Ok(call_id)
    }

    pub fn get_available_runspaces(&mut self) -> Result<i64, PoolError> {
        self.require_opened("get_available_runspaces() requires an opened pool")?;
        let call_id = self.take_call_id();
        self.core
            .send(&GetAvailableRunspaces { call_id }, self.id, None)?;
        self.pending_availability.insert(call_id, ());
        Ok(call_id)
    }

    /// Registers a pipeline; nothing goes on the wire until `start`.
    pub fn create_pipeline(
        &mut self,
        pipeline: PowerShellPipeline,
        no_input: bool,
    ) -> Result<PipelineHandle, PoolError> {
        self.require_opened("create_pipeline() requires an opened pool")?;

        let request = CreatePipeline::builder()
            .pipeline(pipeline)
            .no_input(no_input)
            .apartment_state(ApartmentState::Unknown)
            .host_info(self.config.host_info.clone())
            .build();

        let id = Uuid::new_v4();
        self.pipelines.insert(id, ClientPipeline::new(request));
        Ok(PipelineHandle { id })
    }

    /// Asks the server to enumerate commands. The reply arrives as
    /// pipeline output on the returned handle, ending with a terminal
    /// pipeline state.
    pub fn request_command_metadata(
        &mut self,
        request: poshwire_psrp::GetCommandMetadata,
    ) -> Result<PipelineHandle, PoolError> {
        self.require_opened("request_command_metadata() requires an opened pool")?;

        let id = Uuid::new_v4();
        self.pipelines
            .insert(id, ClientPipeline::started_without_request());
        self.core.send(&request, self.id, Some(id))?;
        Ok(PipelineHandle { id })
    }

    /// Sends CREATE_PIPELINE and moves the pipeline to `Running`.
    pub fn start_pipeline(&mut self, handle: &PipelineHandle) -> Result<(), PoolError> {
        let pipeline = self
            .pipelines
            .get_mut(&handle.id)
            .ok_or(PoolError::UnknownPipeline(handle.id))?;
        let request = pipeline.request.take().ok_or(PoolError::InvalidTransition(
            "start_pipeline() on an already-started pipeline",
        ))?;

        pipeline.state = PsInvocationState::Running;
        info!(pipeline_id = %handle.id, "starting pipeline");
        self.core.send(&request, self.id, Some(handle.id))
    }

    /// Streams one input object. Illegal when the pipeline was created
    /// with `no_input` or its input was closed.
    pub fn send_input(&mut self, handle: &PipelineHandle, value: PsValue) -> Result<(), PoolError> {
        let pipeline = self
            .pipelines
            .get(&handle.id)
            .ok_or(PoolError::UnknownPipeline(handle.id))?;
        if pipeline.no_input {
            return Err(PoolError::ProtocolViolation(
                "pipeline was created with no_input".to_string(),
            ));
        }
        if pipeline.input_closed {
            return Err(PoolError::ProtocolViolation(
                "pipeline input already closed".to_string(),
            ));
        }
        if pipeline.state != PsInvocationState::Running {
            return Err(PoolError::InvalidTransition(
                "send_input() requires a running pipeline",
            ));
        }
        self.core
            .send(&PipelineInput::from(value), self.id, Some(handle.id))
    }

    pub fn close_input(&mut self, handle: &PipelineHandle) -> Result<(), PoolError> {
        let pipeline = self
            .pipelines
            .get_mut(&handle.id)
            .ok_or(PoolError::UnknownPipeline(handle.id))?;
        if pipeline.no_input || pipeline.input_closed {
            return Ok(());
        }
        pipeline.input_closed = true;
        self.core.send(&EndOfPipelineInput, self.id, Some(handle.id))
    }

    /// Requests a stop. PSRP has no stop message: the transport delivers
    /// the interrupt out of band, so this only transitions state and
    /// surfaces a `StopRequested` event for the transport to act on.
    pub fn stop_pipeline(&mut self, handle: &PipelineHandle) -> Result<(), PoolError> {
        let pipeline = self
            .pipelines
            .get_mut(&handle.id)
            .ok_or(PoolError::UnknownPipeline(handle.id))?;
        if pipeline.state.is_terminal() {
            return Err(PoolError::InvalidTransition(
                "stop_pipeline() on a finished pipeline",
            ));
        }
        pipeline.state = PsInvocationState::Stopping;
        self.core.push(PoolEvent::StopRequested {
            pipeline_id: handle.id,
        });
        Ok(())
    }

    /// Answers a host call previously surfaced as [`PoolEvent::HostCall`].
    pub fn host_response(
        &mut self,
        call_id: i64,
        result: Result<Option<PsValue>, PsValue>,
    ) -> Result<(), PoolError> {
        let pending = self
            .pending_host_calls
            .remove(&call_id)
            .ok_or(PoolError::UnknownHostCall(call_id))?;

        let (return_value, exception) = match result {
            Ok(value) => (value, None),
            Err(error) => (None, Some(error)),
        };
        let response = HostMethodResponse::builder()
            .call_id(call_id)
            .method_id(pending.method_id)
            .method_name(pending.method_name.clone())
            .return_value(return_value)
            .exception(exception)
            .build();

        match pending.scope {
            HostCallScope::Pool => {
                self.core
                    .send(&RunspacePoolHostResponse(response), self.id, None)
            }
            HostCallScope::Pipeline(pipeline_id) => {
                if let Some(pipeline) = self.pipelines.get_mut(&pipeline_id) {
                    pipeline.open_host_calls.remove(&call_id);
                }
                self.core
                    .send(&PipelineHostResponse(response), self.id, Some(pipeline_id))
            }
        }
    }

    /// Disconnect is a transport-level operation: track the state, emit
    /// nothing on the wire.
    pub fn disconnect(&mut self) -> Result<(), PoolError> {
        if self.state != RunspacePoolState::Opened {
            return Err(PoolError::InvalidTransition(
                "disconnect() requires an opened pool",
            ));
        }
        self.state = RunspacePoolState::Disconnected;
        self.core.push(PoolEvent::PoolStateChanged {
            state: self.state,
        });
        Ok(())
    }

    /// Begins reconnecting to a disconnected pool; the transport issues
    /// the actual reconnect and then feeds inbound bytes again.
    pub fn connect(&mut self) -> Result<(), PoolError> {
        if self.state != RunspacePoolState::Disconnected {
            return Err(PoolError::InvalidTransition(
                "connect() requires a disconnected pool",
            ));
        }
        self.state = RunspacePoolState::Connecting;
        self.core
            .send(&poshwire_psrp::ConnectRunspacePool::default(), self.id, None)?;
        self.core.push(PoolEvent::PoolStateChanged {
            state: self.state,
        });
        Ok(())
    }

    /// Feeds transport bytes in. Codec-level problems become
    /// diagnostic events; only state-machine poison breaks the pool.
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

    pub fn data_to_send(&mut self) -> Vec<u8> {
        self.core.data_to_send()
    }

    pub fn next_event(&mut self) -> Option<PoolEvent> {
        self.core.next_event()
    }

    fn break_pool(&mut self, err: &PoolError) {
        warn!(pool_id = %self.id, error = %err, "pool broken");
        self.state = RunspacePoolState::Broken;
        self.core.push(PoolEvent::PoolBroken {
            reason: err.to_string(),
        });
    }

    fn require_opened(&self, what: &'static str) -> Result<(), PoolError> {
        if self.state == RunspacePoolState::Opened {
            Ok(())
        } else {
            Err(PoolError::InvalidTransition(what))
        }
    }

    fn take_call_id(&mut self) -> i64 {
        let id = self.next_call_id;
        self.next_call_id += 1;
        id
    }

    fn send_public_key(&mut self) -> Result<(), PoolError> {
        if self.key_exchange.is_none() {
            self.key_exchange = Some(KeyExchange::generate()?);
        }
        let blob = self
            .key_exchange
            .as_ref()
            .expect("key exchange state initialized")
            .public_key_blob_base64()?;
        self.key_exchange_pending = true;
        info!(pool_id = %self.id, "sending public key");
        self.core.send(&PublicKey { public_key: blob }, self.id, None)
    }

    fn handle_message(&mut self, message: &RemotingMessage) -> Result<(), PoolError> {
        debug!(
            message_type = ?message.message_type,
            pipeline_id = ?message.pipeline_id,
            "client dispatching message"
        );
        match message.pipeline_id {
            Some(pipeline_id) => self.handle_pipeline_message(pipeline_id, message),
            None => self.handle_pool_message(message),
        }
    }

    fn handle_pool_message(&mut self, message: &RemotingMessage) -> Result<(), PoolError> {
        let body = self.core.parse_body(message).map_err(PoolError::Psrp)?;

        match message.message_type {
            MessageType::SessionCapability => {
                let capability =
                    SessionCapability::try_from(expect_object(body)?).map_err(PoolError::Psrp)?;
                check_peer_capability(&capability)?;
                self.peer_capability = Some(capability.clone());
                if self.state == RunspacePoolState::NegotiationSent {
                    self.state = RunspacePoolState::NegotiationSucceeded;
                }
                self.core
                    .push(PoolEvent::NegotiationSucceeded { capability });
                if self.opened_announced {
                    self.mark_opened();
                }
                Ok(())
            }
            MessageType::RunspacePoolState => {
                let state_message = RunspacePoolStateMessage::try_from(expect_object(body)?)
                    .map_err(PoolError::Psrp)?;
                self.apply_pool_state(&state_message);
                Ok(())
            }
            MessageType::ApplicationPrivateData => {
                let data = ApplicationPrivateData::try_from(expect_object(body)?)
                    .map_err(PoolError::Psrp)?;
                self.application_private_data = Some(data.clone());
                self.core
                    .push(PoolEvent::ApplicationPrivateDataReceived { data });
                Ok(())
            }
            MessageType::EncryptedSessionKey => {
                let encrypted = EncryptedSessionKey::try_from(expect_object(body)?)
                    .map_err(PoolError::Psrp)?;
                let key_exchange = self.key_exchange.as_ref().ok_or_else(|| {
                    PoolError::ProtocolViolation(
                        "EncryptedSessionKey without a prior PublicKey".to_string(),
                    )
                })?;
                let key = key_exchange.unwrap_session_key(&encrypted.encrypted_session_key)?;
                self.core.install_session_key(&key)?;
                self.key_exchange_pending = false;
                self.core.push(PoolEvent::KeyExchanged);

                while let Some((scope, call)) = self.deferred_host_calls.pop_front() {
                    debug!(call_id = call.call_id, "releasing deferred host call");
                    self.track_host_call(scope, &call);
                    self.core.push(PoolEvent::HostCall { scope, call });
                }
                Ok(())
            }
            MessageType::PublicKeyRequest => {
                // best-effort payload validation, then answer
                if let Err(err) = PublicKeyRequest::try_from(body) {
                    warn!(error = %err, "unexpected PublicKeyRequest payload");
                }
                self.send_public_key()
            }
            MessageType::RunspaceAvailability => {
                let availability =
                    RunspaceAvailability::try_from(expect_object(body)?).map_err(PoolError::Psrp)?;
                if self.pending_availability.remove(&availability.call_id).is_none() {
                    self.core.push(PoolEvent::ProtocolError {
                        description: format!(
                            "availability response for unknown call id {}",
                            availability.call_id
                        ),
                    });
                    return Ok(());
                }
                self.core.push(PoolEvent::AvailabilityResponse {
                    call_id: availability.call_id,
                    response: availability.set_min_max_runspaces_response,
                });
                Ok(())
            }
            MessageType::RunspacePoolHostCall => {
                let call = RunspacePoolHostCall::try_from(expect_object(body)?)
                    .map_err(PoolError::Psrp)?;
                self.accept_host_call(HostCallScope::Pool, call.0)
            }
            MessageType::UserEvent => {
                let event = UserEvent::try_from(expect_object(body)?).map_err(PoolError::Psrp)?;
                self.core.push(PoolEvent::UserEventReceived { event });
                Ok(())
            }
            MessageType::RunspacePoolInitData => {
                // reconnect path: treat as the pool coming back up
                if self.state == RunspacePoolState::Connecting {
                    self.mark_opened();
                }
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
        if !self.pipelines.contains_key(&pipeline_id) {
            // not fatal for the pool
            self.core.push(PoolEvent::ProtocolError {
                description: format!("message for unknown pipeline {pipeline_id}"),
            });
            return Ok(());
        }

        let body = self.core.parse_body(message).map_err(PoolError::Psrp)?;

        match message.message_type {
            MessageType::PipelineOutput => {
                self.core.push(PoolEvent::PipelineOutput {
                    pipeline_id,
                    value: body,
                });
                Ok(())
            }
            MessageType::ErrorRecord => {
                let record =
                    ErrorRecord::try_from(expect_object(body)?).map_err(PoolError::Psrp)?;
                self.core
                    .push(PoolEvent::PipelineErrorRecord { pipeline_id, record });
                Ok(())
            }
            MessageType::DebugRecord | MessageType::VerboseRecord | MessageType::WarningRecord => {
                let kind = match message.message_type {
                    MessageType::DebugRecord => InformationalKind::Debug,
                    MessageType::VerboseRecord => InformationalKind::Verbose,
                    _ => InformationalKind::Warning,
                };
                let record = InformationalRecord::try_from_object(kind, expect_object(body)?)
                    .map_err(PoolError::Psrp)?;
                self.core.push(PoolEvent::PipelineStreamRecord {
                    pipeline_id,
                    record: StreamRecord::Informational(record),
                });
                Ok(())
            }
            MessageType::ProgressRecord => {
                let record =
                    ProgressRecord::try_from(expect_object(body)?).map_err(PoolError::Psrp)?;
                self.core.push(PoolEvent::PipelineStreamRecord {
                    pipeline_id,
                    record: StreamRecord::Progress(record),
                });
                Ok(())
            }
            MessageType::InformationRecord => {
                let record =
                    InformationRecord::try_from(expect_object(body)?).map_err(PoolError::Psrp)?;
                self.core.push(PoolEvent::PipelineStreamRecord {
                    pipeline_id,
                    record: StreamRecord::Information(record),
                });
                Ok(())
            }
            MessageType::PipelineState => {
                let state_message = PipelineStateMessage::try_from(expect_object(body)?)
                    .map_err(PoolError::Psrp)?;
                let state = state_message.pipeline_state;
                if let Some(pipeline) = self.pipelines.get_mut(&pipeline_id) {
                    pipeline.state = state;
                }
                if state.is_terminal() {
                    self.pipelines.remove(&pipeline_id);
                }
                self.core.push(PoolEvent::PipelineStateChanged {
                    pipeline_id,
                    state,
                    error: state_message.exception_as_error_record,
                });
                Ok(())
            }
            MessageType::PipelineHostCall => {
                let call =
                    PipelineHostCall::try_from(expect_object(body)?).map_err(PoolError::Psrp)?;
                self.accept_host_call(HostCallScope::Pipeline(pipeline_id), call.0)
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

    fn apply_pool_state(&mut self, state_message: &RunspacePoolStateMessage) {
        match state_message.runspace_state {
            RunspacePoolStateValue::Opened => {
                if self.peer_capability.is_some() {
                    self.mark_opened();
                } else {
                    // hold the transition until the capability lands
                    self.opened_announced = true;
                }
            }
            RunspacePoolStateValue::Broken => {
                self.state = RunspacePoolState::Broken;
                self.core.push(PoolEvent::PoolBroken {
                    reason: state_message
                        .exception_as_error_record
                        .as_ref()
                        .map_or_else(|| "peer reported broken pool".to_string(), ToString::to_string),
                });
            }
            RunspacePoolStateValue::Closed => {
                self.state = RunspacePoolState::Closed;
                self.core.push(PoolEvent::PoolClosed);
            }
            other => {
                let state = RunspacePoolState::from(other);
                self.state = state;
                self.core.push(PoolEvent::PoolStateChanged { state });
            }
        }
    }

    fn mark_opened(&mut self) {
        if self.state != RunspacePoolState::Opened {
            info!(pool_id = %self.id, "runspace pool opened");
            self.state = RunspacePoolState::Opened;
            self.core.push(PoolEvent::PoolOpened);
        }
    }

    fn track_host_call(&mut self, scope: HostCallScope, call: &poshwire_psrp::HostMethodCall) {
        self.pending_host_calls.insert(
            call.call_id,
            PendingHostCall {
                scope,
                method_id: call.method_id,
                method_name: call.method_name.clone(),
            },
        );
        if let HostCallScope::Pipeline(pipeline_id) = scope
            && let Some(pipeline) = self.pipelines.get_mut(&pipeline_id)
        {
            pipeline.open_host_calls.insert(call.call_id);
        }
    }

    fn accept_host_call(
        &mut self,
        scope: HostCallScope,
        call: poshwire_psrp::HostMethodCall,
    ) -> Result<(), PoolError> {
        // Secure prompts cannot be answered before the session key
        // exists; park them and trigger the exchange ourselves.
        if host_methods::needs_session_key(call.method_id) && !self.core.crypto.has_key() {
            info!(
                call_id = call.call_id,
                method = %call.method_name,
                "deferring host call until session key is established"
            );
            self.deferred_host_calls.push_back((scope, call));
            if !self.key_exchange_pending {
                self.send_public_key()?;
            }
            return Ok(());
        }

        self.track_host_call(scope, &call);
        self.core.push(PoolEvent::HostCall { scope, call });
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
