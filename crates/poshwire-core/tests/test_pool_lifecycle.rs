//! Client and server state machines wired back to back: every byte the
//! client buffers is fed straight into the server and vice versa.

use poshwire_core::{
    ClientRunspacePool, HostCallScope, PoolConfig, PoolEvent, RunspacePoolState, ServerPoolConfig,
    ServerRunspacePool, new_client_pool, new_server_pool,
};
use poshwire_psrp::{
    Command, Destination, Fragment, MessageType, PowerShellPipeline, PsValue, RemotingMessage,
};

fn pump(client: &mut ClientRunspacePool, server: &mut ServerRunspacePool) {
    loop {
        let to_server = client.data_to_send();
        let to_client = server.data_to_send();
        if to_server.is_empty() && to_client.is_empty() {
            break;
        }
        if !to_server.is_empty() {
            server.receive_data(&to_server).unwrap();
        }
        if !to_client.is_empty() {
            client.receive_data(&to_client).unwrap();
        }
    }
}

fn drain(events: &mut Vec<PoolEvent>, pool_events: impl Iterator<Item = PoolEvent>) {
    events.extend(pool_events);
}

fn client_events(client: &mut ClientRunspacePool) -> Vec<PoolEvent> {
    std::iter::from_fn(|| client.next_event()).collect()
}

fn server_events(server: &mut ServerRunspacePool) -> Vec<PoolEvent> {
    std::iter::from_fn(|| server.next_event()).collect()
}

fn opened_pair() -> (ClientRunspacePool, ServerRunspacePool) {
    let mut client = new_client_pool(PoolConfig::builder().min_runspaces(1).max_runspaces(4).build());
    let mut server = new_server_pool(ServerPoolConfig::default());
    client.open().unwrap();
    pump(&mut client, &mut server);
    assert_eq!(client.state(), RunspacePoolState::Opened);
    assert_eq!(server.state(), RunspacePoolState::Opened);
    // clear the handshake events
    let _ = client_events(&mut client);
    let _ = server_events(&mut server);
    (client, server)
}

#[test]
fn open_emits_exactly_capability_then_init() {
    let mut client = new_client_pool(PoolConfig::default());
    client.open().unwrap();

    let bytes = client.data_to_send();
    let mut messages = Vec::new();
    let mut rest = bytes.as_slice();
    while !rest.is_empty() {
        let (fragment, remaining) = Fragment::unpack(rest).unwrap();
        rest = remaining;
        let message =
            RemotingMessage::parse(&mut std::io::Cursor::new(fragment.data)).unwrap();
        messages.push(message);
    }

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].message_type, MessageType::SessionCapability);
    assert_eq!(messages[1].message_type, MessageType::InitRunspacePool);
    assert!(messages.iter().all(|m| m.pipeline_id.is_none()));
    assert!(messages.iter().all(|m| m.destination == Destination::Server));
    assert_eq!(client.state(), RunspacePoolState::NegotiationSent);
}

#[test]
fn full_open_handshake() {
    let mut client = new_client_pool(PoolConfig::default());
    let mut server = new_server_pool(ServerPoolConfig::default());

    client.open().unwrap();
    pump(&mut client, &mut server);

    assert_eq!(client.state(), RunspacePoolState::Opened);
    assert_eq!(server.state(), RunspacePoolState::Opened);

    let mut events = Vec::new();
    drain(&mut events, std::iter::from_fn(|| client.next_event()));
    assert!(events.iter().any(|e| matches!(e, PoolEvent::NegotiationSucceeded { .. })));
    assert!(events.iter().any(|e| matches!(e, PoolEvent::PoolOpened)));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, PoolEvent::ApplicationPrivateDataReceived { .. }))
    );

    let server_seen = server_events(&mut server);
    assert!(server_seen.iter().any(|e| matches!(e, PoolEvent::PoolOpened)));
}

#[test]
fn open_twice_is_invalid() {
    let mut client = new_client_pool(PoolConfig::default());
    client.open().unwrap();
    assert!(client.open().is_err());
}

#[test]
fn key_exchange_and_secure_input() {
    let (mut client, mut server) = opened_pair();

    // a secure string cannot be serialised before key exchange
    let pipeline = PowerShellPipeline::builder()
        .cmds(vec![Command::cmdlet("ConvertFrom-SecureString")])
        .build();
    let handle = client.create_pipeline(pipeline, false).unwrap();
    client.start_pipeline(&handle).unwrap();
    pump(&mut client, &mut server);

    let secret = PsValue::from(poshwire_psrp::PsPrimitiveValue::SecureString(
        poshwire_psrp::PsSecureString::new("hunter2"),
    ));
    let err = client.send_input(&handle, secret.clone()).unwrap_err();
    assert!(matches!(
        err,
        poshwire_core::PoolError::Psrp(poshwire_psrp::PsrpError::CryptoUnavailable)
    ));

    // after the exchange the same value goes through and the server can
    // read it back
    client.exchange_key().unwrap();
    pump(&mut client, &mut server);

    let events = client_events(&mut client);
    assert!(events.iter().any(|e| matches!(e, PoolEvent::KeyExchanged)));
    let events = server_events(&mut server);
    assert!(events.iter().any(|e| matches!(e, PoolEvent::KeyExchanged)));

    client.send_input(&handle, secret).unwrap();
    pump(&mut client, &mut server);

    let events = server_events(&mut server);
    let input = events.iter().find_map(|e| match e {
        PoolEvent::PipelineInputReceived { value, .. } => Some(value.clone()),
        _ => None,
    });
    match input {
        Some(PsValue::Primitive(poshwire_psrp::PsPrimitiveValue::SecureString(ss))) => {
            assert_eq!(ss.plaintext().to_string_lossy(), "hunter2");
        }
        other => panic!("expected secure string input, got {other:?}"),
    }
}

#[test]
fn pipeline_runs_to_completion() {
    let (mut client, mut server) = opened_pair();

    let pipeline = PowerShellPipeline::builder()
        .cmds(vec![Command::script("Get-Date")])
        .build();
    let handle = client.create_pipeline(pipeline, true).unwrap();
    client.start_pipeline(&handle).unwrap();
    pump(&mut client, &mut server);

    // server sees the creation and runs the command chain
    let events = server_events(&mut server);
    let (server_handle, request) = events
        .iter()
        .find_map(|e| match e {
            PoolEvent::PipelineCreated { pipeline_id, request } => Some((
                poshwire_core::PipelineHandle::new(*pipeline_id),
                request.clone(),
            )),
            _ => None,
        })
        .expect("server should observe pipeline creation");
    assert_eq!(server_handle.id(), handle.id());
    assert_eq!(request.pipeline.cmds[0].cmd, "Get-Date");
    assert!(request.no_input);

    server
        .write_output(&server_handle, PsValue::from("Tuesday"))
        .unwrap();
    server.write_verbose(&server_handle, "almost done").unwrap();
    server
        .complete(&server_handle, poshwire_core::PsInvocationState::Completed, None)
        .unwrap();
    pump(&mut client, &mut server);

    let events = client_events(&mut client);
    assert!(events.iter().any(|e| matches!(
        e,
        PoolEvent::PipelineOutput { value, .. } if *value == PsValue::from("Tuesday")
    )));
    assert!(events.iter().any(|e| matches!(e, PoolEvent::PipelineStreamRecord { .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        PoolEvent::PipelineStateChanged {
            state: poshwire_core::PsInvocationState::Completed,
            ..
        }
    )));

    // the pipeline is gone on both sides
    assert_eq!(client.pipeline_state(&handle), None);
    assert_eq!(server.pipeline_state(&server_handle), None);
}

#[test]
fn no_input_pipeline_rejects_input_locally() {
    let (mut client, mut server) = opened_pair();

    let pipeline = PowerShellPipeline::builder()
        .cmds(vec![Command::cmdlet("Get-Location")])
        .build();
    let handle = client.create_pipeline(pipeline, true).unwrap();
    client.start_pipeline(&handle).unwrap();
    pump(&mut client, &mut server);

    let err = client.send_input(&handle, PsValue::from(1)).unwrap_err();
    assert!(matches!(err, poshwire_core::PoolError::ProtocolViolation(_)));
}

#[test]
fn server_fails_pipeline_on_protocol_violation() {
    let (mut client, mut server) = opened_pair();

    let pipeline = PowerShellPipeline::builder()
        .cmds(vec![Command::cmdlet("Get-Location")])
        .build();
    // client says input will follow...
    let handle = client.create_pipeline(pipeline, false).unwrap();
    client.start_pipeline(&handle).unwrap();
    client.close_input(&handle).unwrap();
    pump(&mut client, &mut server);
    let _ = server_events(&mut server);

    // ...then violates its own promise with more input
    client.send_input(&handle, PsValue::from(1)).unwrap_err();

    // forge the violation at the wire level to hit the server-side guard
    let rogue = RemotingMessage::new(
        Destination::Server,
        MessageType::PipelineInput,
        client.id(),
        Some(handle.id()),
        &PsValue::from(1),
        None,
    )
    .unwrap();
    let mut fragmenter = poshwire_psrp::Fragmenter::new(32768);
    server.receive_data(&fragmenter.fragment_multiple(&[&rogue])).unwrap();
    pump(&mut client, &mut server);

    let events = server_events(&mut server);
    assert!(events.iter().any(|e| matches!(e, PoolEvent::ProtocolError { .. })));

    let events = client_events(&mut client);
    assert!(events.iter().any(|e| matches!(
        e,
        PoolEvent::PipelineStateChanged {
            state: poshwire_core::PsInvocationState::Failed,
            ..
        }
    )));
}

#[test]
fn host_call_round_trip() {
    let (mut client, mut server) = opened_pair();

    let pipeline = PowerShellPipeline::builder()
        .cmds(vec![Command::cmdlet("Read-Host")])
        .build();
    let handle = client.create_pipeline(pipeline, true).unwrap();
    client.start_pipeline(&handle).unwrap();
    pump(&mut client, &mut server);
    let _ = server_events(&mut server);

    let call_id = server
        .host_call(
            HostCallScope::Pipeline(handle.id()),
            poshwire_psrp::host_methods::READ_LINE,
            "ReadLine",
            Vec::new(),
        )
        .unwrap();
    pump(&mut client, &mut server);

    let events = client_events(&mut client);
    let call = events
        .iter()
        .find_map(|e| match e {
            PoolEvent::HostCall { call, .. } => Some(call.clone()),
            _ => None,
        })
        .expect("client should surface the host call");
    assert_eq!(call.call_id, call_id);
    assert_eq!(call.method_name, "ReadLine");

    client
        .host_response(call.call_id, Ok(Some(PsValue::from("typed response"))))
        .unwrap();
    pump(&mut client, &mut server);

    let events = server_events(&mut server);
    let response = events
        .iter()
        .find_map(|e| match e {
            PoolEvent::HostResponseReceived { response, .. } => Some(response.clone()),
            _ => None,
        })
        .expect("server should surface the host response");
    assert_eq!(response.call_id, call_id);
    assert_eq!(response.return_value, Some(PsValue::from("typed response")));

    // a second response to the same id is an unknown host call
    assert!(matches!(
        client.host_response(call.call_id, Ok(None)).unwrap_err(),
        poshwire_core::PoolError::UnknownHostCall(_)
    ));
}

#[test]
fn runspace_limit_management() {
    let (mut client, mut server) = opened_pair();

    let call_id = client.set_max_runspaces(8).unwrap();
    pump(&mut client, &mut server);

    assert_eq!(server.max_runspaces(), 8);
    let events = client_events(&mut client);
    assert!(events.iter().any(|e| matches!(
        e,
        PoolEvent::AvailabilityResponse { call_id: id, response }
            if *id == call_id && response.as_bool() == Some(true)
    )));

    let call_id = client.get_available_runspaces().unwrap();
    pump(&mut client, &mut server);
    let events = client_events(&mut client);
    assert!(events.iter().any(|e| matches!(
        e,
        PoolEvent::AvailabilityResponse { call_id: id, response }
            if *id == call_id && response.as_i64() == Some(8)
    )));
}

#[test]
fn stop_request_is_an_event_not_bytes() {
    let (mut client, mut server) = opened_pair();

    let pipeline = PowerShellPipeline::builder()
        .cmds(vec![Command::script("Start-Sleep -Seconds 3600")])
        .build();
    let handle = client.create_pipeline(pipeline, true).unwrap();
    client.start_pipeline(&handle).unwrap();
    pump(&mut client, &mut server);
    let _ = client_events(&mut client);

    client.stop_pipeline(&handle).unwrap();
    assert!(client.data_to_send().is_empty());
    let events = client_events(&mut client);
    assert!(events.iter().any(|e| matches!(
        e,
        PoolEvent::StopRequested { pipeline_id } if *pipeline_id == handle.id()
    )));

    // transport delivered the signal; the server interrupts and closes
    // the pipeline with Stopped
    let server_handle = poshwire_core::PipelineHandle::new(handle.id());
    server
        .complete(&server_handle, poshwire_core::PsInvocationState::Stopped, None)
        .unwrap();
    pump(&mut client, &mut server);

    let events = client_events(&mut client);
    assert!(events.iter().any(|e| matches!(
        e,
        PoolEvent::PipelineStateChanged {
            state: poshwire_core::PsInvocationState::Stopped,
            ..
        }
    )));
}

#[test]
fn unknown_pipeline_does_not_break_the_pool() {
    let (mut client, mut server) = opened_pair();

    let rogue = RemotingMessage::new(
        Destination::Client,
        MessageType::PipelineOutput,
        client.id(),
        Some(uuid::Uuid::new_v4()),
        &PsValue::from("ghost"),
        None,
    )
    .unwrap();
    let mut fragmenter = poshwire_psrp::Fragmenter::new(32768);
    client.receive_data(&fragmenter.fragment_multiple(&[&rogue])).unwrap();

    let events = client_events(&mut client);
    assert!(events.iter().any(|e| matches!(e, PoolEvent::ProtocolError { .. })));
    assert_eq!(client.state(), RunspacePoolState::Opened);

    // the pool still works
    client.get_available_runspaces().unwrap();
    pump(&mut client, &mut server);
    assert!(client_events(&mut client)
        .iter()
        .any(|e| matches!(e, PoolEvent::AvailabilityResponse { .. })));
}

#[test]
fn unknown_message_type_surfaces_as_event() {
    let (mut client, _server) = opened_pair();

    let mystery = RemotingMessage::new(
        Destination::Client,
        MessageType::Unknown(0x00777777),
        client.id(),
        None,
        &PsValue::from("?"),
        None,
    )
    .unwrap();
    let mut fragmenter = poshwire_psrp::Fragmenter::new(32768);
    client.receive_data(&fragmenter.fragment_multiple(&[&mystery])).unwrap();

    let events = client_events(&mut client);
    assert!(events.iter().any(|e| matches!(
        e,
        PoolEvent::UnknownMessage { message_type, .. } if *message_type == 0x00777777
    )));
    assert_eq!(client.state(), RunspacePoolState::Opened);
}

#[test]
fn close_stops_pending_pipelines() {
    let (mut client, mut server) = opened_pair();

    let pipeline = PowerShellPipeline::builder()
        .cmds(vec![Command::cmdlet("Get-Process")])
        .build();
    let handle = client.create_pipeline(pipeline, true).unwrap();
    client.start_pipeline(&handle).unwrap();
    pump(&mut client, &mut server);
    let _ = client_events(&mut client);

    client.close().unwrap();
    assert_eq!(client.state(), RunspacePoolState::Closed);

    let events = client_events(&mut client);
    assert!(events.iter().any(|e| matches!(
        e,
        PoolEvent::PipelineStateChanged {
            state: poshwire_core::PsInvocationState::Stopped,
            ..
        }
    )));
    assert!(events.iter().any(|e| matches!(e, PoolEvent::PoolClosed)));

    // no further operations are accepted
    assert!(client.get_available_runspaces().is_err());
}

#[test]
fn command_metadata_request_round_trip() {
    let (mut client, mut server) = opened_pair();

    let request = poshwire_psrp::GetCommandMetadata::builder()
        .name(vec!["Get-*".to_string()])
        .build();
    let handle = client.request_command_metadata(request).unwrap();
    pump(&mut client, &mut server);

    let events = server_events(&mut server);
    let (meta_id, request) = events
        .iter()
        .find_map(|e| match e {
            PoolEvent::CommandMetadataRequested { pipeline_id, request } => {
                Some((*pipeline_id, request.clone()))
            }
            _ => None,
        })
        .expect("server should surface the metadata request");
    assert_eq!(meta_id, handle.id());
    assert_eq!(request.name, ["Get-*"]);

    // the host answers through the pseudo-pipeline
    let server_handle = poshwire_core::PipelineHandle::new(meta_id);
    server
        .write_output(&server_handle, PsValue::from("Get-ChildItem"))
        .unwrap();
    server
        .complete(&server_handle, poshwire_core::PsInvocationState::Completed, None)
        .unwrap();
    pump(&mut client, &mut server);

    let events = client_events(&mut client);
    assert!(events.iter().any(|e| matches!(
        e,
        PoolEvent::PipelineOutput { value, .. } if *value == PsValue::from("Get-ChildItem")
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        PoolEvent::PipelineStateChanged {
            state: poshwire_core::PsInvocationState::Completed,
            ..
        }
    )));
}

#[test]
fn small_fragment_sizes_still_work_end_to_end() {
    let mut client = new_client_pool(PoolConfig::builder().max_fragment_size(48).build());
    let mut server = new_server_pool(ServerPoolConfig::builder().max_fragment_size(48).build());

    client.open().unwrap();
    pump(&mut client, &mut server);

    assert_eq!(client.state(), RunspacePoolState::Opened);
    assert_eq!(server.state(), RunspacePoolState::Opened);
}
