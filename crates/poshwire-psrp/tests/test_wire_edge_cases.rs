//! Edge-case tests for the wire layer: truncated and malformed input
//! must surface as typed errors, never panics, and never poison state
//! that later input depends on.

use byteorder::{BigEndian, WriteBytesExt};
use uuid::Uuid;

use poshwire_psrp::fragment::{DefragmentResult, Defragmenter, Fragmenter};
use poshwire_psrp::ps_value::PsValue;
use poshwire_psrp::{
    Destination, MessageType, PsrpError, RemotingMessage, TypeRegistry, deserialize_clixml,
};

fn raw_fragment(object_id: u64, fragment_id: u64, start: bool, end: bool, data: &[u8]) -> Vec<u8> {
    let mut buffer = Vec::new();
    buffer.write_u64::<BigEndian>(object_id).unwrap();
    buffer.write_u64::<BigEndian>(fragment_id).unwrap();
    let mut flags = 0u8;
    if start {
        flags |= 0x01;
    }
    if end {
        flags |= 0x02;
    }
    buffer.push(flags);
    buffer.write_u32::<BigEndian>(data.len() as u32).unwrap();
    buffer.extend_from_slice(data);
    buffer
}

#[test]
fn empty_input_is_incomplete() {
    let mut defrag = Defragmenter::new();
    assert!(matches!(
        defrag.defragment(&[]).unwrap(),
        DefragmentResult::Incomplete
    ));
}

#[test]
fn truncated_header_is_an_error() {
    let mut defrag = Defragmenter::new();
    assert!(defrag.defragment(&[0u8; 10]).is_err());
}

#[test]
fn declared_length_beyond_buffer_is_an_error() {
    let mut packet = raw_fragment(1, 0, true, true, &[1, 2, 3, 4]);
    packet.truncate(packet.len() - 2);
    let mut defrag = Defragmenter::new();
    assert!(defrag.defragment(&packet).is_err());
}

#[test]
fn fragment_with_garbage_message_body_is_an_error() {
    // complete fragment whose payload is too short to be a message header
    let packet = raw_fragment(1, 0, true, true, &[0u8; 8]);
    let mut defrag = Defragmenter::new();
    assert!(defrag.defragment(&packet).is_err());
}

#[test]
fn unknown_message_type_still_parses() {
    let message = RemotingMessage::new(
        Destination::Client,
        MessageType::Unknown(0x00FFAABB),
        Uuid::new_v4(),
        None,
        &PsValue::from("mystery"),
        None,
    )
    .unwrap();

    let mut fragmenter = Fragmenter::new(32768);
    let mut defrag = Defragmenter::new();
    let wire = fragmenter.fragment_multiple(&[&message]);

    match defrag.defragment(&wire).unwrap() {
        DefragmentResult::Complete(messages) => {
            assert_eq!(messages[0].message_type, MessageType::Unknown(0x00FFAABB));
            assert_eq!(
                messages[0].parse_body(&TypeRegistry::default(), None).unwrap(),
                PsValue::from("mystery")
            );
        }
        DefragmentResult::Incomplete => panic!("expected completion"),
    }
}

#[test]
fn bad_destination_is_invalid_message() {
    let mut packet = RemotingMessage::new(
        Destination::Server,
        MessageType::SessionCapability,
        Uuid::new_v4(),
        None,
        &PsValue::NULL,
        None,
    )
    .unwrap()
    .pack();
    packet[0] = 0x7F;

    let err = RemotingMessage::parse(&mut std::io::Cursor::new(packet)).unwrap_err();
    assert!(matches!(err, PsrpError::InvalidMessage(_)));
}

#[test]
fn unexpected_tag_in_value_position() {
    let err = deserialize_clixml("<Banana>1</Banana>").unwrap_err();
    assert!(matches!(err, PsrpError::UnexpectedTag { .. }));
}

#[test]
fn unknown_elements_under_obj_are_ignored() {
    let xml = "<Obj RefId=\"0\"><FutureTag>x</FutureTag><MS><S N=\"Name\">ok</S></MS></Obj>";
    let decoded = deserialize_clixml(xml).unwrap();
    let obj = decoded[0].as_object().unwrap();
    assert_eq!(obj.property("Name"), Some(&PsValue::from("ok")));
}

#[test]
fn codec_error_does_not_poison_the_defragmenter() {
    let mut fragmenter = Fragmenter::new(64);
    let mut defrag = Defragmenter::new();

    // broken stream for object A
    let rogue = raw_fragment(50, 3, false, false, &[1, 2, 3]);
    assert!(defrag.defragment(&rogue).is_err());

    // a healthy message still goes through afterwards
    let message = RemotingMessage::new(
        Destination::Client,
        MessageType::PipelineOutput,
        Uuid::new_v4(),
        Some(Uuid::new_v4()),
        &PsValue::from("still alive"),
        None,
    )
    .unwrap();
    let wire = fragmenter.fragment_multiple(&[&message]);
    match defrag.defragment(&wire).unwrap() {
        DefragmentResult::Complete(messages) => assert_eq!(messages.len(), 1),
        DefragmentResult::Incomplete => panic!("expected completion"),
    }
}
