//! Fragment/defragment behaviour at the sizes and orderings the protocol
//! cares about.

use tracing_test::traced_test;
use uuid::Uuid;

use crate::cores::{Destination, MessageType, RemotingMessage};
use crate::fragment::{DefragmentResult, Defragmenter, Fragment, Fragmenter};
use crate::ps_value::PsValue;
use crate::PsrpError;

fn message(text: &str) -> RemotingMessage {
    RemotingMessage::new(
        Destination::Server,
        MessageType::PipelineOutput,
        Uuid::new_v4(),
        Some(Uuid::new_v4()),
        &PsValue::from(text),
        None,
    )
    .unwrap()
}

fn reassemble_all(defrag: &mut Defragmenter, packets: &[Vec<u8>]) -> Vec<RemotingMessage> {
    let mut out = Vec::new();
    for packet in packets {
        if let DefragmentResult::Complete(messages) = defrag.defragment(packet).unwrap() {
            out.extend(messages);
        }
    }
    out
}

#[test]
#[traced_test]
fn round_trip_at_standard_sizes() {
    for max_size in [22usize, 100, 65535] {
        let original = message("fragmentation round trip payload, long enough to split");
        let mut fragmenter = Fragmenter::new(max_size);
        let fragments = fragmenter.fragment(&original);

        let mut defrag = Defragmenter::new();
        let messages = reassemble_all(&mut defrag, &fragments);
        assert_eq!(messages.len(), 1, "max_size={max_size}");
        assert_eq!(messages[0].data, original.data);
        assert_eq!(messages[0].message_type, MessageType::PipelineOutput);
        assert_eq!(defrag.pending_count(), 0);
    }
}

#[test]
fn single_byte_payload_single_fragment_flags() {
    let mut fragmenter = Fragmenter::new(22);
    let fragments = fragmenter.fragment_payload(&[0xAA]);
    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].pack()[16], 0x03);
}

#[test]
fn forty_three_byte_payload_splits_in_two() {
    let mut fragmenter = Fragmenter::new(22);
    let fragments = fragmenter.fragment_payload(&[0u8; 43]);
    assert_eq!(fragments.len(), 2);

    let first = fragments[0].pack();
    let second = fragments[1].pack();
    assert_eq!(first[16], 0x01);
    assert_eq!(second[16], 0x02);

    let (f0, _) = Fragment::unpack(&first).unwrap();
    let (f1, _) = Fragment::unpack(&second).unwrap();
    assert_eq!((f0.fragment_id, f1.fragment_id), (0, 1));
    assert_eq!(f0.data.len(), 22);
    assert_eq!(f1.data.len(), 21);
}

#[test]
#[traced_test]
fn interleaved_objects_reassemble_independently() {
    let first = message("first message");
    let second = message("second message");

    let mut fragmenter = Fragmenter::new(16);
    let first_frags = fragmenter.fragment(&first);
    let second_frags = fragmenter.fragment(&second);

    // a1 b1 a2 b2 ... transport-order per object, interleaved overall
    let mut interleaved = Vec::new();
    let mut a = first_frags.into_iter();
    let mut b = second_frags.into_iter();
    loop {
        match (a.next(), b.next()) {
            (None, None) => break,
            (fa, fb) => {
                interleaved.extend(fa);
                interleaved.extend(fb);
            }
        }
    }

    let mut defrag = Defragmenter::new();
    let messages = reassemble_all(&mut defrag, &interleaved);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].data, first.data);
    assert_eq!(messages[1].data, second.data);
}

#[test]
fn skipped_fragment_is_out_of_order() {
    let original = message("needs at least three fragments to test skipping");
    let mut fragmenter = Fragmenter::new(16);
    let fragments = fragmenter.fragment(&original);
    assert!(fragments.len() >= 3);

    let mut defrag = Defragmenter::new();
    assert!(matches!(
        defrag.defragment(&fragments[0]).unwrap(),
        DefragmentResult::Incomplete
    ));

    let err = defrag.defragment(&fragments[2]).unwrap_err();
    assert!(matches!(
        err,
        PsrpError::OutOfOrder {
            expected: 1,
            got: 2,
            ..
        }
    ));
    // the buffer was dropped; the object cannot be resumed
    assert_eq!(defrag.pending_count(), 0);
}

#[test]
fn duplicate_start_is_out_of_order() {
    let original = message("duplicate start flag detection needs two fragments");
    let mut fragmenter = Fragmenter::new(16);
    let fragments = fragmenter.fragment(&original);

    let mut defrag = Defragmenter::new();
    defrag.defragment(&fragments[0]).unwrap();
    assert!(matches!(
        defrag.defragment(&fragments[0]).unwrap_err(),
        PsrpError::OutOfOrder { .. }
    ));
}

#[test]
fn continuation_without_start_is_missing_start() {
    let original = message("missing start detection");
    let mut fragmenter = Fragmenter::new(16);
    let fragments = fragmenter.fragment(&original);

    let mut defrag = Defragmenter::new();
    let err = defrag.defragment(&fragments[1]).unwrap_err();
    assert!(matches!(err, PsrpError::MissingStart { .. }));
}

#[test]
fn nonzero_first_fragment_id_is_missing_start() {
    // start flag set but fragment id 1: still not a legal object start
    let rogue = Fragment::new(9, 1, vec![1, 2, 3], true, false).pack();
    let mut defrag = Defragmenter::new();
    assert!(matches!(
        defrag.defragment(&rogue).unwrap_err(),
        PsrpError::MissingStart {
            object_id: 9,
            fragment_id: 1
        }
    ));
}

#[test]
fn in_flight_object_cap() {
    let mut defrag = Defragmenter::new();
    for object_id in 1..=256u64 {
        let fragment = Fragment::new(object_id, 0, vec![0u8; 4], true, false).pack();
        defrag.defragment(&fragment).unwrap();
    }
    assert_eq!(defrag.pending_count(), 256);

    let overflow = Fragment::new(257, 0, vec![0u8; 4], true, false).pack();
    assert!(matches!(
        defrag.defragment(&overflow).unwrap_err(),
        PsrpError::TooManyInFlight { limit: 256 }
    ));

    defrag.clear();
    assert_eq!(defrag.pending_count(), 0);
}

#[test]
fn pending_objects_reported_in_order() {
    let mut defrag = Defragmenter::new();
    for object_id in [7u64, 3, 5] {
        let fragment = Fragment::new(object_id, 0, vec![0u8; 4], true, false).pack();
        defrag.defragment(&fragment).unwrap();
    }
    assert_eq!(defrag.pending_objects(), vec![3, 5, 7]);
}

#[test]
fn error_in_one_object_leaves_siblings_intact() {
    let healthy = message("healthy sibling survives the other object breaking");
    let mut fragmenter = Fragmenter::new(16);
    let healthy_frags = fragmenter.fragment(&healthy);

    let mut defrag = Defragmenter::new();
    defrag.defragment(&healthy_frags[0]).unwrap();

    // rogue object appears with no start fragment
    let rogue = Fragment::new(99, 4, vec![1], false, false).pack();
    assert!(defrag.defragment(&rogue).is_err());

    // the healthy object still completes
    let rest: Vec<Vec<u8>> = healthy_frags[1..].to_vec();
    let messages = reassemble_all(&mut defrag, &rest);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].data, healthy.data);
}

#[test]
fn multiple_fragments_in_one_packet() {
    let original = message("all fragments can arrive in one transport read");
    let mut fragmenter = Fragmenter::new(16);
    let mut all = Vec::new();
    for fragment in fragmenter.fragment(&original) {
        all.extend_from_slice(&fragment);
    }

    let mut defrag = Defragmenter::new();
    match defrag.defragment(&all).unwrap() {
        DefragmentResult::Complete(messages) => {
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].data, original.data);
        }
        DefragmentResult::Incomplete => panic!("expected completion"),
    }
}
