use tracing::trace;

use super::fragment::Fragment;
use crate::cores::RemotingMessage;

/// Splits outgoing messages into fragments.
///
/// Object ids are strictly monotonic per endpoint, starting at 1. The
/// caller-supplied maximum bounds each fragment's payload; the 21-byte
/// header rides on top.
#[derive(Debug)]
pub struct Fragmenter {
    max_fragment_size: usize,
    outgoing_counter: u64,
}

impl Fragmenter {
    pub fn new(max_fragment_size: usize) -> Self {
        Self {
            max_fragment_size: max_fragment_size.max(1),
            outgoing_counter: 1,
        }
    }

    pub fn max_fragment_size(&self) -> usize {
        self.max_fragment_size
    }

    /// Fragments one message; returns the packed wire bytes per fragment.
    pub fn fragment(&mut self, message: &RemotingMessage) -> Vec<Vec<u8>> {
        let fragments: Vec<Vec<u8>> = self
            .fragment_payload(&message.pack())
            .iter()
            .map(Fragment::pack)
            .collect();
        trace!(
            object_id = self.outgoing_counter - 1,
            fragment_count = fragments.len(),
            message_type = ?message.message_type,
            "fragmented outgoing message"
        );
        fragments
    }

    /// Chunks an already-packed payload under a fresh object id.
    pub fn fragment_payload(&mut self, payload: &[u8]) -> Vec<Fragment> {
        let object_id = self.outgoing_counter;
        self.outgoing_counter += 1;

        let chunk_count = payload.len().div_ceil(self.max_fragment_size).max(1);
        let mut fragments = Vec::with_capacity(chunk_count);

        if payload.is_empty() {
            fragments.push(Fragment::new(object_id, 0, Vec::new(), true, true));
            return fragments;
        }

        for (fragment_id, chunk) in payload.chunks(self.max_fragment_size).enumerate() {
            let start = fragment_id == 0;
            let end = fragment_id == chunk_count - 1;
            fragments.push(Fragment::new(
                object_id,
                fragment_id as u64,
                chunk.to_vec(),
                start,
                end,
            ));
        }
        fragments
    }

    /// Fragments several messages and flattens the wire bytes, the shape
    /// a byte-stream transport wants.
    pub fn fragment_multiple(&mut self, messages: &[&RemotingMessage]) -> Vec<u8> {
        let mut out = Vec::new();
        for message in messages {
            for fragment in self.fragment(message) {
                out.extend_from_slice(&fragment);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cores::{Destination, MessageType};
    use crate::ps_value::PsValue;
    use uuid::Uuid;

    fn message() -> RemotingMessage {
        RemotingMessage::new(
            Destination::Server,
            MessageType::SessionCapability,
            Uuid::new_v4(),
            None,
            &PsValue::from("abc"),
            None,
        )
        .unwrap()
    }

    #[test]
    fn object_ids_start_at_one_and_increase() {
        let mut fragmenter = Fragmenter::new(32768);
        let first = fragmenter.fragment(&message());
        let second = fragmenter.fragment(&message());
        let (f1, _) = Fragment::unpack(&first[0]).unwrap();
        let (f2, _) = Fragment::unpack(&second[0]).unwrap();
        assert_eq!(f1.object_id, 1);
        assert_eq!(f2.object_id, 2);
        assert!(f1.start && f1.end);
    }

    #[test]
    fn small_max_size_forces_multiple_fragments() {
        let mut fragmenter = Fragmenter::new(16);
        let fragments = fragmenter.fragment(&message());
        assert!(fragments.len() > 1);

        let (first, _) = Fragment::unpack(&fragments[0]).unwrap();
        assert!(first.start && !first.end);
        assert_eq!(first.data.len(), 16);

        let (last, _) = Fragment::unpack(fragments.last().unwrap()).unwrap();
        assert!(!last.start && last.end);

        for (expected_id, bytes) in fragments.iter().enumerate() {
            let (fragment, _) = Fragment::unpack(bytes).unwrap();
            assert_eq!(fragment.fragment_id, expected_id as u64);
        }
    }

    #[test]
    fn exact_multiple_sets_end_on_last_chunk() {
        let msg = message();
        let len = msg.pack().len();
        let mut fragmenter = Fragmenter::new(len / 2 + len % 2);
        let fragments = fragmenter.fragment(&msg);
        let (last, _) = Fragment::unpack(fragments.last().unwrap()).unwrap();
        assert!(last.end);
    }
}
