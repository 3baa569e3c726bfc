use std::collections::HashMap;

use tracing::{trace, warn};

use super::fragment::Fragment;
use super::DefragmentResult;
use crate::PsrpError;
use crate::cores::RemotingMessage;

/// Reassembly cap: more concurrent objects than this means a broken or
/// hostile peer.
pub const MAX_OBJECTS_IN_FLIGHT: usize = 256;

#[derive(Debug)]
struct ReassemblyBuffer {
    next_fragment_id: u64,
    data: Vec<u8>,
}

/// Reassembles inbound fragments into messages.
///
/// Ordering is strict: the first fragment of an object must carry the
/// start flag and fragment id 0, every successor must continue the
/// sequence with the start flag clear. A violation drops that object's
/// buffer and reports the error; sibling objects are untouched.
#[derive(Debug, Default)]
pub struct Defragmenter {
    buffers: HashMap<u64, ReassemblyBuffer>,
}

impl Defragmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes packed fragments (one or more, back to back) and returns
    /// any messages they complete.
    pub fn defragment(&mut self, packet: &[u8]) -> Result<DefragmentResult, PsrpError> {
        let mut remaining = packet;
        let mut completed = Vec::new();

        while !remaining.is_empty() {
            let (fragment, rest) = Fragment::unpack(remaining)?;
            remaining = rest;
            trace!(
                object_id = fragment.object_id,
                fragment_id = fragment.fragment_id,
                start = fragment.start,
                end = fragment.end,
                len = fragment.data.len(),
                "defragmenter accepted fragment"
            );
            if let Some(message) = self.accept(fragment)? {
                completed.push(message);
            }
        }

        if completed.is_empty() {
            Ok(DefragmentResult::Incomplete)
        } else {
            Ok(DefragmentResult::Complete(completed))
        }
    }

    fn accept(&mut self, fragment: Fragment) -> Result<Option<RemotingMessage>, PsrpError> {
        let object_id = fragment.object_id;

        match self.buffers.get_mut(&object_id) {
            None => {
                if !fragment.start || fragment.fragment_id != 0 {
                    return Err(PsrpError::MissingStart {
                        object_id,
                        fragment_id: fragment.fragment_id,
                    });
                }
                if fragment.end {
                    // whole object in one fragment; no buffer needed
                    return Ok(Some(Self::parse_message(fragment.data)?));
                }
                if self.buffers.len() >= MAX_OBJECTS_IN_FLIGHT {
                    warn!(object_id, "reassembly buffer limit reached");
                    return Err(PsrpError::TooManyInFlight {
                        limit: MAX_OBJECTS_IN_FLIGHT,
                    });
                }
                self.buffers.insert(
                    object_id,
                    ReassemblyBuffer {
                        next_fragment_id: 1,
                        data: fragment.data,
                    },
                );
                Ok(None)
            }
            Some(buffer) => {
                if fragment.start || fragment.fragment_id != buffer.next_fragment_id {
                    let expected = buffer.next_fragment_id;
                    self.buffers.remove(&object_id);
                    return Err(PsrpError::OutOfOrder {
                        object_id,
                        expected,
                        got: fragment.fragment_id,
                    });
                }
                buffer.next_fragment_id += 1;
                buffer.data.extend_from_slice(&fragment.data);

                if fragment.end {
                    let buffer = self.buffers.remove(&object_id).unwrap();
                    return Ok(Some(Self::parse_message(buffer.data)?));
                }
                Ok(None)
            }
        }
    }

    /// Object ids with fragments buffered but no end fragment seen —
    /// what a transport reports as unterminated on close.
    pub fn pending_objects(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.buffers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn pending_count(&self) -> usize {
        self.buffers.len()
    }

    /// Drops all partial reassembly state.
    pub fn clear(&mut self) {
        self.buffers.clear();
    }

    fn parse_message(data: Vec<u8>) -> Result<RemotingMessage, PsrpError> {
        let mut cursor = std::io::Cursor::new(data);
        RemotingMessage::parse(&mut cursor)
    }
}
