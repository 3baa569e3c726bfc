use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use tracing::trace;

use crate::PsrpError;

/// Fragment header length: object id + fragment id + flags + blob length.
pub const FRAGMENT_HEADER_LEN: usize = 21;

/// One fragment of a PSRP message.
///
/// https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-psrp/3610dae4-67f7-4175-82da-a3fab83af288
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub object_id: u64,
    pub fragment_id: u64,
    pub start: bool,
    pub end: bool,
    pub data: Vec<u8>,
}

impl Fragment {
    pub fn new(object_id: u64, fragment_id: u64, data: Vec<u8>, start: bool, end: bool) -> Self {
        Self {
            object_id,
            fragment_id,
            start,
            end,
            data,
        }
    }

    /// Packs the fragment into wire bytes: big-endian header, raw payload.
    pub fn pack(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(FRAGMENT_HEADER_LEN + self.data.len());
        buffer.write_u64::<BigEndian>(self.object_id).unwrap();
        buffer.write_u64::<BigEndian>(self.fragment_id).unwrap();

        let mut flags = 0u8;
        if self.start {
            flags |= 0x01;
        }
        if self.end {
            flags |= 0x02;
        }
        buffer.push(flags);

        buffer
            .write_u32::<BigEndian>(self.data.len() as u32)
            .unwrap();
        buffer.extend_from_slice(&self.data);
        buffer
    }

    /// Unpacks one fragment, returning it and the bytes that follow.
    pub fn unpack(data: &[u8]) -> Result<(Self, &[u8]), PsrpError> {
        if data.len() < FRAGMENT_HEADER_LEN {
            return Err(PsrpError::InvalidMessage(format!(
                "fragment too short: need at least {FRAGMENT_HEADER_LEN} bytes, got {}",
                data.len()
            )));
        }

        let mut cursor = Cursor::new(data);
        let object_id = cursor.read_u64::<BigEndian>()?;
        let fragment_id = cursor.read_u64::<BigEndian>()?;
        let flags = cursor.read_u8()?;
        let start = (flags & 0x01) != 0;
        let end = (flags & 0x02) != 0;
        let length = cursor.read_u32::<BigEndian>()? as usize;

        trace!(object_id, fragment_id, start, end, length, "unpacked fragment header");

        if data.len() < FRAGMENT_HEADER_LEN + length {
            return Err(PsrpError::InvalidMessage(format!(
                "fragment payload truncated: expected {} bytes, got {}",
                FRAGMENT_HEADER_LEN + length,
                data.len()
            )));
        }

        let payload = data[FRAGMENT_HEADER_LEN..FRAGMENT_HEADER_LEN + length].to_vec();
        let remaining = &data[FRAGMENT_HEADER_LEN + length..];
        Ok((Self::new(object_id, fragment_id, payload, start, end), remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_round_trip() {
        let fragment = Fragment::new(3, 1, b"payload".to_vec(), false, true);
        let packed = fragment.pack();
        assert_eq!(packed.len(), FRAGMENT_HEADER_LEN + 7);
        assert_eq!(packed[16], 0x02);

        let (parsed, rest) = Fragment::unpack(&packed).unwrap();
        assert_eq!(parsed, fragment);
        assert!(rest.is_empty());
    }

    #[test]
    fn both_flags_set_for_single_fragment() {
        let packed = Fragment::new(1, 0, vec![0xAB], true, true).pack();
        assert_eq!(packed[16], 0x03);
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let mut packed = Fragment::new(1, 0, vec![1, 2, 3, 4], true, true).pack();
        packed.truncate(packed.len() - 2);
        assert!(Fragment::unpack(&packed).is_err());
    }
}
