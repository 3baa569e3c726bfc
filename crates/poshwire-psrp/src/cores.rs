use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use uuid::Uuid;

use crate::crypto::CryptoProvider;
use crate::messages::PsObjectWithType;
use crate::ps_value::PsValue;
use crate::registry::TypeRegistry;
use crate::{PsrpError, clixml};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Message header length: destination + message type + two GUIDs.
pub const MESSAGE_HEADER_LEN: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Client = 0x0000_0001,
    Server = 0x0000_0002,
}

impl TryFrom<u32> for Destination {
    type Error = PsrpError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0x0000_0001 => Ok(Self::Client),
            0x0000_0002 => Ok(Self::Server),
            _ => Err(PsrpError::InvalidMessage(format!(
                "Unknown Destination value: 0x{value:08x}"
            ))),
        }
    }
}

/// https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-psrp/497ac440-89fb-4cb3-9cc1-3434c1aa74c3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    SessionCapability,
    InitRunspacePool,
    PublicKey,
    EncryptedSessionKey,
    PublicKeyRequest,
    ConnectRunspacePool,
    RunspacePoolInitData,
    ResetRunspaceState,
    SetMaxRunspaces,
    SetMinRunspaces,
    RunspaceAvailability,
    RunspacePoolState,
    CreatePipeline,
    GetAvailableRunspaces,
    UserEvent,
    ApplicationPrivateData,
    GetCommandMetadata,
    RunspacePoolHostCall,
    RunspacePoolHostResponse,
    PipelineInput,
    EndOfPipelineInput,
    PipelineOutput,
    ErrorRecord,
    PipelineState,
    DebugRecord,
    VerboseRecord,
    WarningRecord,
    ProgressRecord,
    InformationRecord,
    PipelineHostCall,
    PipelineHostResponse,
    /// A value this implementation does not know. Decodes to a generic
    /// body and surfaces as an event; never a decoder failure.
    Unknown(u32),
}

impl MessageType {
    pub fn value(self) -> u32 {
        match self {
            Self::SessionCapability => 0x00010002,
            Self::InitRunspacePool => 0x00010004,
            Self::PublicKey => 0x00010005,
            Self::EncryptedSessionKey => 0x00010006,
            Self::PublicKeyRequest => 0x00010007,
            Self::ConnectRunspacePool => 0x00010008,
            Self::RunspacePoolInitData => 0x0002100B,
            Self::ResetRunspaceState => 0x0002100C,
            Self::SetMaxRunspaces => 0x00021002,
            Self::SetMinRunspaces => 0x00021003,
            Self::RunspaceAvailability => 0x00021004,
            Self::RunspacePoolState => 0x00021005,
            Self::CreatePipeline => 0x00021006,
            Self::GetAvailableRunspaces => 0x00021007,
            Self::UserEvent => 0x00021008,
            Self::ApplicationPrivateData => 0x00021009,
            Self::GetCommandMetadata => 0x0002100A,
            Self::RunspacePoolHostCall => 0x00021100,
            Self::RunspacePoolHostResponse => 0x00021101,
            Self::PipelineInput => 0x00041002,
            Self::EndOfPipelineInput => 0x00041003,
            Self::PipelineOutput => 0x00041004,
            Self::ErrorRecord => 0x00041005,
            Self::PipelineState => 0x00041006,
            Self::DebugRecord => 0x00041007,
            Self::VerboseRecord => 0x00041008,
            Self::WarningRecord => 0x00041009,
            Self::ProgressRecord => 0x00041010,
            Self::InformationRecord => 0x00041011,
            Self::PipelineHostCall => 0x00041100,
            Self::PipelineHostResponse => 0x00041101,
            Self::Unknown(value) => value,
        }
    }

    pub fn from_u32(value: u32) -> Self {
        match value {
            0x00010002 => Self::SessionCapability,
            0x00010004 => Self::InitRunspacePool,
            0x00010005 => Self::PublicKey,
            0x00010006 => Self::EncryptedSessionKey,
            0x00010007 => Self::PublicKeyRequest,
            0x00010008 => Self::ConnectRunspacePool,
            0x0002100B => Self::RunspacePoolInitData,
            0x0002100C => Self::ResetRunspaceState,
            0x00021002 => Self::SetMaxRunspaces,
            0x00021003 => Self::SetMinRunspaces,
            0x00021004 => Self::RunspaceAvailability,
            0x00021005 => Self::RunspacePoolState,
            0x00021006 => Self::CreatePipeline,
            0x00021007 => Self::GetAvailableRunspaces,
            0x00021008 => Self::UserEvent,
            0x00021009 => Self::ApplicationPrivateData,
            0x0002100A => Self::GetCommandMetadata,
            0x00021100 => Self::RunspacePoolHostCall,
            0x00021101 => Self::RunspacePoolHostResponse,
            0x00041002 => Self::PipelineInput,
            0x00041003 => Self::EndOfPipelineInput,
            0x00041004 => Self::PipelineOutput,
            0x00041005 => Self::ErrorRecord,
            0x00041006 => Self::PipelineState,
            0x00041007 => Self::DebugRecord,
            0x00041008 => Self::VerboseRecord,
            0x00041009 => Self::WarningRecord,
            0x00041010 => Self::ProgressRecord,
            0x00041011 => Self::InformationRecord,
            0x00041100 => Self::PipelineHostCall,
            0x00041101 => Self::PipelineHostResponse,
            other => Self::Unknown(other),
        }
    }

    /// Which endpoint this message type is addressed to.
    pub fn direction(self) -> MessageDirection {
        match self {
            Self::SessionCapability | Self::PublicKeyRequest | Self::Unknown(_) => {
                MessageDirection::Both
            }
            Self::InitRunspacePool
            | Self::PublicKey
            | Self::ConnectRunspacePool
            | Self::SetMaxRunspaces
            | Self::SetMinRunspaces
            | Self::CreatePipeline
            | Self::GetAvailableRunspaces
            | Self::GetCommandMetadata
            | Self::RunspacePoolHostResponse
            | Self::PipelineInput
            | Self::EndOfPipelineInput
            | Self::ResetRunspaceState
            | Self::PipelineHostResponse => MessageDirection::ToServer,
            Self::EncryptedSessionKey
            | Self::RunspacePoolInitData
            | Self::RunspaceAvailability
            | Self::RunspacePoolState
            | Self::UserEvent
            | Self::ApplicationPrivateData
            | Self::RunspacePoolHostCall
            | Self::PipelineOutput
            | Self::ErrorRecord
            | Self::PipelineState
            | Self::DebugRecord
            | Self::VerboseRecord
            | Self::WarningRecord
            | Self::ProgressRecord
            | Self::InformationRecord
            | Self::PipelineHostCall => MessageDirection::ToClient,
        }
    }

    /// Whether the type may flow before the pool reaches `Opened`
    /// (negotiation, key exchange, reconnect plumbing).
    pub fn early(self) -> bool {
        matches!(
            self,
            Self::SessionCapability
                | Self::InitRunspacePool
                | Self::PublicKey
                | Self::EncryptedSessionKey
                | Self::PublicKeyRequest
                | Self::ConnectRunspacePool
                | Self::RunspacePoolInitData
                | Self::RunspacePoolState
                | Self::ApplicationPrivateData
        )
    }

    /// Pool-scoped types ride with an all-zero pipeline id.
    pub fn is_pipeline_scoped(self) -> bool {
        matches!(
            self,
            Self::CreatePipeline
                | Self::PipelineInput
                | Self::EndOfPipelineInput
                | Self::PipelineOutput
                | Self::ErrorRecord
                | Self::PipelineState
                | Self::DebugRecord
                | Self::VerboseRecord
                | Self::WarningRecord
                | Self::ProgressRecord
                | Self::InformationRecord
                | Self::PipelineHostCall
                | Self::PipelineHostResponse
                | Self::GetCommandMetadata
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    ToClient,
    ToServer,
    Both,
}

/// A PSRP message: 40-byte header plus a BOM-prefixed CLIXML body.
///
/// https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-psrp/497ac440-89fb-4cb3-9cc1-3434c1aa74c3
#[derive(Debug, Clone)]
pub struct RemotingMessage {
    pub destination: Destination,
    pub message_type: MessageType,
    pub runspace_pool_id: Uuid,
    /// `None` encodes as all-zero: the message is pool-scoped.
    pub pipeline_id: Option<Uuid>,
    /// Raw body bytes as they appear on the wire (BOM included when
    /// produced by this implementation).
    pub data: Vec<u8>,
}

impl RemotingMessage {
    pub fn new(
        destination: Destination,
        message_type: MessageType,
        runspace_pool_id: Uuid,
        pipeline_id: Option<Uuid>,
        body: &PsValue,
        crypto: Option<&dyn CryptoProvider>,
    ) -> Result<Self, PsrpError> {
        let xml = clixml::serialize_clixml_with(std::slice::from_ref(body), crypto)?;
        let mut data = Vec::with_capacity(3 + xml.len());
        data.extend_from_slice(&UTF8_BOM);
        data.extend_from_slice(xml.as_bytes());
        Ok(Self {
            destination,
            message_type,
            runspace_pool_id,
            pipeline_id,
            data,
        })
    }

    pub fn from_ps_message(
        message: &dyn PsObjectWithType,
        destination: Destination,
        runspace_pool_id: Uuid,
        pipeline_id: Option<Uuid>,
        crypto: Option<&dyn CryptoProvider>,
    ) -> Result<Self, PsrpError> {
        Self::new(
            destination,
            message.message_type(),
            runspace_pool_id,
            pipeline_id,
            &message.to_ps_object(),
            crypto,
        )
    }

    pub fn parse<T>(cursor: &mut std::io::Cursor<T>) -> Result<Self, PsrpError>
    where
        T: AsRef<[u8]>,
    {
        let destination = Destination::try_from(cursor.read_u32::<LittleEndian>()?)?;
        let message_type = MessageType::from_u32(cursor.read_u32::<LittleEndian>()?);

        let mut rpid_bytes = [0u8; 16];
        cursor.read_exact(&mut rpid_bytes)?;
        let mut pid_bytes = [0u8; 16];
        cursor.read_exact(&mut pid_bytes)?;

        let mut data = Vec::new();
        cursor.read_to_end(&mut data)?;

        let pipeline_id = if pid_bytes.iter().all(|&b| b == 0) {
            None
        } else {
            Some(Uuid::from_bytes_le(pid_bytes))
        };

        Ok(Self {
            destination,
            message_type,
            runspace_pool_id: Uuid::from_bytes_le(rpid_bytes),
            pipeline_id,
            data,
        })
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(MESSAGE_HEADER_LEN + self.data.len());
        buffer
            .write_u32::<LittleEndian>(self.destination as u32)
            .unwrap();
        buffer
            .write_u32::<LittleEndian>(self.message_type.value())
            .unwrap();
        buffer.extend_from_slice(&self.runspace_pool_id.to_bytes_le());
        buffer.extend_from_slice(&self.pipeline_id.unwrap_or_default().to_bytes_le());
        buffer.extend_from_slice(&self.data);
        buffer
    }

    /// Decodes the CLIXML body. Empty bodies (END_OF_PIPELINE_INPUT and
    /// friends) come back as null.
    pub fn parse_body(
        &self,
        registry: &TypeRegistry,
        crypto: Option<&dyn CryptoProvider>,
    ) -> Result<PsValue, PsrpError> {
        let bytes = self
            .data
            .strip_prefix(&UTF8_BOM[..])
            .unwrap_or(&self.data);
        let text = std::str::from_utf8(bytes)?;
        if text.trim().is_empty() {
            return Ok(PsValue::NULL);
        }
        let mut values = clixml::deserialize_clixml_with(text, registry, crypto)?;
        values.drain(..).next().ok_or_else(|| {
            PsrpError::InvalidMessage("message body contained no CLIXML value".to_string())
        })
    }
}
