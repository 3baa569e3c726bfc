pub mod client;
pub mod enums;
pub mod server;

pub use client::ClientRunspacePool;
pub use enums::RunspacePoolState;
pub use server::ServerRunspacePool;

use std::collections::VecDeque;

use uuid::Uuid;

use poshwire_psrp::{
    ApplicationArguments, ApplicationPrivateData, CryptoProvider as _, Defragmenter, Destination,
    Fragmenter, HostInfo, PsObjectWithType, PsValue, PsrpError, RemotingMessage, SessionCapability,
    TypeRegistry,
};

use crate::events::PoolEvent;
use crate::keyx::SessionKeyCrypto;
use crate::PoolError;

pub(crate) const PROTOCOL_VERSION: &str = "2.3";
pub(crate) const PS_VERSION: &str = "2.0";
pub(crate) const SERIALIZATION_VERSION: &str = "1.1.0.1";

/// Oldest peer protocol revision this implementation talks to.
pub(crate) const MIN_PEER_PROTOCOL: (u32, u32) = (2, 2);

/// Client pool configuration.
#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct PoolConfig {
    #[builder(default = 1)]
    pub min_runspaces: i32,
    #[builder(default = 1)]
    pub max_runspaces: i32,
    #[builder(default)]
    pub application_arguments: ApplicationArguments,
    #[builder(default)]
    pub host_info: HostInfo,
    /// Per-fragment payload cap, transport-dependent.
    #[builder(default = 32_768)]
    pub max_fragment_size: usize,
    #[builder(default)]
    pub type_registry: TypeRegistry,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Server pool configuration.
#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct ServerPoolConfig {
    #[builder(default)]
    pub application_private_data: ApplicationPrivateData,
    #[builder(default = 32_768)]
    pub max_fragment_size: usize,
    #[builder(default)]
    pub type_registry: TypeRegistry,
}

impl Default for ServerPoolConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Plumbing shared by both pool variants: framing, the outbound byte
/// buffer, the pull-event queue, and the crypto provider.
#[derive(Debug)]
pub(crate) struct PoolCore {
    destination: Destination,
    fragmenter: Fragmenter,
    pub defragmenter: Defragmenter,
    outbound: Vec<u8>,
    events: VecDeque<PoolEvent>,
    pub registry: TypeRegistry,
    pub crypto: SessionKeyCrypto,
}

impl PoolCore {
    pub fn new(destination: Destination, max_fragment_size: usize, registry: TypeRegistry) -> Self {
        Self {
            destination,
            fragmenter: Fragmenter::new(max_fragment_size),
            defragmenter: Defragmenter::new(),
            outbound: Vec::new(),
            events: VecDeque::new(),
            registry,
            crypto: SessionKeyCrypto::new(),
        }
    }

    /// Encodes, fragments, and buffers one message.
    pub fn send(
        &mut self,
        message: &dyn PsObjectWithType,
        runspace_pool_id: Uuid,
        pipeline_id: Option<Uuid>,
    ) -> Result<(), PoolError> {
        let message = RemotingMessage::from_ps_message(
            message,
            self.destination,
            runspace_pool_id,
            pipeline_id,
            Some(&self.crypto),
        )?;
        for fragment in self.fragmenter.fragment(&message) {
            self.outbound.extend_from_slice(&fragment);
        }
        Ok(())
    }

    pub fn parse_body(&self, message: &RemotingMessage) -> Result<PsValue, PsrpError> {
        message.parse_body(&self.registry, Some(&self.crypto))
    }

    pub fn data_to_send(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbound)
    }

    pub fn push(&mut self, event: PoolEvent) {
        self.events.push_back(event);
    }

    pub fn next_event(&mut self) -> Option<PoolEvent> {
        self.events.pop_front()
    }

    pub fn install_session_key(&mut self, key: &[u8]) -> Result<(), PoolError> {
        self.crypto.register_session_key(key)?;
        Ok(())
    }
}

/// Our own capability announcement.
pub(crate) fn own_capability() -> SessionCapability {
    SessionCapability::builder()
        .protocol_version(PROTOCOL_VERSION)
        .ps_version(PS_VERSION)
        .serialization_version(SERIALIZATION_VERSION)
        .build()
}

/// Version gate for the peer's SESSION_CAPABILITY.
pub(crate) fn check_peer_capability(capability: &SessionCapability) -> Result<(), PoolError> {
    let mut parts = capability
        .protocol_version
        .split('.')
        .map(|p| p.parse::<u32>().unwrap_or(0));
    let major = parts.next().unwrap_or(0);
    let minor = parts.next().unwrap_or(0);
    if (major, minor) < MIN_PEER_PROTOCOL {
        return Err(PoolError::CapabilityMismatch(
            capability.protocol_version.clone(),
        ));
    }
    Ok(())
}
