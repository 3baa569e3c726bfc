pub mod events;
pub mod keyx;
pub mod pipeline;
pub mod runspace_pool;

pub use events::{HostCallScope, PoolEvent, StreamRecord};
pub use keyx::SessionKeyCrypto;
pub use pipeline::{PipelineHandle, PsInvocationState};
pub use runspace_pool::{
    ClientRunspacePool, PoolConfig, RunspacePoolState, ServerPoolConfig, ServerRunspacePool,
};

use poshwire_psrp::PsrpError;

/// Convenience constructor mirroring the library surface's naming.
pub fn new_client_pool(config: PoolConfig) -> ClientRunspacePool {
    ClientRunspacePool::new(config)
}

pub fn new_server_pool(config: ServerPoolConfig) -> ServerRunspacePool {
    ServerRunspacePool::new(config)
}

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Caller asked for an operation illegal in the current state.
    #[error("Invalid state transition: {0}")]
    InvalidTransition(&'static str),

    /// Peer sent a message the current state forbids.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Unknown pipeline id {0}")]
    UnknownPipeline(uuid::Uuid),

    #[error("Unknown host call id {0}")]
    UnknownHostCall(i64),

    /// Peer declared a protocol version this implementation cannot talk.
    #[error("Capability mismatch: peer protocol version {0}")]
    CapabilityMismatch(String),

    #[error("Key exchange failure: {0}")]
    KeyExchange(String),

    #[error(transparent)]
    Psrp(#[from] PsrpError),
}
