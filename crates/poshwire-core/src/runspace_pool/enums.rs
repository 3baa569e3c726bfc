use poshwire_psrp::RunspacePoolStateValue;

/// Local pool lifecycle state, shared by the client and server machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunspacePoolState {
    BeforeOpen,
    Opening,
    NegotiationSent,
    NegotiationSucceeded,
    Opened,
    Disconnected,
    Connecting,
    Closing,
    Closed,
    Broken,
}

impl RunspacePoolState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Broken)
    }
}

impl From<RunspacePoolStateValue> for RunspacePoolState {
    fn from(value: RunspacePoolStateValue) -> Self {
        match value {
            RunspacePoolStateValue::BeforeOpen => Self::BeforeOpen,
            RunspacePoolStateValue::Opening => Self::Opening,
            RunspacePoolStateValue::Opened => Self::Opened,
            RunspacePoolStateValue::Closed => Self::Closed,
            RunspacePoolStateValue::Closing => Self::Closing,
            RunspacePoolStateValue::Broken => Self::Broken,
            RunspacePoolStateValue::NegotiationSent => Self::NegotiationSent,
            RunspacePoolStateValue::NegotiationSucceeded => Self::NegotiationSucceeded,
            RunspacePoolStateValue::Connecting => Self::Connecting,
            RunspacePoolStateValue::Disconnected => Self::Disconnected,
        }
    }
}
