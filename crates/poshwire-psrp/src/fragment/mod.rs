pub mod defragmenter;
pub mod fragment;
pub mod fragmenter;

pub use defragmenter::Defragmenter;
pub use fragment::{FRAGMENT_HEADER_LEN, Fragment};
pub use fragmenter::Fragmenter;

use crate::cores::RemotingMessage;

/// Outcome of feeding bytes to the [`Defragmenter`].
#[derive(Debug)]
pub enum DefragmentResult {
    /// All fragments consumed, no message finished yet.
    Incomplete,
    /// One or more messages reassembled completely.
    Complete(Vec<RemotingMessage>),
}
