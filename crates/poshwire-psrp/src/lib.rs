pub mod clixml;
pub mod cores;
pub mod crypto;
pub mod fragment;
pub mod messages;
pub mod ps_value;
pub mod registry;

use std::str::Utf8Error;

pub use clixml::{deserialize_clixml, deserialize_clixml_with, serialize_clixml, serialize_clixml_with};
pub use cores::*;
pub use crypto::{CryptoProvider, NoCrypto};
pub use fragment::*;
pub use messages::*;
pub use registry::TypeRegistry;

#[cfg(test)]
mod tests;

#[derive(Debug, thiserror::Error)]
pub enum PsrpError {
    /// Lexical or structural CLIXML failure.
    #[error("Malformed CLIXML: {0}")]
    MalformedXml(String),

    /// Well-formed XML with an element in a position the dialect forbids.
    #[error("Unexpected tag '{tag}' {context}")]
    UnexpectedTag { tag: String, context: &'static str },

    /// Message body did not match the shape its message type requires.
    #[error("Invalid PSRP message: {0}")]
    InvalidMessage(String),

    /// Fragment continued an object with the wrong fragment id.
    #[error("Fragment out of order for object {object_id}: expected {expected}, got {got}")]
    OutOfOrder {
        object_id: u64,
        expected: u64,
        got: u64,
    },

    /// First fragment seen for an object was not a start fragment.
    #[error("Missing start fragment for object {object_id} (fragment id {fragment_id})")]
    MissingStart { object_id: u64, fragment_id: u64 },

    /// Reassembly buffer limit exceeded.
    #[error("Too many objects in flight (limit {limit})")]
    TooManyInFlight { limit: usize },

    /// SecureString handled without an established session key.
    #[error("Secure string requires a negotiated session key")]
    CryptoUnavailable,

    /// Session-key cryptography failed.
    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Fragment payload is not valid UTF-8: {0}")]
    Utf8(#[from] Utf8Error),
}

impl From<poshwire_xml::XmlError> for PsrpError {
    fn from(err: poshwire_xml::XmlError) -> Self {
        match err {
            poshwire_xml::XmlError::UnexpectedTag(tag) => Self::UnexpectedTag {
                tag,
                context: "in CLIXML document",
            },
            other => Self::MalformedXml(other.to_string()),
        }
    }
}

impl From<std::io::Error> for PsrpError {
    fn from(err: std::io::Error) -> Self {
        Self::InvalidMessage(err.to_string())
    }
}
