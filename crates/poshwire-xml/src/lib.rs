pub mod builder;
pub mod parser;

use roxmltree::NodeType;

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("Invalid XML: {0}")]
    ParseError(#[from] roxmltree::Error),

    #[error("Invalid tag: expected '{expected}', found '{found}'")]
    InvalidTag { expected: String, found: String },

    #[error("Unexpected tag: {0}")]
    UnexpectedTag(String),

    #[error("Missing attribute '{0}'")]
    MissingAttribute(&'static str),

    #[error("Invalid node type: expected '{expected:?}', found {found:?}")]
    InvalidNodeType { expected: NodeType, found: NodeType },

    #[error("{0}")]
    GenericError(String),
}
