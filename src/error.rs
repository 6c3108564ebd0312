/// Error types for presentation merge operations.
use thiserror::Error;

/// Result type for presentation merge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for presentation merge operations.
#[derive(Error, Debug)]
pub enum Error {
    /// OPC package error
    #[error("OPC error: {0}")]
    Opc(#[from] crate::opc::error::OpcError),

    /// The package opened fine but is not a presentation
    #[error("Not a presentation package: {0}")]
    NotAPresentation(String),

    /// A required piece of the package is structurally unusable
    #[error("Malformed part: {0}")]
    MalformedPart(String),
}
