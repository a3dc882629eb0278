use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("document is neither an editor graph nor an API program")]
    UnrecognizedFormat,
    #[error("malformed editor graph: {0}")]
    Malformed(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
