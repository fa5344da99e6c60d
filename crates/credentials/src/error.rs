use crate::query::QuerySyntaxError;
use crate::secret::{ConfidentialityError, DecodeError};

#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error(transparent)]
    QuerySyntax(#[from] QuerySyntaxError),

    #[error("Query too long: {actual} bytes exceeds the {max} byte limit")]
    QueryTooLong { max: usize, actual: usize },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Confidentiality(#[from] ConfidentialityError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CredentialsError>;
