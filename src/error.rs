use serde::Serialize;
use thiserror::Error;

/// Machine-readable classification carried by every rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Gateway,
    Verification,
    Unavailable,
    Persistence,
    Internal,
}

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    ConflictError(String),
    #[error("Payment gateway error: {0}")]
    GatewayError(String),
    #[error("Payment verification failed: {0}")]
    VerificationError(String),
    #[error("Registration store unavailable: {0}")]
    Unavailable(String),
    #[error("Persistence error: {0}")]
    PersistenceError(String),
    #[error("Catalog error: {0}")]
    CatalogError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl RegistrationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationError(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::ConflictError(_) => ErrorKind::Conflict,
            Self::GatewayError(_) => ErrorKind::Gateway,
            Self::VerificationError(_) => ErrorKind::Verification,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::PersistenceError(_) => ErrorKind::Persistence,
            Self::CatalogError(_)
            | Self::CsvError(_)
            | Self::IoError(_)
            | Self::InternalError(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for RegistrationError {
    fn from(err: rocksdb::Error) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RegistrationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_serialize_as_snake_case() {
        let kind = RegistrationError::NotFound("x".to_string()).kind();
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"not_found\"");
    }

    #[test]
    fn test_io_errors_are_internal() {
        let err: RegistrationError = std::io::Error::other("disk").into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
