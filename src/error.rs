// Store errors - every failure leaves the store as a typed value

use thiserror::Error;

use crate::student::Subject;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("identity must be exactly 8 digits, got {0:?}")]
    InvalidFormat(String),

    #[error("identity {0} already exists")]
    DuplicateIdentity(String),

    #[error("no student with identity {0}")]
    NotFound(String),

    #[error("{subject} grade {value} is outside [0, 20]")]
    InvalidGrade { subject: Subject, value: f64 },

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl StoreError {
    /// Stable machine-readable code for the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::InvalidFormat(_) => "INVALID_FORMAT",
            StoreError::DuplicateIdentity(_) => "DUPLICATE_IDENTITY",
            StoreError::NotFound(_) => "NOT_FOUND",
            StoreError::InvalidGrade { .. } => "INVALID_GRADE",
            StoreError::InvalidField { .. } => "INVALID_FIELD",
            StoreError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// True for errors caused by the caller's input rather than the storage engine
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidFormat(_) | StoreError::InvalidGrade { .. } | StoreError::InvalidField { .. }
        )
    }
}
