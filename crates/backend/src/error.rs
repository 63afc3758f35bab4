use sea_orm::DbErr;
use thiserror::Error;

/// Error taxonomy of the bilty storage engine. Not-found on read paths is
/// expressed as `None`/an empty list, never through this type; the
/// `NotFound` variant covers writes aimed at a row that must already exist.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Request rejected before any write was attempted.
    #[error("{0}")]
    Validation(String),
    /// Filter key outside the whitelisted set of filterable fields.
    #[error("unknown filter field: {0}")]
    UnknownFilter(String),
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Db(#[from] DbErr),
    #[error("failed to encode document body: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
