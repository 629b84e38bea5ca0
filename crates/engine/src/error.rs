//! The module contains the errors the engine can return.
//!
//! The errors are:
//!
//! - [`InvalidInput`] returned for malformed requests, before any I/O.
//! - [`KeyNotFound`] returned when a wallet or a transaction does not exist.
//! - [`InsufficientBalance`] returned when an expense would drive a wallet
//!   below zero.
//! - [`WouldGoNegative`] returned when reverting a transaction would leave its
//!   wallet negative (the cached totals are corrupted).
//! - [`UploadFailed`] returned when the asset store rejected an image.
//! - [`Conflict`] returned when a wallet kept changing under a commit.
//! - [`Database`] returned when the underlying storage failed.
//!
//!  [`InvalidInput`]: EngineError::InvalidInput
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`InsufficientBalance`]: EngineError::InsufficientBalance
//!  [`WouldGoNegative`]: EngineError::WouldGoNegative
//!  [`UploadFailed`]: EngineError::UploadFailed
//!  [`Conflict`]: EngineError::Conflict
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

use crate::reconcile::Rejection;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),
    #[error("Wallet would go negative: {0}")]
    WouldGoNegative(String),
    #[error("Upload failed: {0}")]
    UploadFailed(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl From<Rejection> for EngineError {
    fn from(value: Rejection) -> Self {
        match value {
            Rejection::InsufficientBalance {
                available,
                required,
            } => Self::InsufficientBalance(format!(
                "wallet has {available}, operation needs {required}"
            )),
            Rejection::WouldGoNegative { resulting } => Self::WouldGoNegative(format!(
                "wallet balance would become {resulting}"
            )),
            Rejection::Overflow => Self::InvalidInput("amount too large".to_string()),
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::InsufficientBalance(a), Self::InsufficientBalance(b)) => a == b,
            (Self::WouldGoNegative(a), Self::WouldGoNegative(b)) => a == b,
            (Self::UploadFailed(a), Self::UploadFailed(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
