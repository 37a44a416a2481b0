//! Error types for the transfer service
//!
//! This module provides a unified error handling system for the workspace.
//! It defines the error kinds surfaced by account creation and funds
//! transfer and provides consistent error conversion.

use std::fmt::Display;
use thiserror::Error;

/// Transfer service error type
#[derive(Debug, Error)]
pub enum Error {
    /// Error when an account is created with an id that already exists
    #[error("Duplicate account id: {0}")]
    DuplicateAccountId(String),

    /// Error when a transfer request is malformed (self-transfer, non-positive amount)
    #[error("Invalid transfer: {0}")]
    InvalidTransfer(String),

    /// Error when an account cannot be found
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Error when an account has insufficient funds for a transfer
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    /// Error when exclusive access to both accounts could not be acquired in time
    #[error("Transfer timeout: {0}")]
    TransferTimeout(String),

    /// Generic validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Decimal conversion error
    #[error("Decimal conversion error: {0}")]
    DecimalError(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait to add context to error results
pub trait ErrorExt<T> {
    /// Add context information to an error
    fn with_context<C, F>(self, context_fn: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Display;
}

impl<T> ErrorExt<T> for Result<T> {
    fn with_context<C, F>(self, context_fn: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Display,
    {
        self.map_err(|e| {
            let context = context_fn().to_string();
            match e {
                Error::DuplicateAccountId(msg) => Error::DuplicateAccountId(format!("{}: {}", context, msg)),
                Error::InvalidTransfer(msg) => Error::InvalidTransfer(format!("{}: {}", context, msg)),
                Error::AccountNotFound(msg) => Error::AccountNotFound(format!("{}: {}", context, msg)),
                Error::InsufficientBalance(msg) => Error::InsufficientBalance(format!("{}: {}", context, msg)),
                Error::TransferTimeout(msg) => Error::TransferTimeout(format!("{}: {}", context, msg)),
                Error::ValidationError(msg) => Error::ValidationError(format!("{}: {}", context, msg)),
                Error::ConfigurationError(msg) => Error::ConfigurationError(format!("{}: {}", context, msg)),
                Error::Internal(msg) => Error::Internal(format!("{}: {}", context, msg)),
                Error::Serialization(e) => Error::Serialization(e),
                Error::DecimalError(msg) => Error::DecimalError(format!("{}: {}", context, msg)),
            }
        })
    }
}

/// Convert string messages into an error
impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::Internal(message)
    }
}

/// Convert static string references into an error
impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::Internal(message.to_string())
    }
}

/// From rust_decimal::Error
impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::DecimalError(err.to_string())
    }
}
