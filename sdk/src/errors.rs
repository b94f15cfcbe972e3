//! Error types and handling
//!
//! This module provides the error type shared by the Subtrack engine and its
//! HTTP surface. Every error implements the `ErrorExt` trait which provides a
//! user-friendly hint and indicates whether the error is recoverable.
//!
//! # Security
//!
//! Hints are static strings. They never include:
//! - API keys, session tokens or password material
//! - File system paths
//! - Raw upstream response bodies

use thiserror::Error;

/// Trait for Subtrack error extensions
///
/// Adds user-facing context to errors: a hint that is safe to return from the
/// HTTP API and a flag telling callers whether retrying can succeed.
pub trait ErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or fixed by the caller. Non-recoverable
    /// errors need operator intervention (bad configuration, broken storage).
    fn is_recoverable(&self) -> bool;
}

/// Main application error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Database**: SQLite operation failures
/// - **Request**: Invalid input, missing authentication, missing records
/// - **LLM Provider**: Completion API failures and timeouts
/// - **Email**: Transactional email API failures
///
/// # Examples
///
/// ```
/// use sdk::errors::{AppError, ErrorExt};
///
/// let error = AppError::NotFound("subscription".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = AppError::Config("bad port".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum AppError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    // Request errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // LLM provider errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    #[error("LLM call timed out after {0}s")]
    LLMTimeout(u64),

    // Email errors
    #[error("Email delivery failed: {0}")]
    Email(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),
}

impl ErrorExt for AppError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::Database(_) => "Database operation failed. Try again later",

            Self::InvalidInput(_) => "Check the request fields and try again",
            Self::Unauthorized(_) => "Log in again to get a fresh session",
            Self::NotFound(_) => "The requested record does not exist",
            Self::Conflict(_) => "A record with these details already exists",

            Self::LLMProvider(_) => "Cancellation guide service unavailable. Try again later",
            Self::LLMTimeout(_) => "Cancellation guide took too long to generate. Try again",

            Self::Email(_) => "Reminder email could not be sent. It will be retried",
            Self::Network(_) => "Network operation failed. Check your connection",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}
