//! Subtrack Engine Library
//!
//! This library provides the core functionality of Subtrack.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// Database persistence module
pub mod db;

/// Accounts and sessions
pub mod auth;

/// Subscription management
pub mod subscriptions;

/// Completion provider abstraction layer
pub mod llm;

/// Cancellation guide lookup and generation
pub mod guides;

/// Email delivery
pub mod mailer;

/// Trial-ending reminders
pub mod reminders;

/// HTTP API
pub mod api;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
