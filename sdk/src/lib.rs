//! Subtrack SDK
//!
//! Shared library providing the error type, subscription value types and the
//! cancellation step normalizer. It performs no I/O and is used by the engine
//! and its tests.

/// Error types and handling
pub mod errors;

/// Cancellation step normalization
pub mod steps;

/// Subscription value types
pub mod types;

// Re-export commonly used types
pub use errors::{AppError, ErrorExt};
pub use steps::{normalize, CancellationSteps, STEP_COUNT};
pub use types::{BillingCycle, SubscriptionStatus};
