//! Cancellation guide service
//!
//! Looks up cached cancellation guides and generates missing ones:
//!
//! 1. Validate and normalize the service name
//! 2. Return the cached guide unless a refresh is requested
//! 3. Ask the completion provider for ten numbered steps, bounded by the
//!    configured timeout
//! 4. Normalize the completion to exactly ten steps and store it
//!
//! When the provider fails or the timeout fires, nothing is normalized or
//! stored and the error is returned to the caller.

use sdk::errors::AppError;
use sdk::{normalize, CancellationSteps, STEP_COUNT};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::db::guides::service_key;
use crate::db::{db_error, unix_now, CancellationGuide, Database};
use crate::llm::{CompletionProvider, Message};

/// Longest accepted service name, in characters
pub const MAX_SERVICE_NAME_LEN: usize = 100;

/// Trim a service name and check it is usable as a guide key
pub fn validate_service_name(service_name: &str) -> Result<&str, AppError> {
    let trimmed = service_name.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(
            "service_name must not be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_SERVICE_NAME_LEN {
        return Err(AppError::InvalidInput(format!(
            "service_name must be at most {} characters",
            MAX_SERVICE_NAME_LEN
        )));
    }
    Ok(trimmed)
}

/// Conversation asking for numbered cancellation steps
pub fn build_prompt(service_name: &str) -> Vec<Message> {
    vec![
        Message::system(
            "You write short, accurate instructions for cancelling online subscriptions. \
             Answer with a numbered list only.",
        ),
        Message::user(format!(
            "List exactly {count} numbered steps to cancel a {service} subscription. \
             Put each step on its own line in the form \"<number>. <instruction>\" \
             with no introduction or closing remarks.",
            count = STEP_COUNT,
            service = service_name
        )),
    ]
}

/// Cancellation guide lookup and generation
#[derive(Clone)]
pub struct GuideService {
    db: Database,
    provider: Arc<dyn CompletionProvider>,
    timeout: Duration,
}

impl GuideService {
    pub fn new(db: Database, provider: Arc<dyn CompletionProvider>, timeout: Duration) -> Self {
        Self {
            db,
            provider,
            timeout,
        }
    }

    /// Cached guide for a service, if one was generated before
    pub async fn lookup(&self, service_name: &str) -> Result<Option<CancellationGuide>, AppError> {
        let name = validate_service_name(service_name)?;

        self.db
            .guides()
            .get_by_key(&service_key(name))
            .await
            .map_err(db_error)
    }

    /// Cached guide, or a freshly generated one when missing or `refresh` is set
    pub async fn get_or_generate(
        &self,
        service_name: &str,
        refresh: bool,
    ) -> Result<CancellationGuide, AppError> {
        let name = validate_service_name(service_name)?;
        let key = service_key(name);

        if !refresh {
            if let Some(guide) = self.db.guides().get_by_key(&key).await.map_err(db_error)? {
                debug!(service = %key, "Cancellation guide cache hit");
                return Ok(guide);
            }
        }

        let steps = self.generate_steps(name).await?;

        let guide = CancellationGuide {
            id: uuid::Uuid::new_v4().to_string(),
            service_key: key,
            service_name: name.to_string(),
            steps,
            model: self.provider.model().to_string(),
            created_at: unix_now().map_err(db_error)?,
        };

        let stored = self.db.guides().upsert(&guide).await.map_err(db_error)?;
        info!(service = %stored.service_key, "Stored cancellation guide");

        Ok(stored)
    }

    /// Ask the provider for steps and normalize the answer, without caching
    pub async fn generate_steps(&self, service_name: &str) -> Result<CancellationSteps, AppError> {
        let messages = build_prompt(service_name);

        debug!(
            service = %service_name,
            provider = %self.provider.name(),
            timeout_ms = self.timeout.as_millis() as u64,
            "Generating cancellation steps"
        );

        // Dropping the future on timeout cancels the in-flight request
        let text = match timeout(self.timeout, self.provider.complete(&messages)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                error!("Completion call failed: {}", e);
                return Err(e.into());
            }
            Err(_) => {
                error!("Completion call timed out after {:?}", self.timeout);
                return Err(AppError::LLMTimeout(self.timeout.as_secs()));
            }
        };

        let steps = normalize(&text);
        if steps.filler_count() > 0 {
            debug!(
                filler = steps.filler_count(),
                "Completion had fewer than {} steps",
                STEP_COUNT
            );
        }

        Ok(steps)
    }
}
