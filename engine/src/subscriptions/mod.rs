//! Subscription management
//!
//! CRUD over a user's subscriptions. Every call takes the caller's user id
//! and only ever touches rows owned by that user; rows owned by someone else
//! are reported as not found.

use chrono::{Days, NaiveDate};
use sdk::errors::AppError;
use sdk::{BillingCycle, SubscriptionStatus};
use serde::Deserialize;
use tracing::{info, warn};

use crate::db::{db_error, unix_now, Database, Subscription};
use crate::guides::MAX_SERVICE_NAME_LEN;

const MAX_REMIND_DAYS: i64 = 30;
const MAX_UPCOMING_DAYS: u32 = 365;
const MAX_NOTES_LEN: usize = 2000;

/// Fields accepted when creating a subscription
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NewSubscription {
    pub service_name: String,
    #[serde(default)]
    pub price_cents: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub billing_cycle: BillingCycle,
    #[serde(default)]
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub trial_ends_on: Option<NaiveDate>,
    #[serde(default)]
    pub next_billing_on: Option<NaiveDate>,
    #[serde(default)]
    pub remind_days_before: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SubscriptionUpdate {
    pub service_name: Option<String>,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub billing_cycle: Option<BillingCycle>,
    pub status: Option<SubscriptionStatus>,
    pub trial_ends_on: Option<NaiveDate>,
    pub next_billing_on: Option<NaiveDate>,
    pub remind_days_before: Option<i64>,
    /// An empty string clears the notes
    pub notes: Option<String>,
}

fn invalid(msg: impl Into<String>) -> AppError {
    AppError::InvalidInput(msg.into())
}

/// Check a subscription's fields before it is written
pub fn validate(sub: &Subscription) -> Result<(), AppError> {
    let name = sub.service_name.trim();
    if name.is_empty() {
        return Err(invalid("service_name must not be empty"));
    }
    if name.chars().count() > MAX_SERVICE_NAME_LEN {
        return Err(invalid(format!(
            "service_name must be at most {} characters",
            MAX_SERVICE_NAME_LEN
        )));
    }
    if sub.price_cents < 0 {
        return Err(invalid("price_cents must be >= 0"));
    }
    if sub.currency.len() != 3 || !sub.currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(invalid("currency must be a 3-letter code such as USD"));
    }
    if !(0..=MAX_REMIND_DAYS).contains(&sub.remind_days_before) {
        return Err(invalid(format!(
            "remind_days_before must be between 0 and {}",
            MAX_REMIND_DAYS
        )));
    }
    if sub.status == SubscriptionStatus::Trial && sub.trial_ends_on.is_none() {
        return Err(invalid("trial subscriptions need trial_ends_on"));
    }
    if sub.notes.as_ref().is_some_and(|n| n.len() > MAX_NOTES_LEN) {
        return Err(invalid(format!(
            "notes must be at most {} bytes",
            MAX_NOTES_LEN
        )));
    }
    Ok(())
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes.filter(|n| !n.trim().is_empty())
}

/// Subscription CRUD scoped to one user per call
#[derive(Clone)]
pub struct SubscriptionService {
    db: Database,
    default_days_before: u32,
}

impl SubscriptionService {
    pub fn new(db: Database, default_days_before: u32) -> Self {
        Self {
            db,
            default_days_before,
        }
    }

    pub async fn create(
        &self,
        user_id: &str,
        input: NewSubscription,
    ) -> Result<Subscription, AppError> {
        let now = unix_now().map_err(db_error)?;
        let sub = Subscription {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            service_name: input.service_name.trim().to_string(),
            price_cents: input.price_cents,
            currency: input
                .currency
                .map(|c| c.trim().to_uppercase())
                .unwrap_or_else(|| "USD".to_string()),
            billing_cycle: input.billing_cycle,
            status: input.status,
            trial_ends_on: input.trial_ends_on,
            next_billing_on: input.next_billing_on,
            remind_days_before: input
                .remind_days_before
                .unwrap_or(i64::from(self.default_days_before)),
            reminder_sent_at: None,
            notes: normalize_notes(input.notes),
            created_at: now,
            updated_at: now,
        };

        validate(&sub)?;
        self.db.subscriptions().insert(&sub).await.map_err(db_error)?;
        info!(subscription = %sub.id, service = %sub.service_name, "Created subscription");

        Ok(sub)
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<Subscription>, AppError> {
        self.db
            .subscriptions()
            .list_for_user(user_id)
            .await
            .map_err(db_error)
    }

    /// Fetch a subscription the caller owns
    pub async fn get(&self, user_id: &str, id: &str) -> Result<Subscription, AppError> {
        let sub = self
            .db
            .subscriptions()
            .get(id)
            .await
            .map_err(db_error)?
            .ok_or_else(|| AppError::NotFound(format!("subscription {}", id)))?;

        if sub.user_id != user_id {
            warn!(subscription = %id, "Rejected access to another user's subscription");
            return Err(AppError::NotFound(format!("subscription {}", id)));
        }

        Ok(sub)
    }

    pub async fn update(
        &self,
        user_id: &str,
        id: &str,
        patch: SubscriptionUpdate,
    ) -> Result<Subscription, AppError> {
        let mut sub = self.get(user_id, id).await?;
        let reminder_inputs = (sub.trial_ends_on, sub.remind_days_before);

        if let Some(name) = patch.service_name {
            sub.service_name = name.trim().to_string();
        }
        if let Some(price) = patch.price_cents {
            sub.price_cents = price;
        }
        if let Some(currency) = patch.currency {
            sub.currency = currency.trim().to_uppercase();
        }
        if let Some(cycle) = patch.billing_cycle {
            sub.billing_cycle = cycle;
        }
        if let Some(status) = patch.status {
            sub.status = status;
        }
        if let Some(ends) = patch.trial_ends_on {
            sub.trial_ends_on = Some(ends);
        }
        if let Some(next) = patch.next_billing_on {
            sub.next_billing_on = Some(next);
        }
        if let Some(days) = patch.remind_days_before {
            sub.remind_days_before = days;
        }
        if let Some(notes) = patch.notes {
            sub.notes = normalize_notes(Some(notes));
        }

        // A moved deadline deserves a fresh reminder
        if (sub.trial_ends_on, sub.remind_days_before) != reminder_inputs {
            sub.reminder_sent_at = None;
        }

        validate(&sub)?;
        sub.updated_at = unix_now().map_err(db_error)?;
        self.db.subscriptions().update(&sub).await.map_err(db_error)?;

        Ok(sub)
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> Result<(), AppError> {
        self.get(user_id, id).await?;
        self.db.subscriptions().delete(id).await.map_err(db_error)?;
        info!(subscription = %id, "Deleted subscription");
        Ok(())
    }

    pub async fn cancel(&self, user_id: &str, id: &str) -> Result<Subscription, AppError> {
        let mut sub = self.get(user_id, id).await?;
        sub.status = SubscriptionStatus::Cancelled;
        sub.updated_at = unix_now().map_err(db_error)?;
        self.db.subscriptions().update(&sub).await.map_err(db_error)?;
        info!(subscription = %id, "Cancelled subscription");
        Ok(sub)
    }

    /// Trials ending within `days` days of `today`, inclusive
    pub async fn upcoming(
        &self,
        user_id: &str,
        today: NaiveDate,
        days: u32,
    ) -> Result<Vec<Subscription>, AppError> {
        if days > MAX_UPCOMING_DAYS {
            return Err(invalid(format!(
                "days must be between 0 and {}",
                MAX_UPCOMING_DAYS
            )));
        }
        let until = today
            .checked_add_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MAX);

        self.db
            .subscriptions()
            .trials_ending_between(user_id, today, until)
            .await
            .map_err(db_error)
    }
}
