/// Subscription persistence operations
///
/// Ownership is stored on every row (`user_id`) but not enforced here: the
/// repository fetches by id and the API layer applies the owner check.
use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use sdk::{BillingCycle, SubscriptionStatus};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const COLUMNS: &str = "id, user_id, service_name, price_cents, currency, billing_cycle, status, \
    trial_ends_on, next_billing_on, remind_days_before, reminder_sent_at, notes, created_at, updated_at";

/// Subscription record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub service_name: String,
    pub price_cents: i64,
    pub currency: String,
    pub billing_cycle: BillingCycle,
    pub status: SubscriptionStatus,
    pub trial_ends_on: Option<NaiveDate>,
    pub next_billing_on: Option<NaiveDate>,
    pub remind_days_before: i64,
    pub reminder_sent_at: Option<i64>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Subscription {
    fn from_row(r: &SqliteRow) -> Result<Self> {
        let billing_cycle: String = r.get("billing_cycle");
        let status: String = r.get("status");

        Ok(Self {
            id: r.get("id"),
            user_id: r.get("user_id"),
            service_name: r.get("service_name"),
            price_cents: r.get("price_cents"),
            currency: r.get("currency"),
            billing_cycle: billing_cycle.parse()?,
            status: status.parse()?,
            trial_ends_on: r.get("trial_ends_on"),
            next_billing_on: r.get("next_billing_on"),
            remind_days_before: r.get("remind_days_before"),
            reminder_sent_at: r.get("reminder_sent_at"),
            notes: r.get("notes"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        })
    }

    /// First day on which the trial reminder may go out
    pub fn reminder_window_start(&self) -> Option<NaiveDate> {
        let ends = self.trial_ends_on?;
        let lead = Days::new(self.remind_days_before.max(0) as u64);
        Some(ends.checked_sub_days(lead).unwrap_or(NaiveDate::MIN))
    }

    /// A reminder is due while the trial is still running, inside the lead
    /// window, and none has been sent yet.
    pub fn reminder_due(&self, today: NaiveDate) -> bool {
        if self.status != SubscriptionStatus::Trial || self.reminder_sent_at.is_some() {
            return false;
        }
        match (self.reminder_window_start(), self.trial_ends_on) {
            (Some(start), Some(ends)) => start <= today && today <= ends,
            _ => false,
        }
    }
}

/// Subscription repository for database operations
pub struct SubscriptionRepository {
    pool: SqlitePool,
}

impl SubscriptionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, sub: &Subscription) -> Result<()> {
        sqlx::query(
            "INSERT INTO subscriptions (id, user_id, service_name, price_cents, currency, billing_cycle, status, \
             trial_ends_on, next_billing_on, remind_days_before, reminder_sent_at, notes, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&sub.id)
        .bind(&sub.user_id)
        .bind(&sub.service_name)
        .bind(sub.price_cents)
        .bind(&sub.currency)
        .bind(sub.billing_cycle.as_str())
        .bind(sub.status.as_str())
        .bind(sub.trial_ends_on)
        .bind(sub.next_billing_on)
        .bind(sub.remind_days_before)
        .bind(sub.reminder_sent_at)
        .bind(&sub.notes)
        .bind(sub.created_at)
        .bind(sub.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to create subscription")?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Subscription>> {
        let row = sqlx::query(&format!("SELECT {} FROM subscriptions WHERE id = ?", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch subscription")?;

        row.as_ref().map(Subscription::from_row).transpose()
    }

    /// All subscriptions of a user, soonest trial end first
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Subscription>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = ? \
             ORDER BY trial_ends_on IS NULL, trial_ends_on ASC, created_at ASC",
            COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch subscriptions")?;

        rows.iter().map(Subscription::from_row).collect()
    }

    /// Write every mutable column of `sub` back to its row
    pub async fn update(&self, sub: &Subscription) -> Result<()> {
        sqlx::query(
            "UPDATE subscriptions SET service_name = ?, price_cents = ?, currency = ?, billing_cycle = ?, \
             status = ?, trial_ends_on = ?, next_billing_on = ?, remind_days_before = ?, \
             reminder_sent_at = ?, notes = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&sub.service_name)
        .bind(sub.price_cents)
        .bind(&sub.currency)
        .bind(sub.billing_cycle.as_str())
        .bind(sub.status.as_str())
        .bind(sub.trial_ends_on)
        .bind(sub.next_billing_on)
        .bind(sub.remind_days_before)
        .bind(sub.reminder_sent_at)
        .bind(&sub.notes)
        .bind(sub.updated_at)
        .bind(&sub.id)
        .execute(&self.pool)
        .await
        .context("Failed to update subscription")?;

        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete subscription")?;

        Ok(result.rows_affected() > 0)
    }

    /// Trials of a user ending within `[from, to]`
    pub async fn trials_ending_between(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Subscription>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = ? AND status = 'trial' \
             AND trial_ends_on >= ? AND trial_ends_on <= ? ORDER BY trial_ends_on ASC",
            COLUMNS
        ))
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch upcoming trials")?;

        rows.iter().map(Subscription::from_row).collect()
    }

    /// Trials without a sent reminder that haven't ended before `today`.
    /// Narrowed further with [`Subscription::reminder_due`].
    pub async fn reminder_candidates(
        &self,
        user_id: Option<&str>,
        today: NaiveDate,
    ) -> Result<Vec<Subscription>> {
        let rows = match user_id {
            Some(user_id) => {
                sqlx::query(&format!(
                    "SELECT {} FROM subscriptions WHERE status = 'trial' AND reminder_sent_at IS NULL \
                     AND trial_ends_on >= ? AND user_id = ? ORDER BY trial_ends_on ASC",
                    COLUMNS
                ))
                .bind(today)
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM subscriptions WHERE status = 'trial' AND reminder_sent_at IS NULL \
                     AND trial_ends_on >= ? ORDER BY trial_ends_on ASC",
                    COLUMNS
                ))
                .bind(today)
                .fetch_all(&self.pool)
                .await
            }
        }
        .context("Failed to fetch reminder candidates")?;

        rows.iter().map(Subscription::from_row).collect()
    }

    /// Mark the reminder as sent unless another check already did.
    /// Returns `false` when the row was claimed elsewhere.
    pub async fn claim_reminder(&self, id: &str, sent_at: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE subscriptions SET reminder_sent_at = ? WHERE id = ? AND reminder_sent_at IS NULL",
        )
        .bind(sent_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to claim reminder")?;

        Ok(result.rows_affected() > 0)
    }

    /// Undo a claim whose email was never delivered
    pub async fn release_reminder(&self, id: &str, sent_at: i64) -> Result<()> {
        sqlx::query(
            "UPDATE subscriptions SET reminder_sent_at = NULL WHERE id = ? AND reminder_sent_at = ?",
        )
        .bind(id)
        .bind(sent_at)
        .execute(&self.pool)
        .await
        .context("Failed to release reminder")?;

        Ok(())
    }
}
