//! Trial-ending reminders
//!
//! Reminders are checked on request (HTTP for one user, CLI for everyone).
//! Each due subscription gets one email. A check claims the row by setting
//! `reminder_sent_at` before sending, so overlapping checks never both send;
//! the claim is released when the mailer fails and the next check retries.

use chrono::NaiveDate;
use sdk::errors::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::{db_error, unix_now, Database, Subscription};
use crate::mailer::{Email, Mailer};

/// Outcome of one reminder check
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderReport {
    /// Due subscriptions this check claimed
    pub checked: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Current local date
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Reminder text for a due subscription
pub fn reminder_email(sub: &Subscription, to: &str, today: NaiveDate) -> Email {
    let ends = sub
        .trial_ends_on
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "soon".to_string());
    let days_left = sub
        .trial_ends_on
        .map(|d| (d - today).num_days())
        .unwrap_or(0);

    let when = match days_left {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        n => format!("in {} days", n),
    };

    let text = format!(
        "Your free trial of {service} ends {when} ({ends}).\n\n\
         After that you will be charged {price} {currency} per {cycle}.\n\
         If you don't want to keep it, look up the cancellation steps for {service} in Subtrack.\n",
        service = sub.service_name,
        when = when,
        ends = ends,
        price = format_price(sub.price_cents),
        currency = sub.currency,
        cycle = cycle_noun(sub),
    );

    Email {
        to: to.to_string(),
        subject: format!("Your {} trial ends {}", sub.service_name, when),
        text,
    }
}

fn format_price(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

fn cycle_noun(sub: &Subscription) -> &'static str {
    match sub.billing_cycle {
        sdk::BillingCycle::Weekly => "week",
        sdk::BillingCycle::Monthly => "month",
        sdk::BillingCycle::Yearly => "year",
    }
}

/// Finds due reminders and sends them
#[derive(Clone)]
pub struct ReminderService {
    db: Database,
    mailer: Arc<dyn Mailer>,
}

impl ReminderService {
    pub fn new(db: Database, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, mailer }
    }

    /// Send reminders that are due on `today`, for one user or for all users
    pub async fn check(
        &self,
        user_id: Option<&str>,
        today: NaiveDate,
    ) -> Result<ReminderReport, AppError> {
        let candidates = self
            .db
            .subscriptions()
            .reminder_candidates(user_id, today)
            .await
            .map_err(db_error)?;

        let mut report = ReminderReport::default();

        for sub in candidates.iter().filter(|s| s.reminder_due(today)) {
            let claimed_at = unix_now().map_err(db_error)?;
            let claimed = self
                .db
                .subscriptions()
                .claim_reminder(&sub.id, claimed_at)
                .await
                .map_err(db_error)?;
            if !claimed {
                debug!(subscription = %sub.id, "Reminder already claimed by another check");
                continue;
            }

            report.checked += 1;

            match self.send_one(sub, today).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    warn!(subscription = %sub.id, "Reminder not sent: {}", e);
                    report.failed += 1;
                    self.db
                        .subscriptions()
                        .release_reminder(&sub.id, claimed_at)
                        .await
                        .map_err(db_error)?;
                }
            }
        }

        info!(
            checked = report.checked,
            sent = report.sent,
            failed = report.failed,
            mailer = %self.mailer.name(),
            "Reminder check finished"
        );

        Ok(report)
    }

    async fn send_one(&self, sub: &Subscription, today: NaiveDate) -> Result<(), AppError> {
        let owner = self
            .db
            .users()
            .get_user(&sub.user_id)
            .await
            .map_err(db_error)?
            .ok_or_else(|| AppError::NotFound(format!("user {}", sub.user_id)))?;

        let email = reminder_email(sub, &owner.email, today);
        self.mailer.send(&email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::{BillingCycle, SubscriptionStatus};

    fn sub(ends: NaiveDate) -> Subscription {
        Subscription {
            id: "s".to_string(),
            user_id: "u".to_string(),
            service_name: "StreamFlix".to_string(),
            price_cents: 1599,
            currency: "USD".to_string(),
            billing_cycle: BillingCycle::Monthly,
            status: SubscriptionStatus::Trial,
            trial_ends_on: Some(ends),
            next_billing_on: None,
            remind_days_before: 3,
            reminder_sent_at: None,
            notes: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_reminder_email_text() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let ends = NaiveDate::from_ymd_opt(2026, 5, 3).unwrap();

        let email = reminder_email(&sub(ends), "me@example.com", today);

        assert_eq!(email.to, "me@example.com");
        assert_eq!(email.subject, "Your StreamFlix trial ends in 2 days");
        assert!(email.text.contains("2026-05-03"));
        assert!(email.text.contains("15.99 USD per month"));
    }

    #[test]
    fn test_reminder_email_tomorrow_and_today() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();

        let email = reminder_email(&sub(today), "me@example.com", today);
        assert!(email.subject.ends_with("today"));

        let tomorrow = today.succ_opt().unwrap();
        let email = reminder_email(&sub(tomorrow), "me@example.com", today);
        assert!(email.subject.ends_with("tomorrow"));
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0), "0.00");
        assert_eq!(format_price(5), "0.05");
        assert_eq!(format_price(1299), "12.99");
    }
}
