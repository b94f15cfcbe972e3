use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use sdk::{BillingCycle, SubscriptionStatus};
use subtrack_engine::api::extract::bearer_token;
use subtrack_engine::config::Config;
use subtrack_engine::db::guides::service_key;
use subtrack_engine::db::Subscription;

fn trial(ends: NaiveDate, remind_days_before: i64) -> Subscription {
    Subscription {
        id: "s".to_string(),
        user_id: "u".to_string(),
        service_name: "Service".to_string(),
        price_cents: 0,
        currency: "USD".to_string(),
        billing_cycle: BillingCycle::Monthly,
        status: SubscriptionStatus::Trial,
        trial_ends_on: Some(ends),
        next_billing_on: None,
        remind_days_before,
        reminder_sent_at: None,
        notes: None,
        created_at: 0,
        updated_at: 0,
    }
}

proptest! {
    #[test]
    fn test_config_serialization_round_trip(
        log_level in "error|warn|info|debug|trace",
        port in 1..=u16::MAX,
        ttl in 1..=720u32,
        timeout_secs in 1..=300u64,
        days_before in 0..=30u32,
        enabled in any::<bool>(),
    ) {
        let mut config = Config::default_config();
        config.core.log_level = log_level.clone();
        config.server.port = port;
        config.auth.session_ttl_hours = ttl;
        config.llm.timeout_secs = timeout_secs;
        config.reminders.default_days_before = days_before;
        config.email.enabled = enabled;

        prop_assert!(config.validate().is_ok());

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();

        prop_assert_eq!(parsed.core.log_level, log_level);
        prop_assert_eq!(parsed.server.port, port);
        prop_assert_eq!(parsed.auth.session_ttl_hours, ttl);
        prop_assert_eq!(parsed.llm.timeout_secs, timeout_secs);
        prop_assert_eq!(parsed.reminders.default_days_before, days_before);
        prop_assert_eq!(parsed.email.enabled, enabled);
    }

    #[test]
    fn test_service_key_is_stable(name in "[ \\t]{0,3}[A-Za-z0-9+ ]{1,30}[ \\t]{0,3}") {
        let key = service_key(&name);
        prop_assert_eq!(service_key(&key), key.clone());
        prop_assert_eq!(service_key(&name.to_uppercase()), key.clone());
        prop_assert_eq!(key.trim(), key.as_str());
    }

    #[test]
    fn test_reminder_due_only_inside_window(
        lead in 0..=30i64,
        offset in -40..=40i64,
    ) {
        let ends = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let today = if offset >= 0 {
            ends.checked_add_days(Days::new(offset as u64)).unwrap()
        } else {
            ends.checked_sub_days(Days::new((-offset) as u64)).unwrap()
        };

        let sub = trial(ends, lead);
        // offset is today - ends; due while -lead <= offset <= 0
        prop_assert_eq!(sub.reminder_due(today), -lead <= offset && offset <= 0);

        let mut sent = sub.clone();
        sent.reminder_sent_at = Some(1);
        prop_assert!(!sent.reminder_due(today));

        let mut active = sub;
        active.status = SubscriptionStatus::Active;
        prop_assert!(!active.reminder_due(today));
    }

    #[test]
    fn test_bearer_token_round_trip(token in "[A-Za-z0-9]{1,64}") {
        let header = format!("Bearer {}", token);
        prop_assert_eq!(bearer_token(&header), Some(token.as_str()));
        prop_assert_eq!(bearer_token(&token), None);
    }
}
