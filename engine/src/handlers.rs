//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - serve: Run the HTTP API until Ctrl-C
//! - reminders: Send due trial reminders for every user
//! - guide: Print (and cache) cancellation steps for a service
//! - normalize: Turn free text into exactly ten steps
//! - doctor: Validate configuration and check dependencies

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

use crate::api::{self, AppState};
use crate::config::Config;
use crate::db::Database;
use crate::llm::{CompletionProvider, OpenAIProvider};
use crate::mailer;
use crate::reminders::{today, ReminderService};
use crate::secrets::{SecretStore, EMAIL_API_KEY, OPENAI_API_KEY};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

async fn open_database(config: &Config) -> Result<Database> {
    Database::new(&config.db_path())
        .await
        .context("Failed to open database")
}

fn completion_provider(config: &Config) -> Arc<dyn CompletionProvider> {
    Arc::new(OpenAIProvider::new(
        config.llm.clone(),
        SecretStore::from_env(),
    ))
}

/// Run the HTTP API until Ctrl-C, then close the database
pub async fn handle_serve(
    config: &Config,
    host: Option<String>,
    port: Option<u16>,
    format: OutputFormat,
) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    let db = open_database(config).await?;
    let state = AppState::new(
        config,
        db.clone(),
        completion_provider(config),
        mailer::from_config(&config.email, SecretStore::from_env()),
    );

    match state.auth.purge_expired().await {
        Ok(0) => {}
        Ok(n) => tracing::info!("Removed {} expired sessions", n),
        Err(e) => tracing::warn!("Could not purge expired sessions: {}", e),
    }

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind to {}:{}", host, port))?;
    let addr = listener.local_addr()?;

    match format {
        OutputFormat::Text => println!("Subtrack API listening on http://{}", addr),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&json!({ "status": "listening", "addr": addr.to_string() }))?
        ),
    }

    let result = api::serve(listener, state, shutdown_signal()).await;

    db.close().await.context("Failed to close database")?;
    result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl-C");
}

/// Send due reminders for all users
pub async fn handle_reminders(
    config: &Config,
    date: Option<NaiveDate>,
    format: OutputFormat,
) -> Result<()> {
    let date = date.unwrap_or_else(today);
    let db = open_database(config).await?;
    let service = ReminderService::new(
        db.clone(),
        mailer::from_config(&config.email, SecretStore::from_env()),
    );

    let report = service.check(None, date).await?;
    db.close().await?;

    match format {
        OutputFormat::Text => {
            println!("Reminder check for {}", date);
            println!("  Due:    {}", report.checked);
            println!("  Sent:   {}", report.sent);
            println!("  Failed: {}", report.failed);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

/// Print cancellation steps, generating and caching them if needed
pub async fn handle_guide(
    config: &Config,
    service: String,
    refresh: bool,
    format: OutputFormat,
) -> Result<()> {
    let db = open_database(config).await?;
    let guides = crate::guides::GuideService::new(
        db.clone(),
        completion_provider(config),
        std::time::Duration::from_secs(config.llm.timeout_secs),
    );

    let guide = guides.get_or_generate(&service, refresh).await;
    db.close().await?;
    let guide = guide?;

    match format {
        OutputFormat::Text => {
            println!("How to cancel {}:", guide.service_name);
            println!();
            for (i, step) in guide.steps.iter().enumerate() {
                println!("{:>3}. {}", i + 1, step);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&guide)?),
    }

    Ok(())
}

/// Normalize text from a file or stdin
pub async fn handle_normalize(file: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    let text = match file {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read stdin")?;
            buf
        }
    };

    let steps = sdk::normalize(&text);

    match format {
        OutputFormat::Text => {
            for (i, step) in steps.iter().enumerate() {
                println!("{:>3}. {}", i + 1, step);
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "steps": steps,
                "filler": steps.filler_count(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Validate configuration, database and API keys
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let secrets = SecretStore::from_env();
    let mut issues = Vec::new();
    let mut checks = Vec::new();

    match config.validate() {
        Ok(()) => checks.push(("Configuration", "Valid")),
        Err(e) => {
            checks.push(("Configuration", "Invalid"));
            issues.push(e.to_string());
        }
    }

    if config.core.data_dir.exists() {
        checks.push(("Data directory", "Exists"));
    } else {
        checks.push(("Data directory", "Missing"));
        issues.push(format!(
            "Data directory does not exist: {}",
            config.core.data_dir.display()
        ));
    }

    match Database::new(&config.db_path()).await {
        Ok(db) => {
            checks.push(("Database", "OK"));
            if let Err(e) = db.close().await {
                issues.push(format!("Database did not close cleanly: {}", e));
            }
        }
        Err(e) => {
            checks.push(("Database", "Failed"));
            issues.push(format!("Cannot open database: {:#}", e));
        }
    }

    if secrets.has(OPENAI_API_KEY) {
        checks.push(("Completion API key", "Configured"));
    } else {
        checks.push(("Completion API key", "Not configured"));
        issues.push(format!(
            "{} is not set; cancellation guides cannot be generated",
            OPENAI_API_KEY
        ));
    }

    if !config.email.enabled {
        checks.push(("Email", "Disabled (reminders are logged)"));
    } else if secrets.has(EMAIL_API_KEY) {
        checks.push(("Email", "Configured"));
    } else {
        checks.push(("Email", "Missing API key"));
        issues.push(format!(
            "email.enabled is true but {} is not set",
            EMAIL_API_KEY
        ));
    }

    match format {
        OutputFormat::Text => {
            println!("Subtrack Diagnostics");
            println!("====================");
            println!();

            println!("System Checks:");
            for (check, status) in &checks {
                println!("  {:<22} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
