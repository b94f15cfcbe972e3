/// Cancellation guide cache
///
/// Guides are keyed by the normalized service name so "Netflix" and
/// " netflix " share one entry. Steps are stored as a JSON array.
use anyhow::{Context, Result};
use sdk::CancellationSteps;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Cache key for a service name: trimmed and lower-cased
pub fn service_key(service_name: &str) -> String {
    service_name.trim().to_lowercase()
}

/// Cancellation guide record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CancellationGuide {
    pub id: String,
    pub service_key: String,
    pub service_name: String,
    pub steps: CancellationSteps,
    pub model: String,
    pub created_at: i64,
}

impl CancellationGuide {
    fn from_row(r: &SqliteRow) -> Result<Self> {
        let steps_json: String = r.get("steps");
        let steps: CancellationSteps =
            serde_json::from_str(&steps_json).context("Stored guide steps are malformed")?;

        Ok(Self {
            id: r.get("id"),
            service_key: r.get("service_key"),
            service_name: r.get("service_name"),
            steps,
            model: r.get("model"),
            created_at: r.get("created_at"),
        })
    }
}

/// Guide repository for database operations
pub struct GuideRepository {
    pool: SqlitePool,
}

impl GuideRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_key(&self, key: &str) -> Result<Option<CancellationGuide>> {
        let row = sqlx::query(
            "SELECT id, service_key, service_name, steps, model, created_at \
             FROM cancellation_guides WHERE service_key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch cancellation guide")?;

        row.as_ref().map(CancellationGuide::from_row).transpose()
    }

    /// Insert a guide, replacing the steps of an existing guide for the same key.
    /// Returns the stored row.
    pub async fn upsert(&self, guide: &CancellationGuide) -> Result<CancellationGuide> {
        let steps_json =
            serde_json::to_string(&guide.steps).context("Failed to serialize guide steps")?;

        sqlx::query(
            "INSERT INTO cancellation_guides (id, service_key, service_name, steps, model, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(service_key) DO UPDATE SET \
             steps = excluded.steps, model = excluded.model, created_at = excluded.created_at",
        )
        .bind(&guide.id)
        .bind(&guide.service_key)
        .bind(&guide.service_name)
        .bind(&steps_json)
        .bind(&guide.model)
        .bind(guide.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to store cancellation guide")?;

        self.get_by_key(&guide.service_key)
            .await?
            .context("Cancellation guide missing after upsert")
    }
}
