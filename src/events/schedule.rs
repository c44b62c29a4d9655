/// Event schedule storage
///
/// The schedule is a single JSON settings document maintained by the
/// admin UI: an `event_schedule` array plus an optional legacy
/// `event_manager` singleton left over from the pre-schedule era. The
/// store reads the document per request; resolution itself happens in
/// the pure function in the parent module.
use crate::error::{AppError, AppResult};
use crate::events::EventConfig;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

const SCHEDULE_KEY: &str = "event_schedule";

/// The stored schedule document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleDocument {
    #[serde(default)]
    pub event_schedule: Vec<EventConfig>,
    /// Legacy singleton, still honored as a candidate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_manager: Option<EventConfig>,
}

impl ScheduleDocument {
    /// Flatten the document into the candidate pool: the schedule array
    /// followed by the legacy singleton.
    pub fn candidates(&self) -> Vec<EventConfig> {
        let mut pool = self.event_schedule.clone();
        if let Some(legacy) = &self.event_manager {
            pool.push(legacy.clone());
        }
        pool
    }
}

/// Reads and writes the schedule settings document
#[derive(Clone)]
pub struct ScheduleStore {
    db: SqlitePool,
}

impl ScheduleStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Fetch the current schedule document. A missing row is an empty
    /// schedule, not an error.
    pub async fn load(&self) -> AppResult<ScheduleDocument> {
        let row = sqlx::query("SELECT value FROM app_settings WHERE key = ?")
            .bind(SCHEDULE_KEY)
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.get("value");
                serde_json::from_str(&raw).map_err(|e| {
                    AppError::Internal(format!("Malformed schedule document: {}", e))
                })
            }
            None => Ok(ScheduleDocument::default()),
        }
    }

    /// Replace the schedule document
    pub async fn save(&self, document: &ScheduleDocument) -> AppResult<()> {
        let raw = serde_json::to_string(document)
            .map_err(|e| AppError::Internal(format!("Failed to encode schedule: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO app_settings (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(SCHEDULE_KEY)
        .bind(&raw)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(())
    }
}
