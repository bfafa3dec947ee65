use crate::analysis::{AggregateVector, AnalysisResult};
use crate::error::AnalysisError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, params};
use std::path::Path;

/// A persisted analysis row
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAnalysis {
    pub id: i64,
    pub playlist_id: String,
    pub aggregate_vector: AggregateVector,
    pub vibe_label: String,
    pub generated_names: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Append-only history of analyses, one row per run
pub struct AnalysisStore {
    pub(crate) conn: Connection,
}

impl AnalysisStore {
    pub fn open(path: &Path) -> Result<Self, AnalysisError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AnalysisError::Persistence(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let store = AnalysisStore {
            conn: Connection::open(path)?,
        };
        store.migrate()?;
        log::debug!("Opened analysis store at {}", path.display());
        Ok(store)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, AnalysisError> {
        let store = AnalysisStore {
            conn: Connection::open_in_memory()?,
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), AnalysisError> {
        let version: i32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "
                CREATE TABLE IF NOT EXISTS playlist_analyses (
                    id               INTEGER PRIMARY KEY AUTOINCREMENT,
                    playlist_id      TEXT NOT NULL,
                    aggregate_vector TEXT NOT NULL,
                    vibe_label       TEXT NOT NULL,
                    generated_names  TEXT NOT NULL,
                    created_at       TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_playlist_analyses_playlist
                    ON playlist_analyses(playlist_id);
                ",
            )?;
        }

        self.conn.pragma_update(None, "user_version", 1)?;
        Ok(())
    }

    /// Append one analysis. Returns the new row id.
    pub fn record(&self, result: &AnalysisResult) -> Result<i64, AnalysisError> {
        let vector_json = serde_json::to_string(&result.aggregate_vector)?;
        let names_json = serde_json::to_string(&result.generated_names)?;
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        self.conn.execute(
            "INSERT INTO playlist_analyses
                (playlist_id, aggregate_vector, vibe_label, generated_names, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                result.playlist_info.id,
                vector_json,
                result.vibe_label.as_str(),
                names_json,
                created_at,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Every stored analysis of a playlist, newest first
    pub fn history(&self, playlist_id: &str) -> Result<Vec<StoredAnalysis>, AnalysisError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, playlist_id, aggregate_vector, vibe_label, generated_names, created_at
             FROM playlist_analyses
             WHERE playlist_id = ?1
             ORDER BY id DESC",
        )?;

        let rows = stmt
            .query_map(params![playlist_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, playlist_id, vector, vibe_label, names, created_at)| -> Result<StoredAnalysis, AnalysisError> {
                let created_at = DateTime::parse_from_rfc3339(&created_at)
                    .map_err(|e| AnalysisError::Persistence(format!("bad created_at: {e}")))?
                    .with_timezone(&Utc);
                Ok(StoredAnalysis {
                    id,
                    playlist_id,
                    aggregate_vector: serde_json::from_str(&vector)?,
                    vibe_label,
                    generated_names: serde_json::from_str(&names)?,
                    created_at,
                })
            })
            .collect()
    }
}
