use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use eyre::Result;
use log::{debug, info};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::models::application::{ApplicationRecord, ApplicationStatus};
use crate::models::job::{JobPosting, JobSource};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS applications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        job_id TEXT NOT NULL,
        title TEXT NOT NULL,
        company TEXT NOT NULL,
        source TEXT NOT NULL,
        url TEXT,
        status TEXT NOT NULL,
        applied_at TEXT NOT NULL,
        last_updated TEXT NOT NULL,
        resume_used TEXT,
        auto_applied INTEGER NOT NULL DEFAULT 0,
        notes TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_applications_job_id ON applications(job_id)",
    "CREATE TABLE IF NOT EXISTS skill_frequency (
        skill TEXT PRIMARY KEY,
        count INTEGER NOT NULL DEFAULT 0,
        last_seen TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS workflow_sessions (
        session_id TEXT PRIMARY KEY,
        started_at TEXT NOT NULL,
        state TEXT NOT NULL
    )",
];

/// SQLite-backed application tracker.
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn open(path: &Path) -> Result<Self> {
        let url = format!("sqlite:{}?mode=rwc", path.display());
        debug!("opening application store at {}", url);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&url)
            .await?;

        let store = Store { pool };
        store.ensure_schema().await?;
        info!("application store ready at {}", path.display());
        Ok(store)
    }

    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Store { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn record_application(
        &self,
        posting: &JobPosting,
        status: ApplicationStatus,
        resume_used: Option<&str>,
        auto_applied: bool,
        notes: Option<&str>,
    ) -> Result<i64> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO applications
             (job_id, title, company, source, url, status, applied_at, last_updated, resume_used, auto_applied, notes)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&posting.id)
        .bind(&posting.title)
        .bind(&posting.company)
        .bind(posting.source.label())
        .bind(&posting.url)
        .bind(status.as_str())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(resume_used)
        .bind(auto_applied)
        .bind(notes)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!("recorded application #{} for job {}", id, posting.id);
        Ok(id)
    }

    pub async fn update_status(&self, id: i64, status: ApplicationStatus) -> Result<()> {
        sqlx::query("UPDATE applications SET status = ?, last_updated = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;

        info!("application #{} moved to {}", id, status);
        Ok(())
    }

    pub async fn list_applications(&self) -> Result<Vec<ApplicationRecord>> {
        let rows = sqlx::query("SELECT * FROM applications ORDER BY applied_at DESC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_record).collect()
    }

    /// Submissions made in the last 24 hours. Seeds the daily counter so
    /// restarting the tool cannot bypass the cap.
    pub async fn applications_since(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM applications WHERE applied_at >= ?")
            .bind(cutoff.to_rfc3339())
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get::<i64, _>("n")? as usize)
    }

    pub async fn applications_today(&self) -> Result<usize> {
        self.applications_since(Utc::now() - Duration::hours(24)).await
    }

    pub async fn bump_skill_frequency(&self, skills: &[String]) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        for skill in skills {
            sqlx::query(
                "INSERT INTO skill_frequency (skill, count, last_seen) VALUES (?, 1, ?)
                 ON CONFLICT(skill) DO UPDATE SET count = count + 1, last_seen = excluded.last_seen",
            )
            .bind(skill)
            .bind(&now)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    pub async fn top_skills(&self, limit: usize) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query(
            "SELECT skill, count FROM skill_frequency ORDER BY count DESC, skill ASC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Ok((row.try_get("skill")?, row.try_get("count")?)))
            .collect()
    }

    pub async fn save_session(&self, session_id: &str, state_json: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO workflow_sessions (session_id, started_at, state) VALUES (?, ?, ?)
             ON CONFLICT(session_id) DO UPDATE SET state = excluded.state",
        )
        .bind(session_id)
        .bind(Utc::now().to_rfc3339())
        .bind(state_json)
        .execute(&self.pool)
        .await?;

        debug!("saved session {}", session_id);
        Ok(())
    }

    pub async fn load_session(&self, session_id: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT state FROM workflow_sessions WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) => Some(row.try_get("state")?),
            None => None,
        })
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<ApplicationRecord> {
    let source: String = row.try_get("source")?;
    let status: String = row.try_get("status")?;
    let applied_at: String = row.try_get("applied_at")?;
    let last_updated: String = row.try_get("last_updated")?;

    Ok(ApplicationRecord {
        id: row.try_get("id")?,
        job_id: row.try_get("job_id")?,
        title: row.try_get("title")?,
        company: row.try_get("company")?,
        source: JobSource::ALL
            .into_iter()
            .find(|s| s.label() == source)
            .unwrap_or(JobSource::General),
        url: row.try_get("url")?,
        status: ApplicationStatus::parse(&status).unwrap_or(ApplicationStatus::Applied),
        applied_at: DateTime::parse_from_rfc3339(&applied_at)?.with_timezone(&Utc),
        last_updated: DateTime::parse_from_rfc3339(&last_updated)?.with_timezone(&Utc),
        resume_used: row.try_get("resume_used")?,
        auto_applied: row.try_get("auto_applied")?,
        notes: row.try_get("notes")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(id: &str, title: &str) -> JobPosting {
        JobPosting {
            id: id.to_string(),
            title: title.to_string(),
            company: "Acme".to_string(),
            location: "Remote".to_string(),
            url: Some("https://example.com/job".to_string()),
            salary: None,
            description: String::new(),
            source: JobSource::Indeed,
            posted_at: Utc::now(),
            synthetic: false,
        }
    }

    #[tokio::test]
    async fn records_and_lists_applications() {
        let store = Store::open_in_memory().await.unwrap();

        let id = store
            .record_application(
                &posting("job-1", "Rust Engineer"),
                ApplicationStatus::Applied,
                Some("resume.pdf"),
                true,
                None,
            )
            .await
            .unwrap();

        let records = store.list_applications().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].status, ApplicationStatus::Applied);
        assert_eq!(records[0].source, JobSource::Indeed);
        assert!(records[0].auto_applied);
    }

    #[tokio::test]
    async fn status_updates_touch_last_updated() {
        let store = Store::open_in_memory().await.unwrap();
        let id = store
            .record_application(
                &posting("job-1", "Rust Engineer"),
                ApplicationStatus::Applied,
                None,
                false,
                None,
            )
            .await
            .unwrap();

        store
            .update_status(id, ApplicationStatus::InterviewScheduled)
            .await
            .unwrap();

        let records = store.list_applications().await.unwrap();
        assert_eq!(records[0].status, ApplicationStatus::InterviewScheduled);
        assert!(records[0].last_updated >= records[0].applied_at);
    }

    #[tokio::test]
    async fn counts_recent_applications() {
        let store = Store::open_in_memory().await.unwrap();
        for i in 0..3 {
            store
                .record_application(
                    &posting(&format!("job-{i}"), &format!("Role {i}")),
                    ApplicationStatus::Applied,
                    None,
                    false,
                    None,
                )
                .await
                .unwrap();
        }

        assert_eq!(store.applications_today().await.unwrap(), 3);
        assert_eq!(
            store
                .applications_since(Utc::now() + Duration::hours(1))
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn skill_frequency_accumulates() {
        let store = Store::open_in_memory().await.unwrap();
        let batch1: Vec<String> = vec!["rust".to_string(), "python".to_string()];
        let batch2: Vec<String> = vec!["rust".to_string()];

        store.bump_skill_frequency(&batch1).await.unwrap();
        store.bump_skill_frequency(&batch2).await.unwrap();

        let top = store.top_skills(10).await.unwrap();
        assert_eq!(top[0], ("rust".to_string(), 2));
        assert_eq!(top[1], ("python".to_string(), 1));
    }

    #[tokio::test]
    async fn sessions_round_trip_and_overwrite() {
        let store = Store::open_in_memory().await.unwrap();

        store.save_session("s1", "{\"stage\":\"search\"}").await.unwrap();
        store.save_session("s1", "{\"stage\":\"apply\"}").await.unwrap();

        let state = store.load_session("s1").await.unwrap().unwrap();
        assert!(state.contains("apply"));
        assert!(store.load_session("missing").await.unwrap().is_none());
    }
}
