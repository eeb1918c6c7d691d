use crate::domain::model::SeenRecord;
use crate::domain::ports::SeenStore;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS seen_jobs (
    job_id        TEXT PRIMARY KEY NOT NULL,
    title         TEXT NOT NULL,
    link          TEXT NOT NULL,
    skills        TEXT NOT NULL,
    first_seen_at TEXT NOT NULL
)
"#;

#[derive(sqlx::FromRow)]
struct SeenRow {
    job_id: String,
    title: String,
    link: String,
    skills: String,
    first_seen_at: DateTime<Utc>,
}

impl TryFrom<SeenRow> for SeenRecord {
    type Error = serde_json::Error;

    fn try_from(row: SeenRow) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            id: row.job_id,
            title: row.title,
            link: row.link,
            skills: serde_json::from_str(&row.skills)?,
            first_seen_at: row.first_seen_at,
        })
    }
}

/// Seen-job store on a single long-lived SQLite connection.
///
/// Cloning shares the connection. [`SqliteSeenStore::close`] releases it.
#[derive(Debug, Clone)]
pub struct SqliteSeenStore {
    pool: SqlitePool,
}

impl SqliteSeenStore {
    /// Open (creating if missing) the database at `database_url` and ensure the table exists.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // One connection: passes never overlap, and `sqlite::memory:` databases
        // live only as long as their connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        tracing::info!("Connected to seen-job store");

        Ok(Self { pool })
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM seen_jobs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Closed seen-job store connection");
    }
}

impl SeenStore for SqliteSeenStore {
    async fn find(&self, id: &str) -> Result<Option<SeenRecord>> {
        let row = sqlx::query_as::<_, SeenRow>(
            "SELECT job_id, title, link, skills, first_seen_at FROM seen_jobs WHERE job_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(SeenRecord::try_from(row)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, record: &SeenRecord) -> Result<bool> {
        let skills = serde_json::to_string(&record.skills)?;

        let result = sqlx::query(
            "INSERT INTO seen_jobs (job_id, title, link, skills, first_seen_at) \
             VALUES (?, ?, ?, ?, ?) ON CONFLICT(job_id) DO NOTHING",
        )
        .bind(&record.id)
        .bind(&record.title)
        .bind(&record.link)
        .bind(skills)
        .bind(record.first_seen_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
