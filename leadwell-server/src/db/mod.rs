//! SQLite connection pool and schema
//!
//! Every table is created with `CREATE TABLE IF NOT EXISTS`, so opening an
//! existing database is idempotent. Timestamps are RFC 3339 TEXT with
//! millisecond precision and a `Z` suffix, which keeps them sortable as
//! strings. JSON columns (attendees, raw_data, ai_response, related_leads)
//! are TEXT holding serialized JSON.

use leadwell_common::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Current schema version, recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (creating if needed) the database file and bring the schema up
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;
    Ok(pool)
}

/// Private in-memory database with the full schema
///
/// Single connection: every `sqlite::memory:` connection is its own database.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// Create every table and index (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_users_table(pool).await?;
    create_leads_table(pool).await?;
    create_calls_table(pool).await?;
    create_project_types_table(pool).await?;
    create_marketing_channels_table(pool).await?;
    create_form_submissions_table(pool).await?;
    create_ai_insights_table(pool).await?;
    create_stats_table(pool).await?;

    tracing::debug!(version = SCHEMA_VERSION, "Database schema ready");
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?, ?)")
        .bind(SCHEMA_VERSION)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            role TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            job_title TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_leads_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leads (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            company TEXT,
            project_type TEXT NOT NULL,
            budget INTEGER,
            timeline TEXT,
            source TEXT NOT NULL,
            source_icon TEXT,
            score INTEGER NOT NULL DEFAULT 0 CHECK (score BETWEEN 0 AND 100),
            status TEXT NOT NULL DEFAULT 'new',
            notes TEXT,
            ai_qualified INTEGER,
            ai_qualification_reason TEXT,
            ai_processed INTEGER NOT NULL DEFAULT 0,
            assigned_to INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_leads_created_at ON leads(created_at)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_calls_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS calls (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            lead_id INTEGER NOT NULL REFERENCES leads(id),
            scheduled_at TEXT NOT NULL,
            duration INTEGER NOT NULL DEFAULT 30,
            title TEXT NOT NULL,
            notes TEXT,
            completed INTEGER NOT NULL DEFAULT 0,
            attendees TEXT NOT NULL DEFAULT '[]',
            ai_scheduled INTEGER NOT NULL DEFAULT 0,
            ai_summary TEXT,
            follow_up_needed INTEGER NOT NULL DEFAULT 0,
            follow_up_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_calls_scheduled_at ON calls(scheduled_at)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_project_types_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS project_types (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            min_budget INTEGER,
            average_timeline TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_marketing_channels_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS marketing_channels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            icon TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            conversion_rate INTEGER,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_form_submissions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS form_submissions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            form_type TEXT NOT NULL DEFAULT 'contact',
            source TEXT NOT NULL DEFAULT 'website',
            content TEXT NOT NULL,
            raw_data TEXT NOT NULL,
            lead_id INTEGER REFERENCES leads(id),
            ip_address TEXT,
            user_agent TEXT,
            ai_processed INTEGER NOT NULL DEFAULT 0,
            ai_response TEXT,
            status TEXT NOT NULL DEFAULT 'new',
            is_scam INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_ai_insights_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ai_insights (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            type TEXT NOT NULL,
            icon TEXT NOT NULL,
            action TEXT,
            action_url TEXT,
            related_leads TEXT NOT NULL DEFAULT '[]',
            priority TEXT NOT NULL DEFAULT 'medium',
            created_at TEXT NOT NULL,
            read INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_stats_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            value TEXT NOT NULL,
            change_percentage INTEGER,
            icon TEXT,
            period TEXT NOT NULL DEFAULT 'week',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_creation_is_idempotent() {
        let pool = init_memory_pool().await.unwrap();
        create_schema(&pool).await.unwrap();

        let version: i64 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_file_database_created_in_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("leadwell.db");

        let pool = init_database_pool(&path).await.unwrap();
        pool.close().await;

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_call_requires_existing_lead() {
        let pool = init_memory_pool().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO calls (lead_id, scheduled_at, title, created_at, updated_at) VALUES (999, 'x', 't', 'x', 'x')",
        )
        .execute(&pool)
        .await;

        assert!(result.is_err());
    }
}
