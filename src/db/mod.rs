use crate::error::AppResult;
use sqlx::{Pool, Sqlite, sqlite::SqlitePoolOptions};
use std::time::Duration;
use time::OffsetDateTime;

pub async fn init_pool(database_url: &str, max_connections: u32) -> AppResult<Pool<Sqlite>> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;

    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&pool)
        .await?;

    Ok(pool)
}

/// A single connection guards the tables; every write is one atomic statement.
pub async fn init_pool_default(database_url: &str) -> AppResult<Pool<Sqlite>> {
    init_pool(database_url, 1).await
}

struct Migration {
    version: i64,
    description: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create requests table",
    },
    Migration {
        version: 2,
        description: "create accounts table",
    },
    Migration {
        version: 3,
        description: "add carrier_company to requests",
    },
];

/// Applies the versioned migration list. Every step is idempotent, so a lost
/// `schema_migrations` table only costs re-running no-ops.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> AppResult<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    for migration in MIGRATIONS {
        let applied: Option<i64> =
            sqlx::query_scalar("SELECT version FROM schema_migrations WHERE version = ?")
                .bind(migration.version)
                .fetch_optional(pool)
                .await?;
        if applied.is_some() {
            continue;
        }

        apply_migration(pool, migration.version).await?;

        sqlx::query(
            "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?, ?, ?)",
        )
        .bind(migration.version)
        .bind(migration.description)
        .bind(OffsetDateTime::now_utc())
        .execute(pool)
        .await?;

        tracing::info!(
            version = migration.version,
            "applied migration: {}",
            migration.description
        );
    }

    Ok(())
}

async fn apply_migration(pool: &Pool<Sqlite>, version: i64) -> AppResult<()> {
    match version {
        1 => {
            sqlx::query(
                "CREATE TABLE IF NOT EXISTS requests (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    student_name TEXT NOT NULL,
                    student_tax_id TEXT NOT NULL,
                    student_registration TEXT NOT NULL,
                    wheelchair_user INTEGER NOT NULL DEFAULT 0,
                    medical_code TEXT,
                    student_postal_code TEXT,
                    student_street TEXT,
                    student_number TEXT NOT NULL,
                    student_municipality TEXT NOT NULL,
                    school_name TEXT NOT NULL,
                    school_postal_code TEXT,
                    school_street TEXT,
                    school_number TEXT NOT NULL,
                    school_municipality TEXT NOT NULL,
                    resource_room INTEGER NOT NULL DEFAULT 0,
                    attendance_days TEXT NOT NULL DEFAULT '',
                    entry_time TEXT NOT NULL,
                    exit_time TEXT NOT NULL,
                    medical_document BLOB NOT NULL,
                    medical_document_name TEXT NOT NULL,
                    travel_document BLOB NOT NULL,
                    travel_document_name TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'Pending',
                    supervisor_name TEXT,
                    supervisor_tax_id TEXT,
                    rejection_reason TEXT,
                    signed_document BLOB,
                    signed_document_name TEXT,
                    last_updated_at TEXT
                )",
            )
            .execute(pool)
            .await?;
        }
        2 => {
            sqlx::query(
                "CREATE TABLE IF NOT EXISTS accounts (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    full_name TEXT NOT NULL,
                    username TEXT NOT NULL UNIQUE,
                    password_hash TEXT NOT NULL,
                    roles TEXT NOT NULL,
                    created_at TEXT NOT NULL
                )",
            )
            .execute(pool)
            .await?;
        }
        3 => {
            add_column_if_missing(pool, "requests", "carrier_company", "TEXT").await?;
        }
        other => {
            return Err(crate::error::AppError::Other(format!(
                "unknown migration version: {other}"
            )));
        }
    }
    Ok(())
}

/// Additive column patch: a column that already exists is a silent no-op.
pub(crate) async fn add_column_if_missing(
    pool: &Pool<Sqlite>,
    table: &str,
    column: &str,
    declaration: &str,
) -> AppResult<()> {
    let present: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM pragma_table_info(?) WHERE name = ?")
            .bind(table)
            .bind(column)
            .fetch_optional(pool)
            .await?;

    if present.is_none() {
        sqlx::query(&format!(
            "ALTER TABLE {table} ADD COLUMN {column} {declaration}"
        ))
        .execute(pool)
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = init_pool_default("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(applied, MIGRATIONS.len() as i64);
    }

    #[tokio::test]
    async fn column_patch_is_a_silent_noop_when_present() {
        let pool = init_pool_default("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        // carrier_company was added by migration 3; patching again must not fail
        add_column_if_missing(&pool, "requests", "carrier_company", "TEXT")
            .await
            .unwrap();

        let present: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM pragma_table_info('requests') WHERE name = 'carrier_company'")
                .fetch_optional(&pool)
                .await
                .unwrap();
        assert!(present.is_some());
    }
}
