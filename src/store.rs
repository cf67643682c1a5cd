//! Shared SQLite plumbing for the domain stores.
//!
//! Each store owns one database file. Opening a store creates the parent
//! directory, applies that store's embedded migrations, and builds a bb8
//! pool of async connections. Construction failures are fatal; later
//! read/write failures surface as [`EngramError::Storage`].

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use diesel::sqlite::SqliteConnection;
use diesel::Connection;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::RunQueryDsl;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness};
use time::macros::format_description;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::error::{EngramError, Result};

pub(crate) type SqliteAsyncConn = SyncConnectionWrapper<SqliteConnection>;
pub(crate) type SqlitePool = Pool<SqliteAsyncConn>;
pub(crate) type SqlitePooledConn<'a> = PooledConnection<'a, SqliteAsyncConn>;

pub(crate) async fn open_pool(
    sqlite_path: &str,
    migrations: EmbeddedMigrations,
) -> Result<SqlitePool> {
    ensure_parent_dir(sqlite_path)?;
    run_migrations(sqlite_path, migrations).await?;

    let manager = AsyncDieselConnectionManager::<SqliteAsyncConn>::new(sqlite_path);
    Pool::builder()
        .build(manager)
        .await
        .map_err(|e| EngramError::Storage(e.to_string()))
}

/// Check a connection out of the pool with foreign-key enforcement on.
/// SQLite scopes the pragma to the connection, so it is reapplied on every
/// checkout.
pub(crate) async fn checkout(pool: &SqlitePool) -> Result<SqlitePooledConn<'_>> {
    let mut conn = pool
        .get()
        .await
        .map_err(|e| EngramError::Storage(e.to_string()))?;
    diesel::sql_query("PRAGMA foreign_keys = ON")
        .execute(&mut conn)
        .await
        .map_err(|e| EngramError::Storage(e.to_string()))?;
    Ok(conn)
}

fn ensure_parent_dir(path: &str) -> Result<()> {
    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| EngramError::Storage(e.to_string()))?;
    }
    Ok(())
}

async fn run_migrations(database_url: &str, migrations: EmbeddedMigrations) -> Result<()> {
    let database_url = database_url.to_string();
    tokio::task::spawn_blocking(move || {
        let mut conn = SqliteConnection::establish(&database_url)
            .map_err(|e| EngramError::Storage(e.to_string()))?;
        conn.run_pending_migrations(migrations)
            .map_err(|e| EngramError::Storage(e.to_string()))?;
        Ok::<_, EngramError>(())
    })
    .await
    .map_err(|e| EngramError::Storage(e.to_string()))??;
    Ok(())
}

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn now_ts() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

const DAY_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

const DATETIME_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// Today's date as `YYYY-MM-DD`, the key granularity of the daily stats.
pub(crate) fn today() -> String {
    format_day(OffsetDateTime::now_utc())
}

/// The `YYYY-MM-DD` string `days_back` whole days before now.
pub(crate) fn day_floor(days_back: i64) -> String {
    format_day(OffsetDateTime::now_utc() - Duration::days(days_back))
}

fn format_day(dt: OffsetDateTime) -> String {
    dt.format(DAY_FORMAT)
        .unwrap_or_else(|_| dt.unix_timestamp().to_string())
}

/// Current UTC wall time as `YYYY-MM-DDTHH:MM:SS`, the textual form the
/// schedule store compares against caller-supplied datetimes.
pub(crate) fn datetime_now() -> String {
    format_datetime(OffsetDateTime::now_utc())
}

/// The datetime string `days_ahead` whole days after now.
pub(crate) fn datetime_in_days(days_ahead: i64) -> String {
    format_datetime(OffsetDateTime::now_utc() + Duration::days(days_ahead))
}

fn format_datetime(dt: OffsetDateTime) -> String {
    dt.format(DATETIME_FORMAT)
        .unwrap_or_else(|_| dt.unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_opaque() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn day_strings_sort_chronologically() {
        assert!(day_floor(7) < today());
        assert_eq!(day_floor(0), today());
        assert!(datetime_now() < datetime_in_days(1));
    }
}
