use anyhow::{Context, Result};
use async_trait::async_trait;
use session_core::SessionStore;
use sqlx::{
    error::ErrorKind,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

use shared::{
    domain::{Session, SessionId},
    error::{StoreError, StoreResult},
};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url '{database_url}'"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open sqlite database '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to apply sleep session migrations")?;
        debug!(%database_url, "session storage ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn session_count(&self) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM sleep_sessions")
            .fetch_one(&self.pool)
            .await
            .map_err(store_error("count sessions"))
    }
}

#[async_trait]
impl SessionStore for Storage {
    async fn create(&self, session: &Session) -> StoreResult<SessionId> {
        let rec = sqlx::query(
            "INSERT INTO sleep_sessions (start_time_millis, end_time_millis, quality)
             VALUES (?, ?, ?)
             RETURNING id",
        )
        .bind(session.start_time_millis)
        .bind(session.end_time_millis)
        .bind(session.quality)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("insert session"))?;
        Ok(SessionId(rec.get::<i64, _>(0)))
    }

    async fn most_recent(&self) -> StoreResult<Option<Session>> {
        let row = sqlx::query(
            "SELECT id, start_time_millis, end_time_millis, quality
             FROM sleep_sessions
             ORDER BY start_time_millis DESC, id DESC
             LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("load most recent session"))?;
        row.as_ref()
            .map(session_from_row)
            .transpose()
            .map_err(store_error("decode session"))
    }

    async fn update(&self, session: &Session) -> StoreResult<()> {
        let updated = sqlx::query(
            "UPDATE sleep_sessions
             SET start_time_millis = ?, end_time_millis = ?, quality = ?
             WHERE id = ?",
        )
        .bind(session.start_time_millis)
        .bind(session.end_time_millis)
        .bind(session.quality)
        .bind(session.id.0)
        .execute(&self.pool)
        .await
        .map_err(store_error("update session"))?
        .rows_affected();

        if updated == 0 {
            return Err(StoreError::missing(session.id));
        }
        Ok(())
    }

    async fn delete_all(&self) -> StoreResult<()> {
        let deleted = sqlx::query("DELETE FROM sleep_sessions")
            .execute(&self.pool)
            .await
            .map_err(store_error("delete sessions"))?
            .rows_affected();
        debug!(deleted, "deleted all sleep sessions");
        Ok(())
    }

    async fn all(&self) -> StoreResult<Vec<Session>> {
        let rows = sqlx::query(
            "SELECT id, start_time_millis, end_time_millis, quality
             FROM sleep_sessions
             ORDER BY start_time_millis DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("list sessions"))?;
        rows.iter()
            .map(session_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(store_error("decode session"))
    }

    async fn get(&self, session_id: SessionId) -> StoreResult<Option<Session>> {
        let row = sqlx::query(
            "SELECT id, start_time_millis, end_time_millis, quality
             FROM sleep_sessions
             WHERE id = ?",
        )
        .bind(session_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("load session"))?;
        row.as_ref()
            .map(session_from_row)
            .transpose()
            .map_err(store_error("decode session"))
    }
}

fn session_from_row(row: &SqliteRow) -> Result<Session, sqlx::Error> {
    Ok(Session {
        id: SessionId(row.try_get("id")?),
        start_time_millis: row.try_get("start_time_millis")?,
        end_time_millis: row.try_get("end_time_millis")?,
        quality: row.try_get("quality")?,
    })
}

fn store_error(action: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    move |err| {
        let constraint = matches!(
            &err,
            sqlx::Error::Database(db) if !matches!(db.kind(), ErrorKind::Other)
        );
        if constraint {
            StoreError::constraint(format!("{action}: {err}"))
        } else {
            StoreError::io(format!("{action}: {err}"))
        }
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
