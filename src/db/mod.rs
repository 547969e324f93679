pub mod answers;
pub mod chapters;
pub mod comments;
pub mod favorites;
pub mod quizzes;
pub mod records;
pub mod requests;
pub mod schema;
pub mod sections;
pub mod sessions;
pub mod subjects;
pub mod topics;
pub mod users;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Result};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use schema::run_migrations;

pub type DbPool = Arc<Mutex<Connection>>;

/// Extension trait for logging errors before discarding them
pub trait LogOnError<T> {
    /// Log the error at warn level and return None
    fn log_warn(self, context: &str) -> Option<T>;
}

impl<T, E: std::fmt::Display> LogOnError<T> for std::result::Result<T, E> {
    fn log_warn(self, context: &str) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("{}: {}", context, e);
                None
            }
        }
    }
}

/// Error returned when database lock cannot be acquired
#[derive(Debug)]
pub struct DbLockError;

impl std::fmt::Display for DbLockError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "Database unavailable")
  }
}

impl std::error::Error for DbLockError {}

/// Try to acquire the database lock, returning an error if poisoned
pub fn try_lock(pool: &DbPool) -> std::result::Result<MutexGuard<'_, Connection>, DbLockError> {
  pool.lock().map_err(|_: PoisonError<_>| {
    tracing::error!("Database mutex poisoned - a thread panicked while holding the lock");
    DbLockError
  })
}

/// Open a connection with foreign keys enforced and the schema up to date.
pub fn open(path: &Path) -> Result<Connection> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).log_warn("Could not create database directory");
  }

  let conn = Connection::open(path)?;
  configure(&conn)?;
  run_migrations(&conn)?;
  Ok(conn)
}

pub fn init_db(path: &Path) -> Result<DbPool> {
  let conn = open(path)?;
  Ok(Arc::new(Mutex::new(conn)))
}

/// Connection pragmas required by the schema (cascades rely on foreign keys)
pub fn configure(conn: &Connection) -> Result<()> {
  conn.execute_batch(
    r#"
    PRAGMA foreign_keys = ON;
    PRAGMA journal_mode = WAL;
    PRAGMA busy_timeout = 5000;
    "#,
  )
}

/// Parse an RFC3339 timestamp column, falling back to now for legacy rows
pub(crate) fn parse_timestamp(s: &str) -> DateTime<Utc> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .unwrap_or_else(|_| Utc::now())
}

pub(crate) fn now() -> String {
  Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::TestEnv;

  #[test]
  fn test_open_enables_foreign_keys() {
    let env = TestEnv::new().unwrap();
    let enabled: i64 = env
      .conn
      .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
      .unwrap();
    assert_eq!(enabled, 1);
  }

  #[test]
  fn test_parse_timestamp_round_trip() {
    let ts = now();
    let parsed = parse_timestamp(&ts);
    assert_eq!(parsed.to_rfc3339(), ts);
  }

  #[test]
  fn test_log_warn_discards_error() {
    let err: std::result::Result<i64, &str> = Err("boom");
    assert_eq!(err.log_warn("ctx"), None);
    let ok: std::result::Result<i64, &str> = Ok(7);
    assert_eq!(ok.log_warn("ctx"), Some(7));
  }
}
