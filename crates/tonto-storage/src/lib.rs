//! tonto-storage: SQLite-backed record of URLs seen in the channel.
//!
//! Each URL is stored once, at its first sighting. Later postings only read
//! the row, which is how reposts are detected.

use std::path::Path;
use std::sync::Arc;

use rusqlite::{Connection, OptionalExtension};
use tokio::sync::Mutex;

use tonto_types::SeenUrl;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Blocking task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("Malformed time {value:?} stored for {url}")]
    BadTimestamp { url: String, value: String },
}

pub type Result<T> = std::result::Result<T, StorageError>;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS urls (
    url   TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    user  TEXT NOT NULL,
    time  TEXT NOT NULL
);";

/// Persistent first-seen table keyed by URL.
#[derive(Clone)]
pub struct SeenUrlStore {
    conn: Arc<Mutex<Connection>>,
}

impl SeenUrlStore {
    /// Open (or create) the SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        tracing::info!("URL store opened: {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Get the first sighting of `url`, if any.
    pub async fn lookup(&self, url: &str) -> Result<Option<SeenUrl>> {
        let conn = self.conn.clone();
        let url = url.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let row = conn
                .query_row(
                    "SELECT url, title, user, time FROM urls WHERE url = ?1",
                    rusqlite::params![url],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    },
                )
                .optional()?;

            row.map(|(url, title, user, time)| {
                let timestamp = parse_time(&time).ok_or_else(|| StorageError::BadTimestamp {
                    url: url.clone(),
                    value: time.clone(),
                })?;
                Ok(SeenUrl {
                    url,
                    title,
                    user,
                    timestamp,
                })
            })
            .transpose()
        })
        .await?
    }

    /// Record the first sighting of `url`.
    ///
    /// Returns `true` if this call inserted the row and `false` if the URL was
    /// already present. An existing row is never modified.
    pub async fn record_if_absent(
        &self,
        url: &str,
        title: &str,
        user: &str,
        timestamp: i64,
    ) -> Result<bool> {
        let conn = self.conn.clone();
        let url = url.to_string();
        let title = title.to_string();
        let user = user.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let inserted = conn.execute(
                "INSERT INTO urls (url, title, user, time) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(url) DO NOTHING",
                rusqlite::params![url, title, user, timestamp.to_string()],
            )?;
            Ok(inserted == 1)
        })
        .await?
    }

    /// Number of URLs recorded so far.
    pub async fn count(&self) -> Result<u64> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM urls", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await?
    }
}

/// Parse a stored `time` value. Older databases hold fractional seconds.
fn parse_time(value: &str) -> Option<i64> {
    let value = value.trim();
    value
        .parse::<i64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().map(|secs| secs as i64))
}
