// SQLite prediction log
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{PredictionLog, PredictionRecord};
use crate::emotion::Emotion;
use crate::error::PersistenceError;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS predictions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    emotion TEXT NOT NULL,
    recorded_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

// Thread-safe connection wrapper
#[derive(Clone)]
pub struct SqlitePredictionLog {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePredictionLog {
    /// Open (or create) the log at `path`, creating parent directories
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| PersistenceError::Open {
                reason: format!("{}: {}", parent.display(), err),
            })?;
        }

        let conn = Connection::open(path).map_err(|err| PersistenceError::Open {
            reason: format!("{}: {}", path.display(), err),
        })?;
        // Concurrent writers wait instead of failing immediately
        conn.busy_timeout(std::time::Duration::from_secs(2))
            .map_err(open_error)?;
        Self::init(conn)
    }

    /// Private in-memory log, used by tests and the offline CLI
    pub fn in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory().map_err(open_error)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, PersistenceError> {
        conn.execute(SCHEMA, []).map_err(open_error)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, PersistenceError> {
        self.conn.lock().map_err(|_| PersistenceError::LockPoisoned)
    }
}

impl PredictionLog for SqlitePredictionLog {
    fn append(&self, record: &PredictionRecord) -> Result<(), PersistenceError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO predictions (emotion) VALUES (?1)",
            params![record.emotion.as_str()],
        )
        .map_err(|err| PersistenceError::Write {
            reason: err.to_string(),
        })?;
        Ok(())
    }

    fn all(&self) -> Result<Vec<PredictionRecord>, PersistenceError> {
        let read_error = |err: rusqlite::Error| PersistenceError::Read {
            reason: err.to_string(),
        };

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT emotion FROM predictions ORDER BY id")
            .map_err(read_error)?;
        let labels = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(read_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_error)?;

        Ok(labels
            .into_iter()
            .filter_map(|label| match label.parse::<Emotion>() {
                Ok(emotion) => Some(PredictionRecord { emotion }),
                Err(err) => {
                    tracing::warn!("[Store] Skipping stored row: {}", err);
                    None
                }
            })
            .collect())
    }
}

fn open_error(err: rusqlite::Error) -> PersistenceError {
    PersistenceError::Open {
        reason: err.to_string(),
    }
}
