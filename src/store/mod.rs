// Store module - append-only prediction log
//
// Every served prediction is recorded so clients can read back the full
// history. The service only depends on the `PredictionLog` trait; SQLite is
// the production backend.

mod sqlite;

pub use sqlite::SqlitePredictionLog;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;
use crate::emotion::Emotion;
use crate::error::{ErrorCode, PersistenceError};

/// One logged prediction, serialized as `{"emotion": "<label>"}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub emotion: Emotion,
}

/// Append-only record of predictions
pub trait PredictionLog: Send + Sync {
    /// Append one record
    fn append(&self, record: &PredictionRecord) -> Result<(), PersistenceError>;

    /// All records in insertion order
    fn all(&self) -> Result<Vec<PredictionRecord>, PersistenceError>;
}

/// Bounded retry for log writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// Delay before attempt n+1 is `backoff * n`
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for RetryPolicy {
    fn from(config: &ServerConfig) -> Self {
        Self {
            attempts: config.persist_attempts.max(1),
            backoff: Duration::from_millis(config.persist_backoff_ms),
        }
    }
}

/// Append with linear backoff between failed attempts
///
/// Blocks the calling thread while backing off; call from blocking context.
pub fn append_with_retry(
    log: &dyn PredictionLog,
    record: &PredictionRecord,
    policy: &RetryPolicy,
) -> Result<(), PersistenceError> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match log.append(record) {
            Ok(()) => return Ok(()),
            Err(err) if attempt < attempts => {
                tracing::warn!(
                    "[Store] Append attempt {}/{} failed (code {}): {}",
                    attempt,
                    attempts,
                    err.code(),
                    err.message()
                );
                std::thread::sleep(policy.backoff * attempt);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Fails the first `failures` appends
    struct FlakyLog {
        failures: u32,
        calls: AtomicU32,
        records: Mutex<Vec<PredictionRecord>>,
    }

    impl FlakyLog {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                records: Mutex::new(Vec::new()),
            }
        }
    }

    impl PredictionLog for FlakyLog {
        fn append(&self, record: &PredictionRecord) -> Result<(), PersistenceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(PersistenceError::Write {
                    reason: "database is locked".to_string(),
                });
            }
            self.records.lock().unwrap().push(*record);
            Ok(())
        }

        fn all(&self) -> Result<Vec<PredictionRecord>, PersistenceError> {
            Ok(self.records.lock().unwrap().clone())
        }
    }

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            backoff: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_record_json_shape() {
        let record = PredictionRecord {
            emotion: Emotion::Happy,
        };
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"emotion":"Happy"}"#
        );
    }

    #[test]
    fn test_retry_recovers_from_transient_failures() {
        let log = FlakyLog::new(2);
        let record = PredictionRecord {
            emotion: Emotion::Sad,
        };
        append_with_retry(&log, &record, &policy(3)).unwrap();
        assert_eq!(log.calls.load(Ordering::SeqCst), 3);
        assert_eq!(log.all().unwrap(), vec![record]);
    }

    #[test]
    fn test_retry_gives_up_after_attempts() {
        let log = FlakyLog::new(10);
        let record = PredictionRecord {
            emotion: Emotion::Sad,
        };
        let err = append_with_retry(&log, &record, &policy(3)).unwrap_err();
        assert!(matches!(err, PersistenceError::Write { .. }));
        assert_eq!(log.calls.load(Ordering::SeqCst), 3);
        assert!(log.all().unwrap().is_empty());
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.backoff, Duration::from_millis(100));
    }
}
