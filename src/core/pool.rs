//! Connection handling for the document database.
//!
//! Reads open their own connection and run concurrently under WAL. Writes take the
//! pool's mutex, so at most one writer per process touches the file, and are retried
//! with exponential backoff while SQLite reports the file busy or locked (another
//! process may hold it).
//!
//! Relation fan-out runs many short reads and writes from rayon workers at once, so no
//! connection is ever shared between threads.

use crate::core::db;
use crate::core::error::LrsError;
use rusqlite::{Connection, ErrorCode};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

/// Retry schedule for busy writes.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub attempts: u32,
    pub base: Duration,
    pub cap: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            attempts: 5,
            base: Duration::from_millis(100),
            cap: Duration::from_secs(5),
        }
    }
}

impl Backoff {
    /// Delay before retry number `n` (1-based).
    fn delay(&self, n: u32) -> Duration {
        self.base
            .saturating_mul(1u32 << n.saturating_sub(1).min(16))
            .min(self.cap)
    }

    fn run<F, R>(&self, mut f: F) -> Result<R, LrsError>
    where
        F: FnMut() -> Result<R, LrsError>,
    {
        let mut n = 0;
        loop {
            match f() {
                Err(e) if is_busy(&e) && n < self.attempts => {
                    n += 1;
                    let delay = self.delay(n);
                    tracing::debug!(attempt = n, delay_ms = delay.as_millis() as u64, "sqlite busy, retrying");
                    thread::sleep(delay);
                }
                other => return other,
            }
        }
    }
}

fn is_busy(err: &LrsError) -> bool {
    matches!(
        err,
        LrsError::RusqliteError(rusqlite::Error::SqliteFailure(code, _))
            if matches!(code.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

pub struct SqlitePool {
    db_path: PathBuf,
    busy_timeout_secs: u32,
    writer: Mutex<()>,
    backoff: Backoff,
}

impl SqlitePool {
    pub fn new(db_path: &Path, busy_timeout_secs: u32) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
            busy_timeout_secs,
            writer: Mutex::new(()),
            backoff: Backoff::default(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection, LrsError> {
        db::db_connect(&self.db_path, self.busy_timeout_secs)
    }

    /// Serialized write. `f` may run more than once when the file is busy.
    pub fn with_write<F, R>(&self, mut f: F) -> Result<R, LrsError>
    where
        F: FnMut(&Connection) -> Result<R, LrsError>,
    {
        let _writer = self
            .writer
            .lock()
            .map_err(|_| LrsError::StoreError("pool writer lock poisoned".to_string()))?;
        self.backoff.run(|| f(&self.connect()?))
    }

    pub fn with_read<F, R>(&self, f: F) -> Result<R, LrsError>
    where
        F: FnOnce(&Connection) -> Result<R, LrsError>,
    {
        f(&self.connect()?)
    }
}
