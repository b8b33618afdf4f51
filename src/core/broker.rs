//! Serialized mutation layer and audit trail.
//!
//! Every committed document mutation and every client-registry change is appended to
//! `broker.events.jsonl` in the data directory, one JSON object per line.

use crate::core::db;
use crate::core::error::LrsError;
use crate::core::time;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const AUDIT_LOG_NAME: &str = "broker.events.jsonl";

pub struct DbBroker {
    audit_log_path: Option<PathBuf>,
    append_lock: Mutex<()>,
    busy_timeout_secs: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BrokerEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub op: String,
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organisation: Option<String>,
    pub status: String,
}

/// What a mutation touched, for the audit line.
#[derive(Debug, Clone, Copy)]
pub struct AuditTarget<'a> {
    pub collection: &'a str,
    pub entity_id: Option<&'a str>,
    pub organisation: Option<&'a str>,
}

impl DbBroker {
    pub fn new(root: &Path) -> Self {
        Self {
            audit_log_path: Some(root.join(AUDIT_LOG_NAME)),
            append_lock: Mutex::new(()),
            busy_timeout_secs: db::DEFAULT_BUSY_TIMEOUT_SECS,
        }
    }

    pub fn with_busy_timeout(mut self, secs: u32) -> Self {
        self.busy_timeout_secs = secs;
        self
    }

    /// A broker that records nothing. Used with in-memory stores.
    pub fn disabled() -> Self {
        Self {
            audit_log_path: None,
            append_lock: Mutex::new(()),
            busy_timeout_secs: db::DEFAULT_BUSY_TIMEOUT_SECS,
        }
    }

    pub fn audit_log_path(&self) -> Option<&Path> {
        self.audit_log_path.as_deref()
    }

    /// Execute a closure with a serialized connection to the specified DB.
    pub fn with_conn<F, R>(
        &self,
        db_path: &Path,
        actor: &str,
        op_name: &str,
        f: F,
    ) -> Result<R, LrsError>
    where
        F: FnOnce(&Connection) -> Result<R, LrsError>,
    {
        static DB_LOCK: Mutex<()> = Mutex::new(());
        let _lock = DB_LOCK
            .lock()
            .map_err(|_| LrsError::StoreError("broker lock poisoned".to_string()))?;

        let collection = db_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let conn = db::db_connect(db_path, self.busy_timeout_secs)?;

        let result = f(&conn);

        let target = AuditTarget {
            collection: &collection,
            entity_id: None,
            organisation: None,
        };
        self.settle(actor, op_name, target, result)
    }

    /// Record the outcome of an operation and hand its result back unchanged.
    ///
    /// The operation has already run, so a failed append never replaces its result:
    /// a committed mutation stays `Ok` and the append failure is logged.
    pub fn settle<R>(
        &self,
        actor: &str,
        op: &str,
        target: AuditTarget<'_>,
        result: Result<R, LrsError>,
    ) -> Result<R, LrsError> {
        if let Err(audit_err) = self.record(actor, op, target, result.is_ok()) {
            if result.is_ok() {
                tracing::error!(
                    op,
                    collection = target.collection,
                    entity_id = target.entity_id,
                    error = %audit_err,
                    "mutation committed but audit append failed"
                );
            } else {
                tracing::warn!(op, collection = target.collection, error = %audit_err, "audit append failed");
            }
        }
        result
    }

    /// Append one audit line. A disabled broker returns immediately.
    pub fn record(
        &self,
        actor: &str,
        op: &str,
        target: AuditTarget<'_>,
        success: bool,
    ) -> Result<(), LrsError> {
        let Some(path) = &self.audit_log_path else {
            return Ok(());
        };
        let ev = BrokerEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            actor: actor.to_string(),
            op: op.to_string(),
            collection: target.collection.to_string(),
            entity_id: target.entity_id.map(str::to_string),
            organisation: target.organisation.map(str::to_string),
            status: if success { "success" } else { "error" }.to_string(),
        };
        let line = serde_json::to_string(&ev)?;

        let _guard = self
            .append_lock
            .lock()
            .map_err(|_| LrsError::StoreError("audit lock poisoned".to_string()))?;
        let mut f = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(f, "{}", line)?;
        Ok(())
    }

    /// Every recorded event, oldest first.
    pub fn events(&self) -> Result<Vec<BrokerEvent>, LrsError> {
        let Some(path) = &self.audit_log_path else {
            return Ok(Vec::new());
        };
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(path)?;
        raw.lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(LrsError::from))
            .collect()
    }
}
