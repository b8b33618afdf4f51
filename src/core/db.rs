use crate::core::document::Document;
use crate::core::error;
use crate::core::pool::SqlitePool;
use crate::core::schemas;
use crate::core::store::{DocumentStore, Filter};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BUSY_TIMEOUT_SECS: u32 = 5;

pub fn db_connect(db_path: &Path, busy_timeout_secs: u32) -> Result<Connection, error::LrsError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(Duration::from_secs(u64::from(busy_timeout_secs)))
        .map_err(error::LrsError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::LrsError::RusqliteError)?;
    Ok(conn)
}

pub fn lrs_db_path(root: &Path) -> PathBuf {
    root.join(schemas::LRS_DB_NAME)
}

pub fn initialize_db_at(db_path: &Path, busy_timeout_secs: u32) -> Result<(), error::LrsError> {
    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir).map_err(error::LrsError::IoError)?;
    }
    let conn = db_connect(db_path, busy_timeout_secs).map_err(|e| {
        error::LrsError::DatabaseInitializationError(format!("{}: {}", db_path.display(), e))
    })?;
    for ddl in schemas::ALL_SCHEMAS {
        conn.execute(ddl, [])?;
    }
    Ok(())
}

pub fn initialize_lrs_db(root: &Path) -> Result<(), error::LrsError> {
    initialize_db_at(&lrs_db_path(root), DEFAULT_BUSY_TIMEOUT_SECS)
}

/// Names that may be spliced into a JSON path or an index name.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// SQL value comparable with `json_extract` output. Arrays, objects, null and
/// out-of-range integers stay in the Rust-side filter only.
fn sql_scalar(value: &JsonValue) -> Option<Value> {
    match value {
        JsonValue::String(s) => Some(Value::Text(s.clone())),
        JsonValue::Bool(b) => Some(Value::Integer(i64::from(*b))),
        JsonValue::Number(n) if n.is_f64() => n.as_f64().map(Value::Real),
        JsonValue::Number(n) => n.as_i64().map(Value::Integer),
        _ => None,
    }
}

/// `WHERE` clause and bindings for `filter` over `collection`.
///
/// The clause narrows the scan; it may admit rows the filter rejects (`true` and `1`
/// compare equal in SQL) but never drops a row the filter accepts.
fn find_clause(collection: &str, filter: &Filter) -> (String, Vec<Value>) {
    let mut sql = String::from("collection = ? AND organisation = ?");
    let mut binds = vec![
        Value::Text(collection.to_string()),
        Value::Text(filter.organisation.clone()),
    ];
    if !filter.include_deleted {
        sql.push_str(" AND deleted = 0");
    }
    for (field, value) in &filter.equals {
        if !is_plain_name(field) {
            continue;
        }
        if let Some(v) = sql_scalar(value) {
            sql.push_str(&format!(" AND json_extract(body, '$.{}') = ?", field));
            binds.push(v);
        }
    }
    if let Some((field, id)) = &filter.referencing
        && is_plain_name(field)
    {
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM json_each(documents.body, '$.{}') WHERE json_each.value = ?)",
            field
        ));
        binds.push(Value::Text(id.clone()));
    }
    (sql, binds)
}

/// Expression index DDL for one hint, or `None` when no field can be indexed.
fn hint_index_ddl(collection: &str, fields: &[&str]) -> Option<String> {
    if !is_plain_name(collection) {
        return None;
    }
    let json_fields: Vec<&str> = fields
        .iter()
        .copied()
        .filter(|f| *f != "organisation" && is_plain_name(f))
        .collect();
    if json_fields.is_empty() {
        return None;
    }
    let columns: Vec<String> = json_fields
        .iter()
        .map(|f| format!("json_extract(body, '$.{}')", f))
        .collect();
    Some(format!(
        "CREATE INDEX IF NOT EXISTS idx_hint_{}_{} ON documents(collection, organisation, {})",
        collection,
        json_fields.join("_"),
        columns.join(", ")
    ))
}

/// Document store over the `documents` table.
///
/// Bodies are stored as JSON; tenant, collection and the delete flag are mirrored into
/// columns so the tenant partition is enforced in SQL. Scalar field predicates are
/// pushed into SQL through `json_extract`, and every row is re-checked against the
/// filter after decoding.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `db_path`.
    pub fn open(db_path: &Path, busy_timeout_secs: u32) -> Result<Self, error::LrsError> {
        initialize_db_at(db_path, busy_timeout_secs)?;
        Ok(Self {
            pool: SqlitePool::new(db_path, busy_timeout_secs),
        })
    }

    pub fn db_path(&self) -> &Path {
        self.pool.db_path()
    }
}

impl DocumentStore for SqliteStore {
    fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, error::LrsError> {
        let (clause, binds) = find_clause(collection, filter);
        let bodies = self.pool.with_read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT body FROM documents WHERE {} ORDER BY id",
                clause
            ))?;
            let rows = stmt.query_map(params_from_iter(binds.iter()), |row| row.get::<_, String>(0))?;
            let mut out = Vec::new();
            for r in rows {
                out.push(r?);
            }
            Ok(out)
        })?;

        let mut results = Vec::new();
        for body in bodies {
            let doc = Document::from_body(collection, &body)?;
            if filter.matches(&doc) {
                results.push(doc);
            }
        }
        Ok(results)
    }

    fn get(
        &self,
        collection: &str,
        organisation: &str,
        id: &str,
    ) -> Result<Option<Document>, error::LrsError> {
        let body = self.pool.with_read(|conn| {
            let body = conn
                .query_row(
                    "SELECT body FROM documents WHERE collection = ?1 AND id = ?2 AND organisation = ?3",
                    params![collection, id, organisation],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(body)
        })?;
        body.map(|b| Document::from_body(collection, &b)).transpose()
    }

    fn owner(&self, collection: &str, id: &str) -> Result<Option<String>, error::LrsError> {
        self.pool.with_read(|conn| {
            Ok(conn
                .query_row(
                    "SELECT organisation FROM documents WHERE collection = ?1 AND id = ?2",
                    params![collection, id],
                    |row| row.get::<_, String>(0),
                )
                .optional()?)
        })
    }

    fn save(&self, doc: &Document) -> Result<(), error::LrsError> {
        let body = doc.to_body()?;
        let changed = self.pool.with_write(|conn| {
            let n = conn.execute(
                "INSERT INTO documents(collection, id, organisation, deleted, body, updated_at)
                 VALUES(?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(collection, id) DO UPDATE SET
                    deleted = excluded.deleted,
                    body = excluded.body,
                    updated_at = excluded.updated_at
                 WHERE documents.organisation = excluded.organisation",
                params![
                    doc.collection,
                    doc.id,
                    doc.organisation,
                    doc.deleted,
                    body,
                    doc.updated_at
                ],
            )?;
            Ok(n)
        })?;
        if changed == 0 {
            return Err(error::LrsError::ValidationError(format!(
                "document {} belongs to another organisation",
                doc.id
            )));
        }
        Ok(())
    }

    fn remove(&self, collection: &str, organisation: &str, id: &str) -> Result<bool, error::LrsError> {
        let n = self.pool.with_write(|conn| {
            Ok(conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2 AND organisation = ?3",
                params![collection, id, organisation],
            )?)
        })?;
        Ok(n > 0)
    }

    fn ensure_indexes(&self, collection: &str, hints: &[&[&str]]) -> Result<(), error::LrsError> {
        self.pool.with_write(|conn| {
            for fields in hints {
                conn.execute(
                    "INSERT OR IGNORE INTO index_hints(collection, fields) VALUES(?1, ?2)",
                    params![collection, fields.join(",")],
                )?;
                if let Some(ddl) = hint_index_ddl(collection, fields) {
                    conn.execute(&ddl, [])?;
                }
            }
            Ok(())
        })
    }
}
