//! The `Lrs` context: one opened store, one catalog, one audit broker.
//!
//! Opened once at start-up and handed to whatever needs it; there is no global
//! connection registry. Every entity operation resolves its pipeline here, runs it and
//! records the outcome in the audit log.

use crate::core::broker::{AuditTarget, DbBroker};
use crate::core::config::LrsConfig;
use crate::core::db::SqliteStore;
use crate::core::document::Document;
use crate::core::error::LrsError;
use crate::core::field_scope;
use crate::core::model::{Catalog, EntityDef};
use crate::core::pipeline::{Outcome, Pipeline};
use crate::core::scope::CallerContext;
use crate::core::store::{DocumentStore, MemoryStore};
use crate::core::time;
use crate::core::validate;
use serde_json::{Map, Value as JsonValue};
use std::fs;
use std::sync::Arc;

pub struct Lrs {
    config: LrsConfig,
    store: Arc<dyn DocumentStore>,
    catalog: &'static Catalog,
    broker: DbBroker,
}

impl Lrs {
    /// Open the SQLite-backed store under `config.data_dir` and declare index hints.
    pub fn open(config: LrsConfig, catalog: &'static Catalog) -> Result<Self, LrsError> {
        fs::create_dir_all(&config.data_dir)?;
        let store = SqliteStore::open(&config.db_path(), config.busy_timeout_secs)?;
        let broker = DbBroker::new(&config.data_dir).with_busy_timeout(config.busy_timeout_secs);
        let lrs = Self::with_store(config, Arc::new(store), catalog, broker);
        lrs.ensure_indexes()?;
        tracing::info!(
            db = %lrs.config.db_path().display(),
            catalog = catalog.name,
            "store opened"
        );
        Ok(lrs)
    }

    pub fn with_store(
        config: LrsConfig,
        store: Arc<dyn DocumentStore>,
        catalog: &'static Catalog,
        broker: DbBroker,
    ) -> Self {
        Self {
            config,
            store,
            catalog,
            broker,
        }
    }

    /// In-memory store, no audit log.
    pub fn in_memory(catalog: &'static Catalog) -> Self {
        Self::with_store(
            LrsConfig::default(),
            Arc::new(MemoryStore::new()),
            catalog,
            DbBroker::disabled(),
        )
    }

    pub fn close(self) {
        tracing::debug!(catalog = self.catalog.name, "store closed");
    }

    pub fn config(&self) -> &LrsConfig {
        &self.config
    }

    pub fn catalog(&self) -> &'static Catalog {
        self.catalog
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn broker(&self) -> &DbBroker {
        &self.broker
    }

    pub fn ensure_indexes(&self) -> Result<(), LrsError> {
        for def in self.catalog.entities {
            self.store.ensure_indexes(def.collection, def.index_hints)?;
        }
        Ok(())
    }

    pub fn pipeline(&self, entity: &str) -> Result<Pipeline<'_>, LrsError> {
        let def = self.catalog.entity(entity)?;
        Ok(Pipeline::new(def, self.catalog, self.store.as_ref()))
    }

    /// Insert a new document. Ids are always assigned here.
    pub fn create(
        &self,
        caller: &CallerContext,
        entity: &str,
        body: JsonValue,
    ) -> Result<Map<String, JsonValue>, LrsError> {
        let pipeline = self.pipeline(entity)?;
        let def = pipeline.entity();
        let input = into_object(body)?;
        validate::check_writable_input(def, &input)?;
        if input.contains_key("_id") {
            return Err(LrsError::ValidationError(
                "`_id`: assigned by the store on create".to_string(),
            ));
        }
        let mut doc = Document::new(def.collection, &time::new_document_id(), "");
        merge_input(&mut doc, input)?;
        let outcome = self.audited(caller, def, "entity.create", &doc, || {
            pipeline.save(caller, doc.clone())
        })?;
        Ok(field_scope::filter_read(def, &outcome.document, &caller.scopes))
    }

    /// Merge `patch` into an active document and save it. `null` clears a field and
    /// `deleted: true` soft-deletes through the save path.
    pub fn update(
        &self,
        caller: &CallerContext,
        entity: &str,
        id: &str,
        patch: JsonValue,
    ) -> Result<Map<String, JsonValue>, LrsError> {
        let pipeline = self.pipeline(entity)?;
        let def = pipeline.entity();
        let input = into_object(patch)?;
        validate::check_writable_input(def, &input)?;
        if let Some(given) = input.get("_id")
            && given.as_str() != Some(id)
        {
            return Err(LrsError::ValidationError(format!(
                "`_id`: does not match {}",
                id
            )));
        }
        field_scope::authorize_write(def, &caller.scopes)?;
        let mut doc = pipeline.load(caller, id, false)?;
        merge_input(&mut doc, input)?;
        let outcome = self.audited(caller, def, "entity.update", &doc, || {
            pipeline.save(caller, doc.clone())
        })?;
        Ok(field_scope::filter_read(def, &outcome.document, &caller.scopes))
    }

    /// `create` without `_id`, `update` with it.
    pub fn save(
        &self,
        caller: &CallerContext,
        entity: &str,
        body: JsonValue,
    ) -> Result<Map<String, JsonValue>, LrsError> {
        match body.get("_id").and_then(JsonValue::as_str).map(str::to_string) {
            Some(id) => self.update(caller, entity, &id, body),
            None => self.create(caller, entity, body),
        }
    }

    pub fn delete(
        &self,
        caller: &CallerContext,
        entity: &str,
        id: &str,
    ) -> Result<Map<String, JsonValue>, LrsError> {
        let pipeline = self.pipeline(entity)?;
        let def = pipeline.entity();
        field_scope::authorize_write(def, &caller.scopes)?;
        // Deleting twice re-applies the scrub and the relation cleanup.
        let doc = pipeline.load(caller, id, true)?;
        let outcome = self.audited(caller, def, "entity.delete", &doc, || {
            pipeline.delete(caller, doc.clone())
        })?;
        Ok(field_scope::filter_read(def, &outcome.document, &caller.scopes))
    }

    /// Hard remove. Soft-deleted documents can be removed too.
    pub fn remove(&self, caller: &CallerContext, entity: &str, id: &str) -> Result<(), LrsError> {
        let pipeline = self.pipeline(entity)?;
        let def = pipeline.entity();
        field_scope::authorize_write(def, &caller.scopes)?;
        let doc = pipeline.load(caller, id, true)?;
        self.audited(caller, def, "entity.remove", &doc, || {
            pipeline.remove(caller, doc.clone())
        })?;
        Ok(())
    }

    pub fn get(
        &self,
        caller: &CallerContext,
        entity: &str,
        id: &str,
        include_deleted: bool,
    ) -> Result<Map<String, JsonValue>, LrsError> {
        self.pipeline(entity)?.get(caller, id, include_deleted)
    }

    pub fn list(
        &self,
        caller: &CallerContext,
        entity: &str,
        equals: &[(String, JsonValue)],
        include_deleted: bool,
    ) -> Result<Vec<Map<String, JsonValue>>, LrsError> {
        self.pipeline(entity)?.list(caller, equals, include_deleted)
    }

    fn audited<F>(
        &self,
        caller: &CallerContext,
        def: &EntityDef,
        op: &str,
        doc: &Document,
        f: F,
    ) -> Result<Outcome, LrsError>
    where
        F: FnOnce() -> Result<Outcome, LrsError>,
    {
        let result = f();
        let organisation = match &result {
            Ok(outcome) => outcome.document.organisation.clone(),
            Err(_) => caller.organisation.clone(),
        };
        let target = AuditTarget {
            collection: def.collection,
            entity_id: Some(&doc.id),
            organisation: Some(&organisation),
        };
        self.broker.settle(&caller.actor, op, target, result)
    }
}

fn into_object(value: JsonValue) -> Result<Map<String, JsonValue>, LrsError> {
    match value {
        JsonValue::Object(map) => Ok(map),
        other => Err(LrsError::ValidationError(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// Apply caller input onto `doc`: envelope keys go to the envelope, `null` clears.
fn merge_input(doc: &mut Document, input: Map<String, JsonValue>) -> Result<(), LrsError> {
    for (key, value) in input {
        match key.as_str() {
            "_id" => {}
            "organisation" => match value {
                JsonValue::String(org) => doc.organisation = org,
                JsonValue::Null => {}
                _ => {
                    return Err(LrsError::ValidationError(
                        "`organisation`: expected a string".to_string(),
                    ));
                }
            },
            "deleted" => match value {
                JsonValue::Bool(flag) => doc.deleted = flag,
                _ => {
                    return Err(LrsError::ValidationError(
                        "`deleted`: expected a boolean".to_string(),
                    ));
                }
            },
            _ if value.is_null() => {
                doc.clear(&key);
            }
            _ => doc.set(&key, value),
        }
    }
    Ok(())
}
