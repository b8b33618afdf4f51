//! Document store boundary.
//!
//! The engine issues only the primitives on [`DocumentStore`]: `find`, `get`, `save`,
//! `remove` and advisory index hints. Every call names the tenant, so an implementation
//! can never be asked for another organisation's documents by accident. The one
//! exception is `owner`, which reveals only the owning organisation of an id.
//!
//! [`MemoryStore`] backs tests and dry runs; the SQLite implementation lives in
//! [`crate::core::db`].

use crate::core::document::Document;
use crate::core::error::LrsError;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Tenant-scoped predicate over one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub organisation: String,
    /// Every `(field, value)` pair must be equal.
    pub equals: Vec<(String, JsonValue)>,
    /// `(field, id)`: the relation field must hold `id` (singular or within a list).
    pub referencing: Option<(String, String)>,
    pub include_deleted: bool,
}

impl Filter {
    pub fn tenant(organisation: &str) -> Self {
        Self {
            organisation: organisation.to_string(),
            equals: Vec::new(),
            referencing: None,
            include_deleted: false,
        }
    }

    pub fn eq(mut self, field: &str, value: JsonValue) -> Self {
        self.equals.push((field.to_string(), value));
        self
    }

    pub fn referencing(mut self, field: &str, id: &str) -> Self {
        self.referencing = Some((field.to_string(), id.to_string()));
        self
    }

    pub fn with_deleted(mut self, include: bool) -> Self {
        self.include_deleted = include;
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        if doc.organisation != self.organisation {
            return false;
        }
        if doc.deleted && !self.include_deleted {
            return false;
        }
        let fields_match = self
            .equals
            .iter()
            .all(|(field, value)| doc.get(field) == Some(value));
        let reference_match = match &self.referencing {
            Some((field, id)) => doc.references_id(field, id),
            None => true,
        };
        fields_match && reference_match
    }
}

pub trait DocumentStore: Send + Sync {
    /// Matching documents ordered by id.
    fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, LrsError>;

    /// Fetch by id inside one tenant, deleted documents included.
    fn get(
        &self,
        collection: &str,
        organisation: &str,
        id: &str,
    ) -> Result<Option<Document>, LrsError>;

    /// Organisation owning `id`, whichever tenant that is. Lets the engine refuse a
    /// foreign id before any related document is touched.
    fn owner(&self, collection: &str, id: &str) -> Result<Option<String>, LrsError>;

    /// Insert or replace. Replacing a document owned by another tenant is a
    /// `ValidationError`.
    fn save(&self, doc: &Document) -> Result<(), LrsError>;

    /// Physically delete. Returns whether a document was removed.
    fn remove(&self, collection: &str, organisation: &str, id: &str) -> Result<bool, LrsError>;

    /// Advisory index declaration; stores are free to ignore it.
    fn ensure_indexes(&self, _collection: &str, _hints: &[&[&str]]) -> Result<(), LrsError> {
        Ok(())
    }
}

/// In-process store keyed by `(collection, id)`.
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<BTreeMap<(String, String), Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> LrsError {
    LrsError::StoreError("memory store lock poisoned".to_string())
}

impl DocumentStore for MemoryStore {
    fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, LrsError> {
        let docs = self.docs.read().map_err(|_| poisoned())?;
        Ok(docs
            .iter()
            .filter(|((c, _), doc)| c == collection && filter.matches(doc))
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    fn get(
        &self,
        collection: &str,
        organisation: &str,
        id: &str,
    ) -> Result<Option<Document>, LrsError> {
        let docs = self.docs.read().map_err(|_| poisoned())?;
        Ok(docs
            .get(&(collection.to_string(), id.to_string()))
            .filter(|doc| doc.organisation == organisation)
            .cloned())
    }

    fn owner(&self, collection: &str, id: &str) -> Result<Option<String>, LrsError> {
        let docs = self.docs.read().map_err(|_| poisoned())?;
        Ok(docs
            .get(&(collection.to_string(), id.to_string()))
            .map(|doc| doc.organisation.clone()))
    }

    fn save(&self, doc: &Document) -> Result<(), LrsError> {
        let mut docs = self.docs.write().map_err(|_| poisoned())?;
        let key = (doc.collection.clone(), doc.id.clone());
        if let Some(existing) = docs.get(&key)
            && existing.organisation != doc.organisation
        {
            return Err(LrsError::ValidationError(format!(
                "document {} belongs to another organisation",
                doc.id
            )));
        }
        docs.insert(key, doc.clone());
        Ok(())
    }

    fn remove(&self, collection: &str, organisation: &str, id: &str) -> Result<bool, LrsError> {
        let mut docs = self.docs.write().map_err(|_| poisoned())?;
        let key = (collection.to_string(), id.to_string());
        match docs.get(&key) {
            Some(existing) if existing.organisation == organisation => {
                docs.remove(&key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
