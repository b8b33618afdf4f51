//! Relation consistency engine.
//!
//! After a save or delete of a subject document, every relation declared on its entity
//! type is brought back into a consistent state on both sides:
//!
//! - **Foreign side**: the pointer lives on the counterpart. Counterparts are located by
//!   tenant plus every key pair; in additive mode they gain the subject's id, in removal
//!   mode they lose it.
//! - **Local side**: the pointer lives on the subject. It is recomputed from scratch by
//!   querying the counterparts, so drift heals on the next save. Local tasks never write
//!   the subject; they return [`LocalAssignment`]s for the caller to apply before persist.
//!
//! All relation tasks of one operation run on the rayon pool and are joined before the
//! operation returns. Every task is attempted even when a sibling fails; the first
//! error in declaration order is reported. Nothing is rolled back, and every task is
//! idempotent, so re-running the operation converges.

use crate::core::document::{Document, id_array};
use crate::core::error::LrsError;
use crate::core::model::{Cardinality, Catalog, EntityDef, RelationDef, Side};
use crate::core::store::{DocumentStore, Filter};
use rayon::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Subject saved and live: counterparts only ever gain the subject's id.
    Additive,
    /// Subject deleted or being removed: counterparts lose the subject's id.
    Removal,
}

impl SyncMode {
    pub fn for_document(doc: &Document) -> Self {
        if doc.deleted {
            SyncMode::Removal
        } else {
            SyncMode::Additive
        }
    }
}

/// Recomputed value for one of the subject's own pointer fields. `None` clears it.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalAssignment {
    pub field: &'static str,
    pub value: Option<JsonValue>,
}

impl LocalAssignment {
    pub fn apply(&self, doc: &mut Document) {
        match &self.value {
            Some(v) => doc.set(self.field, v.clone()),
            None => {
                doc.clear(self.field);
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// Counterpart documents rewritten by foreign-side tasks.
    pub counterpart_writes: usize,
    pub local: Vec<LocalAssignment>,
}

pub struct RelationEngine<'a> {
    store: &'a dyn DocumentStore,
    catalog: &'a Catalog,
}

impl<'a> RelationEngine<'a> {
    pub fn new(store: &'a dyn DocumentStore, catalog: &'a Catalog) -> Self {
        Self { store, catalog }
    }

    /// Run every relation task for `subject`.
    ///
    /// `keys_from` supplies matching-key values. It differs from `subject` when a soft
    /// delete has already scrubbed the subject's key fields.
    pub fn sync(
        &self,
        def: &EntityDef,
        subject: &Document,
        keys_from: &Document,
        mode: SyncMode,
    ) -> Result<SyncReport, LrsError> {
        let (foreign, local) = rayon::join(
            || self.sync_foreign(def, subject, keys_from, mode),
            || match mode {
                SyncMode::Additive => self.resolve_local(def, subject),
                // A deleted subject keeps only its keep set; nothing to resolve.
                SyncMode::Removal => Ok(Vec::new()),
            },
        );
        let counterpart_writes = foreign?;
        let local = local?;
        Ok(SyncReport {
            counterpart_writes,
            local,
        })
    }

    /// Foreign-side tasks in parallel. Returns the number of counterparts rewritten.
    pub fn sync_foreign(
        &self,
        def: &EntityDef,
        subject: &Document,
        keys_from: &Document,
        mode: SyncMode,
    ) -> Result<usize, LrsError> {
        let relations: Vec<&RelationDef> = def.foreign_relations().collect();
        let results: Vec<Result<usize, LrsError>> = relations
            .par_iter()
            .map(|rel| self.update_foreign(def, rel, subject, keys_from, mode))
            .collect();
        Ok(join_results(results)?.into_iter().sum())
    }

    /// Local-side tasks in parallel.
    pub fn resolve_local(
        &self,
        def: &EntityDef,
        subject: &Document,
    ) -> Result<Vec<LocalAssignment>, LrsError> {
        let relations: Vec<&RelationDef> = def.local_relations().collect();
        let results: Vec<Result<LocalAssignment, LrsError>> = relations
            .par_iter()
            .map(|rel| self.resolve_one(rel, subject))
            .collect();
        join_results(results)
    }

    fn update_foreign(
        &self,
        def: &EntityDef,
        rel: &RelationDef,
        subject: &Document,
        keys_from: &Document,
        mode: SyncMode,
    ) -> Result<usize, LrsError> {
        debug_assert_eq!(rel.side, Side::Foreign);
        let target = self.catalog.entity(rel.target)?;

        let mut counterparts = match key_filter(rel, &subject.organisation, keys_from) {
            Some(filter) => self.store.find(target.collection, &filter)?,
            None => Vec::new(),
        };
        if mode == SyncMode::Removal {
            let by_pointer = Filter::tenant(&subject.organisation).referencing(rel.field, &subject.id);
            for doc in self.store.find(target.collection, &by_pointer)? {
                if !counterparts.iter().any(|c| c.id == doc.id) {
                    counterparts.push(doc);
                }
            }
        }

        if counterparts.is_empty() {
            tracing::debug!(
                entity = def.name,
                id = %subject.id,
                counterpart_type = target.name,
                field = rel.field,
                "no counterpart for relation"
            );
            return Ok(0);
        }

        let mut results = Vec::with_capacity(counterparts.len());
        for mut counterpart in counterparts {
            let changed = match (rel.cardinality, mode) {
                (Cardinality::Singular, SyncMode::Additive) => {
                    counterpart.set_reference(rel.field, &subject.id)
                }
                (Cardinality::Singular, SyncMode::Removal) => {
                    counterpart.clear_reference(rel.field, &subject.id)
                }
                (Cardinality::Multiple, SyncMode::Additive) => {
                    counterpart.add_reference(rel.field, &subject.id)
                }
                (Cardinality::Multiple, SyncMode::Removal) => {
                    counterpart.remove_reference(rel.field, &subject.id)
                }
            };
            if !changed {
                continue;
            }
            tracing::debug!(
                counterpart_type = target.name,
                counterpart = %counterpart.id,
                field = rel.field,
                ?mode,
                "rewriting counterpart pointer"
            );
            results.push(self.store.save(&counterpart).map(|_| 1usize));
        }
        Ok(join_results(results)?.into_iter().sum())
    }

    fn resolve_one(&self, rel: &RelationDef, subject: &Document) -> Result<LocalAssignment, LrsError> {
        debug_assert_eq!(rel.side, Side::Local);
        let target = self.catalog.entity(rel.target)?;

        let mut ids: Vec<String> = match key_filter(rel, &subject.organisation, subject) {
            Some(filter) => self
                .store
                .find(target.collection, &filter)?
                .into_iter()
                .map(|d| d.id)
                .collect(),
            None => Vec::new(),
        };
        ids.sort();
        ids.dedup();

        let value = match rel.cardinality {
            Cardinality::Singular => ids.into_iter().next().map(JsonValue::String),
            Cardinality::Multiple => Some(id_array(ids)),
        };
        Ok(LocalAssignment {
            field: rel.field,
            value,
        })
    }
}

/// Counterpart predicate for a relation, or `None` when a key component is missing on
/// the subject: a partial compound key never matches.
pub fn key_filter(rel: &RelationDef, organisation: &str, keys_from: &Document) -> Option<Filter> {
    let mut filter = Filter::tenant(organisation);
    for pair in rel.keys {
        let value = keys_from.key_value(pair.own)?;
        filter = filter.eq(pair.remote, value.clone());
    }
    Some(filter)
}

/// Wait-for-all join: every result is already computed; report the first error in order.
pub fn join_results<T>(results: Vec<Result<T, LrsError>>) -> Result<Vec<T>, LrsError> {
    let mut out = Vec::with_capacity(results.len());
    let mut first_err = None;
    for r in results {
        match r {
            Ok(v) => out.push(v),
            Err(e) => {
                tracing::warn!(error = %e, "relation task failed");
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(out),
    }
}
