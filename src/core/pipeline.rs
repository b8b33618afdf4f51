//! Entity lifecycle pipeline.
//!
//! Every mutation runs the same explicit stage list:
//!
//! ```text
//! Authorize -> Validate -> OrgScope -> SoftDelete -> RelationSync -> Persist
//! ```
//!
//! Authorize and Validate reject before anything is written. RelationSync sees the
//! final delete-marker state, so a save that flips `deleted` runs removal semantics.
//! Reads load through the tenant filter and project through field scoping last.

use crate::core::document::Document;
use crate::core::error::LrsError;
use crate::core::field_scope;
use crate::core::model::{Catalog, EntityDef};
use crate::core::org_scope;
use crate::core::relations::{RelationEngine, SyncMode};
use crate::core::scope::CallerContext;
use crate::core::soft_delete;
use crate::core::store::DocumentStore;
use crate::core::time;
use crate::core::validate;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Authorize,
    Validate,
    OrgScope,
    SoftDelete,
    RelationSync,
    Persist,
}

impl Stage {
    pub const DEFAULT: [Stage; 6] = [
        Stage::Authorize,
        Stage::Validate,
        Stage::OrgScope,
        Stage::SoftDelete,
        Stage::RelationSync,
        Stage::Persist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Authorize => "authorize",
            Stage::Validate => "validate",
            Stage::OrgScope => "org_scope",
            Stage::SoftDelete => "soft_delete",
            Stage::RelationSync => "relation_sync",
            Stage::Persist => "persist",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Insert or replace; `deleted: true` on the document turns it into a soft delete.
    Save,
    /// Soft delete.
    Delete,
    /// Relation cleanup, then physical removal.
    Remove,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Save => "save",
            Intent::Delete => "delete",
            Intent::Remove => "remove",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub intent: Intent,
    /// The document as persisted (or as it was just before removal).
    pub document: Document,
    pub created: bool,
    pub counterpart_writes: usize,
    pub stages_run: Vec<Stage>,
}

pub struct Pipeline<'a> {
    def: &'static EntityDef,
    catalog: &'a Catalog,
    store: &'a dyn DocumentStore,
    stages: Vec<Stage>,
}

/// Mutable state threaded through the stages of one operation.
struct Work {
    intent: Intent,
    doc: Document,
    existing: Option<Document>,
    /// Pre-scrub copy whose key fields locate counterparts in removal mode.
    snapshot: Option<Document>,
    counterpart_writes: usize,
}

impl<'a> Pipeline<'a> {
    pub fn new(def: &'static EntityDef, catalog: &'a Catalog, store: &'a dyn DocumentStore) -> Self {
        Self {
            def,
            catalog,
            store,
            stages: Stage::DEFAULT.to_vec(),
        }
    }

    pub fn with_stages(mut self, stages: Vec<Stage>) -> Self {
        self.stages = stages;
        self
    }

    pub fn entity(&self) -> &'static EntityDef {
        self.def
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn save(&self, caller: &CallerContext, doc: Document) -> Result<Outcome, LrsError> {
        self.run(Intent::Save, caller, doc)
    }

    pub fn delete(&self, caller: &CallerContext, doc: Document) -> Result<Outcome, LrsError> {
        self.run(Intent::Delete, caller, doc)
    }

    pub fn remove(&self, caller: &CallerContext, doc: Document) -> Result<Outcome, LrsError> {
        self.run(Intent::Remove, caller, doc)
    }

    fn run(&self, intent: Intent, caller: &CallerContext, mut doc: Document) -> Result<Outcome, LrsError> {
        doc.collection = self.def.collection.to_string();
        let existing = self
            .store
            .get(self.def.collection, &caller.organisation, &doc.id)?;
        let created = existing.is_none();
        let mut work = Work {
            intent,
            doc,
            existing,
            snapshot: None,
            counterpart_writes: 0,
        };

        let mut stages_run = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            tracing::trace!(entity = self.def.name, stage = stage.as_str(), "pipeline stage");
            self.run_stage(*stage, caller, &mut work)?;
            stages_run.push(*stage);
        }

        tracing::info!(
            entity = self.def.name,
            id = %work.doc.id,
            organisation = %work.doc.organisation,
            intent = intent.as_str(),
            deleted = work.doc.deleted,
            counterpart_writes = work.counterpart_writes,
            "entity mutation committed"
        );
        Ok(Outcome {
            intent,
            document: work.doc,
            created,
            counterpart_writes: work.counterpart_writes,
            stages_run,
        })
    }

    fn run_stage(&self, stage: Stage, caller: &CallerContext, work: &mut Work) -> Result<(), LrsError> {
        match stage {
            Stage::Authorize => field_scope::authorize_write(self.def, &caller.scopes),
            Stage::Validate => {
                if work.intent != Intent::Save {
                    return Ok(());
                }
                if work.existing.is_none() {
                    validate::apply_defaults(self.def, &mut work.doc);
                }
                validate::validate_document(self.def, &work.doc)?;
                self.check_unique(caller, &work.doc)
            }
            Stage::OrgScope => {
                org_scope::stamp(caller, &mut work.doc, work.existing.as_ref())?;
                if work.existing.is_some() {
                    return Ok(());
                }
                // Not in the caller's tenant; the id must not belong to another one either.
                let owner = self.store.owner(self.def.collection, &work.doc.id)?;
                org_scope::check_owner(&work.doc, owner.as_deref())
            }
            Stage::SoftDelete => {
                if work.intent == Intent::Delete {
                    work.doc.deleted = true;
                }
                work.snapshot = Some(work.doc.clone());
                if work.intent != Intent::Remove {
                    if soft_delete::is_deleted(&work.doc) {
                        soft_delete::mark_deleted(self.def, &mut work.doc, &time::now_rfc3339());
                    } else {
                        work.doc.deleted_at = None;
                    }
                }
                Ok(())
            }
            Stage::RelationSync => {
                let mode = if work.intent == Intent::Remove {
                    SyncMode::Removal
                } else {
                    SyncMode::for_document(&work.doc)
                };
                let engine = RelationEngine::new(self.store, self.catalog);
                let keys_from = work.snapshot.as_ref().unwrap_or(&work.doc);
                let report = engine.sync(self.def, &work.doc, keys_from, mode)?;
                work.counterpart_writes = report.counterpart_writes;
                for assignment in &report.local {
                    assignment.apply(&mut work.doc);
                }
                Ok(())
            }
            Stage::Persist => match work.intent {
                Intent::Remove => {
                    if !self
                        .store
                        .remove(self.def.collection, &work.doc.organisation, &work.doc.id)?
                    {
                        tracing::debug!(id = %work.doc.id, "document already removed");
                    }
                    Ok(())
                }
                Intent::Save | Intent::Delete => {
                    let now = time::now_rfc3339();
                    if work.doc.created_at.is_none() {
                        work.doc.created_at = work
                            .existing
                            .as_ref()
                            .and_then(|e| e.created_at.clone())
                            .or_else(|| Some(now.clone()));
                    }
                    work.doc.updated_at = Some(now);
                    self.store.save(&work.doc)
                }
            },
        }
    }

    /// Reject a second active document carrying the same business key in the tenant.
    fn check_unique(&self, caller: &CallerContext, doc: &Document) -> Result<(), LrsError> {
        if !self.def.unique_key || doc.deleted {
            return Ok(());
        }
        let mut filter = org_scope::read_filter(caller, false);
        for key in self.def.business_key {
            match doc.key_value(key) {
                Some(v) => filter = filter.eq(key, v.clone()),
                None => return Ok(()),
            }
        }
        let clash = self
            .store
            .find(self.def.collection, &filter)?
            .into_iter()
            .find(|other| other.id != doc.id);
        match clash {
            Some(other) => Err(LrsError::ValidationError(format!(
                "{} with business key [{}] already exists as {}",
                self.def.name,
                self.def.business_key.join(", "),
                other.id
            ))),
            None => Ok(()),
        }
    }

    /// Project a loaded document for `caller`.
    pub fn read(&self, caller: &CallerContext, doc: &Document) -> Result<Map<String, JsonValue>, LrsError> {
        field_scope::authorize_read(self.def, &caller.scopes)?;
        Ok(field_scope::filter_read(self.def, doc, &caller.scopes))
    }

    /// Load one document by id inside the caller's tenant.
    pub fn load(
        &self,
        caller: &CallerContext,
        id: &str,
        include_deleted: bool,
    ) -> Result<Document, LrsError> {
        let found = self
            .store
            .get(self.def.collection, &caller.organisation, id)?
            .filter(|d| include_deleted || !d.deleted);
        found.ok_or_else(|| LrsError::NotFound(format!("{} {}", self.def.name, id)))
    }

    pub fn get(
        &self,
        caller: &CallerContext,
        id: &str,
        include_deleted: bool,
    ) -> Result<Map<String, JsonValue>, LrsError> {
        field_scope::authorize_read(self.def, &caller.scopes)?;
        let doc = self.load(caller, id, include_deleted)?;
        self.read(caller, &doc)
    }

    pub fn list(
        &self,
        caller: &CallerContext,
        equals: &[(String, JsonValue)],
        include_deleted: bool,
    ) -> Result<Vec<Map<String, JsonValue>>, LrsError> {
        field_scope::authorize_read(self.def, &caller.scopes)?;
        let mut filter = org_scope::read_filter(caller, include_deleted);
        for (field, value) in equals {
            filter = filter.eq(field, value.clone());
        }
        self.store
            .find(self.def.collection, &filter)?
            .iter()
            .map(|doc| self.read(caller, doc))
            .collect()
    }
}
