//! Declarative entity tables consulted by the generic engine code.
//!
//! Every data plugin describes its entity types as `static` [`EntityDef`] values: the
//! collection they live in, their business key, per-field read scopes and validation
//! rules, entity-level read/write scopes, the soft-delete keep set, and the relation
//! declarations the consistency engine walks on every save and delete.

use crate::core::error::LrsError;
use crate::core::scope::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Date,
    /// Singular relation pointer (a document id).
    Reference,
    /// Multiple-valued relation pointer (a set of document ids).
    ReferenceList,
}

impl FieldKind {
    pub fn is_relation(&self) -> bool {
        matches!(self, FieldKind::Reference | FieldKind::ReferenceList)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Date => "date",
            FieldKind::Reference => "reference",
            FieldKind::ReferenceList => "reference_list",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Scopes allowed to read this field. Empty means only `ALL`.
    pub read: &'static [Scope],
    pub max_len: Option<usize>,
    pub range: Option<(f64, f64)>,
    pub one_of: Option<&'static [&'static str]>,
    pub default_number: Option<f64>,
}

impl FieldDef {
    const fn base(name: &'static str, kind: FieldKind, read: &'static [Scope]) -> Self {
        Self {
            name,
            kind,
            required: false,
            read,
            max_len: None,
            range: None,
            one_of: None,
            default_number: None,
        }
    }

    pub const fn text(name: &'static str, read: &'static [Scope]) -> Self {
        Self::base(name, FieldKind::Text, read)
    }

    pub const fn number(name: &'static str, read: &'static [Scope]) -> Self {
        Self::base(name, FieldKind::Number, read)
    }

    pub const fn date(name: &'static str, read: &'static [Scope]) -> Self {
        Self::base(name, FieldKind::Date, read)
    }

    pub const fn reference(name: &'static str, read: &'static [Scope]) -> Self {
        Self::base(name, FieldKind::Reference, read)
    }

    pub const fn references(name: &'static str, read: &'static [Scope]) -> Self {
        Self::base(name, FieldKind::ReferenceList, read)
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn max_len(mut self, len: usize) -> Self {
        self.max_len = Some(len);
        self
    }

    pub const fn range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }

    pub const fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.one_of = Some(values);
        self
    }

    pub const fn default_number(mut self, value: f64) -> Self {
        self.default_number = Some(value);
        self
    }
}

/// Which document holds the pointer a relation declaration maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The pointer lives on the entity being saved.
    Local,
    /// The pointer lives on the counterpart and points back at the entity being saved.
    Foreign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Singular,
    Multiple,
}

/// One component of a matching key: `counterpart.remote == subject.own`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPair {
    pub remote: &'static str,
    pub own: &'static str,
}

impl KeyPair {
    pub const fn same(field: &'static str) -> Self {
        Self {
            remote: field,
            own: field,
        }
    }

    pub const fn new(remote: &'static str, own: &'static str) -> Self {
        Self { remote, own }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RelationDef {
    /// Entity name of the counterpart.
    pub target: &'static str,
    pub side: Side,
    /// Cardinality of `field`.
    pub cardinality: Cardinality,
    /// Pointer field: on the subject for `Local`, on the counterpart for `Foreign`.
    pub field: &'static str,
    /// All pairs must match, inside the subject's organisation. Empty = whole tenant.
    pub keys: &'static [KeyPair],
}

impl RelationDef {
    pub const fn local(
        target: &'static str,
        cardinality: Cardinality,
        field: &'static str,
        keys: &'static [KeyPair],
    ) -> Self {
        Self {
            target,
            side: Side::Local,
            cardinality,
            field,
            keys,
        }
    }

    pub const fn foreign(
        target: &'static str,
        cardinality: Cardinality,
        field: &'static str,
        keys: &'static [KeyPair],
    ) -> Self {
        Self {
            target,
            side: Side::Foreign,
            cardinality,
            field,
            keys,
        }
    }
}

#[derive(Debug)]
pub struct EntityDef {
    pub name: &'static str,
    pub collection: &'static str,
    pub business_key: &'static [&'static str],
    /// Reject a second active document with the same business key in a tenant.
    pub unique_key: bool,
    pub fields: &'static [FieldDef],
    pub read_scopes: &'static [Scope],
    pub write_scopes: &'static [Scope],
    /// Fields that survive a soft delete besides identity, organisation and timestamps.
    pub keep_on_delete: &'static [&'static str],
    pub relations: &'static [RelationDef],
    pub index_hints: &'static [&'static [&'static str]],
}

impl EntityDef {
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn local_relations(&self) -> impl Iterator<Item = &'static RelationDef> {
        self.relations.iter().filter(|r| r.side == Side::Local)
    }

    pub fn foreign_relations(&self) -> impl Iterator<Item = &'static RelationDef> {
        self.relations.iter().filter(|r| r.side == Side::Foreign)
    }

    pub fn keeps(&self, field: &str) -> bool {
        self.keep_on_delete.iter().any(|k| *k == field)
    }
}

/// A data plugin's full set of entity tables.
#[derive(Debug)]
pub struct Catalog {
    pub name: &'static str,
    pub entities: &'static [&'static EntityDef],
}

impl Catalog {
    /// Look up by entity name (case-insensitive) or collection name.
    pub fn entity(&self, name: &str) -> Result<&'static EntityDef, LrsError> {
        self.entities
            .iter()
            .copied()
            .find(|e| e.name.eq_ignore_ascii_case(name) || e.collection == name)
            .ok_or_else(|| LrsError::NotFound(format!("entity type '{}'", name)))
    }

    /// Every local relation must be mirrored by a foreign relation on its target and
    /// vice versa, with the same field, cardinality and reversed key pairs.
    pub fn relation_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for def in self.entities.iter().copied() {
            for rel in def.relations {
                let target = match self.entity(rel.target) {
                    Ok(t) => t,
                    Err(_) => {
                        problems.push(format!(
                            "{}: relation field '{}' targets unknown entity '{}'",
                            def.name, rel.field, rel.target
                        ));
                        continue;
                    }
                };
                let pointer_owner = match rel.side {
                    Side::Local => def,
                    Side::Foreign => target,
                };
                match pointer_owner.field(rel.field) {
                    Some(f) => {
                        let expected = match rel.cardinality {
                            Cardinality::Singular => FieldKind::Reference,
                            Cardinality::Multiple => FieldKind::ReferenceList,
                        };
                        if f.kind != expected {
                            problems.push(format!(
                                "{}.{} is {} but relation declares {:?}",
                                pointer_owner.name,
                                rel.field,
                                f.kind.as_str(),
                                rel.cardinality
                            ));
                        }
                    }
                    None => problems.push(format!(
                        "{}.{} is not declared as a field",
                        pointer_owner.name, rel.field
                    )),
                }
                let mirror_side = match rel.side {
                    Side::Local => Side::Foreign,
                    Side::Foreign => Side::Local,
                };
                let mirrored = target.relations.iter().any(|m| {
                    m.side == mirror_side
                        && m.target == def.name
                        && m.field == rel.field
                        && m.cardinality == rel.cardinality
                        && m.keys.len() == rel.keys.len()
                        && rel.keys.iter().all(|k| {
                            m.keys
                                .iter()
                                .any(|mk| mk.remote == k.own && mk.own == k.remote)
                        })
                });
                if !mirrored {
                    problems.push(format!(
                        "{} {:?} relation on '{}' has no mirror on {}",
                        def.name, rel.side, rel.field, target.name
                    ));
                }
            }
        }
        problems
    }
}
