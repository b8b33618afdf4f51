use super::{ANALYTICS, EVERYONE, TEACHING, WHOLE_TENANT};
use crate::core::model::{Cardinality, EntityDef, FieldDef, RelationDef};
use crate::core::scope::Scope;

static FIELDS: &[FieldDef] = &[
    FieldDef::text("UKPRN", EVERYONE).required().max_len(8),
    FieldDef::text("INST_NAME", EVERYONE).max_len(255),
    FieldDef::text("INST_ACRONYM", EVERYONE).max_len(20),
    FieldDef::text("INST_TYPE", ANALYTICS).max_len(255),
    FieldDef::text("VLE_URL", TEACHING),
    // Relations
    FieldDef::references("students", &[Scope::All, Scope::UddRead]),
    FieldDef::references("staff", &[Scope::All, Scope::UddRead]),
];

/// The institution owns every student and staff member of its tenant.
static RELATIONS: &[RelationDef] = &[
    RelationDef::local("Student", Cardinality::Multiple, "students", WHOLE_TENANT),
    RelationDef::local("Staff", Cardinality::Multiple, "staff", WHOLE_TENANT),
];

pub static INSTITUTION: EntityDef = EntityDef {
    name: "Institution",
    collection: "jiscInstitutions",
    business_key: &["UKPRN"],
    unique_key: true,
    fields: FIELDS,
    read_scopes: EVERYONE,
    write_scopes: &[Scope::All],
    keep_on_delete: &["UKPRN"],
    relations: RELATIONS,
    index_hints: &[&["organisation", "UKPRN"]],
};
