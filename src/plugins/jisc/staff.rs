use super::{BY_STAFF, EVERYONE, MENTEES_OF_STAFF, TEACHING, WHOLE_TENANT};
use crate::core::model::{Cardinality, EntityDef, FieldDef, RelationDef};
use crate::core::scope::Scope;

static FIELDS: &[FieldDef] = &[
    FieldDef::text("STAFF_ID", EVERYONE).required().max_len(255),
    FieldDef::text("TITLE", TEACHING).max_len(35),
    FieldDef::text("FIRST_NAME", EVERYONE).max_len(255),
    FieldDef::text("LAST_NAME", EVERYONE).max_len(255),
    FieldDef::text("USERNAME", TEACHING).max_len(255),
    FieldDef::text("PRIMARY_EMAIL_ADDRESS", TEACHING).max_len(255),
    FieldDef::text("APPSHIB_ID", TEACHING).max_len(256),
    FieldDef::text("VLE_ID", TEACHING).max_len(256),
    FieldDef::text("PHOTO_URL", TEACHING),
    // Relations
    FieldDef::references("mentees", TEACHING),
    FieldDef::references("staffCourseInstances", TEACHING),
    FieldDef::references("staffModuleInstances", TEACHING),
];

static RELATIONS: &[RelationDef] = &[
    RelationDef::local("Student", Cardinality::Multiple, "mentees", MENTEES_OF_STAFF),
    RelationDef::local(
        "StaffCourseInstance",
        Cardinality::Multiple,
        "staffCourseInstances",
        BY_STAFF,
    ),
    RelationDef::local(
        "StaffModuleInstance",
        Cardinality::Multiple,
        "staffModuleInstances",
        BY_STAFF,
    ),
    RelationDef::foreign("Student", Cardinality::Singular, "tutor", MENTEES_OF_STAFF),
    RelationDef::foreign("StaffCourseInstance", Cardinality::Singular, "staff", BY_STAFF),
    RelationDef::foreign("StaffModuleInstance", Cardinality::Singular, "staff", BY_STAFF),
    RelationDef::foreign("Institution", Cardinality::Multiple, "staff", WHOLE_TENANT),
];

pub static STAFF: EntityDef = EntityDef {
    name: "Staff",
    collection: "jiscStaff",
    business_key: &["STAFF_ID"],
    unique_key: true,
    fields: FIELDS,
    read_scopes: EVERYONE,
    write_scopes: &[
        Scope::All,
        Scope::StudentApp,
        Scope::TribalInsight,
        Scope::Lap,
        Scope::Ssp,
        Scope::Opendash,
    ],
    keep_on_delete: &["STAFF_ID"],
    relations: RELATIONS,
    index_hints: &[&["organisation", "STAFF_ID"]],
};
