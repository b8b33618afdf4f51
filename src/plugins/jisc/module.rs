use super::{ANALYTICS, BY_MOD_INSTANCE, BY_STAFF, BY_STUDENT, EVERYONE, TEACHING};
use crate::core::model::{Cardinality, EntityDef, FieldDef, RelationDef};
use crate::core::scope::Scope;

const MODULE_STAFFING: &[Scope] = &[
    Scope::All,
    Scope::UddRead,
    Scope::TribalInsight,
    Scope::Opendash,
];

static MODULE_INSTANCE_FIELDS: &[FieldDef] = &[
    FieldDef::text("MOD_INSTANCE_ID", EVERYONE).required().max_len(255),
    FieldDef::text("MOD_ID", EVERYONE).max_len(255),
    FieldDef::text("MOD_TITLE", EVERYONE).max_len(255),
    FieldDef::text("ACADEMIC_YEAR", ANALYTICS).max_len(9),
    FieldDef::date("MOD_START_DATE", ANALYTICS),
    FieldDef::date("MOD_END_DATE", ANALYTICS),
    FieldDef::number("MOD_CREDITS", ANALYTICS).range(0.0, 999.0),
    FieldDef::references("staffModuleInstances", MODULE_STAFFING),
    FieldDef::references("studentModuleInstances", ANALYTICS),
];

pub static MODULE_INSTANCE: EntityDef = EntityDef {
    name: "ModuleInstance",
    collection: "jiscModuleInstances",
    business_key: &["MOD_INSTANCE_ID"],
    unique_key: true,
    fields: MODULE_INSTANCE_FIELDS,
    read_scopes: EVERYONE,
    write_scopes: &[Scope::All, Scope::TribalInsight, Scope::Lap, Scope::Ssp],
    keep_on_delete: &["MOD_INSTANCE_ID"],
    relations: &[
        RelationDef::local(
            "StaffModuleInstance",
            Cardinality::Multiple,
            "staffModuleInstances",
            BY_MOD_INSTANCE,
        ),
        RelationDef::local(
            "StudentModuleInstance",
            Cardinality::Multiple,
            "studentModuleInstances",
            BY_MOD_INSTANCE,
        ),
        RelationDef::foreign(
            "StaffModuleInstance",
            Cardinality::Singular,
            "moduleInstance",
            BY_MOD_INSTANCE,
        ),
        RelationDef::foreign(
            "StudentModuleInstance",
            Cardinality::Singular,
            "moduleInstance",
            BY_MOD_INSTANCE,
        ),
    ],
    index_hints: &[&["organisation", "MOD_INSTANCE_ID"]],
};

static STUDENT_MODULE_INSTANCE_FIELDS: &[FieldDef] = &[
    FieldDef::text("STUDENT_ID", ANALYTICS).required().max_len(255),
    FieldDef::text("MOD_INSTANCE_ID", ANALYTICS).required().max_len(255),
    FieldDef::text("STUDENT_COURSE_MEMBERSHIP_ID", ANALYTICS).max_len(255),
    FieldDef::text("MOD_GRADE", ANALYTICS).max_len(255),
    FieldDef::number("MOD_ACTUAL_MARK", ANALYTICS).range(0.0, 100.0),
    FieldDef::number("MOD_AGREED_MARK", ANALYTICS).range(0.0, 100.0),
    FieldDef::number("MOD_RESULT", ANALYTICS).range(1.0, 99.0),
    FieldDef::reference("student", &[]),
    FieldDef::reference("moduleInstance", ANALYTICS),
];

pub static STUDENT_MODULE_INSTANCE: EntityDef = EntityDef {
    name: "StudentModuleInstance",
    collection: "jiscStudentModuleInstances",
    business_key: &["STUDENT_ID", "MOD_INSTANCE_ID"],
    unique_key: false,
    fields: STUDENT_MODULE_INSTANCE_FIELDS,
    read_scopes: ANALYTICS,
    write_scopes: &[Scope::All, Scope::TribalInsight, Scope::Lap, Scope::Ssp],
    keep_on_delete: &["STUDENT_ID", "MOD_INSTANCE_ID"],
    relations: &[
        RelationDef::local("Student", Cardinality::Singular, "student", BY_STUDENT),
        RelationDef::local(
            "ModuleInstance",
            Cardinality::Singular,
            "moduleInstance",
            BY_MOD_INSTANCE,
        ),
        RelationDef::foreign(
            "Student",
            Cardinality::Multiple,
            "studentModuleInstances",
            BY_STUDENT,
        ),
        RelationDef::foreign(
            "ModuleInstance",
            Cardinality::Multiple,
            "studentModuleInstances",
            BY_MOD_INSTANCE,
        ),
    ],
    index_hints: &[&["organisation", "STUDENT_ID"], &["organisation", "MOD_INSTANCE_ID"]],
};

static STAFF_MODULE_INSTANCE_FIELDS: &[FieldDef] = &[
    FieldDef::text("STAFF_ID", TEACHING).required().max_len(255),
    FieldDef::text("MOD_INSTANCE_ID", MODULE_STAFFING)
        .required()
        .max_len(255),
    FieldDef::reference("staff", TEACHING),
    FieldDef::reference("moduleInstance", MODULE_STAFFING),
];

pub static STAFF_MODULE_INSTANCE: EntityDef = EntityDef {
    name: "StaffModuleInstance",
    collection: "jiscStaffModuleInstances",
    business_key: &["STAFF_ID", "MOD_INSTANCE_ID"],
    unique_key: false,
    fields: STAFF_MODULE_INSTANCE_FIELDS,
    read_scopes: TEACHING,
    write_scopes: &[Scope::All, Scope::TribalInsight, Scope::Ssp, Scope::Opendash],
    keep_on_delete: &["STAFF_ID", "MOD_INSTANCE_ID"],
    relations: &[
        RelationDef::local("Staff", Cardinality::Singular, "staff", BY_STAFF),
        RelationDef::local(
            "ModuleInstance",
            Cardinality::Singular,
            "moduleInstance",
            BY_MOD_INSTANCE,
        ),
        RelationDef::foreign("Staff", Cardinality::Multiple, "staffModuleInstances", BY_STAFF),
        RelationDef::foreign(
            "ModuleInstance",
            Cardinality::Multiple,
            "staffModuleInstances",
            BY_MOD_INSTANCE,
        ),
    ],
    index_hints: &[&["organisation", "STAFF_ID"], &["organisation", "MOD_INSTANCE_ID"]],
};
