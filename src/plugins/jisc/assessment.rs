use super::{ANALYTICS, BY_STUDENT};
use crate::core::model::{Cardinality, EntityDef, FieldDef, RelationDef};
use crate::core::scope::Scope;

static FIELDS: &[FieldDef] = &[
    FieldDef::text("STUDENT_ID", ANALYTICS).required().max_len(255),
    FieldDef::text("ASSESS_INSTANCE_ID", ANALYTICS).required().max_len(255),
    FieldDef::text("MOD_INSTANCE_ID", ANALYTICS).max_len(255),
    FieldDef::number("ASSESS_ATTEMPT", ANALYTICS).range(1.0, 99.0),
    FieldDef::number("ASSESS_ACTUAL_MARK", ANALYTICS).range(0.0, 100.0),
    FieldDef::number("ASSESS_AGREED_MARK", ANALYTICS).range(0.0, 100.0),
    FieldDef::text("ASSESS_ACTUAL_GRADE", ANALYTICS).max_len(255),
    FieldDef::text("ASSESS_AGREED_GRADE", ANALYTICS).max_len(255),
    FieldDef::date("ASSESS_SUBMITTED_DATE", ANALYTICS),
    FieldDef::reference("student", &[]),
];

pub static STUDENT_ASSESSMENT_INSTANCE: EntityDef = EntityDef {
    name: "StudentAssessmentInstance",
    collection: "jiscStudentAssessmentInstances",
    business_key: &["STUDENT_ID", "ASSESS_INSTANCE_ID"],
    unique_key: true,
    fields: FIELDS,
    read_scopes: ANALYTICS,
    write_scopes: &[Scope::All, Scope::TribalInsight, Scope::Lap, Scope::Ssp],
    keep_on_delete: &["STUDENT_ID", "ASSESS_INSTANCE_ID"],
    relations: &[
        RelationDef::local("Student", Cardinality::Singular, "student", BY_STUDENT),
        RelationDef::foreign(
            "Student",
            Cardinality::Multiple,
            "studentAssessmentInstances",
            BY_STUDENT,
        ),
    ],
    index_hints: &[&["organisation", "STUDENT_ID", "ASSESS_INSTANCE_ID"]],
};
