use super::codes::{DOMICILE_CODES, ETHNICITY_CODES};
use super::{ANALYTICS, BY_STUDENT, CONTACT, EVERYONE, PROFILE, TUTOR_OF_STUDENT, WHOLE_TENANT};
use crate::core::model::{Cardinality, EntityDef, FieldDef, RelationDef};
use crate::core::scope::Scope;

const SSP_TRIBAL: &[Scope] = &[
    Scope::All,
    Scope::UddRead,
    Scope::TribalInsight,
    Scope::Ssp,
];
const PROFILE_NO_APP: &[Scope] = &[
    Scope::All,
    Scope::UddRead,
    Scope::TribalInsight,
    Scope::Ssp,
    Scope::Opendash,
];
const PHOTO: &[Scope] = &[Scope::All, Scope::UddRead, Scope::Ssp, Scope::Opendash];

static FIELDS: &[FieldDef] = &[
    FieldDef::text("STUDENT_ID", EVERYONE).required().max_len(255),
    FieldDef::text("ULN", ANALYTICS).max_len(10),
    FieldDef::date("DOB", ANALYTICS),
    FieldDef::text("ETHNICITY", ANALYTICS).one_of(ETHNICITY_CODES),
    FieldDef::number("SEXID", ANALYTICS).range(1.0, 4.0),
    FieldDef::number("LEARN_DIF", ANALYTICS).range(1.0, 99.0),
    FieldDef::number("DISABILITY1", ANALYTICS).range(0.0, 99.0),
    FieldDef::number("DISABILITY2", ANALYTICS).range(0.0, 99.0),
    FieldDef::text("DOMICILE", ANALYTICS).max_len(2).one_of(DOMICILE_CODES),
    FieldDef::number("TERMTIME_ACCOM", ANALYTICS).range(1.0, 9.0),
    FieldDef::number("PARENTS_ED", ANALYTICS).range(1.0, 9.0),
    FieldDef::number("SOCIO_EC", ANALYTICS).range(1.0, 9.0),
    FieldDef::number("OVERSEAS", ANALYTICS),
    FieldDef::text("APPSHIB_ID", EVERYONE).max_len(256),
    FieldDef::text("VLE_ID", EVERYONE).max_len(256),
    FieldDef::text("HUS_ID", ANALYTICS).max_len(13),
    FieldDef::text("USERNAME", PROFILE).max_len(255),
    FieldDef::text("LAST_NAME", PROFILE),
    FieldDef::text("FIRST_NAME", PROFILE),
    FieldDef::text("ADDRESS_LINE_1", CONTACT),
    FieldDef::text("ADDRESS_LINE_2", CONTACT),
    FieldDef::text("ADDRESS_LINE_3", CONTACT),
    FieldDef::text("ADDRESS_LINE_4", CONTACT),
    FieldDef::text("POSTCODE", CONTACT).max_len(8),
    FieldDef::text("PRIMARY_EMAIL_ADDRESS", SSP_TRIBAL).max_len(255),
    FieldDef::text("HOME_PHONE", CONTACT).max_len(255),
    FieldDef::text("MOBILE_PHONE", CONTACT).max_len(255),
    FieldDef::text("PHOTO_URL", PHOTO),
    FieldDef::text("TUTOR_STAFF_ID", PROFILE_NO_APP).max_len(255),
    FieldDef::text("ENTRY_POSTCODE", &[]).max_len(8),
    // Relations
    FieldDef::references("studentAssessmentInstances", PROFILE),
    FieldDef::references("studentCourseInstances", PROFILE),
    FieldDef::references("studentCourseMemberships", PROFILE),
    FieldDef::references("studentModuleInstances", PROFILE),
    FieldDef::reference("tutor", PROFILE),
];

static RELATIONS: &[RelationDef] = &[
    RelationDef::local(
        "StudentAssessmentInstance",
        Cardinality::Multiple,
        "studentAssessmentInstances",
        BY_STUDENT,
    ),
    RelationDef::local(
        "StudentModuleInstance",
        Cardinality::Multiple,
        "studentModuleInstances",
        BY_STUDENT,
    ),
    RelationDef::local(
        "StudentCourseInstance",
        Cardinality::Multiple,
        "studentCourseInstances",
        BY_STUDENT,
    ),
    RelationDef::local(
        "StudentCourseMembership",
        Cardinality::Multiple,
        "studentCourseMemberships",
        BY_STUDENT,
    ),
    RelationDef::local("Staff", Cardinality::Singular, "tutor", TUTOR_OF_STUDENT),
    RelationDef::foreign(
        "StudentAssessmentInstance",
        Cardinality::Singular,
        "student",
        BY_STUDENT,
    ),
    RelationDef::foreign("StudentCourseInstance", Cardinality::Singular, "student", BY_STUDENT),
    RelationDef::foreign(
        "StudentCourseMembership",
        Cardinality::Singular,
        "student",
        BY_STUDENT,
    ),
    RelationDef::foreign("StudentModuleInstance", Cardinality::Singular, "student", BY_STUDENT),
    RelationDef::foreign("Institution", Cardinality::Multiple, "students", WHOLE_TENANT),
    RelationDef::foreign("Staff", Cardinality::Multiple, "mentees", TUTOR_OF_STUDENT),
];

const WRITE: &[Scope] = &[
    Scope::All,
    Scope::StudentApp,
    Scope::TribalInsight,
    Scope::Lap,
    Scope::Ssp,
    Scope::Opendash,
];

pub static STUDENT: EntityDef = EntityDef {
    name: "Student",
    collection: "jiscStudents",
    business_key: &["STUDENT_ID"],
    unique_key: true,
    fields: FIELDS,
    read_scopes: EVERYONE,
    write_scopes: WRITE,
    keep_on_delete: &["STUDENT_ID"],
    relations: RELATIONS,
    index_hints: &[&["organisation", "STUDENT_ID"], &["organisation", "TUTOR_STAFF_ID"]],
};
