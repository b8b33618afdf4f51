use super::{ANALYTICS, BY_COURSE_INSTANCE, BY_MEMBERSHIP, BY_STAFF, BY_STUDENT, EVERYONE};
use crate::core::model::{Cardinality, EntityDef, FieldDef, RelationDef};
use crate::core::scope::Scope;

const STAFFING: &[Scope] = &[Scope::All, Scope::UddRead, Scope::TribalInsight, Scope::Ssp];
const LEARNING_WRITE: &[Scope] = &[Scope::All, Scope::TribalInsight, Scope::Lap, Scope::Ssp];

static COURSE_INSTANCE_FIELDS: &[FieldDef] = &[
    FieldDef::text("COURSE_INSTANCE_ID", EVERYONE).required().max_len(255),
    FieldDef::text("COURSE_ID", EVERYONE).max_len(255),
    FieldDef::text("COURSE_TITLE", EVERYONE).max_len(255),
    FieldDef::text("ACADEMIC_YEAR", ANALYTICS).max_len(9),
    FieldDef::date("COURSE_START_DATE", ANALYTICS),
    FieldDef::date("COURSE_END_DATE", ANALYTICS),
    FieldDef::references("staffCourseInstances", STAFFING),
];

pub static COURSE_INSTANCE: EntityDef = EntityDef {
    name: "CourseInstance",
    collection: "jiscCourseInstances",
    business_key: &["COURSE_INSTANCE_ID"],
    unique_key: true,
    fields: COURSE_INSTANCE_FIELDS,
    read_scopes: EVERYONE,
    write_scopes: LEARNING_WRITE,
    keep_on_delete: &["COURSE_INSTANCE_ID"],
    relations: &[
        RelationDef::local(
            "StaffCourseInstance",
            Cardinality::Multiple,
            "staffCourseInstances",
            BY_COURSE_INSTANCE,
        ),
        RelationDef::foreign(
            "StaffCourseInstance",
            Cardinality::Singular,
            "courseInstance",
            BY_COURSE_INSTANCE,
        ),
    ],
    index_hints: &[&["organisation", "COURSE_INSTANCE_ID"]],
};

static MEMBERSHIP_FIELDS: &[FieldDef] = &[
    FieldDef::text("STUDENT_ID", ANALYTICS).required().max_len(255),
    FieldDef::text("STUDENT_COURSE_MEMBERSHIP_ID", ANALYTICS)
        .required()
        .max_len(255),
    FieldDef::text("STUDENT_COURSE_MEMBERSHIP_SEQ", ANALYTICS).max_len(255),
    FieldDef::text("COURSE_INSTANCE_ID", ANALYTICS).max_len(255),
    FieldDef::number("MODE", ANALYTICS).range(1.0, 99.0).default_number(98.0),
    FieldDef::date("START_DATE", ANALYTICS),
    FieldDef::date("END_DATE", ANALYTICS),
    FieldDef::number("YEAR_STU", ANALYTICS),
    FieldDef::text("COURSE_LOCATION", ANALYTICS).max_len(255),
    FieldDef::reference("student", &[]),
    FieldDef::references("studentCourseInstances", ANALYTICS),
];

pub static STUDENT_COURSE_MEMBERSHIP: EntityDef = EntityDef {
    name: "StudentCourseMembership",
    collection: "jiscStudentCourseMemberships",
    business_key: &["STUDENT_ID", "STUDENT_COURSE_MEMBERSHIP_ID"],
    unique_key: true,
    fields: MEMBERSHIP_FIELDS,
    read_scopes: ANALYTICS,
    write_scopes: LEARNING_WRITE,
    keep_on_delete: &["STUDENT_ID", "STUDENT_COURSE_MEMBERSHIP_ID"],
    relations: &[
        RelationDef::local("Student", Cardinality::Singular, "student", BY_STUDENT),
        RelationDef::local(
            "StudentCourseInstance",
            Cardinality::Multiple,
            "studentCourseInstances",
            BY_MEMBERSHIP,
        ),
        RelationDef::foreign(
            "Student",
            Cardinality::Multiple,
            "studentCourseMemberships",
            BY_STUDENT,
        ),
        RelationDef::foreign(
            "StudentCourseInstance",
            Cardinality::Singular,
            "studentCourseMembership",
            BY_MEMBERSHIP,
        ),
    ],
    index_hints: &[
        &["organisation", "STUDENT_ID"],
        &["organisation", "STUDENT_ID", "STUDENT_COURSE_MEMBERSHIP_ID"],
    ],
};

static STUDENT_COURSE_INSTANCE_FIELDS: &[FieldDef] = &[
    FieldDef::text("STUDENT_ID", ANALYTICS).required().max_len(255),
    FieldDef::text("STUDENT_COURSE_MEMBERSHIP_ID", ANALYTICS)
        .required()
        .max_len(255),
    FieldDef::text("STUDENT_COURSE_MEMBERSHIP_SEQ", ANALYTICS).max_len(255),
    FieldDef::number("MODE", ANALYTICS).range(1.0, 99.0).default_number(98.0),
    FieldDef::number("YEAR_COM", ANALYTICS),
    FieldDef::number("YEAR_PRG", ANALYTICS),
    FieldDef::number("YEAR_STU", ANALYTICS),
    FieldDef::text("COURSE_LOCATION", ANALYTICS).max_len(255),
    FieldDef::number("X_COURSE_AVERAGE_MARK", ANALYTICS).range(0.0, 1.0),
    FieldDef::number("X_YEAR_AVERAGE_MARK", ANALYTICS).range(0.0, 1.0),
    FieldDef::reference("student", &[]),
    FieldDef::reference("studentCourseMembership", ANALYTICS),
];

pub static STUDENT_COURSE_INSTANCE: EntityDef = EntityDef {
    name: "StudentCourseInstance",
    collection: "jiscStudentCourseInstances",
    business_key: &["STUDENT_ID", "STUDENT_COURSE_MEMBERSHIP_ID"],
    unique_key: false,
    fields: STUDENT_COURSE_INSTANCE_FIELDS,
    read_scopes: ANALYTICS,
    write_scopes: LEARNING_WRITE,
    keep_on_delete: &["STUDENT_ID", "STUDENT_COURSE_MEMBERSHIP_ID"],
    relations: &[
        RelationDef::local("Student", Cardinality::Singular, "student", BY_STUDENT),
        RelationDef::local(
            "StudentCourseMembership",
            Cardinality::Singular,
            "studentCourseMembership",
            BY_MEMBERSHIP,
        ),
        RelationDef::foreign(
            "Student",
            Cardinality::Multiple,
            "studentCourseInstances",
            BY_STUDENT,
        ),
        RelationDef::foreign(
            "StudentCourseMembership",
            Cardinality::Multiple,
            "studentCourseInstances",
            BY_MEMBERSHIP,
        ),
    ],
    index_hints: &[&["organisation", "STUDENT_ID", "STUDENT_COURSE_MEMBERSHIP_ID"]],
};

static STAFF_COURSE_INSTANCE_FIELDS: &[FieldDef] = &[
    FieldDef::text("STAFF_ID", STAFFING).required().max_len(255),
    FieldDef::text("COURSE_INSTANCE_ID", STAFFING)
        .required()
        .max_len(255),
    FieldDef::reference("staff", STAFFING),
    FieldDef::reference("courseInstance", STAFFING),
];

pub static STAFF_COURSE_INSTANCE: EntityDef = EntityDef {
    name: "StaffCourseInstance",
    collection: "jiscStaffCourseInstances",
    business_key: &["STAFF_ID", "COURSE_INSTANCE_ID"],
    unique_key: false,
    fields: STAFF_COURSE_INSTANCE_FIELDS,
    read_scopes: STAFFING,
    write_scopes: &[Scope::All, Scope::TribalInsight, Scope::Ssp],
    keep_on_delete: &["STAFF_ID", "COURSE_INSTANCE_ID"],
    relations: &[
        RelationDef::local("Staff", Cardinality::Singular, "staff", BY_STAFF),
        RelationDef::local(
            "CourseInstance",
            Cardinality::Singular,
            "courseInstance",
            BY_COURSE_INSTANCE,
        ),
        RelationDef::foreign("Staff", Cardinality::Multiple, "staffCourseInstances", BY_STAFF),
        RelationDef::foreign(
            "CourseInstance",
            Cardinality::Multiple,
            "staffCourseInstances",
            BY_COURSE_INSTANCE,
        ),
    ],
    index_hints: &[&["organisation", "STAFF_ID"], &["organisation", "COURSE_INSTANCE_ID"]],
};
