//! JISC Unified Data Definitions (UDD) data plugin.
//!
//! Eleven entity types covering students, staff, the institution, course and module
//! instances and the membership/enrolment documents linking them. Every relation is
//! declared on both sides: the local side recomputes the pointer on the document being
//! saved, the foreign side keeps the counterpart's back-reference in step.
//!
//! | Entity                      | Collection                       | Business key                                  |
//! |-----------------------------|----------------------------------|-----------------------------------------------|
//! | `Student`                   | `jiscStudents`                   | `STUDENT_ID`                                  |
//! | `Staff`                     | `jiscStaff`                      | `STAFF_ID`                                    |
//! | `Institution`               | `jiscInstitutions`               | `UKPRN`                                       |
//! | `CourseInstance`            | `jiscCourseInstances`            | `COURSE_INSTANCE_ID`                          |
//! | `ModuleInstance`            | `jiscModuleInstances`            | `MOD_INSTANCE_ID`                             |
//! | `StudentCourseMembership`   | `jiscStudentCourseMemberships`   | `STUDENT_ID` + `STUDENT_COURSE_MEMBERSHIP_ID` |
//! | `StudentCourseInstance`     | `jiscStudentCourseInstances`     | `STUDENT_ID` + `STUDENT_COURSE_MEMBERSHIP_ID` |
//! | `StudentModuleInstance`     | `jiscStudentModuleInstances`     | `STUDENT_ID` + `MOD_INSTANCE_ID`              |
//! | `StudentAssessmentInstance` | `jiscStudentAssessmentInstances` | `STUDENT_ID` + `ASSESS_INSTANCE_ID`           |
//! | `StaffCourseInstance`       | `jiscStaffCourseInstances`       | `STAFF_ID` + `COURSE_INSTANCE_ID`             |
//! | `StaffModuleInstance`       | `jiscStaffModuleInstances`       | `STAFF_ID` + `MOD_INSTANCE_ID`                |

pub mod assessment;
pub mod codes;
pub mod course;
pub mod institution;
pub mod module;
pub mod staff;
pub mod student;

use crate::core::model::{Catalog, KeyPair};
use crate::core::scope::Scope;

pub static CATALOG: Catalog = Catalog {
    name: "jisc",
    entities: &[
        &student::STUDENT,
        &staff::STAFF,
        &institution::INSTITUTION,
        &course::COURSE_INSTANCE,
        &module::MODULE_INSTANCE,
        &course::STUDENT_COURSE_MEMBERSHIP,
        &course::STUDENT_COURSE_INSTANCE,
        &module::STUDENT_MODULE_INSTANCE,
        &assessment::STUDENT_ASSESSMENT_INSTANCE,
        &course::STAFF_COURSE_INSTANCE,
        &module::STAFF_MODULE_INSTANCE,
    ],
};

// Field read-scope groups shared by the entity tables.
pub(crate) const EVERYONE: &[Scope] = &[
    Scope::All,
    Scope::UddRead,
    Scope::StudentApp,
    Scope::TribalInsight,
    Scope::Lap,
    Scope::Ssp,
    Scope::Opendash,
];
pub(crate) const ANALYTICS: &[Scope] = &[
    Scope::All,
    Scope::UddRead,
    Scope::TribalInsight,
    Scope::Lap,
    Scope::Ssp,
];
pub(crate) const PROFILE: &[Scope] = &[
    Scope::All,
    Scope::UddRead,
    Scope::StudentApp,
    Scope::TribalInsight,
    Scope::Ssp,
    Scope::Opendash,
];
pub(crate) const CONTACT: &[Scope] = &[Scope::All, Scope::UddRead, Scope::Ssp];
pub(crate) const TEACHING: &[Scope] = &[
    Scope::All,
    Scope::UddRead,
    Scope::TribalInsight,
    Scope::Ssp,
    Scope::Opendash,
];

// Matching keys.
pub(crate) const BY_STUDENT: &[KeyPair] = &[KeyPair::same("STUDENT_ID")];
pub(crate) const BY_STAFF: &[KeyPair] = &[KeyPair::same("STAFF_ID")];
pub(crate) const BY_COURSE_INSTANCE: &[KeyPair] = &[KeyPair::same("COURSE_INSTANCE_ID")];
pub(crate) const BY_MOD_INSTANCE: &[KeyPair] = &[KeyPair::same("MOD_INSTANCE_ID")];
pub(crate) const BY_MEMBERSHIP: &[KeyPair] = &[
    KeyPair::same("STUDENT_ID"),
    KeyPair::same("STUDENT_COURSE_MEMBERSHIP_ID"),
];
/// Student side of the tutor relation: `Staff.STAFF_ID == Student.TUTOR_STAFF_ID`.
pub(crate) const TUTOR_OF_STUDENT: &[KeyPair] = &[KeyPair::new("STAFF_ID", "TUTOR_STAFF_ID")];
/// Staff side of the tutor relation: `Student.TUTOR_STAFF_ID == Staff.STAFF_ID`.
pub(crate) const MENTEES_OF_STAFF: &[KeyPair] = &[KeyPair::new("TUTOR_STAFF_ID", "STAFF_ID")];
pub(crate) const WHOLE_TENANT: &[KeyPair] = &[];
