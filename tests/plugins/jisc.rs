use jisc_lrs::core::config::LrsConfig;
use jisc_lrs::core::error::LrsError;
use jisc_lrs::core::repository::Lrs;
use jisc_lrs::core::scope::{CallerContext, Scope, ScopeSet};
use jisc_lrs::core::soft_delete;
use jisc_lrs::plugins::jisc::CATALOG;
use serde_json::{Map, Value as JsonValue, json};
use tempfile::{TempDir, tempdir};

fn open() -> (TempDir, Lrs) {
    let tmp = tempdir().unwrap();
    let cfg = LrsConfig {
        data_dir: tmp.path().join("data"),
        ..LrsConfig::default()
    };
    let lrs = Lrs::open(cfg, &CATALOG).unwrap();
    (tmp, lrs)
}

fn caller(org: &str, scopes: &[Scope]) -> CallerContext {
    CallerContext::new(org, ScopeSet::new(scopes.iter().copied()))
}

fn admin() -> CallerContext {
    caller("org-1", &[Scope::All])
}

fn id_of(doc: &Map<String, JsonValue>) -> String {
    doc["_id"].as_str().unwrap().to_string()
}

fn create(lrs: &Lrs, entity: &str, body: JsonValue) -> String {
    id_of(&lrs.create(&admin(), entity, body).unwrap())
}

fn fetch(lrs: &Lrs, entity: &str, id: &str) -> Map<String, JsonValue> {
    lrs.get(&admin(), entity, id, true).unwrap()
}

fn ids(doc: &Map<String, JsonValue>, field: &str) -> Vec<String> {
    match doc.get(field) {
        Some(JsonValue::Array(items)) => items
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect(),
        Some(JsonValue::String(id)) => vec![id.clone()],
        _ => Vec::new(),
    }
}

struct Hydrated {
    student: String,
    staff: String,
    scm: String,
    sci: String,
    sai: String,
    smi: String,
}

/// Insert a student and its related documents in mixed order.
fn hydrate(lrs: &Lrs) -> Hydrated {
    let scm = create(
        lrs,
        "StudentCourseMembership",
        json!({"STUDENT_ID": "S1", "STUDENT_COURSE_MEMBERSHIP_ID": "M1"}),
    );
    let sci = create(
        lrs,
        "StudentCourseInstance",
        json!({"STUDENT_ID": "S1", "STUDENT_COURSE_MEMBERSHIP_ID": "M1"}),
    );
    let student = create(
        lrs,
        "Student",
        json!({"STUDENT_ID": "S1", "FIRST_NAME": "Ada", "TUTOR_STAFF_ID": "T1", "SEXID": 2}),
    );
    let sai = create(
        lrs,
        "StudentAssessmentInstance",
        json!({"STUDENT_ID": "S1", "ASSESS_INSTANCE_ID": "A1", "ASSESS_ACTUAL_MARK": 71}),
    );
    let smi = create(
        lrs,
        "StudentModuleInstance",
        json!({"STUDENT_ID": "S1", "MOD_INSTANCE_ID": "MOD1"}),
    );
    let staff = create(lrs, "Staff", json!({"STAFF_ID": "T1", "LAST_NAME": "Hopper"}));
    Hydrated {
        student,
        staff,
        scm,
        sci,
        sai,
        smi,
    }
}

#[test]
fn test_hydration_links_every_relation() {
    let (_tmp, lrs) = open();
    let h = hydrate(&lrs);

    let student = fetch(&lrs, "Student", &h.student);
    assert_eq!(ids(&student, "studentCourseMemberships"), vec![h.scm.clone()]);
    assert_eq!(ids(&student, "studentCourseInstances"), vec![h.sci.clone()]);
    assert_eq!(ids(&student, "studentAssessmentInstances"), vec![h.sai.clone()]);
    assert_eq!(ids(&student, "studentModuleInstances"), vec![h.smi.clone()]);
    assert_eq!(student["tutor"], json!(h.staff));

    let staff = fetch(&lrs, "Staff", &h.staff);
    assert_eq!(ids(&staff, "mentees"), vec![h.student.clone()]);

    for (entity, id) in [
        ("StudentCourseMembership", &h.scm),
        ("StudentCourseInstance", &h.sci),
        ("StudentAssessmentInstance", &h.sai),
        ("StudentModuleInstance", &h.smi),
    ] {
        let doc = fetch(&lrs, entity, id);
        assert_eq!(doc["student"], json!(h.student), "{}", entity);
    }

    let sci = fetch(&lrs, "StudentCourseInstance", &h.sci);
    assert_eq!(sci["studentCourseMembership"], json!(h.scm));
    let scm = fetch(&lrs, "StudentCourseMembership", &h.scm);
    assert_eq!(ids(&scm, "studentCourseInstances"), vec![h.sci.clone()]);
    assert_eq!(scm["MODE"], json!(98.0));
}

#[test]
fn test_deleting_student_unlinks_children_and_scrubs_to_keep_set() {
    let (_tmp, lrs) = open();
    let h = hydrate(&lrs);

    lrs.delete(&admin(), "Student", &h.student).unwrap();

    for (entity, id) in [
        ("StudentCourseMembership", &h.scm),
        ("StudentCourseInstance", &h.sci),
        ("StudentAssessmentInstance", &h.sai),
        ("StudentModuleInstance", &h.smi),
    ] {
        let doc = fetch(&lrs, entity, id);
        assert!(doc.get("student").is_none(), "{} still points at student", entity);
    }
    let staff = fetch(&lrs, "Staff", &h.staff);
    assert!(ids(&staff, "mentees").is_empty());

    let stored = lrs
        .store()
        .get("jiscStudents", "org-1", &h.student)
        .unwrap()
        .unwrap();
    assert!(stored.deleted);
    assert!(stored.deleted_at.is_some());
    assert_eq!(stored.organisation, "org-1");
    assert_eq!(soft_delete::retained_fields(&stored), vec!["STUDENT_ID"]);

    assert!(matches!(
        lrs.get(&admin(), "Student", &h.student, false),
        Err(LrsError::NotFound(_))
    ));
}

#[test]
fn test_deleting_twice_reapplies_the_delete() {
    let (_tmp, lrs) = open();
    let h = hydrate(&lrs);

    lrs.delete(&admin(), "Student", &h.student).unwrap();
    lrs.delete(&admin(), "Student", &h.student).unwrap();

    let stored = lrs
        .store()
        .get("jiscStudents", "org-1", &h.student)
        .unwrap()
        .unwrap();
    assert!(stored.deleted);
    assert!(stored.deleted_at.is_some());
    assert_eq!(soft_delete::retained_fields(&stored), vec!["STUDENT_ID"]);
    let scm = fetch(&lrs, "StudentCourseMembership", &h.scm);
    assert!(scm.get("student").is_none());

    let events = lrs.broker().events().unwrap();
    let deletes: Vec<&str> = events
        .iter()
        .filter(|e| e.op == "entity.delete")
        .map(|e| e.status.as_str())
        .collect();
    assert_eq!(deletes, vec!["success", "success"]);
}

#[test]
fn test_removing_children_empties_student_arrays() {
    let (_tmp, lrs) = open();
    let h = hydrate(&lrs);

    lrs.remove(&admin(), "StudentCourseMembership", &h.scm).unwrap();
    lrs.remove(&admin(), "StudentModuleInstance", &h.smi).unwrap();
    lrs.delete(&admin(), "StudentAssessmentInstance", &h.sai).unwrap();
    lrs.remove(&admin(), "StudentCourseInstance", &h.sci).unwrap();

    let student = fetch(&lrs, "Student", &h.student);
    assert!(ids(&student, "studentCourseMemberships").is_empty());
    assert!(ids(&student, "studentModuleInstances").is_empty());
    assert!(ids(&student, "studentAssessmentInstances").is_empty());
    assert!(ids(&student, "studentCourseInstances").is_empty());
    assert_eq!(student["tutor"], json!(h.staff));
}

#[test]
fn test_compound_key_requires_every_component() {
    let (_tmp, lrs) = open();
    let scm = create(
        &lrs,
        "StudentCourseMembership",
        json!({"STUDENT_ID": "S1", "STUDENT_COURSE_MEMBERSHIP_ID": "M1"}),
    );
    let other_student = create(
        &lrs,
        "StudentCourseInstance",
        json!({"STUDENT_ID": "S2", "STUDENT_COURSE_MEMBERSHIP_ID": "M1"}),
    );
    let other_membership = create(
        &lrs,
        "StudentCourseInstance",
        json!({"STUDENT_ID": "S1", "STUDENT_COURSE_MEMBERSHIP_ID": "M2"}),
    );

    for id in [&other_student, &other_membership] {
        let sci = fetch(&lrs, "StudentCourseInstance", id);
        assert!(sci.get("studentCourseMembership").is_none());
    }
    let scm = fetch(&lrs, "StudentCourseMembership", &scm);
    assert!(ids(&scm, "studentCourseInstances").is_empty());
}

#[test]
fn test_student_after_membership_links_both_sides() {
    let (_tmp, lrs) = open();
    let scm = create(
        &lrs,
        "StudentCourseMembership",
        json!({"STUDENT_ID": "S1", "STUDENT_COURSE_MEMBERSHIP_ID": "M1"}),
    );
    let student = lrs
        .create(&admin(), "Student", json!({"STUDENT_ID": "S1"}))
        .unwrap();
    assert_eq!(ids(&student, "studentCourseMemberships"), vec![scm.clone()]);
    let membership = fetch(&lrs, "StudentCourseMembership", &scm);
    assert_eq!(membership["student"], student["_id"]);
}

#[test]
fn test_institution_tracks_every_student_in_tenant() {
    let (_tmp, lrs) = open();
    let s1 = create(&lrs, "Student", json!({"STUDENT_ID": "S1"}));
    let inst = create(&lrs, "Institution", json!({"UKPRN": "10007777", "INST_NAME": "Example"}));
    assert_eq!(ids(&fetch(&lrs, "Institution", &inst), "students"), vec![s1.clone()]);

    let s2 = create(&lrs, "Student", json!({"STUDENT_ID": "S2"}));
    let mut expected = vec![s1.clone(), s2.clone()];
    expected.sort();
    let mut got = ids(&fetch(&lrs, "Institution", &inst), "students");
    got.sort();
    assert_eq!(got, expected);

    lrs.delete(&admin(), "Student", &s1).unwrap();
    assert_eq!(ids(&fetch(&lrs, "Institution", &inst), "students"), vec![s2]);
}

#[test]
fn test_changing_tutor_heals_on_staff_save() {
    let (_tmp, lrs) = open();
    let t1 = create(&lrs, "Staff", json!({"STAFF_ID": "T1"}));
    let t2 = create(&lrs, "Staff", json!({"STAFF_ID": "T2"}));
    let s = create(&lrs, "Student", json!({"STUDENT_ID": "S1", "TUTOR_STAFF_ID": "T1"}));
    assert_eq!(ids(&fetch(&lrs, "Staff", &t1), "mentees"), vec![s.clone()]);

    let student = lrs
        .update(&admin(), "Student", &s, json!({"TUTOR_STAFF_ID": "T2"}))
        .unwrap();
    assert_eq!(student["tutor"], json!(t2));
    assert_eq!(ids(&fetch(&lrs, "Staff", &t2), "mentees"), vec![s.clone()]);

    // The old tutor's multiple back-reference is only additive; its own save recomputes it.
    assert_eq!(ids(&fetch(&lrs, "Staff", &t1), "mentees"), vec![s.clone()]);
    lrs.update(&admin(), "Staff", &t1, json!({"LAST_NAME": "Lovelace"}))
        .unwrap();
    assert!(ids(&fetch(&lrs, "Staff", &t1), "mentees").is_empty());
}

#[test]
fn test_scopes_filter_student_fields() {
    let (_tmp, lrs) = open();
    let s = create(
        &lrs,
        "Student",
        json!({
            "STUDENT_ID": "S1",
            "FIRST_NAME": "Ada",
            "ADDRESS_LINE_1": "1 Lane",
            "ETHNICITY": "10",
            "ENTRY_POSTCODE": "AB1 2CD"
        }),
    );

    let lap = lrs.get(&caller("org-1", &[Scope::Lap]), "Student", &s, false).unwrap();
    assert_eq!(lap["STUDENT_ID"], "S1");
    assert_eq!(lap["ETHNICITY"], "10");
    assert!(lap.get("FIRST_NAME").is_none());
    assert!(lap.get("ADDRESS_LINE_1").is_none());
    assert!(lap.get("ENTRY_POSTCODE").is_none());

    let app = lrs
        .get(&caller("org-1", &[Scope::StudentApp]), "Student", &s, false)
        .unwrap();
    assert_eq!(app["FIRST_NAME"], "Ada");
    assert!(app.get("ETHNICITY").is_none());

    let all = fetch(&lrs, "Student", &s);
    assert_eq!(all["ENTRY_POSTCODE"], "AB1 2CD");
    let stored = lrs.store().get("jiscStudents", "org-1", &s).unwrap().unwrap();
    assert_eq!(JsonValue::Object(all), stored.to_json());
}

#[test]
fn test_rejections_are_typed() {
    let (_tmp, lrs) = open();
    let udd = caller("org-1", &[Scope::UddRead]);
    let err = lrs
        .create(&udd, "Student", json!({"STUDENT_ID": "S1"}))
        .unwrap_err();
    assert!(matches!(err, LrsError::AuthorizationError(_)));

    let lap = caller("org-1", &[Scope::Lap]);
    let err = lrs
        .create(&lap, "Institution", json!({"UKPRN": "1"}))
        .unwrap_err();
    assert!(matches!(err, LrsError::AuthorizationError(_)));

    let err = lrs
        .create(&admin(), "Student", json!({"STUDENT_ID": "S1", "ETHNICITY": "77", "DOMICILE": "QQ"}))
        .unwrap_err();
    assert!(matches!(err, LrsError::ValidationError(_)));
    assert!(err.is_rejection());

    create(&lrs, "Student", json!({"STUDENT_ID": "S1"}));
    let err = lrs
        .create(&admin(), "Student", json!({"STUDENT_ID": "S1"}))
        .unwrap_err();
    assert!(matches!(err, LrsError::ValidationError(_)));

    let err = lrs
        .create(&admin(), "Student", json!({"STUDENT_ID": "S9", "tutor": "x"}))
        .unwrap_err();
    assert!(matches!(err, LrsError::ValidationError(_)));
}
