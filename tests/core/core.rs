use jisc_lrs::core::broker::{AUDIT_LOG_NAME, BrokerEvent};
use jisc_lrs::core::config::LrsConfig;
use jisc_lrs::core::db;
use jisc_lrs::core::document::Document;
use jisc_lrs::core::error::LrsError;
use jisc_lrs::core::pipeline::{Intent, Pipeline, Stage};
use jisc_lrs::core::repository::Lrs;
use jisc_lrs::core::schemas;
use jisc_lrs::core::scope::{CallerContext, Scope, ScopeSet};
use jisc_lrs::plugins::jisc::CATALOG;
use rusqlite::Connection;
use serde_json::json;
use std::fs;
use tempfile::tempdir;

fn caller(org: &str, scopes: &[Scope]) -> CallerContext {
    CallerContext::new(org, ScopeSet::new(scopes.iter().copied()))
}

fn admin(org: &str) -> CallerContext {
    caller(org, &[Scope::All])
}

#[test]
fn config_file_overrides_defaults() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("lrs.toml");
    fs::write(
        &path,
        "data_dir = \"/srv/lrs\"\nendpoint_base_url = \"https://lrs.example.ac.uk\"\n",
    )
    .unwrap();

    let cfg = LrsConfig::load(Some(&path)).unwrap();
    assert_eq!(cfg.data_dir, std::path::PathBuf::from("/srv/lrs"));
    assert_eq!(cfg.endpoint_base_url, "https://lrs.example.ac.uk");
    assert_eq!(cfg.db_name, "lrs.db");
    assert_eq!(cfg.db_path(), std::path::PathBuf::from("/srv/lrs/lrs.db"));

    let cfg = jisc_lrs::load_config(Some(&path), Some(tmp.path())).unwrap();
    assert_eq!(cfg.data_dir, tmp.path());
}

#[test]
fn config_errors_are_reported() {
    let tmp = tempdir().unwrap();
    let missing = tmp.path().join("nope.toml");
    let err = LrsConfig::load(Some(&missing)).unwrap_err();
    assert!(matches!(err, LrsError::ConfigError(_)));

    let bad = tmp.path().join("bad.toml");
    fs::write(&bad, "busy_timeout_secs = \"soon\"\n").unwrap();
    let err = LrsConfig::load(Some(&bad)).unwrap_err();
    assert!(format!("{}", err).contains("bad.toml"));
}

#[test]
fn initialize_creates_every_table() {
    let tmp = tempdir().unwrap();
    db::initialize_lrs_db(tmp.path()).unwrap();
    // Idempotent.
    db::initialize_lrs_db(tmp.path()).unwrap();

    let conn = Connection::open(db::lrs_db_path(tmp.path())).unwrap();
    for table in ["documents", "index_hints", "clients"] {
        let n: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(n, 1, "missing table {}", table);
    }
    assert!(!schemas::ALL_SCHEMAS.is_empty());
}

#[test]
fn open_writes_audit_log_for_mutations() {
    let tmp = tempdir().unwrap();
    let cfg = LrsConfig {
        data_dir: tmp.path().to_path_buf(),
        ..LrsConfig::default()
    };
    let lrs = Lrs::open(cfg, &CATALOG).unwrap();
    let who = admin("org-1").with_actor("importer");

    let saved = lrs.create(&who, "Student", json!({"STUDENT_ID": "S1"})).unwrap();
    let id = saved["_id"].as_str().unwrap().to_string();
    lrs.delete(&who, "Student", &id).unwrap();
    let _ = lrs.create(&who, "Student", json!({"STUDENT_ID": "S2", "SEXID": 42}));

    assert!(tmp.path().join(AUDIT_LOG_NAME).exists());
    let events: Vec<BrokerEvent> = lrs.broker().events().unwrap();
    let ops: Vec<(&str, &str)> = events
        .iter()
        .map(|e| (e.op.as_str(), e.status.as_str()))
        .collect();
    assert_eq!(
        ops,
        vec![
            ("entity.create", "success"),
            ("entity.delete", "success"),
            ("entity.create", "error"),
        ]
    );
    assert!(events.iter().all(|e| e.actor == "importer"));
    assert_eq!(events[0].entity_id.as_deref(), Some(id.as_str()));
    assert_eq!(events[0].organisation.as_deref(), Some("org-1"));
    assert_eq!(events[0].collection, "jiscStudents");
    lrs.close();
}

#[test]
fn pipeline_runs_every_stage_in_order() {
    let lrs = Lrs::in_memory(&CATALOG);
    let pipeline = lrs.pipeline("jiscStudents").unwrap();
    assert_eq!(pipeline.entity().name, "Student");
    assert_eq!(pipeline.stages(), Stage::DEFAULT);

    let mut doc = Document::new("jiscStudents", "s-1", "");
    doc.set("STUDENT_ID", json!("S1"));
    let first = pipeline.save(&admin("org-1"), doc.clone()).unwrap();
    assert!(first.created);
    assert_eq!(first.intent, Intent::Save);
    assert_eq!(first.stages_run, Stage::DEFAULT.to_vec());
    assert_eq!(first.document.organisation, "org-1");
    assert!(first.document.created_at.is_some());

    let second = pipeline.save(&admin("org-1"), doc).unwrap();
    assert!(!second.created);
    assert_eq!(second.document.created_at, first.document.created_at);
    assert_eq!(second.counterpart_writes, 0);
}

#[test]
fn custom_stage_list_skips_relation_sync() {
    let lrs = Lrs::in_memory(&CATALOG);
    let who = admin("org-1");
    lrs.create(&who, "Staff", json!({"STAFF_ID": "T1"})).unwrap();

    let def = CATALOG.entity("Student").unwrap();
    let stages = vec![Stage::Authorize, Stage::Validate, Stage::OrgScope, Stage::Persist];
    let bare = Pipeline::new(def, &CATALOG, lrs.store()).with_stages(stages.clone());
    let mut doc = Document::new("jiscStudents", "s-1", "");
    doc.set("STUDENT_ID", json!("S1"));
    doc.set("TUTOR_STAFF_ID", json!("T1"));
    let out = bare.save(&who, doc).unwrap();
    assert_eq!(out.stages_run, stages);
    assert!(out.document.get("tutor").is_none());

    // The default pipeline links on the next save.
    let linked = lrs
        .update(&who, "Student", "s-1", json!({"FIRST_NAME": "Ada"}))
        .unwrap();
    assert!(linked["tutor"].is_string());
}

#[test]
fn authorization_is_checked_before_validation() {
    let lrs = Lrs::in_memory(&CATALOG);
    let reader = caller("org-1", &[Scope::UddRead]);
    let err = lrs
        .create(&reader, "Student", json!({"SEXID": "not a number"}))
        .unwrap_err();
    assert!(matches!(err, LrsError::AuthorizationError(_)));

    let err = lrs
        .create(&admin("org-1"), "Student", json!({"SEXID": "not a number"}))
        .unwrap_err();
    assert!(matches!(err, LrsError::ValidationError(_)));
    assert!(lrs.list(&admin("org-1"), "Student", &[], true).unwrap().is_empty());
}

#[test]
fn unknown_entity_is_not_found() {
    let lrs = Lrs::in_memory(&CATALOG);
    let err = lrs
        .create(&admin("org-1"), "Unicorn", json!({}))
        .unwrap_err();
    assert!(matches!(err, LrsError::NotFound(_)));
}

#[test]
fn tenants_cannot_see_or_touch_each_other() {
    let lrs = Lrs::in_memory(&CATALOG);
    let one = admin("org-1");
    let two = admin("org-2");

    let s1 = lrs.create(&one, "Student", json!({"STUDENT_ID": "S1"})).unwrap();
    let id = s1["_id"].as_str().unwrap().to_string();

    // Same business key in another tenant is a different student.
    let s2 = lrs.create(&two, "Student", json!({"STUDENT_ID": "S1"})).unwrap();
    assert_ne!(s2["_id"], s1["_id"]);

    assert!(matches!(lrs.get(&two, "Student", &id, true), Err(LrsError::NotFound(_))));
    assert!(matches!(
        lrs.update(&two, "Student", &id, json!({"FIRST_NAME": "Eve"})),
        Err(LrsError::NotFound(_))
    ));
    assert!(matches!(lrs.delete(&two, "Student", &id), Err(LrsError::NotFound(_))));
    assert!(matches!(lrs.remove(&two, "Student", &id), Err(LrsError::NotFound(_))));

    let err = lrs
        .create(&two, "Student", json!({"STUDENT_ID": "S3", "organisation": "org-1"}))
        .unwrap_err();
    assert!(matches!(err, LrsError::ValidationError(_)));

    // Relations never cross tenants.
    let scm = lrs
        .create(
            &two,
            "StudentCourseMembership",
            json!({"STUDENT_ID": "S1", "STUDENT_COURSE_MEMBERSHIP_ID": "M1"}),
        )
        .unwrap();
    assert_eq!(scm["student"], s2["_id"]);
    let untouched = lrs.get(&one, "Student", &id, false).unwrap();
    assert!(untouched.get("studentCourseMemberships").is_none_or(|v| v == &json!([])));
}

#[test]
fn foreign_id_is_refused_before_any_counterpart_is_written() {
    let tmp = tempdir().unwrap();
    let cfg = LrsConfig {
        data_dir: tmp.path().to_path_buf(),
        ..LrsConfig::default()
    };
    let disk = Lrs::open(cfg, &CATALOG).unwrap();
    let mem = Lrs::in_memory(&CATALOG);
    let one = admin("org-1");
    let two = admin("org-2");

    for lrs in [&disk, &mem] {
        let theirs = lrs.create(&two, "Student", json!({"STUDENT_ID": "S9"})).unwrap();
        let foreign_id = theirs["_id"].as_str().unwrap().to_string();
        let scm = lrs
            .create(
                &one,
                "StudentCourseMembership",
                json!({"STUDENT_ID": "S1", "STUDENT_COURSE_MEMBERSHIP_ID": "M1"}),
            )
            .unwrap();
        let scm_id = scm["_id"].as_str().unwrap().to_string();

        let mut doc = Document::new("jiscStudents", &foreign_id, "");
        doc.set("STUDENT_ID", json!("S1"));
        let err = lrs.pipeline("Student").unwrap().save(&one, doc).unwrap_err();
        assert!(matches!(err, LrsError::ValidationError(_)));

        let scm = lrs.get(&one, "StudentCourseMembership", &scm_id, false).unwrap();
        assert!(scm.get("student").is_none());
        let theirs = lrs.get(&two, "Student", &foreign_id, false).unwrap();
        assert_eq!(theirs["STUDENT_ID"], json!("S9"));
        assert!(theirs.get("studentCourseMemberships").is_none_or(|v| v == &json!([])));
    }
}

#[test]
fn audit_append_failure_does_not_mask_the_result() {
    let tmp = tempdir().unwrap();
    let cfg = LrsConfig {
        data_dir: tmp.path().to_path_buf(),
        ..LrsConfig::default()
    };
    let lrs = Lrs::open(cfg, &CATALOG).unwrap();
    // A directory where the log file should be makes every append fail.
    fs::create_dir(tmp.path().join(AUDIT_LOG_NAME)).unwrap();
    let who = admin("org-1");

    let saved = lrs.create(&who, "Student", json!({"STUDENT_ID": "S1"})).unwrap();
    let id = saved["_id"].as_str().unwrap();
    assert_eq!(lrs.get(&who, "Student", id, false).unwrap()["STUDENT_ID"], json!("S1"));

    let err = lrs
        .create(&who, "Student", json!({"STUDENT_ID": "S2", "SEXID": 42}))
        .unwrap_err();
    assert!(matches!(err, LrsError::ValidationError(_)));
}

#[test]
fn update_merges_and_clears() {
    let lrs = Lrs::in_memory(&CATALOG);
    let who = admin("org-1");
    let saved = lrs
        .create(&who, "Student", json!({"STUDENT_ID": "S1", "FIRST_NAME": "Ada", "LAST_NAME": "King"}))
        .unwrap();
    let id = saved["_id"].as_str().unwrap().to_string();

    let updated = lrs
        .update(&who, "Student", &id, json!({"FIRST_NAME": null, "LAST_NAME": "Lovelace"}))
        .unwrap();
    assert!(updated.get("FIRST_NAME").is_none());
    assert_eq!(updated["LAST_NAME"], "Lovelace");
    assert_eq!(updated["STUDENT_ID"], "S1");

    let via_save = lrs
        .save(&who, "Student", json!({"_id": id, "LAST_NAME": "Byron"}))
        .unwrap();
    assert_eq!(via_save["LAST_NAME"], "Byron");

    let err = lrs
        .update(&who, "Student", &id, json!({"_id": "other"}))
        .unwrap_err();
    assert!(matches!(err, LrsError::ValidationError(_)));
    let err = lrs
        .create(&who, "Student", json!({"_id": "mine", "STUDENT_ID": "S2"}))
        .unwrap_err();
    assert!(matches!(err, LrsError::ValidationError(_)));
    let err = lrs.create(&who, "Student", json!(["S1"])).unwrap_err();
    assert!(matches!(err, LrsError::ValidationError(_)));
}

#[test]
fn delete_flag_in_update_soft_deletes() {
    let lrs = Lrs::in_memory(&CATALOG);
    let who = admin("org-1");
    let saved = lrs
        .create(&who, "Student", json!({"STUDENT_ID": "S1", "FIRST_NAME": "Ada"}))
        .unwrap();
    let id = saved["_id"].as_str().unwrap().to_string();

    let deleted = lrs
        .update(&who, "Student", &id, json!({"deleted": true}))
        .unwrap();
    assert_eq!(deleted["deleted"], true);
    assert!(deleted.get("deletedAt").is_some());
    assert_eq!(deleted["FIRST_NAME"], "");

    assert!(matches!(lrs.get(&who, "Student", &id, false), Err(LrsError::NotFound(_))));
    assert_eq!(lrs.get(&who, "Student", &id, true).unwrap()["STUDENT_ID"], "S1");
    assert!(lrs.list(&who, "Student", &[], false).unwrap().is_empty());
    assert_eq!(lrs.list(&who, "Student", &[], true).unwrap().len(), 1);

    // The business key is free again once the holder is deleted.
    lrs.create(&who, "Student", json!({"STUDENT_ID": "S1"})).unwrap();
}

#[test]
fn list_filters_by_field_and_projects() {
    let lrs = Lrs::in_memory(&CATALOG);
    let who = admin("org-1");
    for (sid, sex) in [("S1", 1), ("S2", 2), ("S3", 2)] {
        lrs.create(&who, "Student", json!({"STUDENT_ID": sid, "SEXID": sex, "FIRST_NAME": sid}))
            .unwrap();
    }

    let lap = caller("org-1", &[Scope::Lap]);
    let found = lrs
        .list(&lap, "Student", &[("SEXID".to_string(), json!(2))], false)
        .unwrap();
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|d| d.get("FIRST_NAME").is_none()));
    assert!(found.iter().all(|d| d["SEXID"] == json!(2)));
}

#[test]
fn sqlite_and_memory_stores_agree() {
    let tmp = tempdir().unwrap();
    let cfg = LrsConfig {
        data_dir: tmp.path().to_path_buf(),
        ..LrsConfig::default()
    };
    let disk = Lrs::open(cfg, &CATALOG).unwrap();
    let mem = Lrs::in_memory(&CATALOG);
    let who = admin("org-1");

    for lrs in [&disk, &mem] {
        lrs.create(&who, "Staff", json!({"STAFF_ID": "T1"})).unwrap();
        let student = lrs
            .create(&who, "Student", json!({"STUDENT_ID": "S1", "TUTOR_STAFF_ID": "T1"}))
            .unwrap();
        let staff = lrs
            .list(&who, "Staff", &[("STAFF_ID".to_string(), json!("T1"))], false)
            .unwrap();
        assert_eq!(staff.len(), 1);
        assert_eq!(staff[0]["mentees"], json!([student["_id"]]));
        assert_eq!(student["tutor"], staff[0]["_id"]);
    }
}
