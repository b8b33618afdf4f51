use jisc_lrs::core::config::LrsConfig;
use jisc_lrs::core::error::LrsError;
use jisc_lrs::core::repository::Lrs;
use jisc_lrs::core::scope::{Scope, ScopeSet};
use jisc_lrs::plugins::clients::{self, ClientEdit};
use jisc_lrs::plugins::jisc::CATALOG;
use serde_json::json;
use tempfile::{TempDir, tempdir};

fn setup() -> (TempDir, LrsConfig) {
    let tmp = tempdir().unwrap();
    let cfg = LrsConfig {
        data_dir: tmp.path().to_path_buf(),
        ..LrsConfig::default()
    };
    (tmp, cfg)
}

fn scopes(raw: &str) -> ScopeSet {
    ScopeSet::parse_list(raw).unwrap()
}

#[test]
fn test_add_then_authenticate() {
    let (_tmp, cfg) = setup();
    let (client, secret) = clients::add_client(&cfg, "org-1", "Tribal", &scopes("TRIBAL_INSIGHT,LAP")).unwrap();
    assert_eq!(client.organisation, "org-1");
    assert_eq!(client.scopes, vec![Scope::TribalInsight, Scope::Lap]);
    assert!(!secret.is_empty());

    let caller = clients::authenticate(&cfg, &client.api_key, &secret).unwrap();
    assert_eq!(caller.organisation, "org-1");
    assert!(caller.scopes.contains(Scope::Lap));
    assert!(!caller.scopes.contains(Scope::All));
    assert_eq!(caller.actor, format!("client:{}", client.id));
}

#[test]
fn test_wrong_secret_is_rejected() {
    let (_tmp, cfg) = setup();
    let (client, _secret) = clients::add_client(&cfg, "org-1", "Tribal", &scopes("ALL")).unwrap();

    let err = clients::authenticate(&cfg, &client.api_key, "not-the-secret").unwrap_err();
    assert!(matches!(err, LrsError::AuthorizationError(_)));
    let err = clients::authenticate(&cfg, "no-such-key", "x").unwrap_err();
    assert!(matches!(err, LrsError::AuthorizationError(_)));
}

#[test]
fn test_secret_is_not_stored_in_plaintext() {
    let (_tmp, cfg) = setup();
    let (client, secret) = clients::add_client(&cfg, "org-1", "Tribal", &scopes("ALL")).unwrap();
    let listed = clients::list_clients(&cfg, None).unwrap();
    let rendered = serde_json::to_string(&listed).unwrap();
    assert!(rendered.contains(&client.api_key));
    assert!(!rendered.contains(&secret));
}

#[test]
fn test_list_by_organisation() {
    let (_tmp, cfg) = setup();
    clients::add_client(&cfg, "org-1", "A", &scopes("ALL")).unwrap();
    clients::add_client(&cfg, "org-1", "B", &scopes("SSP")).unwrap();
    clients::add_client(&cfg, "org-2", "C", &scopes("LAP")).unwrap();

    assert_eq!(clients::list_clients(&cfg, None).unwrap().len(), 3);
    let org1 = clients::list_clients(&cfg, Some("org-1")).unwrap();
    assert_eq!(org1.len(), 2);
    assert!(org1.iter().all(|c| c.organisation == "org-1"));
    assert!(clients::list_clients(&cfg, Some("org-3")).unwrap().is_empty());
}

#[test]
fn test_edit_and_rotate() {
    let (_tmp, cfg) = setup();
    let (client, old_secret) = clients::add_client(&cfg, "org-1", "Tribal", &scopes("ALL")).unwrap();

    let (edited, none) = clients::edit_client(
        &cfg,
        &client.id,
        &ClientEdit {
            name: Some("Tribal Insight".to_string()),
            scopes: Some(scopes("TRIBAL_INSIGHT")),
            rotate_secret: false,
        },
    )
    .unwrap();
    assert!(none.is_none());
    assert_eq!(edited.name, "Tribal Insight");
    assert_eq!(edited.scopes, vec![Scope::TribalInsight]);
    assert_eq!(clients::get_client(&cfg, &client.id).unwrap(), edited);

    let (_, new_secret) = clients::edit_client(
        &cfg,
        &client.id,
        &ClientEdit {
            rotate_secret: true,
            ..ClientEdit::default()
        },
    )
    .unwrap();
    let new_secret = new_secret.unwrap();
    assert_ne!(new_secret, old_secret);
    assert!(clients::authenticate(&cfg, &client.api_key, &old_secret).is_err());
    let caller = clients::authenticate(&cfg, &client.api_key, &new_secret).unwrap();
    assert!(caller.scopes.contains(Scope::TribalInsight));
}

#[test]
fn test_invalid_client_input() {
    let (_tmp, cfg) = setup();
    let err = clients::add_client(&cfg, "org-1", "  ", &scopes("ALL")).unwrap_err();
    assert!(matches!(err, LrsError::ValidationError(_)));
    let err = clients::add_client(&cfg, "", "A", &scopes("ALL")).unwrap_err();
    assert!(matches!(err, LrsError::ValidationError(_)));
    let err = clients::add_client(&cfg, "org-1", "A", &ScopeSet::default()).unwrap_err();
    assert!(matches!(err, LrsError::ValidationError(_)));
    assert!(ScopeSet::parse_list("ALL,NOPE").is_err());
}

#[test]
fn test_delete_client() {
    let (_tmp, cfg) = setup();
    let (client, secret) = clients::add_client(&cfg, "org-1", "Tribal", &scopes("ALL")).unwrap();
    clients::delete_client(&cfg, &client.id).unwrap();

    assert!(matches!(
        clients::get_client(&cfg, &client.id),
        Err(LrsError::NotFound(_))
    ));
    assert!(matches!(
        clients::delete_client(&cfg, &client.id),
        Err(LrsError::NotFound(_))
    ));
    assert!(clients::authenticate(&cfg, &client.api_key, &secret).is_err());
}

#[test]
fn test_authenticated_client_is_bound_to_its_organisation() {
    let (_tmp, cfg) = setup();
    let (c1, s1) = clients::add_client(&cfg, "org-1", "One", &scopes("ALL")).unwrap();
    let (c2, s2) = clients::add_client(&cfg, "org-2", "Two", &scopes("ALL")).unwrap();
    let one = clients::authenticate(&cfg, &c1.api_key, &s1).unwrap();
    let two = clients::authenticate(&cfg, &c2.api_key, &s2).unwrap();

    let lrs = Lrs::open(cfg.clone(), &CATALOG).unwrap();
    let saved = lrs
        .create(&one, "Student", json!({"STUDENT_ID": "S1"}))
        .unwrap();
    let id = saved["_id"].as_str().unwrap();
    assert_eq!(saved["organisation"], "org-1");

    assert!(matches!(
        lrs.get(&two, "Student", id, false),
        Err(LrsError::NotFound(_))
    ));
    assert!(lrs.list(&two, "Student", &[], false).unwrap().is_empty());
    assert_eq!(lrs.list(&one, "Student", &[], false).unwrap().len(), 1);
}

#[test]
fn test_endpoint_url() {
    let (_tmp, cfg) = setup();
    assert_eq!(
        clients::endpoint_url(&cfg.endpoint_base_url),
        "http://localhost:8000/data/xAPI/"
    );
}
