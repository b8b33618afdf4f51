//! jisc-lrs: the data core of a Learning Record Store for JISC UDD entities.
//!
//! Every entity write runs an explicit pipeline:
//!
//! ```text
//! Authorize -> Validate -> OrgScope -> SoftDelete -> RelationSync -> Persist
//! ```
//!
//! and every read runs the tenant filter, then field scoping.
//!
//! # Guarantees
//!
//! - **Tenant isolation**: reads and writes are bound to the caller's organisation.
//! - **Field scoping**: each field lists the scopes that may read it; `ALL` reads everything.
//! - **Soft delete**: deleting scrubs a document down to its keep set instead of removing it.
//! - **Relation consistency**: after each save or delete, denormalized pointers are
//!   recomputed on both sides of every declared relation, in parallel, idempotently.
//!
//! # Crate Structure
//!
//! - [`core`]: the generic engine (model tables, store, pipeline, relations, audit broker)
//! - [`plugins`]: the JISC entity catalog and the API client registry
//!
//! # Examples
//!
//! ```bash
//! jisc-lrs init
//! jisc-lrs client add --org org-1 --name "Tribal" --scopes TRIBAL_INSIGHT
//! jisc-lrs entity save Student --org org-1 --scopes ALL --json '{"STUDENT_ID":"S1"}'
//! jisc-lrs entity list Student --org org-1 --scopes LAP --where STUDENT_ID=S1
//! ```

pub mod core;
pub mod plugins;

mod cli;

use crate::cli::{CallerArgs, Cli, ClientCommand, Command, EntityCommand};
use crate::core::config::LrsConfig;
use crate::core::error::LrsError;
use crate::core::repository::Lrs;
use crate::core::scope::{CallerContext, Scope, ScopeRegistry, ScopeSet};
use crate::core::time::command_envelope;
use crate::plugins::{clients, jisc};
use clap::Parser;
use serde_json::{Value as JsonValue, json};
use std::io::Read;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Resolve configuration the way the binary does: `--config`, then `--data-dir`.
pub fn load_config(config: Option<&Path>, data_dir: Option<&Path>) -> Result<LrsConfig, LrsError> {
    let mut cfg = LrsConfig::load(config)?;
    if let Some(dir) = data_dir {
        cfg.data_dir = dir.to_path_buf();
    }
    Ok(cfg)
}

/// Install the global `tracing` subscriber. `JISC_LRS_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_env("JISC_LRS_LOG").unwrap_or_else(|_| EnvFilter::new(default_filter));
    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run() -> Result<(), LrsError> {
    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref(), cli.data_dir.as_deref())?;
    init_tracing(&cfg.log_filter);
    dispatch(cli.command, cfg)
}

fn print(value: &JsonValue) -> Result<(), LrsError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn dispatch(command: Command, cfg: LrsConfig) -> Result<(), LrsError> {
    match command {
        Command::Init => {
            let lrs = Lrs::open(cfg, &jisc::CATALOG)?;
            let db = lrs.config().db_path().display().to_string();
            lrs.close();
            print(&command_envelope("init", "ok", json!({ "db": db })))
        }
        Command::Entity(entity_cli) => run_entity(entity_cli.command, cfg),
        Command::Client(client_cli) => run_client(client_cli.command, &cfg),
        Command::Scopes { scope } => {
            let registry = ScopeRegistry::new(&jisc::CATALOG);
            let scopes: Vec<Scope> = match scope {
                Some(s) => vec![s.parse()?],
                None => Scope::EVERY.to_vec(),
            };
            let mut out = serde_json::Map::new();
            for s in scopes {
                out.insert(
                    s.as_str().to_string(),
                    json!({
                        "readable_entities": registry.readable_entities(s),
                        "writable_entities": registry.writable_entities(s),
                        "fields": registry.exposures(s),
                    }),
                );
            }
            print(&command_envelope("scopes", "ok", json!({ "scopes": out })))
        }
        Command::Schema => print(&catalog_schema()),
    }
}

fn resolve_caller(cfg: &LrsConfig, args: &CallerArgs) -> Result<CallerContext, LrsError> {
    if let (Some(key), Some(secret)) = (&args.client_key, &args.client_secret) {
        return clients::authenticate(cfg, key, secret);
    }
    if let (Some(org), Some(scopes)) = (&args.org, &args.scopes) {
        return Ok(CallerContext::new(org.clone(), ScopeSet::parse_list(scopes)?).with_actor("cli"));
    }
    Err(LrsError::AuthorizationError(
        "pass --org with --scopes, or --client-key with --client-secret".to_string(),
    ))
}

fn read_json_arg(raw: &str) -> Result<JsonValue, LrsError> {
    if raw == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(serde_json::from_str(&buf)?)
    } else {
        Ok(serde_json::from_str(raw)?)
    }
}

fn parse_where(filters: &[String]) -> Result<Vec<(String, JsonValue)>, LrsError> {
    filters
        .iter()
        .map(|f| {
            let (field, value) = f.split_once('=').ok_or_else(|| {
                LrsError::ValidationError(format!("--where expects FIELD=VALUE, got '{}'", f))
            })?;
            // Numbers and booleans compare as JSON values; anything else is a string.
            let value = serde_json::from_str::<JsonValue>(value)
                .ok()
                .filter(|v| v.is_number() || v.is_boolean())
                .unwrap_or_else(|| JsonValue::String(value.to_string()));
            Ok((field.to_string(), value))
        })
        .collect()
}

fn run_entity(command: EntityCommand, cfg: LrsConfig) -> Result<(), LrsError> {
    let lrs = Lrs::open(cfg, &jisc::CATALOG)?;
    let result = match command {
        EntityCommand::Save { entity, json, caller } => {
            let caller = resolve_caller(lrs.config(), &caller)?;
            let body = read_json_arg(&json)?;
            let saved = lrs.save(&caller, &entity, body)?;
            command_envelope("entity.save", "ok", json!({ "document": saved }))
        }
        EntityCommand::Get { entity, id, include_deleted, caller } => {
            let caller = resolve_caller(lrs.config(), &caller)?;
            let doc = lrs.get(&caller, &entity, &id, include_deleted)?;
            command_envelope("entity.get", "ok", json!({ "document": doc }))
        }
        EntityCommand::List { entity, filters, include_deleted, caller } => {
            let caller = resolve_caller(lrs.config(), &caller)?;
            let equals = parse_where(&filters)?;
            let docs = lrs.list(&caller, &entity, &equals, include_deleted)?;
            command_envelope(
                "entity.list",
                "ok",
                json!({ "count": docs.len(), "documents": docs }),
            )
        }
        EntityCommand::Delete { entity, id, caller } => {
            let caller = resolve_caller(lrs.config(), &caller)?;
            let doc = lrs.delete(&caller, &entity, &id)?;
            command_envelope("entity.delete", "ok", json!({ "document": doc }))
        }
        EntityCommand::Remove { entity, id, caller } => {
            let caller = resolve_caller(lrs.config(), &caller)?;
            lrs.remove(&caller, &entity, &id)?;
            command_envelope("entity.remove", "ok", json!({ "removed": id }))
        }
    };
    lrs.close();
    print(&result)
}

fn run_client(command: ClientCommand, cfg: &LrsConfig) -> Result<(), LrsError> {
    let out = match command {
        ClientCommand::Add { org, name, scopes } => {
            let scopes = ScopeSet::parse_list(&scopes)?;
            let (client, secret) = clients::add_client(cfg, &org, &name, &scopes)?;
            command_envelope(
                "client.add",
                "ok",
                json!({
                    "client": client,
                    "secret": secret,
                    "endpoint": clients::endpoint_url(&cfg.endpoint_base_url),
                }),
            )
        }
        ClientCommand::List { org } => {
            let list = clients::list_clients(cfg, org.as_deref())?;
            command_envelope("client.list", "ok", json!({ "clients": list }))
        }
        ClientCommand::Edit { id, name, scopes, rotate_secret } => {
            let edit = clients::ClientEdit {
                name,
                scopes: scopes.as_deref().map(ScopeSet::parse_list).transpose()?,
                rotate_secret,
            };
            let (client, secret) = clients::edit_client(cfg, &id, &edit)?;
            command_envelope("client.edit", "ok", json!({ "client": client, "secret": secret }))
        }
        ClientCommand::Delete { id } => {
            clients::delete_client(cfg, &id)?;
            command_envelope("client.delete", "ok", json!({ "deleted": id }))
        }
        ClientCommand::Endpoint => command_envelope(
            "client.endpoint",
            "ok",
            json!({ "endpoint": clients::endpoint_url(&cfg.endpoint_base_url) }),
        ),
    };
    print(&out)
}

/// JSON description of every entity type in the catalog.
pub fn catalog_schema() -> JsonValue {
    let entities: Vec<JsonValue> = jisc::CATALOG
        .entities
        .iter()
        .map(|def| {
            json!({
                "name": def.name,
                "collection": def.collection,
                "business_key": def.business_key,
                "read_scopes": def.read_scopes,
                "write_scopes": def.write_scopes,
                "keep_on_delete": def.keep_on_delete,
                "fields": def.fields.iter().map(|f| json!({
                    "name": f.name,
                    "kind": f.kind.as_str(),
                    "required": f.required,
                    "read": f.read,
                })).collect::<Vec<_>>(),
                "relations": def.relations.iter().map(|r| json!({
                    "target": r.target,
                    "side": format!("{:?}", r.side).to_lowercase(),
                    "cardinality": format!("{:?}", r.cardinality).to_lowercase(),
                    "field": r.field,
                    "keys": r.keys.iter().map(|k| json!({"remote": k.remote, "own": k.own})).collect::<Vec<_>>(),
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    json!({
        "name": jisc::CATALOG.name,
        "entities": entities,
        "plugins": [clients::schema()],
    })
}
