//! API client registry.
//!
//! Each client is a key/secret pair bound to one organisation and a scope set. Secrets
//! are returned once, at creation or rotation, and only their SHA-256 digest is stored.
//! [`authenticate`] turns a presented key and secret into the [`CallerContext`] every
//! entity operation runs under.

use crate::core::broker::DbBroker;
use crate::core::config::LrsConfig;
use crate::core::db;
use crate::core::error::LrsError;
use crate::core::scope::{CallerContext, Scope, ScopeSet};
use crate::core::time;
use rusqlite::{OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use ulid::Ulid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiClient {
    pub id: String,
    pub organisation: String,
    pub name: String,
    pub api_key: String,
    pub scopes: Vec<Scope>,
    pub created_at: String,
    pub updated_at: String,
}

impl ApiClient {
    pub fn scope_set(&self) -> ScopeSet {
        ScopeSet::new(self.scopes.iter().copied())
    }
}

/// Changes accepted by [`edit_client`]. `None` leaves a property alone.
#[derive(Debug, Clone, Default)]
pub struct ClientEdit {
    pub name: Option<String>,
    pub scopes: Option<ScopeSet>,
    pub rotate_secret: bool,
}

pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// xAPI endpoint clients post statements to.
pub fn endpoint_url(base_url: &str) -> String {
    format!("{}/data/xAPI/", base_url.trim_end_matches('/'))
}

fn new_secret() -> String {
    format!("{}{}", Ulid::new(), Ulid::new()).to_lowercase()
}

fn check_scopes(scopes: &ScopeSet) -> Result<(), LrsError> {
    if scopes.is_empty() {
        return Err(LrsError::ValidationError(
            "a client needs at least one scope".to_string(),
        ));
    }
    Ok(())
}

fn check_name(name: &str) -> Result<(), LrsError> {
    if name.trim().is_empty() {
        return Err(LrsError::ValidationError("client name is empty".to_string()));
    }
    Ok(())
}

fn client_from_row(row: &Row<'_>) -> rusqlite::Result<(ApiClient, String)> {
    let scopes_json: String = row.get(5)?;
    let scopes: Vec<Scope> = serde_json::from_str(&scopes_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok((
        ApiClient {
            id: row.get(0)?,
            organisation: row.get(1)?,
            name: row.get(2)?,
            api_key: row.get(3)?,
            scopes,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        },
        row.get(4)?,
    ))
}

const SELECT_CLIENT: &str = "SELECT id, organisation, name, api_key, secret_hash, scopes, created_at, updated_at FROM clients";

fn broker_for(config: &LrsConfig) -> Result<DbBroker, LrsError> {
    db::initialize_db_at(&config.db_path(), config.busy_timeout_secs)?;
    Ok(DbBroker::new(&config.data_dir).with_busy_timeout(config.busy_timeout_secs))
}

/// Register a client. Returns the client and its plaintext secret.
pub fn add_client(
    config: &LrsConfig,
    organisation: &str,
    name: &str,
    scopes: &ScopeSet,
) -> Result<(ApiClient, String), LrsError> {
    if organisation.trim().is_empty() {
        return Err(LrsError::ValidationError(
            "client organisation is empty".to_string(),
        ));
    }
    check_name(name)?;
    check_scopes(scopes)?;

    let now = time::now_rfc3339();
    let secret = new_secret();
    let client = ApiClient {
        id: Ulid::new().to_string(),
        organisation: organisation.to_string(),
        name: name.trim().to_string(),
        api_key: Ulid::new().to_string().to_lowercase(),
        scopes: scopes.iter().collect(),
        created_at: now.clone(),
        updated_at: now,
    };
    let scopes_json = serde_json::to_string(&client.scopes)?;
    let secret_hash = hash_secret(&secret);

    let broker = broker_for(config)?;
    broker.with_conn(&config.db_path(), "admin", "client.add", |conn| {
        conn.execute(
            "INSERT INTO clients(id, organisation, name, api_key, secret_hash, scopes, created_at, updated_at)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                client.id,
                client.organisation,
                client.name,
                client.api_key,
                secret_hash,
                scopes_json,
                client.created_at,
                client.updated_at
            ],
        )?;
        Ok(())
    })?;
    tracing::info!(client = %client.id, organisation, "api client registered");
    Ok((client, secret))
}

/// Clients of one organisation, or every client when `organisation` is `None`.
pub fn list_clients(config: &LrsConfig, organisation: Option<&str>) -> Result<Vec<ApiClient>, LrsError> {
    let broker = broker_for(config)?;
    broker.with_conn(&config.db_path(), "admin", "client.list", |conn| {
        let mut out = Vec::new();
        match organisation {
            Some(org) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE organisation = ?1 ORDER BY created_at, id",
                    SELECT_CLIENT
                ))?;
                let rows = stmt.query_map(params![org], client_from_row)?;
                for r in rows {
                    out.push(r?.0);
                }
            }
            None => {
                let mut stmt = conn.prepare(&format!("{} ORDER BY created_at, id", SELECT_CLIENT))?;
                let rows = stmt.query_map([], client_from_row)?;
                for r in rows {
                    out.push(r?.0);
                }
            }
        }
        Ok(out)
    })
}

pub fn get_client(config: &LrsConfig, id: &str) -> Result<ApiClient, LrsError> {
    let broker = broker_for(config)?;
    let found = broker.with_conn(&config.db_path(), "admin", "client.get", |conn| {
        Ok(conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_CLIENT),
                params![id],
                client_from_row,
            )
            .optional()?)
    })?;
    found
        .map(|(client, _)| client)
        .ok_or_else(|| LrsError::NotFound(format!("client {}", id)))
}

/// Apply `edit`. Returns the updated client and, when rotated, the new secret.
pub fn edit_client(
    config: &LrsConfig,
    id: &str,
    edit: &ClientEdit,
) -> Result<(ApiClient, Option<String>), LrsError> {
    let mut client = get_client(config, id)?;
    if let Some(name) = &edit.name {
        check_name(name)?;
        client.name = name.trim().to_string();
    }
    if let Some(scopes) = &edit.scopes {
        check_scopes(scopes)?;
        client.scopes = scopes.iter().collect();
    }
    client.updated_at = time::now_rfc3339();
    let secret = edit.rotate_secret.then(new_secret);
    let scopes_json = serde_json::to_string(&client.scopes)?;

    let broker = broker_for(config)?;
    broker.with_conn(&config.db_path(), "admin", "client.edit", |conn| {
        conn.execute(
            "UPDATE clients SET name = ?2, scopes = ?3, updated_at = ?4 WHERE id = ?1",
            params![client.id, client.name, scopes_json, client.updated_at],
        )?;
        if let Some(secret) = &secret {
            conn.execute(
                "UPDATE clients SET secret_hash = ?2 WHERE id = ?1",
                params![client.id, hash_secret(secret)],
            )?;
        }
        Ok(())
    })?;
    tracing::info!(client = %client.id, rotated = secret.is_some(), "api client updated");
    Ok((client, secret))
}

pub fn delete_client(config: &LrsConfig, id: &str) -> Result<(), LrsError> {
    let broker = broker_for(config)?;
    let n = broker.with_conn(&config.db_path(), "admin", "client.delete", |conn| {
        Ok(conn.execute("DELETE FROM clients WHERE id = ?1", params![id])?)
    })?;
    if n == 0 {
        return Err(LrsError::NotFound(format!("client {}", id)));
    }
    tracing::info!(client = id, "api client deleted");
    Ok(())
}

/// Resolve a key and secret to the caller they identify.
pub fn authenticate(config: &LrsConfig, api_key: &str, secret: &str) -> Result<CallerContext, LrsError> {
    let broker = broker_for(config)?;
    let found = broker.with_conn(&config.db_path(), "auth", "client.authenticate", |conn| {
        Ok(conn
            .query_row(
                &format!("{} WHERE api_key = ?1", SELECT_CLIENT),
                params![api_key],
                client_from_row,
            )
            .optional()?)
    })?;
    match found {
        Some((client, hash)) if hash == hash_secret(secret) => {
            tracing::debug!(client = %client.id, "client authenticated");
            Ok(CallerContext::new(client.organisation.clone(), client.scope_set())
                .with_actor(format!("client:{}", client.id)))
        }
        _ => Err(LrsError::AuthorizationError(
            "unknown client key or wrong secret".to_string(),
        )),
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "client",
        "description": "API client credentials bound to an organisation and scope set",
        "commands": [
            { "name": "add", "description": "Register a client and print its secret once" },
            { "name": "list", "description": "List clients, optionally for one organisation" },
            { "name": "edit", "description": "Rename, re-scope or rotate the secret" },
            { "name": "delete", "description": "Remove a client" },
            { "name": "endpoint", "description": "Show the xAPI endpoint URL" }
        ],
        "storage": ["lrs.db#clients"]
    })
}
