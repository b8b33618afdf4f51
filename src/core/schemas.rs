//! Centralized database schema definitions.
//!
//! One SQLite file (`lrs.db` by default) holds:
//! 1. `documents`: every entity collection, one JSON body per row, tenant-partitioned.
//! 2. `index_hints`: advisory index declarations recorded per collection.
//! 3. `clients`: API client credentials and their granted scopes.

pub const LRS_DB_NAME: &str = "lrs.db";

pub const DOCUMENTS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        organisation TEXT NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0,
        body TEXT NOT NULL, -- JSON document including the envelope keys
        updated_at TEXT,
        PRIMARY KEY (collection, id)
    )
";
pub const DOCUMENTS_SCHEMA_INDEX_TENANT: &str =
    "CREATE INDEX IF NOT EXISTS idx_documents_tenant ON documents(collection, organisation, deleted)";

pub const INDEX_HINTS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS index_hints (
        collection TEXT NOT NULL,
        fields TEXT NOT NULL, -- comma-separated field list
        PRIMARY KEY (collection, fields)
    )
";

pub const CLIENTS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS clients (
        id TEXT PRIMARY KEY,
        organisation TEXT NOT NULL,
        name TEXT NOT NULL,
        api_key TEXT NOT NULL UNIQUE,
        secret_hash TEXT NOT NULL,
        scopes TEXT NOT NULL, -- JSON array of scope tokens
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
";
pub const CLIENTS_SCHEMA_INDEX_ORG: &str =
    "CREATE INDEX IF NOT EXISTS idx_clients_organisation ON clients(organisation)";

pub const ALL_SCHEMAS: &[&str] = &[
    DOCUMENTS_SCHEMA,
    DOCUMENTS_SCHEMA_INDEX_TENANT,
    INDEX_HINTS_SCHEMA,
    CLIENTS_SCHEMA,
    CLIENTS_SCHEMA_INDEX_ORG,
];
