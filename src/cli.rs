//! CLI struct definitions for the `jisc-lrs` command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `lib.rs`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "jisc-lrs",
    version = env!("CARGO_PKG_VERSION"),
    about = "Learning Record Store core: JISC UDD entities with scoped access, tenant isolation and consistent relations."
)]
pub(crate) struct Cli {
    /// Path to lrs.toml (defaults to ./lrs.toml when present).
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
    /// Override the configured data directory.
    #[clap(long, global = true)]
    pub data_dir: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Create the database and declare index hints.
    Init,
    /// Read and write JISC entities.
    Entity(EntityCli),
    /// Manage API clients.
    Client(ClientCli),
    /// Show what each scope exposes.
    Scopes {
        /// Limit to one scope token, e.g. SSP.
        #[clap(long)]
        scope: Option<String>,
    },
    /// Print the entity catalog as JSON.
    Schema,
}

/// Who is calling: either an organisation with explicit scopes or a client credential.
#[derive(clap::Args, Debug, Clone)]
pub(crate) struct CallerArgs {
    /// Organisation id.
    #[clap(long, requires = "scopes", conflicts_with = "client_key")]
    pub org: Option<String>,
    /// Comma-separated scope tokens, e.g. ALL or LAP,SSP.
    #[clap(long)]
    pub scopes: Option<String>,
    #[clap(long, requires = "client_secret")]
    pub client_key: Option<String>,
    #[clap(long)]
    pub client_secret: Option<String>,
}

#[derive(clap::Args, Debug)]
pub(crate) struct EntityCli {
    #[clap(subcommand)]
    pub command: EntityCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum EntityCommand {
    /// Create (no `_id`) or update (with `_id`) from a JSON object.
    Save {
        /// Entity type or collection name, e.g. Student or jiscStudents.
        entity: String,
        /// JSON object; `-` reads stdin.
        #[clap(long)]
        json: String,
        #[clap(flatten)]
        caller: CallerArgs,
    },
    Get {
        entity: String,
        id: String,
        #[clap(long)]
        include_deleted: bool,
        #[clap(flatten)]
        caller: CallerArgs,
    },
    List {
        entity: String,
        /// Equality filter, repeatable: FIELD=VALUE.
        #[clap(long = "where")]
        filters: Vec<String>,
        #[clap(long)]
        include_deleted: bool,
        #[clap(flatten)]
        caller: CallerArgs,
    },
    /// Soft delete.
    Delete {
        entity: String,
        id: String,
        #[clap(flatten)]
        caller: CallerArgs,
    },
    /// Unlink from every counterpart, then remove physically.
    Remove {
        entity: String,
        id: String,
        #[clap(flatten)]
        caller: CallerArgs,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct ClientCli {
    #[clap(subcommand)]
    pub command: ClientCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum ClientCommand {
    Add {
        #[clap(long)]
        org: String,
        #[clap(long)]
        name: String,
        /// Comma-separated scope tokens.
        #[clap(long, default_value = "ALL")]
        scopes: String,
    },
    List {
        #[clap(long)]
        org: Option<String>,
    },
    Edit {
        id: String,
        #[clap(long)]
        name: Option<String>,
        #[clap(long)]
        scopes: Option<String>,
        /// Issue a new secret.
        #[clap(long)]
        rotate_secret: bool,
    },
    Delete {
        id: String,
    },
    /// Print the xAPI endpoint URL.
    Endpoint,
}
