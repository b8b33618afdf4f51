//! Capability tokens and the registry of what each one exposes.

use crate::core::error::LrsError;
use crate::core::model::Catalog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    /// Universal scope: every field of every entity, read and write.
    All,
    UddRead,
    StudentApp,
    TribalInsight,
    Lap,
    Ssp,
    Opendash,
}

impl Scope {
    pub const EVERY: [Scope; 7] = [
        Scope::All,
        Scope::UddRead,
        Scope::StudentApp,
        Scope::TribalInsight,
        Scope::Lap,
        Scope::Ssp,
        Scope::Opendash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::All => "ALL",
            Scope::UddRead => "UDD_READ",
            Scope::StudentApp => "STUDENT_APP",
            Scope::TribalInsight => "TRIBAL_INSIGHT",
            Scope::Lap => "LAP",
            Scope::Ssp => "SSP",
            Scope::Opendash => "OPENDASH",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = LrsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Scope::EVERY
            .iter()
            .copied()
            .find(|scope| scope.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| LrsError::ValidationError(format!("Unknown scope '{}'", wanted)))
    }
}

/// The scopes granted to one caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSet(BTreeSet<Scope>);

impl ScopeSet {
    pub fn new<I: IntoIterator<Item = Scope>>(scopes: I) -> Self {
        Self(scopes.into_iter().collect())
    }

    /// Parse a comma-separated token list such as `ALL,SSP`.
    pub fn parse_list(raw: &str) -> Result<Self, LrsError> {
        let mut set = BTreeSet::new();
        for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            set.insert(token.parse::<Scope>()?);
        }
        Ok(Self(set))
    }

    pub fn contains(&self, scope: Scope) -> bool {
        self.0.contains(&scope)
    }

    pub fn is_universal(&self) -> bool {
        self.contains(Scope::All)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn intersects(&self, declared: &[Scope]) -> bool {
        declared.iter().any(|s| self.0.contains(s))
    }

    pub fn iter(&self) -> impl Iterator<Item = Scope> + '_ {
        self.0.iter().copied()
    }

    pub fn to_list(&self) -> String {
        self.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(",")
    }
}

/// Resolved identity of an inbound request: the tenant and the granted scopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub organisation: String,
    pub scopes: ScopeSet,
    /// Recorded in the audit log.
    pub actor: String,
}

impl CallerContext {
    pub fn new(organisation: impl Into<String>, scopes: ScopeSet) -> Self {
        Self {
            organisation: organisation.into(),
            scopes,
            actor: "lrs".to_string(),
        }
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exposure {
    pub entity: &'static str,
    pub field: &'static str,
}

/// Read-only view over a catalog answering "what does this token grant".
pub struct ScopeRegistry<'a> {
    catalog: &'a Catalog,
}

impl<'a> ScopeRegistry<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn grants(&self, scope: Scope, entity: &str, field: &str) -> bool {
        let Ok(def) = self.catalog.entity(entity) else {
            return false;
        };
        if scope == Scope::All {
            return true;
        }
        def.field(field)
            .map(|f| f.read.contains(&scope))
            .unwrap_or(false)
    }

    /// Every entity field readable with `scope`, in catalog order.
    pub fn exposures(&self, scope: Scope) -> Vec<Exposure> {
        let mut out = Vec::new();
        for def in self.catalog.entities.iter().copied() {
            for field in def.fields {
                if scope == Scope::All || field.read.contains(&scope) {
                    out.push(Exposure {
                        entity: def.name,
                        field: field.name,
                    });
                }
            }
        }
        out
    }

    pub fn writable_entities(&self, scope: Scope) -> Vec<&'static str> {
        self.catalog
            .entities
            .iter()
            .filter(|def| def.write_scopes.contains(&scope))
            .map(|def| def.name)
            .collect()
    }

    pub fn readable_entities(&self, scope: Scope) -> Vec<&'static str> {
        self.catalog
            .entities
            .iter()
            .filter(|def| def.read_scopes.contains(&scope))
            .map(|def| def.name)
            .collect()
    }
}
