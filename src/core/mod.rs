//! The generic engine.
//!
//! Nothing here knows about JISC: entity types arrive as static tables
//! ([`model::Catalog`]) and every module is driven by them.

pub mod broker;
pub mod config;
pub mod db;
pub mod document;
pub mod error;
pub mod field_scope;
pub mod model;
pub mod org_scope;
pub mod pipeline;
pub mod pool;
pub mod relations;
pub mod repository;
pub mod schemas;
pub mod scope;
pub mod soft_delete;
pub mod store;
pub mod time;
pub mod validate;
