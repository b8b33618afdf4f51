//! Data and admin plugins layered on the core engine.
//!
//! - [`jisc`]: the JISC UDD entity catalog
//! - [`clients`]: API client credentials and caller resolution

pub mod clients;
pub mod jisc;
