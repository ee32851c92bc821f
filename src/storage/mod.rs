mod repository;
mod series;

pub use repository::*;
pub use series::*;

/// SQL migration for the initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");
