mod repository;

pub use repository::*;

/// SQL migration for initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// SQL migration for itemized debts
pub const MIGRATION_002_DEBTS: &str = include_str!("migrations/002_debts.sql");
