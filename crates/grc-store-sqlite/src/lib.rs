// crates/grc-store-sqlite/src/lib.rs
// ============================================================================
// Module: GRC SQLite Store
// Description: SQLite-backed persistence gateway for the GRC back office.
// Purpose: Own the schema and every entity read and write.
// Dependencies: grc-core, rusqlite, serde_json, time, uuid
// ============================================================================

//! ## Overview
//! [`SqliteGrcStore`] is the only component that touches the database. Each
//! entity family lives in its own module as an `impl SqliteGrcStore` block;
//! `store` owns connection setup, schema versioning, and row conversion
//! helpers. Operations that read then write (evidence submission, ticket
//! numbering, bulk import, partial updates) run inside one transaction.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod assets;
mod audit;
mod controls;
mod dashboard;
mod documents;
mod dsr;
mod notifications;
mod risks;
mod ropa;
mod schema;
pub mod seed;
pub mod store;
mod tickets;
mod users;
mod vendors;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use seed::SEED_PASSWORDS;
pub use seed::SEED_USERS;
pub use seed::SeedReport;
pub use seed::SeedUser;
pub use store::DEFAULT_BUSY_TIMEOUT_MS;
pub use store::SqliteGrcStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
