/// Database layer
///
/// LibSQL (local SQLite file) storage for monitors, check history, contact
/// lists and device tokens, exposed to the engine through the traits in
/// `crate::store`.

pub mod migrations;
pub mod models;
pub mod repository;

pub use repository::DatabaseImpl;

use anyhow::Result;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}
