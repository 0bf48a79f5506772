/// Persistence layer
///
/// Sites registry and append-only probe log stored in a local LibSQL file.

pub mod repository;
pub mod migrations;
pub mod models;

pub use models::{ChartPoint, LogRecord, NewSite, Site, SiteOverview};
pub use repository::{Database, DatabaseImpl};

use crate::Result;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}
