mod health;
mod logs;
mod sites;

macros_utils::routes! {
    load health,
    load sites,
    load logs,
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use actix_web::web;
    use sitewatch_service::database::{Database, DatabaseImpl, initialize_database};
    use sitewatch_service::pool::open_pool;
    use tempfile::TempDir;

    /// Shared state backed by a fresh on-disk database
    pub async fn test_database() -> (web::Data<dyn Database>, Arc<dyn Database>, TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("server.db");

        let pool = open_pool(&db_path.to_string_lossy()).await.unwrap();
        initialize_database(&pool.get().await.unwrap()).await.unwrap();

        let database: Arc<dyn Database> = Arc::new(DatabaseImpl::new_from_pool(pool));
        (web::Data::from(database.clone()), database, temp_dir)
    }
}
