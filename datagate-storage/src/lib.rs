//! PostgreSQL backing for the datagate platform: connection management and
//! the stored-procedure RPC provider.

mod provider;
mod sql;

pub use provider::PgRpcProvider;

use async_trait::async_trait;
use datagate_error::{init::InitContextError, storage::StorageError, DgResult};
use datagate_models::{settings::Settings, DbManager};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{info, instrument};

/// Global database manager struct
pub struct PgDbManager {
    db_conn: Option<DatabaseConnection>,
}

#[async_trait]
impl DbManager for PgDbManager {
    #[inline]
    #[instrument(name = "init-db-manager", skip_all)]
    async fn init(settings: &Settings) -> DgResult<Arc<Self>, InitContextError> {
        let db_conn = sql::postgres::init_db(&settings.db.postgres)
            .await
            .map_err(|e| {
                InitContextError::Primitive(format!("Failed to init PostgreSQL database: {e}"))
            })?;

        let db_manager = Arc::new(PgDbManager {
            db_conn: Some(db_conn),
        });

        info!("Database manager initialized successfully");
        Ok(db_manager)
    }

    #[inline]
    fn get_connection(&self) -> DgResult<DatabaseConnection, StorageError> {
        self.db_conn
            .as_ref()
            .ok_or(StorageError::StorageUnavailable)
            .cloned()
    }

    #[inline]
    #[instrument(name = "db_close", skip_all)]
    async fn close(&self) -> DgResult<()> {
        info!("Closing database connections...");
        if let Some(db) = &self.db_conn {
            db.clone().close().await.map_err(StorageError::DBError)?;
        }
        info!("Database connections closed successfully");
        Ok(())
    }
}
