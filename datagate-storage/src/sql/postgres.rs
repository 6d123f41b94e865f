use datagate_error::{storage::StorageError, DgResult};
use datagate_models::settings::Postgres;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::{info, instrument, log::LevelFilter};

#[instrument(name = "init_postgres_db", skip_all)]
/// Initialize the PostgreSQL connection pool from settings.
pub async fn init_db(config: &Postgres) -> DgResult<DatabaseConnection> {
    let database_url = config.to_url();

    let mut opts = ConnectOptions::new(&database_url);
    opts.connect_timeout(Duration::from_millis(config.timeout))
        .idle_timeout(Duration::from_millis(config.idle_timeout))
        .max_lifetime(Duration::from_millis(config.max_lifetime))
        .max_connections(config.max_connections)
        .min_connections(config.min_connections);

    #[cfg(debug_assertions)]
    {
        opts.sqlx_logging(true)
            .sqlx_logging_level(LevelFilter::Info);
    }
    #[cfg(not(debug_assertions))]
    {
        opts.sqlx_logging(false)
            .sqlx_logging_level(LevelFilter::Off);
    }

    info!(
        "Connecting to PostgreSQL database at {}:{}/{} (pool {}..{})",
        config.host, config.port, config.dbname, config.min_connections, config.max_connections
    );

    let db = Database::connect(opts).await.map_err(StorageError::DBError)?;
    Ok(db)
}
