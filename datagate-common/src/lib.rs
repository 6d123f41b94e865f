//! Process-wide application context and logging for datagate embedders.
//!
//! The context is optional plumbing: the registries and dispatcher work
//! without it. Embedders that want the platform to own settings loading,
//! logging, database lifetime and shutdown ordering initialize it once at
//! startup.

mod logger;

// Re-export error types
pub use datagate_error::{DgError, DgResult};

use datagate_models::{settings::Settings, DbManager};
use logger::Logger;
use once_cell::sync::OnceCell;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};

static APP_CONTEXT: OnceCell<RwLock<AppContext>> = OnceCell::new();

pub struct AppContext {
    /// Global settings
    settings: Settings,
    /// Global logger
    logger: Logger,
    /// Database manager, absent in standalone (no-database) mode
    db_manager: Option<Arc<dyn DbManager>>,
    /// Flag to prevent duplicate shutdowns
    shutting_down: AtomicBool,
    /// Shutdown token
    shutdown_token: CancellationToken,
}

impl AppContext {
    #[inline]
    pub async fn instance() -> RwLockReadGuard<'static, AppContext> {
        APP_CONTEXT
            .get()
            .expect("AppContext is not initialized")
            .read()
            .await
    }

    #[inline]
    pub async fn instance_mut() -> RwLockWriteGuard<'static, AppContext> {
        APP_CONTEXT
            .get()
            .expect("AppContext is not initialized")
            .write()
            .await
    }

    /// Initializes the global context with a database manager.
    ///
    /// Loads settings, starts the logger, and brings up the database manager.
    /// The instance is initialized exactly once.
    pub async fn init<D: DbManager + 'static>(config: String) -> DgResult<()> {
        let mut ctx = Self::build(config)?;
        let db_manager = D::init(&ctx.settings).await?;
        ctx.db_manager = Some(db_manager);
        info!("Database initialized successfully.");
        Self::install(ctx)
    }

    /// Initializes the global context without a database manager.
    ///
    /// For embedders that wire their own provider or only use the codec
    /// registry.
    pub async fn init_standalone(config: String) -> DgResult<()> {
        let ctx = Self::build(config)?;
        Self::install(ctx)
    }

    fn build(config: String) -> DgResult<AppContext> {
        let mut logger = Logger::new(if cfg!(debug_assertions) {
            Some(Level::DEBUG)
        } else {
            Some(Level::INFO)
        });

        let settings = Settings::new(config)?;
        logger.initialize(&settings.general.log_dir)?;

        Ok(AppContext {
            settings,
            logger,
            db_manager: None,
            shutting_down: AtomicBool::new(false),
            shutdown_token: CancellationToken::new(),
        })
    }

    fn install(ctx: AppContext) -> DgResult<()> {
        APP_CONTEXT
            .set(RwLock::new(ctx))
            .map_err(|_| DgError::from("AppContext is already initialized"))?;
        info!("AppContext initialized successfully.");
        Ok(())
    }

    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn db_manager(&self) -> DgResult<Arc<dyn DbManager>> {
        self.db_manager
            .as_ref()
            .cloned()
            .ok_or_else(|| DgError::from("database manager is not installed"))
    }

    #[inline]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    #[inline]
    pub fn log_level(&self) -> Level {
        self.logger.get_level()
    }

    #[inline]
    pub fn set_log_level(&self, level: Level) {
        self.logger.set_level(level);
    }

    /// Gracefully shuts the context down.
    ///
    /// Safe to call more than once; only the first call does work.
    pub async fn shutdown(&self) -> DgResult<()> {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Shutting down AppContext...");
        self.shutdown_token.cancel();
        if let Some(db) = &self.db_manager {
            db.close().await?;
        }
        info!("AppContext shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn standalone_context_lifecycle() {
        AppContext::init_standalone("does-not-exist.toml".to_string())
            .await
            .unwrap();

        let ctx = AppContext::instance().await;
        assert_eq!(ctx.settings().db.postgres.port, 5432);
        assert!(ctx.db_manager().is_err());

        ctx.set_log_level(Level::WARN);
        assert_eq!(ctx.log_level(), Level::WARN);

        let token = ctx.shutdown_token();
        assert!(!token.is_cancelled());
        ctx.shutdown().await.unwrap();
        assert!(token.is_cancelled());
        // Second shutdown is a no-op.
        ctx.shutdown().await.unwrap();

        // A second init must be rejected.
        drop(ctx);
        assert!(AppContext::init_standalone("x.toml".to_string())
            .await
            .is_err());
    }
}
