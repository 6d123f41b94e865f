pub mod constants;
pub mod domain;
pub mod retry;
pub mod settings;

use crate::domain::prelude::{ContractPackage, RpcCommandMetadata};
use async_trait::async_trait;
use datagate_error::{init::InitContextError, storage::StorageError, DgResult, RpcResult};
use downcast_rs::{impl_downcast, DowncastSync};
use sea_orm::DatabaseConnection;
use settings::Settings;
use std::sync::Arc;

impl_downcast!(sync DbManager);
impl_downcast!(sync RpcProvider);

/// Database management interface for the datagate platform.
///
/// This trait defines the core database operations including initialization,
/// connection management, and cleanup.
#[async_trait]
pub trait DbManager: DowncastSync + Send + Sync + 'static {
    /// Initializes the database manager with the provided settings.
    ///
    /// # Arguments
    /// * `settings` - The platform configuration settings
    ///
    /// # Returns
    /// An Arc-wrapped instance of the database manager
    async fn init(settings: &Settings) -> DgResult<Arc<Self>, InitContextError>
    where
        Self: Sized;

    /// Retrieves a database connection from the connection pool.
    fn get_connection(&self) -> DgResult<DatabaseConnection, StorageError>;

    /// Gracefully closes all database connections and performs cleanup.
    async fn close(&self) -> DgResult<()>;
}

/// Backend that executes a single command invocation.
///
/// The dispatcher hands the provider a fully resolved command metadata and a
/// request package already encoded per the request descriptor. The provider
/// answers with a package matching the response descriptor, or an `RpcError`
/// classified as transient (retry applies) or permanent.
#[async_trait]
pub trait RpcProvider: DowncastSync + Send + Sync + 'static {
    async fn invoke(
        &self,
        metadata: &RpcCommandMetadata,
        request: ContractPackage,
    ) -> RpcResult<ContractPackage>;
}
