use thiserror::Error;

#[derive(Error, Debug, Default)]
pub enum StorageError {
    #[error("database unavailable")]
    #[default]
    StorageUnavailable,

    #[error("database error: `{0}`")]
    DBError(#[from] sea_orm::DbErr),

    /// Procedure produced a result the provider cannot interpret
    /// (no rows, multiple rows, or a payload column of the wrong type).
    #[error("procedure result error: {0}")]
    ProcedureResult(String),

    #[error("unsupported database backend: {0}")]
    UnsupportedBackend(String),
}
