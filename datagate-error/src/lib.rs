pub mod codec;
pub mod init;
pub mod rpc;
pub mod storage;

use anyhow::Error as AnyhowError;
use codec::CodecError;
use config::ConfigError;
use init::InitContextError;
use rpc::RpcError;
use serde_json::Error as SerdeJsonError;
use std::{error::Error as StdError, io::Error as IoError};
use storage::StorageError;
use thiserror::Error;
use tokio::task::JoinError;

pub type DgResult<T, E = DgError> = Result<T, E>;
pub type CodecResult<T, E = CodecError> = Result<T, E>;
pub type RpcResult<T, E = RpcError> = Result<T, E>;
pub type StorageResult<T, E = StorageError> = Result<T, E>;

/// Top-level error for the datagate platform.
///
/// Concern-specific errors (`CodecError`, `RpcError`, `StorageError`,
/// `InitContextError`) fold into this type at crate boundaries; library code
/// keeps the specific type for as long as the concern is unambiguous.
#[derive(Error, Debug, Default)]
pub enum DgError {
    #[error("service unavailable")]
    #[default]
    ServiceUnavailable,
    #[error("{0}")]
    JoinError(#[from] JoinError),
    #[error("{0}")]
    StdError(#[from] Box<dyn StdError + Send + Sync>),
    #[error("{0}")]
    Msg(String),
    #[error("{0}")]
    IoError(#[from] IoError),
    #[error("{0}")]
    Anyhow(#[from] AnyhowError),
    #[error("{0}")]
    Json(#[from] SerdeJsonError),
    #[error("{0}")]
    ConfigError(#[from] ConfigError),
    #[error("{0}")]
    CodecError(#[from] CodecError),
    #[error("{0}")]
    RpcError(#[from] RpcError),
    #[error("{0}")]
    StorageError(#[from] StorageError),
    #[error("{0}")]
    InitContextError(#[from] InitContextError),
    #[error("Shutdown error: {0}")]
    ShutdownError(String),
    #[error("Unknown error")]
    None,
}

impl From<String> for DgError {
    #[inline]
    fn from(value: String) -> Self {
        Self::Msg(value)
    }
}

impl From<&str> for DgError {
    #[inline]
    fn from(value: &str) -> Self {
        Self::Msg(value.to_string())
    }
}
