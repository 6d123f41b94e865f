use crate::codec::CodecError;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Command dispatch specific errors.
#[derive(Error, Debug)]
pub enum RpcError {
    /// No command registered under the requested oid
    #[error("unknown command: {0}")]
    UnknownCommand(Uuid),

    /// A command with this oid is already registered
    #[error("command {0} is already registered")]
    DuplicateCommand(Uuid),

    /// Another command already claims this procedure
    #[error("procedure '{procedure}' is already bound to command {command_oid}")]
    DuplicateProcedure { procedure: String, command_oid: Uuid },

    /// Command metadata failed validation
    #[error("invalid command metadata: {0}")]
    Metadata(String),

    /// A request/response descriptor refers to a contract the codec registry does not know
    #[error("command {command_oid} {side} descriptor is not registered: {reason}")]
    UnboundDescriptor {
        command_oid: Uuid,
        side: &'static str,
        reason: String,
    },

    /// Provider did not answer within the command timeout
    #[error("command {command_oid} timed out after {timeout:?}")]
    Timeout { command_oid: Uuid, timeout: Duration },

    /// Provider failure worth retrying (connection loss, serialization conflict)
    #[error("transient provider failure: {0}")]
    Transient(String),

    /// Provider failure that retrying cannot fix
    #[error("provider failure: {0}")]
    Provider(String),

    /// Serialization failed while preparing or completing a dispatch
    #[error("{0}")]
    Codec(#[from] CodecError),
}

impl RpcError {
    /// Whether the dispatcher's retry policy applies to this error.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<crate::storage::StorageError> for RpcError {
    fn from(value: crate::storage::StorageError) -> Self {
        match value {
            crate::storage::StorageError::StorageUnavailable => {
                RpcError::Transient(value.to_string())
            }
            other => RpcError::Provider(other.to_string()),
        }
    }
}
