use thiserror::Error;
use uuid::Uuid;

/// Classifies serialization-registry errors to avoid ad-hoc strings.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Media type string is not one the platform understands
    #[error("unknown media type: {0}")]
    UnknownMediaType(String),

    /// A codec is already registered under this (contract, media type) key
    #[error("codec already registered for contract {contract_id} as '{media_type}'")]
    DuplicateCodec { contract_id: Uuid, media_type: String },

    /// No codec registered under the requested (contract, media type) key
    #[error("no codec registered for contract {contract_id} as '{media_type}'")]
    NotRegistered { contract_id: Uuid, media_type: String },

    /// Contract has no registered codec at all
    #[error("contract {0} is not registered")]
    UnknownContract(Uuid),

    /// Package carries a different contract than the caller requested
    #[error("contract mismatch: package carries {actual}, expected {expected}")]
    ContractMismatch { expected: Uuid, actual: Uuid },

    /// Value could not be encoded for the target media type
    #[error("encode failed for contract {contract_id}: {reason}")]
    Encode { contract_id: Uuid, reason: String },

    /// Payload bytes could not be decoded as the registered contract
    #[error("decode failed for contract {contract_id}: {reason}")]
    Decode { contract_id: Uuid, reason: String },

    /// Wire envelope violated its schema (version, payload text, field shape)
    #[error("wire envelope error: {0}")]
    Wire(String),
}
