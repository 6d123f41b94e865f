//! Data-contract codec registry.
//!
//! Maps (contract id, media type) pairs to codec implementations and resolves
//! the default media type per contract. All serialization in the platform
//! goes through a [`CodecRegistry`], so every payload that leaves a process
//! is traceable to a registered contract.

mod codecs;
mod contract;
mod registry;

pub use contract::DataContract;
pub use registry::{CodecRegistry, ContractCatalogEntry};
