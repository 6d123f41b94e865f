pub mod command;
pub mod contract;

pub mod prelude {
    pub use super::command::{
        IsolationLevel, ProcedureRef, RpcCommandMetadata, RpcCommandMetadataBuilder,
    };
    pub use super::contract::{
        ContractDescriptor, ContractId, ContractPackage, MediaType, WirePackage,
    };
}
