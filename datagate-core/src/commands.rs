//! Command registry: oid -> validated metadata.

use crate::command::RpcCommand;
use dashmap::DashMap;
use datagate_codec::{CodecRegistry, DataContract};
use datagate_error::{codec::CodecError, rpc::RpcError, RpcResult};
use datagate_models::domain::prelude::{ContractDescriptor, RpcCommandMetadata};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Registry of dispatchable commands.
///
/// Every registration is validated against the codec registry: both exchange
/// descriptors must resolve to a registered codec, and the descriptors must
/// name the command's own `Request`/`Response` contracts. Oids and procedure
/// names are both unique across the registry.
pub struct CommandRegistry {
    codecs: Arc<CodecRegistry>,
    commands: DashMap<Uuid, Arc<RpcCommandMetadata>>,
    /// procedure full name -> owning command oid
    procedures: DashMap<String, Uuid>,
}

impl CommandRegistry {
    pub fn new(codecs: Arc<CodecRegistry>) -> Self {
        Self {
            codecs,
            commands: DashMap::new(),
            procedures: DashMap::new(),
        }
    }

    #[inline]
    pub fn codecs(&self) -> &Arc<CodecRegistry> {
        &self.codecs
    }

    /// Register a typed command.
    pub fn register<C: RpcCommand>(&self) -> RpcResult<Arc<RpcCommandMetadata>> {
        let metadata = C::metadata()?;
        let oid = metadata.oid();

        if metadata.request().contract_id != C::Request::contract_id() {
            return Err(RpcError::Metadata(format!(
                "command {oid} request descriptor names contract {}, but the command type exchanges {}",
                metadata.request().contract_id,
                C::Request::contract_id()
            )));
        }
        if metadata.response().contract_id != C::Response::contract_id() {
            return Err(RpcError::Metadata(format!(
                "command {oid} response descriptor names contract {}, but the command type exchanges {}",
                metadata.response().contract_id,
                C::Response::contract_id()
            )));
        }
        self.validate_descriptor(oid, "request", metadata.request())?;
        self.validate_descriptor(oid, "response", metadata.response())?;

        if self.commands.contains_key(&oid) {
            return Err(RpcError::DuplicateCommand(oid));
        }
        let procedure = metadata.procedure().to_string();
        if let Some(owner) = self.procedures.get(&procedure) {
            return Err(RpcError::DuplicateProcedure {
                procedure,
                command_oid: *owner.value(),
            });
        }

        let metadata = Arc::new(metadata);
        self.commands.insert(oid, Arc::clone(&metadata));
        self.procedures.insert(procedure, oid);

        info!(
            command = %oid,
            procedure = %metadata.procedure(),
            request = %metadata.request(),
            response = %metadata.response(),
            "Registered command"
        );
        Ok(metadata)
    }

    /// Resolve a command by oid.
    pub fn get(&self, oid: Uuid) -> RpcResult<Arc<RpcCommandMetadata>> {
        self.commands
            .get(&oid)
            .map(|r| Arc::clone(r.value()))
            .ok_or(RpcError::UnknownCommand(oid))
    }

    /// Resolve a command by its procedure full name.
    pub fn get_by_procedure(&self, procedure: &str) -> RpcResult<Arc<RpcCommandMetadata>> {
        let oid = self
            .procedures
            .get(procedure)
            .map(|r| *r.value())
            .ok_or_else(|| RpcError::Metadata(format!("no command bound to '{procedure}'")))?;
        self.get(oid)
    }

    /// Snapshot of all registered commands.
    pub fn commands(&self) -> Vec<Arc<RpcCommandMetadata>> {
        let mut all: Vec<_> = self
            .commands
            .iter()
            .map(|kv| Arc::clone(kv.value()))
            .collect();
        all.sort_unstable_by_key(|m| m.oid());
        all
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Re-check every stored command against the codec registry.
    ///
    /// Useful after late codec registration changes, before serving traffic.
    pub fn verify_integrity(&self) -> RpcResult<()> {
        for kv in self.commands.iter() {
            let metadata = kv.value();
            self.validate_descriptor(metadata.oid(), "request", metadata.request())?;
            self.validate_descriptor(metadata.oid(), "response", metadata.response())?;
        }
        Ok(())
    }

    fn validate_descriptor(
        &self,
        command_oid: Uuid,
        side: &'static str,
        descriptor: &ContractDescriptor,
    ) -> RpcResult<()> {
        self.codecs
            .ensure_registered(descriptor)
            .map_err(|e: CodecError| RpcError::UnboundDescriptor {
                command_oid,
                side,
                reason: e.to_string(),
            })
    }
}
