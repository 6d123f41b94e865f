//! Dispatches command invocations to a provider with timeout and retry.

use crate::command::RpcCommand;
use crate::commands::CommandRegistry;
use backoff::backoff::Backoff;
use datagate_codec::CodecRegistry;
use datagate_error::{codec::CodecError, rpc::RpcError, RpcResult};
use datagate_models::constants::CLIENT_TIMEOUT_GRACE_MS;
use datagate_models::domain::prelude::{ContractPackage, RpcCommandMetadata};
use datagate_models::retry::build_exponential_backoff;
use datagate_models::RpcProvider;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Routes command invocations to an [`RpcProvider`].
///
/// The dispatcher owns no transport state. Per invocation it resolves the
/// command metadata, encodes the request per the request descriptor, invokes
/// the provider under a client-side watchdog, retries transient failures per
/// the command's policy, and verifies the response package against the
/// response descriptor before decoding.
pub struct RpcDispatcher {
    codecs: Arc<CodecRegistry>,
    commands: Arc<CommandRegistry>,
    provider: Arc<dyn RpcProvider>,
}

impl RpcDispatcher {
    pub fn new(
        codecs: Arc<CodecRegistry>,
        commands: Arc<CommandRegistry>,
        provider: Arc<dyn RpcProvider>,
    ) -> Self {
        Self {
            codecs,
            commands,
            provider,
        }
    }

    #[inline]
    pub fn codecs(&self) -> &Arc<CodecRegistry> {
        &self.codecs
    }

    #[inline]
    pub fn commands(&self) -> &Arc<CommandRegistry> {
        &self.commands
    }

    /// Typed dispatch: encode, invoke, verify, decode.
    #[instrument(name = "rpc_dispatch", skip_all)]
    pub async fn dispatch<C: RpcCommand>(&self, request: C::Request) -> RpcResult<C::Response> {
        let oid = C::metadata()?.oid();
        let metadata = self.commands.get(oid)?;
        let package = self
            .codecs
            .serialize_as(&request, metadata.request().media_type)?;
        let response = self.invoke_with_retry(&metadata, package).await?;
        Ok(self.codecs.deserialize::<C::Response>(&response)?)
    }

    /// Package-level dispatch for callers holding only wire data.
    ///
    /// A request package whose media type differs from the registered request
    /// descriptor is transcoded; a different contract id is an error.
    #[instrument(name = "rpc_dispatch_package", skip_all, fields(command = %oid))]
    pub async fn dispatch_package(
        &self,
        oid: Uuid,
        request: ContractPackage,
    ) -> RpcResult<ContractPackage> {
        let metadata = self.commands.get(oid)?;
        let descriptor = metadata.request();
        if request.contract_id() != descriptor.contract_id {
            return Err(RpcError::Codec(CodecError::ContractMismatch {
                expected: descriptor.contract_id.as_uuid(),
                actual: request.contract_id().as_uuid(),
            }));
        }
        let request = if request.media_type() == descriptor.media_type {
            request
        } else {
            self.codecs.transcode(&request, descriptor.media_type)?
        };
        self.invoke_with_retry(&metadata, request).await
    }

    async fn invoke_with_retry(
        &self,
        metadata: &RpcCommandMetadata,
        request: ContractPackage,
    ) -> RpcResult<ContractPackage> {
        let oid = metadata.oid();
        // The server-side statement_timeout is authoritative; the watchdog
        // only has to catch hung connections, hence the grace.
        let budget = metadata.timeout() + Duration::from_millis(CLIENT_TIMEOUT_GRACE_MS);
        let policy = metadata.retry();
        let mut bo = build_exponential_backoff(policy);
        let mut attempt: u32 = 0;

        loop {
            let invocation = self.provider.invoke(metadata, request.clone());
            let outcome = match tokio::time::timeout(budget, invocation).await {
                Err(_) => {
                    return Err(RpcError::Timeout {
                        command_oid: oid,
                        timeout: budget,
                    });
                }
                Ok(outcome) => outcome,
            };

            match outcome {
                Ok(response) => {
                    Self::verify_response(metadata, &response)?;
                    debug!(
                        command = %oid,
                        correlation = %response.correlation_id(),
                        attempts = attempt + 1,
                        "Command dispatched"
                    );
                    return Ok(response);
                }
                Err(e) if e.is_transient() => {
                    attempt = attempt.saturating_add(1);
                    if let Some(max) = policy.max_attempts {
                        if attempt > max {
                            return Err(e);
                        }
                    }
                    let Some(delay) = bo.next_backoff() else {
                        return Err(e);
                    };
                    warn!(
                        command = %oid,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Command invocation retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// A response that does not match the response descriptor is a provider
    /// defect, never a pass-through.
    fn verify_response(metadata: &RpcCommandMetadata, response: &ContractPackage) -> RpcResult<()> {
        if response.matches(metadata.response()) {
            return Ok(());
        }
        Err(RpcError::Provider(format!(
            "command {} response package carries {} but the command declares {}",
            metadata.oid(),
            response.descriptor(),
            metadata.response()
        )))
    }
}
