use async_trait::async_trait;
use datagate_codec::{CodecRegistry, DataContract};
use datagate_core::{CommandRegistry, RpcCommand, RpcDispatcher};
use datagate_error::{rpc::RpcError, RpcResult};
use datagate_models::domain::prelude::{
    ContractDescriptor, ContractId, ContractPackage, MediaType, RpcCommandMetadata,
};
use datagate_models::retry::RetryPolicy;
use datagate_models::RpcProvider;
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc, Once,
};
use std::time::Duration;
use tracing::Level;
use uuid::Uuid;

static INIT_TRACING: Once = Once::new();

pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_target(false)
            .without_time()
            .try_init();
    });
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EchoRequest {
    pub text: String,
}

impl DataContract for EchoRequest {
    const CONTRACT_ID: ContractId = ContractId::from_u128(0xE001);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EchoReply {
    pub text: String,
    pub shouted: bool,
}

impl DataContract for EchoReply {
    const CONTRACT_ID: ContractId = ContractId::from_u128(0xE002);
}

pub struct EchoCommand;

impl RpcCommand for EchoCommand {
    type Request = EchoRequest;
    type Response = EchoReply;

    fn metadata() -> RpcResult<RpcCommandMetadata> {
        RpcCommandMetadata::builder(Uuid::from_u128(0xE100))
            .procedure("api", "echo")?
            .request(ContractDescriptor::new(
                EchoRequest::contract_id(),
                MediaType::Json,
            ))
            .response(ContractDescriptor::new(
                EchoReply::contract_id(),
                MediaType::Json,
            ))
            .build()
    }
}

pub struct RetryingEchoCommand;

impl RpcCommand for RetryingEchoCommand {
    type Request = EchoRequest;
    type Response = EchoReply;

    fn metadata() -> RpcResult<RpcCommandMetadata> {
        RpcCommandMetadata::builder(Uuid::from_u128(0xE101))
            .procedure("api", "echo_retrying")?
            .request(ContractDescriptor::new(
                EchoRequest::contract_id(),
                MediaType::Json,
            ))
            .response(ContractDescriptor::new(
                EchoReply::contract_id(),
                MediaType::Json,
            ))
            .retry(RetryPolicy {
                initial_interval_ms: 10,
                max_interval_ms: 50,
                ..RetryPolicy::with_max_attempts(3)
            })
            .build()
    }
}

pub struct SlowEchoCommand;

impl RpcCommand for SlowEchoCommand {
    type Request = EchoRequest;
    type Response = EchoReply;

    fn metadata() -> RpcResult<RpcCommandMetadata> {
        RpcCommandMetadata::builder(Uuid::from_u128(0xE102))
            .procedure("api", "echo_slow")?
            .request(ContractDescriptor::new(
                EchoRequest::contract_id(),
                MediaType::Json,
            ))
            .response(ContractDescriptor::new(
                EchoReply::contract_id(),
                MediaType::Json,
            ))
            .timeout(Duration::from_secs(1))
            .build()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transient,
    Permanent,
}

/// Provider double that answers the echo commands in-process.
///
/// Behavior is scripted per test: a number of leading failures, an optional
/// artificial delay, and optionally a response encoded under the wrong
/// contract.
pub struct ScriptedProvider {
    codecs: Arc<CodecRegistry>,
    failures: AtomicU32,
    failure_kind: FailureKind,
    delay: Option<Duration>,
    wrong_contract: bool,
    invocations: AtomicU32,
}

impl ScriptedProvider {
    pub fn new(codecs: Arc<CodecRegistry>) -> Self {
        Self {
            codecs,
            failures: AtomicU32::new(0),
            failure_kind: FailureKind::Transient,
            delay: None,
            wrong_contract: false,
            invocations: AtomicU32::new(0),
        }
    }

    pub fn with_failures(self, count: u32, kind: FailureKind) -> Self {
        self.failures.store(count, Ordering::SeqCst);
        Self {
            failure_kind: kind,
            ..self
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_wrong_contract(mut self) -> Self {
        self.wrong_contract = true;
        self
    }

    pub fn invocations(&self) -> u32 {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RpcProvider for ScriptedProvider {
    async fn invoke(
        &self,
        metadata: &RpcCommandMetadata,
        request: ContractPackage,
    ) -> RpcResult<ContractPackage> {
        self.invocations.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return match self.failure_kind {
                FailureKind::Transient => {
                    Err(RpcError::Transient("connection reset by peer".into()))
                }
                FailureKind::Permanent => {
                    Err(RpcError::Provider("relation does not exist".into()))
                }
            };
        }

        let echo: EchoRequest = self.codecs.deserialize(&request)?;
        if self.wrong_contract {
            // Answer with the request contract: the dispatcher must refuse it.
            let package = self.codecs.serialize(&echo)?;
            return Ok(package);
        }

        let reply = EchoReply {
            text: echo.text.to_uppercase(),
            shouted: true,
        };
        let package = self
            .codecs
            .serialize_as(&reply, metadata.response().media_type)?;
        Ok(ContractPackage::reply(
            package.contract_id(),
            package.media_type(),
            package.payload().clone(),
            request.correlation_id(),
        ))
    }
}

pub struct Harness {
    pub codecs: Arc<CodecRegistry>,
    pub commands: Arc<CommandRegistry>,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        let codecs = Arc::new(CodecRegistry::new());
        codecs.register::<EchoRequest>(MediaType::Json).unwrap();
        codecs.register::<EchoRequest>(MediaType::Postcard).unwrap();
        codecs.register::<EchoReply>(MediaType::Json).unwrap();
        let commands = Arc::new(CommandRegistry::new(Arc::clone(&codecs)));
        commands.register::<EchoCommand>().unwrap();
        commands.register::<RetryingEchoCommand>().unwrap();
        commands.register::<SlowEchoCommand>().unwrap();
        Self { codecs, commands }
    }

    pub fn dispatcher(&self, provider: Arc<ScriptedProvider>) -> RpcDispatcher {
        RpcDispatcher::new(
            Arc::clone(&self.codecs),
            Arc::clone(&self.commands),
            provider,
        )
    }

    pub fn provider(&self) -> ScriptedProvider {
        ScriptedProvider::new(Arc::clone(&self.codecs))
    }
}
