//! Command metadata: which procedure a command maps to, under which
//! transaction settings, exchanging which contracts.

use crate::constants::{DEFAULT_COMMAND_TIMEOUT_MS, MAX_COMMAND_TIMEOUT_MS, MAX_IDENT_LEN};
use crate::domain::contract::ContractDescriptor;
use crate::retry::RetryPolicy;
use datagate_error::{rpc::RpcError, RpcResult};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::fmt::{Display, Formatter};
use std::time::Duration;
use uuid::Uuid;

/// Transaction isolation a command runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize_repr, Deserialize_repr)]
#[repr(i16)]
pub enum IsolationLevel {
    #[default]
    ReadCommitted = 0,
    RepeatableRead = 1,
    Serializable = 2,
}

impl IsolationLevel {
    pub const fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

impl From<IsolationLevel> for sea_orm::IsolationLevel {
    fn from(value: IsolationLevel) -> Self {
        match value {
            IsolationLevel::ReadCommitted => sea_orm::IsolationLevel::ReadCommitted,
            IsolationLevel::RepeatableRead => sea_orm::IsolationLevel::RepeatableRead,
            IsolationLevel::Serializable => sea_orm::IsolationLevel::Serializable,
        }
    }
}

/// Validated reference to a PostgreSQL function.
///
/// Both parts must be lower_snake identifiers within the PostgreSQL length
/// limit, so the rendered form can be quoted verbatim into a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcedureRef {
    schema: String,
    name: String,
}

impl ProcedureRef {
    pub fn new(schema: &str, name: &str) -> RpcResult<Self> {
        validate_ident("schema", schema)?;
        validate_ident("procedure name", name)?;
        Ok(Self {
            schema: schema.to_string(),
            name: name.to_string(),
        })
    }

    #[inline]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Quoted, schema-qualified form safe to splice into a statement.
    pub fn full_name(&self) -> String {
        format!("\"{}\".\"{}\"", self.schema, self.name)
    }
}

impl Display for ProcedureRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

fn validate_ident(what: &str, value: &str) -> RpcResult<()> {
    if value.is_empty() {
        return Err(RpcError::Metadata(format!("{what} must not be empty")));
    }
    if value.len() > MAX_IDENT_LEN {
        return Err(RpcError::Metadata(format!(
            "{what} '{value}' exceeds {MAX_IDENT_LEN} characters"
        )));
    }
    let mut chars = value.chars();
    let first = chars.next().unwrap_or('\0');
    if !(first.is_ascii_lowercase() || first == '_') {
        return Err(RpcError::Metadata(format!(
            "{what} '{value}' must start with a lowercase letter or underscore"
        )));
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        return Err(RpcError::Metadata(format!(
            "{what} '{value}' may only contain lowercase letters, digits and underscores"
        )));
    }
    Ok(())
}

/// Resolved description of one database command.
///
/// Immutable once built; every field is validated by the builder. The oid is
/// the dispatch key, the procedure is the execution target, and the two
/// descriptors pin the exact wire encoding of both exchange sides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcCommandMetadata {
    oid: Uuid,
    procedure: ProcedureRef,
    request: ContractDescriptor,
    response: ContractDescriptor,
    isolation: IsolationLevel,
    timeout: Duration,
    retry: RetryPolicy,
}

impl RpcCommandMetadata {
    pub fn builder(oid: Uuid) -> RpcCommandMetadataBuilder {
        RpcCommandMetadataBuilder::new(oid)
    }

    #[inline]
    pub const fn oid(&self) -> Uuid {
        self.oid
    }

    #[inline]
    pub fn procedure(&self) -> &ProcedureRef {
        &self.procedure
    }

    #[inline]
    pub const fn request(&self) -> &ContractDescriptor {
        &self.request
    }

    #[inline]
    pub const fn response(&self) -> &ContractDescriptor {
        &self.response
    }

    #[inline]
    pub const fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    #[inline]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    #[inline]
    pub const fn retry(&self) -> &RetryPolicy {
        &self.retry
    }
}

/// Builder enforcing the metadata invariants.
#[derive(Debug)]
pub struct RpcCommandMetadataBuilder {
    oid: Uuid,
    procedure: Option<ProcedureRef>,
    request: Option<ContractDescriptor>,
    response: Option<ContractDescriptor>,
    isolation: IsolationLevel,
    timeout: Duration,
    retry: RetryPolicy,
}

impl RpcCommandMetadataBuilder {
    pub fn new(oid: Uuid) -> Self {
        Self {
            oid,
            procedure: None,
            request: None,
            response: None,
            isolation: IsolationLevel::default(),
            timeout: Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS),
            retry: RetryPolicy::no_retry(),
        }
    }

    pub fn procedure(mut self, schema: &str, name: &str) -> RpcResult<Self> {
        self.procedure = Some(ProcedureRef::new(schema, name)?);
        Ok(self)
    }

    pub fn request(mut self, descriptor: ContractDescriptor) -> Self {
        self.request = Some(descriptor);
        self
    }

    pub fn response(mut self, descriptor: ContractDescriptor) -> Self {
        self.response = Some(descriptor);
        self
    }

    pub fn isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn build(self) -> RpcResult<RpcCommandMetadata> {
        if self.oid.is_nil() {
            return Err(RpcError::Metadata("command oid must not be nil".into()));
        }
        let procedure = self
            .procedure
            .ok_or_else(|| RpcError::Metadata("procedure is required".into()))?;
        let request = self
            .request
            .ok_or_else(|| RpcError::Metadata("request descriptor is required".into()))?;
        let response = self
            .response
            .ok_or_else(|| RpcError::Metadata("response descriptor is required".into()))?;
        if self.timeout.is_zero() {
            return Err(RpcError::Metadata("timeout must be positive".into()));
        }
        if self.timeout > Duration::from_millis(MAX_COMMAND_TIMEOUT_MS) {
            return Err(RpcError::Metadata(format!(
                "timeout {:?} exceeds the {MAX_COMMAND_TIMEOUT_MS}ms ceiling",
                self.timeout
            )));
        }
        Ok(RpcCommandMetadata {
            oid: self.oid,
            procedure,
            request,
            response,
            isolation: self.isolation,
            timeout: self.timeout,
            retry: self.retry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contract::{ContractId, MediaType};

    fn descriptor() -> ContractDescriptor {
        ContractDescriptor::new(ContractId::from_u128(7), MediaType::Json)
    }

    #[test]
    fn procedure_ref_accepts_valid_identifiers() {
        let p = ProcedureRef::new("api", "create_order_v2").unwrap();
        assert_eq!(p.full_name(), "\"api\".\"create_order_v2\"");
        assert!(ProcedureRef::new("_private", "x").is_ok());
    }

    #[test]
    fn procedure_ref_rejects_invalid_identifiers() {
        assert!(ProcedureRef::new("", "proc").is_err());
        assert!(ProcedureRef::new("api", "Proc").is_err());
        assert!(ProcedureRef::new("api", "drop table").is_err());
        assert!(ProcedureRef::new("api", "proc\"; --").is_err());
        assert!(ProcedureRef::new("api", &"p".repeat(64)).is_err());
    }

    #[test]
    fn builder_enforces_required_fields() {
        let oid = Uuid::from_u128(42);
        assert!(RpcCommandMetadata::builder(oid).build().is_err());

        let meta = RpcCommandMetadata::builder(oid)
            .procedure("api", "echo")
            .unwrap()
            .request(descriptor())
            .response(descriptor())
            .build()
            .unwrap();
        assert_eq!(meta.oid(), oid);
        assert_eq!(meta.isolation(), IsolationLevel::ReadCommitted);
        assert_eq!(meta.timeout(), Duration::from_millis(30_000));
    }

    #[test]
    fn builder_rejects_nil_oid_and_bad_timeouts() {
        let build = |oid: Uuid, timeout: Duration| {
            RpcCommandMetadata::builder(oid)
                .procedure("api", "echo")
                .unwrap()
                .request(descriptor())
                .response(descriptor())
                .timeout(timeout)
                .build()
        };
        assert!(build(Uuid::nil(), Duration::from_secs(1)).is_err());
        assert!(build(Uuid::from_u128(1), Duration::ZERO).is_err());
        assert!(build(Uuid::from_u128(1), Duration::from_secs(601)).is_err());
        assert!(build(Uuid::from_u128(1), Duration::from_secs(600)).is_ok());
    }
}
