//! Stored-procedure invocation over sea-orm.

use async_trait::async_trait;
use bytes::Bytes;
use datagate_error::{rpc::RpcError, storage::StorageError, RpcResult};
use datagate_models::domain::prelude::{ContractPackage, MediaType, RpcCommandMetadata};
use datagate_models::RpcProvider;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr, Statement,
    TransactionTrait, Value,
};
use tracing::{debug, instrument};

/// Executes commands as single-transaction PostgreSQL function calls.
///
/// Per invocation:
/// 1. a transaction is opened with the command's isolation level;
/// 2. `SET LOCAL statement_timeout` makes the server enforce the command
///    timeout;
/// 3. the request payload is bound as `jsonb`, `text` or `bytea` per its
///    media type and the function is invoked as
///    `SELECT "schema"."proc"($1)`;
/// 4. the single response cell is read and the transaction committed.
///
/// Any error drops the transaction unfinished, which rolls it back.
/// Serialization conflicts (SQLSTATE 40001/40P01) and connection failures
/// surface as transient errors so the dispatcher's retry policy applies.
pub struct PgRpcProvider {
    db: DatabaseConnection,
}

impl PgRpcProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn call_procedure(
        &self,
        metadata: &RpcCommandMetadata,
        request: &ContractPackage,
    ) -> Result<Vec<u8>, RpcError> {
        let txn = self
            .db
            .begin_with_config(Some(metadata.isolation().into()), None)
            .await
            .map_err(classify_db_err)?;

        txn.execute(Statement::from_string(
            DbBackend::Postgres,
            format!(
                "SET LOCAL statement_timeout = {}",
                metadata.timeout().as_millis()
            ),
        ))
        .await
        .map_err(classify_db_err)?;

        let payload = self.fetch_response(&txn, metadata, request).await?;

        txn.commit().await.map_err(classify_db_err)?;
        Ok(payload)
    }

    async fn fetch_response(
        &self,
        txn: &DatabaseTransaction,
        metadata: &RpcCommandMetadata,
        request: &ContractPackage,
    ) -> Result<Vec<u8>, RpcError> {
        let procedure = metadata.procedure().full_name();
        let (cast, value) = bind_request(request)?;
        let sql = format!("SELECT {procedure}($1::{cast}) AS response");

        let rows = txn
            .query_all(Statement::from_sql_and_values(
                DbBackend::Postgres,
                &sql,
                [value],
            ))
            .await
            .map_err(classify_db_err)?;

        let row = match rows.len() {
            0 => {
                return Err(StorageError::ProcedureResult(format!(
                    "{} returned no rows",
                    metadata.procedure()
                ))
                .into());
            }
            1 => &rows[0],
            n => {
                return Err(StorageError::ProcedureResult(format!(
                    "{} returned {n} rows, expected exactly one",
                    metadata.procedure()
                ))
                .into());
            }
        };

        let payload = match metadata.response().media_type {
            MediaType::Json => {
                let value: serde_json::Value = row
                    .try_get("", "response")
                    .map_err(|e| procedure_result_err(metadata, e))?;
                serde_json::to_vec(&value).map_err(|e| {
                    RpcError::Provider(format!("response json re-encode failed: {e}"))
                })?
            }
            MediaType::Text => {
                let value: String = row
                    .try_get("", "response")
                    .map_err(|e| procedure_result_err(metadata, e))?;
                value.into_bytes()
            }
            MediaType::Postcard => row
                .try_get::<Vec<u8>>("", "response")
                .map_err(|e| procedure_result_err(metadata, e))?,
        };
        Ok(payload)
    }
}

#[async_trait]
impl RpcProvider for PgRpcProvider {
    #[instrument(name = "pg_invoke", skip_all, fields(command = %metadata.oid(), procedure = %metadata.procedure()))]
    async fn invoke(
        &self,
        metadata: &RpcCommandMetadata,
        request: ContractPackage,
    ) -> RpcResult<ContractPackage> {
        let payload = self.call_procedure(metadata, &request).await?;
        debug!(
            correlation = %request.correlation_id(),
            response_bytes = payload.len(),
            "Procedure call completed"
        );
        Ok(ContractPackage::reply(
            metadata.response().contract_id,
            metadata.response().media_type,
            Bytes::from(payload),
            request.correlation_id(),
        ))
    }
}

/// Bind the request payload as the SQL parameter matching its media type.
fn bind_request(request: &ContractPackage) -> Result<(&'static str, Value), RpcError> {
    let payload = request.payload();
    match request.media_type() {
        MediaType::Json => {
            let value: serde_json::Value = serde_json::from_slice(payload).map_err(|e| {
                RpcError::Provider(format!("request payload is not valid json: {e}"))
            })?;
            Ok(("jsonb", Value::Json(Some(Box::new(value)))))
        }
        MediaType::Text => {
            let value = std::str::from_utf8(payload).map_err(|e| {
                RpcError::Provider(format!("request payload is not valid UTF-8: {e}"))
            })?;
            Ok(("text", Value::String(Some(Box::new(value.to_string())))))
        }
        MediaType::Postcard => Ok((
            "bytea",
            Value::Bytes(Some(Box::new(payload.to_vec()))),
        )),
    }
}

fn procedure_result_err(metadata: &RpcCommandMetadata, e: DbErr) -> RpcError {
    StorageError::ProcedureResult(format!(
        "{} response column unreadable as '{}': {e}",
        metadata.procedure(),
        metadata.response().media_type
    ))
    .into()
}

/// Split database failures into transient (retry-worthy) and permanent.
fn classify_db_err(e: DbErr) -> RpcError {
    match &e {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => RpcError::Transient(e.to_string()),
        _ => {
            let msg = e.to_string();
            // SQLSTATE 40001 serialization_failure / 40P01 deadlock_detected
            if msg.contains("40001")
                || msg.contains("40P01")
                || msg.contains("serialization failure")
                || msg.contains("deadlock detected")
            {
                RpcError::Transient(msg)
            } else {
                RpcError::Provider(msg)
            }
        }
    }
}
