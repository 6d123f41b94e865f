//! Live PostgreSQL round trip.
//!
//! Requires a reachable database; configure with `DG__DB__POSTGRES__*`
//! environment variables (host, user, password, dbname). Run with
//! `cargo test -p datagate-storage -- --ignored`.

use datagate_codec::{CodecRegistry, DataContract};
use datagate_core::{CommandRegistry, RpcCommand, RpcDispatcher};
use datagate_error::RpcResult;
use datagate_models::constants::DEFAULT_CONFIG_FILE_NAME;
use datagate_models::domain::prelude::{
    ContractDescriptor, ContractId, IsolationLevel, MediaType, RpcCommandMetadata,
};
use datagate_models::{settings::Settings, DbManager};
use datagate_storage::{PgDbManager, PgRpcProvider};
use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Once};
use tracing::Level;
use uuid::Uuid;

static INIT_TRACING: Once = Once::new();

fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_target(false)
            .without_time()
            .try_init();
    });
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct EchoRequest {
    text: String,
}

impl DataContract for EchoRequest {
    const CONTRACT_ID: ContractId = ContractId::from_u128(0xF001);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct EchoReply {
    text: String,
    shouted: bool,
}

impl DataContract for EchoReply {
    const CONTRACT_ID: ContractId = ContractId::from_u128(0xF002);
}

struct EchoUpperCommand;

impl RpcCommand for EchoUpperCommand {
    type Request = EchoRequest;
    type Response = EchoReply;

    fn metadata() -> RpcResult<RpcCommandMetadata> {
        RpcCommandMetadata::builder(Uuid::from_u128(0xF100))
            .procedure("dg_test", "echo_upper")?
            .request(ContractDescriptor::new(
                EchoRequest::contract_id(),
                MediaType::Json,
            ))
            .response(ContractDescriptor::new(
                EchoReply::contract_id(),
                MediaType::Json,
            ))
            .isolation(IsolationLevel::ReadCommitted)
            .build()
    }
}

#[tokio::test]
#[ignore]
async fn postgres_echo_round_trip() {
    init_tracing();

    let settings = Settings::new(DEFAULT_CONFIG_FILE_NAME.to_string()).unwrap();
    let manager = PgDbManager::init(&settings).await.unwrap();
    let db = manager.get_connection().unwrap();

    db.execute_unprepared("CREATE SCHEMA IF NOT EXISTS dg_test")
        .await
        .unwrap();
    db.execute_unprepared(
        r#"
        CREATE OR REPLACE FUNCTION dg_test.echo_upper(req jsonb) RETURNS jsonb
        LANGUAGE sql AS $$
            SELECT jsonb_build_object('text', upper(req->>'text'), 'shouted', true)
        $$
        "#,
    )
    .await
    .unwrap();

    let codecs = Arc::new(CodecRegistry::new());
    codecs.register::<EchoRequest>(MediaType::Json).unwrap();
    codecs.register::<EchoReply>(MediaType::Json).unwrap();
    let commands = Arc::new(CommandRegistry::new(Arc::clone(&codecs)));
    commands.register::<EchoUpperCommand>().unwrap();

    let provider = Arc::new(PgRpcProvider::new(db.clone()));
    let dispatcher = RpcDispatcher::new(codecs, commands, provider);

    let reply = dispatcher
        .dispatch::<EchoUpperCommand>(EchoRequest {
            text: "postgres".into(),
        })
        .await
        .unwrap();
    assert_eq!(
        reply,
        EchoReply {
            text: "POSTGRES".into(),
            shouted: true
        }
    );

    db.execute_unprepared("DROP SCHEMA dg_test CASCADE")
        .await
        .unwrap();
    manager.close().await.unwrap();
}
