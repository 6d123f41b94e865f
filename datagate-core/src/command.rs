use datagate_codec::DataContract;
use datagate_models::domain::prelude::RpcCommandMetadata;
use datagate_error::RpcResult;

/// A typed database command.
///
/// Implementations pin the request/response contracts at the type level and
/// describe the execution target through [`RpcCommandMetadata`]. Registration
/// checks that the metadata descriptors actually name `Request`/`Response`,
/// so a dispatch can never pair a command with foreign contracts.
///
/// # Example
/// ```ignore
/// struct CreateOrderCommand;
///
/// impl RpcCommand for CreateOrderCommand {
///     type Request = CreateOrder;
///     type Response = OrderCreated;
///
///     fn metadata() -> RpcResult<RpcCommandMetadata> {
///         RpcCommandMetadata::builder(uuid!("8c32b19e-d4f0-4a57-9b0e-2f6c1d8a4e11"))
///             .procedure("api", "create_order")?
///             .request(ContractDescriptor::new(
///                 CreateOrder::contract_id(),
///                 MediaType::Json,
///             ))
///             .response(ContractDescriptor::new(
///                 OrderCreated::contract_id(),
///                 MediaType::Json,
///             ))
///             .build()
///     }
/// }
/// ```
pub trait RpcCommand: Send + Sync + 'static {
    type Request: DataContract;
    type Response: DataContract;

    /// Command metadata. Must be deterministic: every call returns the same
    /// logical value.
    fn metadata() -> RpcResult<RpcCommandMetadata>;
}
