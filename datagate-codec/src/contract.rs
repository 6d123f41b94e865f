use datagate_models::domain::prelude::ContractId;
use serde::{de::DeserializeOwned, Serialize};

/// A serializable type with a stable, globally unique identity.
///
/// The identity outlives refactors: renaming or moving the Rust type must
/// not change `CONTRACT_ID` once the contract has been published.
///
/// # Example
/// ```
/// use datagate_codec::DataContract;
/// use datagate_models::domain::prelude::ContractId;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct CreateOrder {
///     customer: String,
///     quantity: u32,
/// }
///
/// impl DataContract for CreateOrder {
///     const CONTRACT_ID: ContractId =
///         ContractId::from_u128(0x3f8a_1c2e_9b4d_4f6a_8e21_7c5b_0a93_d417);
/// }
/// ```
pub trait DataContract: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable contract identity.
    const CONTRACT_ID: ContractId;

    #[inline]
    fn contract_id() -> ContractId {
        Self::CONTRACT_ID
    }

    /// Human-readable name used in logs and the contract catalog.
    #[inline]
    fn contract_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}
