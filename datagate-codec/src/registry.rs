//! Codec registry keyed by (contract id, media type).

use crate::{codecs, contract::DataContract};
use arc_swap::ArcSwap;
use bytes::Bytes;
use dashmap::{mapref::entry::Entry as DashEntry, DashMap};
use datagate_error::{codec::CodecError, CodecResult};
use datagate_models::domain::prelude::{
    ContractDescriptor, ContractId, ContractPackage, MediaType,
};
use std::any::Any;
use std::sync::Arc;
use tracing::debug;

type ErasedValue = Box<dyn Any + Send + Sync>;
type EncodeFn = dyn Fn(&(dyn Any + Send + Sync)) -> CodecResult<Bytes> + Send + Sync;
type DecodeFn = dyn Fn(&[u8]) -> CodecResult<ErasedValue> + Send + Sync;

/// One registered (contract, media type) pair.
struct CodecEntry {
    contract_name: &'static str,
    encode: Box<EncodeFn>,
    decode: Box<DecodeFn>,
}

/// Catalog row describing one registered codec, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCatalogEntry {
    pub contract_id: ContractId,
    pub media_type: MediaType,
    pub contract_name: &'static str,
    pub is_default: bool,
}

/// Registry mapping (contract id, media type) pairs to codecs.
///
/// Invariants:
/// - at most one codec per key; re-registration is an error
/// - every contract with any registration has a default media type, and the
///   default always refers to a registered key
///
/// The first registration for a contract fixes its default media type;
/// [`CodecRegistry::set_default`] may re-point it to another registered key.
pub struct CodecRegistry {
    entries: DashMap<(ContractId, MediaType), Arc<CodecEntry>>,
    defaults: DashMap<ContractId, MediaType>,
    /// Sorted snapshot of all registrations, rebuilt on every mutation so
    /// read-side enumeration never walks the maps.
    catalog: ArcSwap<Vec<ContractCatalogEntry>>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            defaults: DashMap::new(),
            catalog: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Register a codec for `T` under `media_type`.
    ///
    /// The first registration for a contract also becomes its default
    /// media type.
    pub fn register<T: DataContract>(&self, media_type: MediaType) -> CodecResult<()> {
        let contract_id = T::contract_id();
        let entry = CodecEntry {
            contract_name: T::contract_name(),
            encode: Box::new(move |any| {
                let value = any.downcast_ref::<T>().ok_or_else(|| CodecError::Encode {
                    contract_id: contract_id.as_uuid(),
                    reason: "value does not have the registered contract type".to_string(),
                })?;
                codecs::encode::<T>(media_type, value)
            }),
            decode: Box::new(move |bytes| {
                let value = codecs::decode::<T>(media_type, bytes)?;
                Ok(Box::new(value) as ErasedValue)
            }),
        };

        match self.entries.entry((contract_id, media_type)) {
            DashEntry::Occupied(_) => {
                return Err(CodecError::DuplicateCodec {
                    contract_id: contract_id.as_uuid(),
                    media_type: media_type.to_string(),
                });
            }
            DashEntry::Vacant(vacant) => {
                vacant.insert(Arc::new(entry));
            }
        }
        self.defaults.entry(contract_id).or_insert(media_type);
        self.rebuild_catalog();

        debug!(
            contract = %contract_id,
            media_type = %media_type,
            name = T::contract_name(),
            "Registered codec"
        );
        Ok(())
    }

    /// Re-point the default media type of `T` to an already-registered key.
    pub fn set_default<T: DataContract>(&self, media_type: MediaType) -> CodecResult<()> {
        let contract_id = T::contract_id();
        if !self.entries.contains_key(&(contract_id, media_type)) {
            return Err(CodecError::NotRegistered {
                contract_id: contract_id.as_uuid(),
                media_type: media_type.to_string(),
            });
        }
        self.defaults.insert(contract_id, media_type);
        self.rebuild_catalog();
        Ok(())
    }

    /// Default media type of a contract.
    pub fn default_media_type(&self, contract_id: ContractId) -> CodecResult<MediaType> {
        self.defaults
            .get(&contract_id)
            .map(|r| *r.value())
            .ok_or(CodecError::UnknownContract(contract_id.as_uuid()))
    }

    /// Serialize a value using the contract's default media type.
    pub fn serialize<T: DataContract>(&self, value: &T) -> CodecResult<ContractPackage> {
        let media_type = self.default_media_type(T::contract_id())?;
        self.serialize_as(value, media_type)
    }

    /// Serialize a value using an explicit media type.
    pub fn serialize_as<T: DataContract>(
        &self,
        value: &T,
        media_type: MediaType,
    ) -> CodecResult<ContractPackage> {
        let contract_id = T::contract_id();
        // Registration is required even though the typed path could encode
        // directly; unregistered contracts must not produce packages.
        self.lookup(contract_id, media_type)?;
        let payload = codecs::encode::<T>(media_type, value)?;
        Ok(ContractPackage::new(contract_id, media_type, payload))
    }

    /// Deserialize a package into `T`.
    ///
    /// Rejects packages carrying a different contract id before touching the
    /// payload.
    pub fn deserialize<T: DataContract>(&self, package: &ContractPackage) -> CodecResult<T> {
        let expected = T::contract_id();
        if package.contract_id() != expected {
            return Err(CodecError::ContractMismatch {
                expected: expected.as_uuid(),
                actual: package.contract_id().as_uuid(),
            });
        }
        self.lookup(expected, package.media_type())?;
        codecs::decode::<T>(package.media_type(), package.payload())
    }

    /// Decode a package through its registered codec without static type
    /// knowledge. Callers downcast the result or hand it to an erased sink.
    pub fn decode_erased(&self, package: &ContractPackage) -> CodecResult<ErasedValue> {
        let entry = self.lookup(package.contract_id(), package.media_type())?;
        (entry.decode)(package.payload())
    }

    /// Re-encode a package under another registered media type for the same
    /// contract. Correlation id is preserved.
    pub fn transcode(
        &self,
        package: &ContractPackage,
        target: MediaType,
    ) -> CodecResult<ContractPackage> {
        if package.media_type() == target {
            return Ok(package.clone());
        }
        let source = self.lookup(package.contract_id(), package.media_type())?;
        let sink = self.lookup(package.contract_id(), target)?;
        let value = (source.decode)(package.payload())?;
        let payload = (sink.encode)(value.as_ref())?;
        Ok(ContractPackage::reply(
            package.contract_id(),
            target,
            payload,
            package.correlation_id(),
        ))
    }

    /// Pick a media type for `contract_id` out of the caller's accepted list,
    /// preferring the contract's default.
    pub fn negotiate(
        &self,
        contract_id: ContractId,
        accepted: &[MediaType],
    ) -> CodecResult<MediaType> {
        let default = self.default_media_type(contract_id)?;
        if accepted.contains(&default) {
            return Ok(default);
        }
        accepted
            .iter()
            .copied()
            .find(|mt| self.entries.contains_key(&(contract_id, *mt)))
            .ok_or_else(|| CodecError::NotRegistered {
                contract_id: contract_id.as_uuid(),
                media_type: accepted
                    .iter()
                    .map(|mt| mt.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// Validate that a descriptor refers to a registered codec.
    pub fn ensure_registered(&self, descriptor: &ContractDescriptor) -> CodecResult<()> {
        self.lookup(descriptor.contract_id, descriptor.media_type)
            .map(|_| ())
    }

    /// Sorted snapshot of every registration.
    pub fn contracts(&self) -> Arc<Vec<ContractCatalogEntry>> {
        self.catalog.load_full()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(
        &self,
        contract_id: ContractId,
        media_type: MediaType,
    ) -> CodecResult<Arc<CodecEntry>> {
        self.entries
            .get(&(contract_id, media_type))
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| {
                if self.defaults.contains_key(&contract_id) {
                    CodecError::NotRegistered {
                        contract_id: contract_id.as_uuid(),
                        media_type: media_type.to_string(),
                    }
                } else {
                    CodecError::UnknownContract(contract_id.as_uuid())
                }
            })
    }

    fn rebuild_catalog(&self) {
        let mut rows: Vec<ContractCatalogEntry> = self
            .entries
            .iter()
            .map(|kv| {
                let (contract_id, media_type) = *kv.key();
                let is_default = self
                    .defaults
                    .get(&contract_id)
                    .map(|d| *d.value() == media_type)
                    .unwrap_or(false);
                ContractCatalogEntry {
                    contract_id,
                    media_type,
                    contract_name: kv.value().contract_name,
                    is_default,
                }
            })
            .collect();
        rows.sort_unstable_by(|a, b| {
            (a.contract_id, a.media_type.as_str()).cmp(&(b.contract_id, b.media_type.as_str()))
        });
        self.catalog.store(Arc::new(rows));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Order {
        item: String,
        quantity: u32,
    }

    impl DataContract for Order {
        const CONTRACT_ID: ContractId = ContractId::from_u128(0xB1);
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Receipt {
        order_total: u64,
    }

    impl DataContract for Receipt {
        const CONTRACT_ID: ContractId = ContractId::from_u128(0xB2);
    }

    fn registry() -> CodecRegistry {
        let registry = CodecRegistry::new();
        registry.register::<Order>(MediaType::Json).unwrap();
        registry.register::<Order>(MediaType::Postcard).unwrap();
        registry.register::<Receipt>(MediaType::Json).unwrap();
        registry
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = registry();
        assert!(matches!(
            registry.register::<Order>(MediaType::Json),
            Err(CodecError::DuplicateCodec { .. })
        ));
        // The failed registration must not disturb existing state.
        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.default_media_type(Order::contract_id()).unwrap(),
            MediaType::Json
        );
    }

    #[test]
    fn first_registration_fixes_the_default() {
        let registry = registry();
        assert_eq!(
            registry.default_media_type(Order::contract_id()).unwrap(),
            MediaType::Json
        );
        registry.set_default::<Order>(MediaType::Postcard).unwrap();
        assert_eq!(
            registry.default_media_type(Order::contract_id()).unwrap(),
            MediaType::Postcard
        );
        // set_default refuses keys that were never registered.
        assert!(registry.set_default::<Receipt>(MediaType::Text).is_err());
    }

    #[test]
    fn serialize_deserialize_round_trip() {
        let registry = registry();
        let order = Order {
            item: "widget".into(),
            quantity: 3,
        };
        let package = registry.serialize(&order).unwrap();
        assert_eq!(package.contract_id(), Order::contract_id());
        assert_eq!(package.media_type(), MediaType::Json);
        assert_eq!(registry.deserialize::<Order>(&package).unwrap(), order);
    }

    #[test]
    fn deserialize_rejects_contract_mismatch() {
        let registry = registry();
        let package = registry
            .serialize(&Order {
                item: "widget".into(),
                quantity: 1,
            })
            .unwrap();
        assert!(matches!(
            registry.deserialize::<Receipt>(&package),
            Err(CodecError::ContractMismatch { .. })
        ));
    }

    #[test]
    fn unregistered_contracts_cannot_produce_packages() {
        #[derive(Debug, Serialize, Deserialize)]
        struct Unknown;
        impl DataContract for Unknown {
            const CONTRACT_ID: ContractId = ContractId::from_u128(0xDEAD);
        }
        let registry = registry();
        assert!(matches!(
            registry.serialize(&Unknown),
            Err(CodecError::UnknownContract(_))
        ));
        assert!(matches!(
            registry.serialize_as(&Unknown, MediaType::Json),
            Err(CodecError::UnknownContract(_))
        ));
    }

    #[test]
    fn transcode_preserves_value_and_correlation() {
        let registry = registry();
        let order = Order {
            item: "widget".into(),
            quantity: 9,
        };
        let json = registry.serialize_as(&order, MediaType::Json).unwrap();
        let binary = registry.transcode(&json, MediaType::Postcard).unwrap();
        assert_eq!(binary.media_type(), MediaType::Postcard);
        assert_eq!(binary.correlation_id(), json.correlation_id());
        assert_eq!(registry.deserialize::<Order>(&binary).unwrap(), order);
        // Receipt has no postcard codec, so transcoding there must fail.
        let receipt = registry.serialize(&Receipt { order_total: 5 }).unwrap();
        assert!(registry.transcode(&receipt, MediaType::Postcard).is_err());
    }

    #[test]
    fn negotiate_prefers_the_default() {
        let registry = registry();
        let id = Order::contract_id();
        assert_eq!(
            registry
                .negotiate(id, &[MediaType::Postcard, MediaType::Json])
                .unwrap(),
            MediaType::Json
        );
        assert_eq!(
            registry.negotiate(id, &[MediaType::Postcard]).unwrap(),
            MediaType::Postcard
        );
        assert!(registry.negotiate(id, &[MediaType::Text]).is_err());
    }

    #[test]
    fn catalog_reflects_registrations() {
        let registry = registry();
        let catalog = registry.contracts();
        assert_eq!(catalog.len(), 3);
        let defaults: Vec<_> = catalog.iter().filter(|row| row.is_default).collect();
        assert_eq!(defaults.len(), 2);
        assert!(catalog
            .iter()
            .all(|row| row.contract_name.contains("Order") || row.contract_name.contains("Receipt")));
    }
}
