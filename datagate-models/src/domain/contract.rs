//! Contract identity, media types and serialized packages.
//!
//! A *contract* is a serializable type with a stable, globally unique
//! identity. Packages carry one encoded contract instance together with the
//! key it was encoded under, so any hop can resolve the matching codec
//! without inspecting the payload.

use crate::constants::WIRE_SCHEMA_VERSION;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use datagate_error::{codec::CodecError, CodecResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identity of a data contract.
///
/// The value never changes once published; renaming or moving the Rust type
/// does not affect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractId(Uuid);

impl ContractId {
    /// Build a contract id from a compile-time u128 literal.
    #[inline]
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    #[inline]
    pub const fn new(value: Uuid) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    #[inline]
    pub const fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Display for ContractId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for ContractId {
    #[inline]
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// Payload encodings the codec registry can resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// `application/json` via serde_json
    Json,
    /// `application/postcard`, compact binary via postcard
    Postcard,
    /// `text/plain; charset=utf-8` for string-shaped contracts
    Text,
}

impl MediaType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MediaType::Json => "application/json",
            MediaType::Postcard => "application/postcard",
            MediaType::Text => "text/plain; charset=utf-8",
        }
    }

    /// Whether payloads of this media type are valid UTF-8 by construction.
    pub const fn is_textual(&self) -> bool {
        matches!(self, MediaType::Json | MediaType::Text)
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Parameters other than the canonical charset are not understood.
        match s.trim() {
            "application/json" => Ok(MediaType::Json),
            "application/postcard" => Ok(MediaType::Postcard),
            "text/plain" | "text/plain; charset=utf-8" => Ok(MediaType::Text),
            other => Err(CodecError::UnknownMediaType(other.to_string())),
        }
    }
}

impl Serialize for MediaType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MediaType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Names one side of a command exchange: which contract, in which encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDescriptor {
    pub contract_id: ContractId,
    pub media_type: MediaType,
}

impl ContractDescriptor {
    #[inline]
    pub const fn new(contract_id: ContractId, media_type: MediaType) -> Self {
        Self {
            contract_id,
            media_type,
        }
    }
}

impl Display for ContractDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} as '{}'", self.contract_id, self.media_type)
    }
}

/// A serialized contract instance in flight.
///
/// The payload is opaque at this layer; `contract_id` and `media_type` are
/// the registry key that produced it. `correlation_id` survives the full
/// request/response round trip.
#[derive(Debug, Clone)]
pub struct ContractPackage {
    contract_id: ContractId,
    media_type: MediaType,
    payload: Bytes,
    correlation_id: Uuid,
    created_at: DateTime<Utc>,
}

impl ContractPackage {
    pub fn new(contract_id: ContractId, media_type: MediaType, payload: Bytes) -> Self {
        Self {
            contract_id,
            media_type,
            payload,
            correlation_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    /// Rebuild a package that continues an existing exchange.
    pub fn reply(
        contract_id: ContractId,
        media_type: MediaType,
        payload: Bytes,
        correlation_id: Uuid,
    ) -> Self {
        Self {
            contract_id,
            media_type,
            payload,
            correlation_id,
            created_at: Utc::now(),
        }
    }

    #[inline]
    pub const fn contract_id(&self) -> ContractId {
        self.contract_id
    }

    #[inline]
    pub const fn media_type(&self) -> MediaType {
        self.media_type
    }

    #[inline]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    #[inline]
    pub const fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    #[inline]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    pub fn descriptor(&self) -> ContractDescriptor {
        ContractDescriptor::new(self.contract_id, self.media_type)
    }

    /// Whether this package matches a command-side descriptor exactly.
    #[inline]
    pub fn matches(&self, descriptor: &ContractDescriptor) -> bool {
        self.contract_id == descriptor.contract_id && self.media_type == descriptor.media_type
    }
}

/// Stable JSON envelope for packages crossing a process boundary.
///
/// # Design
/// - **Stable**: the top-level shape is versioned with `schema_version`.
/// - **Text-safe**: the payload is base64 regardless of media type, so the
///   envelope survives any JSON transport untouched.
///
/// Unknown schema versions are rejected on unpack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirePackage {
    /// Schema version for evolution.
    pub schema_version: u32,
    /// Contract identity the payload was encoded under.
    pub contract_id: ContractId,
    /// Payload encoding.
    pub media_type: MediaType,
    /// Base64 payload bytes.
    pub payload: String,
    /// Correlation id preserved across the exchange.
    pub correlation_id: Uuid,
    /// Creation timestamp, unix milliseconds.
    pub ts_ms: i64,
}

impl WirePackage {
    pub fn from_package(package: &ContractPackage) -> Self {
        Self {
            schema_version: WIRE_SCHEMA_VERSION,
            contract_id: package.contract_id(),
            media_type: package.media_type(),
            payload: BASE64.encode(package.payload()),
            correlation_id: package.correlation_id(),
            ts_ms: package.created_at().timestamp_millis(),
        }
    }

    pub fn into_package(self) -> CodecResult<ContractPackage> {
        if self.schema_version != WIRE_SCHEMA_VERSION {
            return Err(CodecError::Wire(format!(
                "unsupported schema_version {}",
                self.schema_version
            )));
        }
        let payload = BASE64
            .decode(self.payload.as_bytes())
            .map_err(|e| CodecError::Wire(format!("payload is not valid base64: {e}")))?;
        let created_at = Utc
            .timestamp_millis_opt(self.ts_ms)
            .single()
            .ok_or_else(|| CodecError::Wire(format!("ts_ms {} out of range", self.ts_ms)))?;
        Ok(ContractPackage {
            contract_id: self.contract_id,
            media_type: self.media_type,
            payload: Bytes::from(payload),
            correlation_id: self.correlation_id,
            created_at,
        })
    }

    pub fn encode_json(&self) -> CodecResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CodecError::Wire(e.to_string()))
    }

    pub fn decode_json(bytes: &[u8]) -> CodecResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Wire(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_round_trip() {
        for mt in [MediaType::Json, MediaType::Postcard, MediaType::Text] {
            assert_eq!(mt.as_str().parse::<MediaType>().unwrap(), mt);
        }
        assert_eq!("text/plain".parse::<MediaType>().unwrap(), MediaType::Text);
        assert!("application/xml".parse::<MediaType>().is_err());
    }

    #[test]
    fn wire_package_round_trip() {
        let package = ContractPackage::new(
            ContractId::from_u128(0x1234_5678),
            MediaType::Postcard,
            Bytes::from_static(&[0x00, 0xFF, 0x7F, 0x80]),
        );
        let bytes = WirePackage::from_package(&package).encode_json().unwrap();
        let back = WirePackage::decode_json(&bytes)
            .unwrap()
            .into_package()
            .unwrap();
        assert_eq!(back.contract_id(), package.contract_id());
        assert_eq!(back.media_type(), package.media_type());
        assert_eq!(back.payload(), package.payload());
        assert_eq!(back.correlation_id(), package.correlation_id());
        assert_eq!(
            back.created_at().timestamp_millis(),
            package.created_at().timestamp_millis()
        );
    }

    #[test]
    fn wire_package_rejects_unknown_schema_version() {
        let package = ContractPackage::new(
            ContractId::from_u128(1),
            MediaType::Json,
            Bytes::from_static(b"{}"),
        );
        let mut wire = WirePackage::from_package(&package);
        wire.schema_version = 99;
        assert!(matches!(
            wire.into_package(),
            Err(CodecError::Wire(msg)) if msg.contains("schema_version")
        ));
    }
}
