//! Per-media-type encode/decode primitives.
//!
//! Each arm encodes exactly one contract value to bytes, or decodes it back.
//! The registry is responsible for deciding *which* arm applies; these
//! functions never consult registration state.

use crate::contract::DataContract;
use bytes::Bytes;
use datagate_error::{codec::CodecError, CodecResult};
use datagate_models::domain::prelude::MediaType;
use serde_json::Value;

pub(crate) fn encode<T: DataContract>(media_type: MediaType, value: &T) -> CodecResult<Bytes> {
    match media_type {
        MediaType::Json => serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| encode_err::<T>(e.to_string())),
        MediaType::Postcard => postcard::to_allocvec(value)
            .map(Bytes::from)
            .map_err(|e| encode_err::<T>(e.to_string())),
        MediaType::Text => {
            // text/plain only fits contracts whose serde form is one string.
            match serde_json::to_value(value).map_err(|e| encode_err::<T>(e.to_string()))? {
                Value::String(s) => Ok(Bytes::from(s.into_bytes())),
                other => Err(encode_err::<T>(format!(
                    "contract is not string-shaped (serializes to {})",
                    value_kind(&other)
                ))),
            }
        }
    }
}

pub(crate) fn decode<T: DataContract>(media_type: MediaType, bytes: &[u8]) -> CodecResult<T> {
    match media_type {
        MediaType::Json => {
            serde_json::from_slice(bytes).map_err(|e| decode_err::<T>(e.to_string()))
        }
        MediaType::Postcard => {
            postcard::from_bytes(bytes).map_err(|e| decode_err::<T>(e.to_string()))
        }
        MediaType::Text => {
            let s = std::str::from_utf8(bytes)
                .map_err(|e| decode_err::<T>(format!("payload is not valid UTF-8: {e}")))?;
            serde_json::from_value(Value::String(s.to_string()))
                .map_err(|e| decode_err::<T>(e.to_string()))
        }
    }
}

fn encode_err<T: DataContract>(reason: String) -> CodecError {
    CodecError::Encode {
        contract_id: T::contract_id().as_uuid(),
        reason,
    }
}

fn decode_err<T: DataContract>(reason: String) -> CodecError {
    CodecError::Decode {
        contract_id: T::contract_id().as_uuid(),
        reason,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
