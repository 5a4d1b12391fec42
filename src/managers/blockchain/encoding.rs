//! Normalizes a raw log entry into a JSON-compatible tree.
//!
//! The envelope serializer cannot represent raw byte fields, so every
//! byte-valued field (hashes, addresses, bytes, fixed bytes) is encoded as a
//! 0x-prefixed lowercase hex string. The output mirrors the shape upstream
//! consumers already expect: decoded `args` plus log metadata.

use alloy::{
    dyn_abi::{DynSolValue, EventExt},
    json_abi::Event,
    primitives::{B256, hex},
    rpc::types::Log,
};
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
#[error("Failed to decode log for event '{event}': {source}")]
pub(crate) struct LogDecodeError {
    pub event: String,
    #[source]
    pub source: alloy::dyn_abi::Error,
}

/// Decode `log` against `event` and produce the `event_data` tree.
pub(crate) fn normalize_log(event: &Event, log: &Log) -> Result<Value, LogDecodeError> {
    let inner: &alloy::primitives::Log = log.as_ref();
    let decoded = event
        .decode_log_parts(inner.data.topics().iter().copied(), &inner.data.data)
        .map_err(|source| LogDecodeError {
            event: event.name.clone(),
            source,
        })?;

    let mut indexed = decoded.indexed.into_iter();
    let mut body = decoded.body.into_iter();
    let mut args = Map::new();
    for (position, input) in event.inputs.iter().enumerate() {
        let value = if input.indexed {
            indexed.next()
        } else {
            body.next()
        };
        let Some(value) = value else { break };

        let name = if input.name.is_empty() {
            format!("arg{position}")
        } else {
            input.name.clone()
        };
        args.insert(name, dyn_value_to_json(&value));
    }

    let mut data = Map::new();
    data.insert("args".to_string(), Value::Object(args));
    data.insert("event".to_string(), Value::String(event.name.clone()));
    data.insert("logIndex".to_string(), opt_number(log.log_index));
    data.insert(
        "transactionIndex".to_string(),
        opt_number(log.transaction_index),
    );
    data.insert(
        "transactionHash".to_string(),
        opt_hash(log.transaction_hash),
    );
    data.insert(
        "address".to_string(),
        Value::String(hex::encode_prefixed(inner.address.as_slice())),
    );
    data.insert("blockHash".to_string(), opt_hash(log.block_hash));
    data.insert("blockNumber".to_string(), opt_number(log.block_number));

    Ok(Value::Object(data))
}

fn opt_number(value: Option<u64>) -> Value {
    value.map_or(Value::Null, Value::from)
}

fn opt_hash(value: Option<B256>) -> Value {
    value.map_or(Value::Null, |hash| {
        Value::String(hex::encode_prefixed(hash.as_slice()))
    })
}

/// Decoded ABI value to JSON. Byte-like values become 0x lowercase hex;
/// integers wider than 64 bits fall back to decimal strings since JSON
/// numbers cannot carry them losslessly.
fn dyn_value_to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Address(address) => Value::String(hex::encode_prefixed(address.as_slice())),
        DynSolValue::Function(function) => Value::String(hex::encode_prefixed(function.as_slice())),
        DynSolValue::Bytes(bytes) => Value::String(hex::encode_prefixed(bytes)),
        DynSolValue::FixedBytes(word, size) => {
            Value::String(hex::encode_prefixed(&word.as_slice()[..*size]))
        }
        DynSolValue::Uint(value, _) => u64::try_from(*value)
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(value.to_string())),
        DynSolValue::Int(value, _) => i64::try_from(*value)
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(value.to_string())),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(dyn_value_to_json).collect())
        }
        _ => Value::Null,
    }
}
