//! Decoding of raw values and re-association with the caller's key order.

use std::collections::HashMap;

use log::{error, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sp_core::{
    storage::{StorageChangeSet, StorageData, StorageKey},
    H256,
};

use csq_runtime_codec::{CodecFactory, StorageEntryMetadata};

use crate::{
    error::StorageQueryError,
    types::{DecodePolicy, MissingEntryStrategy, StorageResponse},
};

const LOG_TARGET: &str = "storage-query-merge";

/// Decode `bytes` as `type_name`, requiring the value to consume the whole
/// buffer. Trailing bytes mean the type does not actually describe the
/// value, which matters for fallback detection after runtime upgrades.
fn decode_exact<F: CodecFactory + ?Sized>(
    factory: &F,
    bytes: &[u8],
    type_name: &str,
) -> Result<Value, StorageQueryError> {
    let mut input = bytes;
    let value = factory.decode(&mut input, type_name)?;
    if !input.is_empty() {
        return Err(StorageQueryError::DataCorruption(format!(
            "value decoded as `{}` left {} trailing byte(s)",
            type_name,
            input.len()
        )));
    }
    Ok(value)
}

fn decode_with_fallback<F: CodecFactory + ?Sized>(
    factory: &F,
    entry: &StorageEntryMetadata,
    bytes: &[u8],
    policy: &DecodePolicy,
) -> Result<Value, StorageQueryError> {
    let primary = entry.ty.value_type();
    match decode_exact(factory, bytes, primary) {
        Ok(value) => Ok(value),
        Err(primary_err) => {
            if policy.uses_runtime_fallback {
                if let Some(fallback) = entry.fallback_value_type.as_deref() {
                    warn!(
                        target: LOG_TARGET,
                        "value failed to decode as `{}`, retrying as fallback `{}`: {}",
                        primary,
                        fallback,
                        primary_err,
                    );
                    if let Ok(value) = decode_exact(factory, bytes, fallback) {
                        return Ok(value);
                    }
                }
            }
            error!(
                target: LOG_TARGET,
                "undecodable storage value ({} byte(s)) for type `{}`",
                bytes.len(),
                primary,
            );
            Err(StorageQueryError::DataCorruption(format!(
                "storage value does not decode as `{}`: {}",
                primary, primary_err
            )))
        }
    }
}

fn convert<T: DeserializeOwned>(json: Value) -> Result<T, StorageQueryError> {
    serde_json::from_value(json)
        .map_err(csq_runtime_codec::CodecError::from)
        .map_err(StorageQueryError::from)
}

/// Merge raw change sets into typed responses ordered by `original_keys`.
///
/// The transport may split, reorder or batch changes arbitrarily, so all
/// results are indexed by key first and the caller's key order drives the
/// final mapping. When the transport reports a key more than once, the last
/// reported change wins.
pub(crate) fn merge_results<T, F>(
    factory: &F,
    entry: &StorageEntryMetadata,
    change_sets: Vec<StorageChangeSet<H256>>,
    original_keys: &[StorageKey],
    policy: &DecodePolicy,
) -> Result<Vec<StorageResponse<T>>, StorageQueryError>
where
    T: DeserializeOwned,
    F: CodecFactory + ?Sized,
{
    let mut indexed: HashMap<&[u8], Option<&StorageData>> = HashMap::new();
    for set in &change_sets {
        for (key, maybe_data) in &set.changes {
            indexed.insert(key.0.as_slice(), maybe_data.as_ref());
        }
    }

    original_keys
        .iter()
        .map(|key| {
            let raw = indexed.get(key.0.as_slice()).copied().flatten();
            match raw {
                Some(data) => {
                    let json = decode_with_fallback(factory, entry, &data.0, policy)?;
                    Ok(StorageResponse {
                        key: key.clone(),
                        data: Some(data.clone()),
                        value: Some(convert(json)?),
                    })
                }
                None => match policy.missing_entry {
                    MissingEntryStrategy::ReturnAbsent => Ok(StorageResponse {
                        key: key.clone(),
                        data: None,
                        value: None,
                    }),
                    MissingEntryStrategy::DefaultValue => {
                        let json =
                            decode_exact(factory, &entry.default_value, entry.ty.value_type())?;
                        Ok(StorageResponse {
                            key: key.clone(),
                            data: None,
                            value: Some(convert(json)?),
                        })
                    }
                    MissingEntryStrategy::Fail => Err(StorageQueryError::DataCorruption(format!(
                        "no value on chain for storage key 0x{}",
                        hex::encode(&key.0)
                    ))),
                },
            }
        })
        .collect()
}
