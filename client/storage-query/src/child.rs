//! Single-item lookups inside child (nested) storage tries.

use serde::de::DeserializeOwned;
use sp_core::storage::StorageKey;

use csq_runtime_codec::CodecFactory;

use crate::{
    batch::ensure_not_cancelled,
    error::StorageQueryError,
    transport::{self, StateRpcEngine},
    types::{ChildStorageResponse, QueryOptions},
};

/// Fetch and decode one key of a child trie.
///
/// No batching: exactly one transport call. The decode type is supplied by
/// the caller because child tries are not described by the runtime's storage
/// metadata. Absence is success; bytes that fail to decode are corruption.
pub(crate) async fn fetch_child_item<T, E, F>(
    engine: &E,
    factory: &F,
    child_key: &StorageKey,
    storage_key: &StorageKey,
    value_type: &str,
    options: &QueryOptions,
) -> Result<ChildStorageResponse<T>, StorageQueryError>
where
    T: DeserializeOwned,
    E: StateRpcEngine + ?Sized,
    F: CodecFactory + ?Sized,
{
    ensure_not_cancelled(&options.cancellation)?;

    let maybe_data = tokio::select! {
        _ = options.cancellation.cancelled() => Err(StorageQueryError::Cancelled),
        result = transport::get_child_storage(
            engine,
            child_key,
            storage_key,
            options.at,
            options.timeout,
        ) => result,
    }?;

    let Some(data) = maybe_data else {
        return Ok(ChildStorageResponse {
            storage_key: storage_key.clone(),
            child_key: child_key.clone(),
            data: None,
            value: None,
        });
    };

    let mut input = data.0.as_slice();
    let json = factory.decode(&mut input, value_type).map_err(|e| {
        StorageQueryError::DataCorruption(format!(
            "child storage value does not decode as `{}`: {}",
            value_type, e
        ))
    })?;
    if !input.is_empty() {
        return Err(StorageQueryError::DataCorruption(format!(
            "child storage value decoded as `{}` left {} trailing byte(s)",
            value_type,
            input.len()
        )));
    }

    let value = serde_json::from_value(json).map_err(csq_runtime_codec::CodecError::from)?;

    Ok(ChildStorageResponse {
        storage_key: storage_key.clone(),
        child_key: child_key.clone(),
        data: Some(data),
        value: Some(value),
    })
}
