//! Public entry point composing key derivation, batched fetching and
//! decode-and-merge into the operations business logic calls.

use std::collections::BTreeMap;

use log::debug;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sp_core::storage::StorageKey;

use csq_runtime_codec::{CodecError, CodecFactory, StoragePath};

use crate::{
    batch, child,
    error::StorageQueryError,
    key_encoder, merge, prefix,
    transport::StateRpcEngine,
    types::{ChildStorageResponse, QueryOptions, StorageQueryConfig, StorageResponse},
};

const LOG_TARGET: &str = "storage-query";

/// Stateless composition of the query pipeline.
///
/// The service owns only its configuration. The RPC engine and the codec
/// factory are passed per call: the engine is a long-lived shared handle,
/// while the factory reflects one block's runtime metadata and is obtained
/// fresh by the caller for each logical request.
#[derive(Debug, Clone, Default)]
pub struct StorageQueryService {
    config: StorageQueryConfig,
}

impl StorageQueryService {
    pub fn new(config: StorageQueryConfig) -> Self {
        Self { config }
    }

    /// Fetch raw values for already-derived keys and merge them into typed,
    /// caller-ordered responses.
    async fn query_entry_items<T, E, F>(
        &self,
        engine: &E,
        factory: &F,
        path: &StoragePath,
        keys: Vec<StorageKey>,
        options: &QueryOptions,
    ) -> Result<Vec<StorageResponse<T>>, StorageQueryError>
    where
        T: DeserializeOwned,
        E: StateRpcEngine + ?Sized,
        F: CodecFactory + ?Sized,
    {
        let entry = factory
            .storage_entry(&path.module_name, &path.item_name)
            .ok_or_else(|| StorageQueryError::InvalidStoragePath(path.clone()))?;

        let change_sets = batch::fetch_raw(engine, &self.config, &keys, options).await?;
        merge::merge_results(factory, entry, change_sets, &keys, &options.policy)
    }

    /// Query a single plain (unkeyed) storage value.
    pub async fn query_item<T, E, F>(
        &self,
        engine: &E,
        factory: &F,
        path: &StoragePath,
        options: &QueryOptions,
    ) -> Result<StorageResponse<T>, StorageQueryError>
    where
        T: DeserializeOwned,
        E: StateRpcEngine + ?Sized,
        F: CodecFactory + ?Sized,
    {
        let key = key_encoder::storage_key(factory, path, &[])?;
        let responses = self
            .query_entry_items(engine, factory, path, vec![key], options)
            .await?;

        responses.into_iter().next().ok_or_else(|| {
            StorageQueryError::DataCorruption(format!(
                "singular query of `{}` produced no response",
                path
            ))
        })
    }

    /// Query a map entry for each key parameter in `key_params`, in order.
    pub async fn query_items_by_key_params<K, T, E, F>(
        &self,
        engine: &E,
        factory: &F,
        path: &StoragePath,
        key_params: &[K],
        options: &QueryOptions,
    ) -> Result<Vec<StorageResponse<T>>, StorageQueryError>
    where
        K: Serialize,
        T: DeserializeOwned,
        E: StateRpcEngine + ?Sized,
        F: CodecFactory + ?Sized,
    {
        let keys = key_params
            .iter()
            .map(|param| {
                let param = serde_json::to_value(param).map_err(CodecError::from)?;
                key_encoder::storage_key(factory, path, std::slice::from_ref(&param))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.query_entry_items(engine, factory, path, keys, options)
            .await
    }

    /// Query a double-map entry for each zipped `(key1, key2)` pair.
    pub async fn query_items_by_key_param_pairs<K1, K2, T, E, F>(
        &self,
        engine: &E,
        factory: &F,
        path: &StoragePath,
        key_params1: &[K1],
        key_params2: &[K2],
        options: &QueryOptions,
    ) -> Result<Vec<StorageResponse<T>>, StorageQueryError>
    where
        K1: Serialize,
        K2: Serialize,
        T: DeserializeOwned,
        E: StateRpcEngine + ?Sized,
        F: CodecFactory + ?Sized,
    {
        if key_params1.len() != key_params2.len() {
            return Err(StorageQueryError::MissingRequiredParams(path.clone()));
        }

        let keys = key_params1
            .iter()
            .zip(key_params2.iter())
            .map(|(param1, param2)| {
                let params = [
                    serde_json::to_value(param1).map_err(CodecError::from)?,
                    serde_json::to_value(param2).map_err(CodecError::from)?,
                ];
                key_encoder::storage_key(factory, path, &params)
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.query_entry_items(engine, factory, path, keys, options)
            .await
    }

    /// Query an n-map entry for each positional key tuple.
    pub async fn query_items_by_nmap_params<T, E, F>(
        &self,
        engine: &E,
        factory: &F,
        path: &StoragePath,
        key_tuples: &[Vec<Value>],
        options: &QueryOptions,
    ) -> Result<Vec<StorageResponse<T>>, StorageQueryError>
    where
        T: DeserializeOwned,
        E: StateRpcEngine + ?Sized,
        F: CodecFactory + ?Sized,
    {
        let keys = key_tuples
            .iter()
            .map(|tuple| key_encoder::storage_key(factory, path, tuple))
            .collect::<Result<Vec<_>, _>>()?;

        self.query_entry_items(engine, factory, path, keys, options)
            .await
    }

    /// Query raw, pre-encoded storage keys, decoding values as the entry
    /// under `path`.
    pub async fn query_items_by_keys<T, E, F>(
        &self,
        engine: &E,
        factory: &F,
        path: &StoragePath,
        keys: Vec<StorageKey>,
        options: &QueryOptions,
    ) -> Result<Vec<StorageResponse<T>>, StorageQueryError>
    where
        T: DeserializeOwned,
        E: StateRpcEngine + ?Sized,
        F: CodecFactory + ?Sized,
    {
        self.query_entry_items(engine, factory, path, keys, options)
            .await
    }

    /// Query a single item of a child (nested) storage trie.
    pub async fn query_child_item<T, E, F>(
        &self,
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
        child::fetch_child_item(engine, factory, child_key, storage_key, value_type, options).await
    }

    /// Scan a whole map: enumerate every key under the entry's prefix, fetch
    /// and decode the values, and return them keyed by the recovered key
    /// parameter(s). Keys without a value on chain are omitted.
    pub async fn query_by_prefix<K, T, E, F>(
        &self,
        engine: &E,
        factory: &F,
        path: &StoragePath,
        options: &QueryOptions,
    ) -> Result<BTreeMap<K, T>, StorageQueryError>
    where
        K: DeserializeOwned + Ord,
        T: DeserializeOwned,
        E: StateRpcEngine + ?Sized,
        F: CodecFactory + ?Sized,
    {
        let entry = factory
            .storage_entry(&path.module_name, &path.item_name)
            .ok_or_else(|| StorageQueryError::InvalidStoragePath(path.clone()))?;
        let entry_ty = entry.ty.clone();

        let prefix_key = StorageKey(key_encoder::storage_prefix(path));
        let keys = prefix::enumerate_keys(engine, &self.config, &prefix_key, options).await?;
        debug!(
            target: LOG_TARGET,
            "prefix scan of `{}` found {} key(s)",
            path,
            keys.len(),
        );

        let responses: Vec<StorageResponse<T>> = self
            .query_entry_items(engine, factory, path, keys, options)
            .await?;

        let mut items = BTreeMap::new();
        for response in responses {
            let Some(value) = response.value else {
                continue;
            };
            let key_json = key_encoder::decode_map_key(factory, path, &entry_ty, &response.key)?;
            let key = serde_json::from_value(key_json).map_err(CodecError::from)?;
            items.insert(key, value);
        }
        Ok(items)
    }
}
