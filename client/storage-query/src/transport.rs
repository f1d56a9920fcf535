//! Abstract JSON-RPC transport seam and typed wrappers for the state query
//! methods the engine consumes.

use std::time::Duration;

use async_trait::async_trait;
use jsonrpsee::core::{client::ClientT, params::ArrayParams};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use sp_core::{
    storage::{StorageChangeSet, StorageData, StorageKey},
    H256,
};
use thiserror::Error;

use crate::error::StorageQueryError;

pub const QUERY_STORAGE_AT: &str = "state_queryStorageAt";
pub const GET_KEYS_PAGED: &str = "state_getKeysPaged";
pub const GET_CHILD_STORAGE: &str = "state_getChildStorage";

/// Transport-level failures. Retry policy belongs to the caller of the
/// query engine, never to this layer.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("RPC call `{method}` failed: {reason}")]
    Call {
        method: &'static str,
        reason: String,
    },
    #[error("RPC call `{method}` timed out after {timeout:?}")]
    Timeout {
        method: &'static str,
        timeout: Duration,
    },
}

/// Asynchronous JSON-RPC engine the query subsystem runs against.
///
/// One invocation issues exactly one call. Implementations are shared,
/// read-only handles accessed concurrently by many logical requests.
#[async_trait]
pub trait StateRpcEngine: Send + Sync {
    /// Issue a single call with positional `params`, bounded by `timeout`.
    async fn call(
        &self,
        method: &'static str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, TransportError>;
}

/// [`StateRpcEngine`] adapter over any jsonrpsee client.
pub struct JsonRpcEngine<C> {
    client: C,
}

impl<C> JsonRpcEngine<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C> StateRpcEngine for JsonRpcEngine<C>
where
    C: ClientT + Send + Sync,
{
    async fn call(
        &self,
        method: &'static str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, TransportError> {
        let mut array = ArrayParams::new();
        match params {
            Value::Array(items) => {
                for item in items {
                    array.insert(item).map_err(|e| TransportError::Call {
                        method,
                        reason: format!("failed to serialize params: {}", e),
                    })?;
                }
            }
            Value::Null => {}
            other => {
                array.insert(other).map_err(|e| TransportError::Call {
                    method,
                    reason: format!("failed to serialize params: {}", e),
                })?;
            }
        }

        match tokio::time::timeout(timeout, self.client.request::<Value, _>(method, array)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(TransportError::Call {
                method,
                reason: e.to_string(),
            }),
            Err(_) => Err(TransportError::Timeout { method, timeout }),
        }
    }
}

fn parse_response<T: DeserializeOwned>(
    method: &'static str,
    raw: Value,
) -> Result<T, StorageQueryError> {
    serde_json::from_value(raw).map_err(|e| {
        StorageQueryError::DataCorruption(format!("malformed `{}` response: {}", method, e))
    })
}

/// `state_queryStorageAt` for one page of keys.
pub(crate) async fn query_storage_at<E: StateRpcEngine + ?Sized>(
    engine: &E,
    keys: &[StorageKey],
    at: Option<H256>,
    timeout: Duration,
) -> Result<Vec<StorageChangeSet<H256>>, StorageQueryError> {
    let raw = engine
        .call(QUERY_STORAGE_AT, json!([keys, at]), timeout)
        .await?;
    parse_response(QUERY_STORAGE_AT, raw)
}

/// `state_getKeysPaged`: keys under `prefix`, lexicographically after
/// `start_key`, at most `count` of them.
pub(crate) async fn get_keys_paged<E: StateRpcEngine + ?Sized>(
    engine: &E,
    prefix: &StorageKey,
    count: u32,
    start_key: Option<&StorageKey>,
    at: Option<H256>,
    timeout: Duration,
) -> Result<Vec<StorageKey>, StorageQueryError> {
    let raw = engine
        .call(GET_KEYS_PAGED, json!([prefix, count, start_key, at]), timeout)
        .await?;
    parse_response(GET_KEYS_PAGED, raw)
}

/// `state_getChildStorage`: one key inside a child trie.
pub(crate) async fn get_child_storage<E: StateRpcEngine + ?Sized>(
    engine: &E,
    child_key: &StorageKey,
    key: &StorageKey,
    at: Option<H256>,
    timeout: Duration,
) -> Result<Option<StorageData>, StorageQueryError> {
    let raw = engine
        .call(GET_CHILD_STORAGE, json!([child_key, key, at]), timeout)
        .await?;
    parse_response(GET_CHILD_STORAGE, raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonrpsee::core::{
        client::{BatchResponse, Error},
        params::BatchRequestBuilder,
        traits::ToRpcParams,
    };
    use std::fmt;

    /// Client whose requests never complete.
    struct StalledClient;

    #[async_trait]
    impl ClientT for StalledClient {
        async fn notification<Params>(&self, _method: &str, _params: Params) -> Result<(), Error>
        where
            Params: ToRpcParams + Send,
        {
            unimplemented!("notifications are not issued by the query engine")
        }

        async fn request<R, Params>(&self, _method: &str, _params: Params) -> Result<R, Error>
        where
            R: DeserializeOwned,
            Params: ToRpcParams + Send,
        {
            futures::future::pending::<()>().await;
            unreachable!("pending future never resolves")
        }

        async fn batch_request<'a, R>(
            &self,
            _batch: BatchRequestBuilder<'a>,
        ) -> Result<BatchResponse<'a, R>, Error>
        where
            R: DeserializeOwned + fmt::Debug + 'a,
        {
            unimplemented!("batch requests are not issued by the query engine")
        }
    }

    #[tokio::test]
    async fn stalled_calls_surface_as_timeouts() {
        let engine = JsonRpcEngine::new(StalledClient);
        let err = engine
            .call(QUERY_STORAGE_AT, json!([]), Duration::from_millis(20))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TransportError::Timeout {
                method: QUERY_STORAGE_AT,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn timeouts_reach_the_caller_as_transport_failures() {
        let engine = JsonRpcEngine::new(StalledClient);
        let err = query_storage_at(&engine, &[], None, Duration::from_millis(20))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StorageQueryError::Transport(TransportError::Timeout { .. })
        ));
    }
}
