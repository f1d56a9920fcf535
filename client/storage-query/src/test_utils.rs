//! Shared fixtures for the unit tests: a scripted RPC engine and a type
//! registry covering the storage shapes the tests exercise.

use std::{
    collections::VecDeque,
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use serde_json::Value;
use sp_core::{
    storage::{StorageChangeSet, StorageData, StorageKey},
    H256,
};
use tokio_util::sync::CancellationToken;

use csq_runtime_codec::{
    StorageEntryMetadata, StorageEntryType, StorageHasher, StoragePath, TypeRegistry,
};

use crate::transport::{StateRpcEngine, TransportError};

/// RPC engine serving scripted responses in order and recording every call.
pub struct MockRpcEngine {
    responses: Mutex<VecDeque<Result<Value, String>>>,
    calls: Mutex<Vec<(String, Value)>>,
    cancel_after: Mutex<Option<(usize, CancellationToken)>>,
}

impl MockRpcEngine {
    pub fn new(responses: impl IntoIterator<Item = Value>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            calls: Mutex::new(Vec::new()),
            cancel_after: Mutex::new(None),
        }
    }

    /// Script a transport failure as the next response.
    pub fn push_error(&self, reason: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(reason.to_string()));
    }

    /// Fire `token` as soon as `calls` responses have been served.
    pub fn cancel_after(&self, calls: usize, token: CancellationToken) {
        *self.cancel_after.lock().unwrap() = Some((calls, token));
    }

    /// Every `(method, params)` pair issued so far.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StateRpcEngine for MockRpcEngine {
    async fn call(
        &self,
        method: &'static str,
        params: Value,
        _timeout: Duration,
    ) -> Result<Value, TransportError> {
        let served = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((method.to_string(), params));
            calls.len()
        };

        let result = match self.responses.lock().unwrap().pop_front() {
            Some(Ok(value)) => Ok(value),
            Some(Err(reason)) => Err(TransportError::Call { method, reason }),
            None => Err(TransportError::Call {
                method,
                reason: "no scripted response".to_string(),
            }),
        };

        if let Some((after, token)) = self.cancel_after.lock().unwrap().as_ref() {
            if served >= *after {
                token.cancel();
            }
        }

        result
    }
}

/// `count` distinct storage keys.
pub fn keys(count: usize) -> Vec<StorageKey> {
    (0..count)
        .map(|i| StorageKey((i as u32).to_le_bytes().to_vec()))
        .collect()
}

/// JSON wire form of one change set assigning `value` to every key.
pub fn change_set_json(block: H256, keys: &[StorageKey], value: Option<Vec<u8>>) -> Value {
    let set = StorageChangeSet {
        block,
        changes: keys
            .iter()
            .map(|key| (key.clone(), value.clone().map(StorageData)))
            .collect(),
    };
    serde_json::to_value(set).expect("change sets serialize to JSON")
}

/// Registry with the storage entries the tests query.
pub fn test_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::with_well_known_types();
    registry.register_type::<H256>("AccountId");
    registry.register_type::<u64>("AccountData");

    registry.register_entry(
        StoragePath::new("System", "Number"),
        StorageEntryMetadata::new(StorageEntryType::Plain {
            value_type: "u32".to_string(),
        }),
    );
    registry.register_entry(
        StoragePath::new("Balances", "Account"),
        StorageEntryMetadata::new(StorageEntryType::Map {
            hasher: StorageHasher::Blake2_128Concat,
            key_type: "AccountId".to_string(),
            value_type: "AccountData".to_string(),
        }),
    );
    registry.register_entry(
        StoragePath::new("TestModule", "TwoxMap"),
        StorageEntryMetadata::new(StorageEntryType::Map {
            hasher: StorageHasher::Twox64Concat,
            key_type: "u32".to_string(),
            value_type: "u32".to_string(),
        }),
    );
    registry.register_entry(
        StoragePath::new("TestModule", "DoubleMap"),
        StorageEntryMetadata::new(StorageEntryType::DoubleMap {
            hasher1: StorageHasher::Blake2_128Concat,
            key1_type: "u32".to_string(),
            hasher2: StorageHasher::Twox64Concat,
            key2_type: "u64".to_string(),
            value_type: "u64".to_string(),
        }),
    );
    registry.register_entry(
        StoragePath::new("TestModule", "NMap"),
        StorageEntryMetadata::new(StorageEntryType::NMap {
            hashers: vec![
                StorageHasher::Twox64Concat,
                StorageHasher::Identity,
                StorageHasher::Blake2_128Concat,
            ],
            key_types: vec!["u32".to_string(), "u32".to_string(), "u64".to_string()],
            value_type: "u32".to_string(),
        }),
    );
    registry
}
