use thiserror::Error;

use csq_runtime_codec::{CodecError, StoragePath};

use crate::transport::TransportError;

/// Errors surfaced by the storage query engine.
///
/// No internal retry is performed at any layer: because partial success is
/// never returned, the caller can always re-invoke the whole logical request
/// after a [`StorageQueryError::Transport`] failure.
#[derive(Error, Debug)]
pub enum StorageQueryError {
    /// The resolved storage shape requires key parameters the caller did not
    /// provide. Caller bug, not retryable.
    #[error("storage entry `{0}` requires key parameters that were not provided")]
    MissingRequiredParams(StoragePath),
    /// The `(module, item)` path is absent from the current runtime
    /// metadata. Indicates stale metadata or the wrong chain.
    #[error("storage entry `{0}` was not found in the runtime metadata")]
    InvalidStoragePath(StoragePath),
    /// Key arity or shape mismatch against the resolved storage entry.
    #[error("storage entry `{path}` does not match the request shape: {reason}")]
    IncompatibleStorageType { path: StoragePath, reason: String },
    /// The transport reported success but the response is structurally
    /// invalid, or on-chain bytes failed to decode.
    #[error("chain state response is corrupted: {0}")]
    DataCorruption(String),
    /// Encoding a key parameter or converting a decoded value failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Network, timeout or RPC-level failure, surfaced unchanged.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The request was cancelled before completion. Deliberate, not a fault;
    /// no partial result was delivered.
    #[error("storage request was cancelled")]
    Cancelled,
}

impl StorageQueryError {
    pub(crate) fn incompatible(path: &StoragePath, reason: impl Into<String>) -> Self {
        Self::IncompatibleStorageType {
            path: path.clone(),
            reason: reason.into(),
        }
    }
}
