//! Chain state query engine.
//!
//! Turns logical "read this value from chain state" requests into concrete
//! JSON-RPC calls and raw responses back into typed values, while preserving
//! caller-supplied key ordering and respecting transport page limits.
//!
//! The subsystem is stateless: the RPC engine and the runtime codec factory
//! are externally owned, read-only collaborators passed in per call, so any
//! number of logical requests can run concurrently against the same handles.

pub mod batch;
pub mod child;
pub mod error;
pub mod key_encoder;
pub mod merge;
pub mod prefix;
pub mod query_service;
pub mod transport;
pub mod types;

#[cfg(test)]
pub mod test_utils;

pub use csq_runtime_codec::{
    CodecError, CodecFactory, StorageEntryMetadata, StorageEntryType, StorageHasher, StoragePath,
    TypeRegistry,
};

pub use self::{
    error::StorageQueryError,
    query_service::StorageQueryService,
    transport::{JsonRpcEngine, StateRpcEngine, TransportError},
    types::{
        ChildStorageResponse, DecodePolicy, MissingEntryStrategy, QueryOptions, StorageQueryConfig,
        StorageResponse,
    },
};
