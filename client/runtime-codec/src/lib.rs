//! Runtime metadata model and dynamic codec surface for chain state queries.
//!
//! A [`CodecFactory`] reflects the runtime metadata of one specific block: it
//! resolves `(module, item)` storage paths to their declared shape and
//! encodes/decodes values of named types. Callers obtain a factory per
//! logical request, because type layouts are chain- and block-height-
//! dependent.
//!
//! [`TypeRegistry`] is the in-crate implementation, where named types are
//! registered as SCALE codecs bridged through [`serde_json::Value`]. How the
//! registry is populated (parsing on-chain metadata) is the caller's concern.

pub mod error;
pub mod registry;
pub mod types;

pub use self::{
    error::CodecError,
    registry::TypeRegistry,
    types::{StorageEntryMetadata, StorageEntryType, StorageHasher, StoragePath},
};

use serde_json::Value;

/// Per-block runtime codec surface consumed by the storage query engine.
///
/// Implementations must be cheap to share across concurrent requests; all
/// methods take `&self` and the engine never mutates the factory.
pub trait CodecFactory: Send + Sync {
    /// Resolve the storage entry declared under `(module, item)` in the
    /// runtime metadata, if any.
    fn storage_entry(&self, module: &str, item: &str) -> Option<&StorageEntryMetadata>;

    /// SCALE-encode a dynamic value as the named type.
    fn encode(&self, value: &Value, type_name: &str) -> Result<Vec<u8>, CodecError>;

    /// SCALE-decode the named type from `input`, consuming exactly the bytes
    /// the type occupies. Trailing bytes are left in `input` for the caller
    /// to interpret (storage keys encode several values back to back).
    fn decode(&self, input: &mut &[u8], type_name: &str) -> Result<Value, CodecError>;
}
