//! Dynamic type registry bridging named runtime types to SCALE codecs.

use std::collections::HashMap;

use codec::{Decode, Encode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sp_core::H256;

use crate::{
    error::CodecError,
    types::{StorageEntryMetadata, StoragePath},
    CodecFactory,
};

/// Codec for one named runtime type, operating on dynamic values.
trait TypeCodec: Send + Sync {
    fn encode(&self, value: &Value, type_name: &str) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, input: &mut &[u8], type_name: &str) -> Result<Value, CodecError>;
}

/// Adapter implementing [`TypeCodec`] for any concrete SCALE type that can
/// cross the dynamic boundary through serde.
struct ScaleTypeCodec<T>(std::marker::PhantomData<fn() -> T>);

impl<T> TypeCodec for ScaleTypeCodec<T>
where
    T: Encode + Decode + Serialize + DeserializeOwned + Send + Sync,
{
    fn encode(&self, value: &Value, _type_name: &str) -> Result<Vec<u8>, CodecError> {
        let typed: T = serde_json::from_value(value.clone())?;
        Ok(typed.encode())
    }

    fn decode(&self, input: &mut &[u8], type_name: &str) -> Result<Value, CodecError> {
        let typed = T::decode(input).map_err(|source| CodecError::Decode {
            type_name: type_name.to_string(),
            source,
        })?;
        Ok(serde_json::to_value(typed)?)
    }
}

/// A [`CodecFactory`] backed by explicit type and storage entry
/// registrations.
///
/// A production caller populates one registry per runtime version from the
/// chain's metadata (fetched and parsed elsewhere) and hands it to the query
/// engine alongside each request.
#[derive(Default)]
pub struct TypeRegistry {
    entries: HashMap<StoragePath, StorageEntryMetadata>,
    codecs: HashMap<String, Box<dyn TypeCodec>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with primitive types common to all runtimes.
    pub fn with_well_known_types() -> Self {
        let mut registry = Self::new();
        registry.register_type::<u8>("u8");
        registry.register_type::<u16>("u16");
        registry.register_type::<u32>("u32");
        registry.register_type::<u64>("u64");
        registry.register_type::<bool>("bool");
        registry.register_type::<H256>("H256");
        registry
    }

    /// Register a concrete SCALE type under a runtime type name.
    pub fn register_type<T>(&mut self, name: impl Into<String>)
    where
        T: Encode + Decode + Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.codecs.insert(
            name.into(),
            Box::new(ScaleTypeCodec::<T>(std::marker::PhantomData)),
        );
    }

    /// Declare a storage entry under its `(module, item)` path.
    pub fn register_entry(&mut self, path: StoragePath, metadata: StorageEntryMetadata) {
        self.entries.insert(path, metadata);
    }
}

impl CodecFactory for TypeRegistry {
    fn storage_entry(&self, module: &str, item: &str) -> Option<&StorageEntryMetadata> {
        self.entries.get(&StoragePath::new(module, item))
    }

    fn encode(&self, value: &Value, type_name: &str) -> Result<Vec<u8>, CodecError> {
        let codec = self
            .codecs
            .get(type_name)
            .ok_or_else(|| CodecError::UnknownType(type_name.to_string()))?;
        codec.encode(value, type_name)
    }

    fn decode(&self, input: &mut &[u8], type_name: &str) -> Result<Value, CodecError> {
        let codec = self
            .codecs
            .get(type_name)
            .ok_or_else(|| CodecError::UnknownType(type_name.to_string()))?;
        codec.decode(input, type_name)
    }
}
