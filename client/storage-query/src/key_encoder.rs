//! Derivation of on-chain storage addresses from storage paths and key
//! parameters, and recovery of key parameters from addresses where the
//! declared hashers allow it.
//!
//! Pure CPU work: no I/O, deterministic for fixed inputs.

use serde_json::Value;
use sp_core::storage::StorageKey;
use sp_crypto_hashing::twox_128;

use csq_runtime_codec::{CodecFactory, StorageEntryType, StorageHasher, StoragePath};

use crate::error::StorageQueryError;

/// The module/item address prefix shared by every key of a storage entry.
pub fn storage_prefix(path: &StoragePath) -> Vec<u8> {
    let mut prefix = twox_128(path.module_name.as_bytes()).to_vec();
    prefix.extend(twox_128(path.item_name.as_bytes()));
    prefix
}

/// Hasher and key type per declared key position, in declaration order.
fn key_positions<'a>(
    path: &StoragePath,
    ty: &'a StorageEntryType,
) -> Result<Vec<(&'a StorageHasher, &'a str)>, StorageQueryError> {
    match ty {
        StorageEntryType::Plain { .. } => Ok(Vec::new()),
        StorageEntryType::Map {
            hasher, key_type, ..
        } => Ok(vec![(hasher, key_type.as_str())]),
        StorageEntryType::DoubleMap {
            hasher1,
            key1_type,
            hasher2,
            key2_type,
            ..
        } => Ok(vec![
            (hasher1, key1_type.as_str()),
            (hasher2, key2_type.as_str()),
        ]),
        StorageEntryType::NMap {
            hashers, key_types, ..
        } => {
            if hashers.len() != key_types.len() {
                return Err(StorageQueryError::incompatible(
                    path,
                    format!(
                        "metadata declares {} hashers for {} key types",
                        hashers.len(),
                        key_types.len()
                    ),
                ));
            }
            Ok(hashers
                .iter()
                .zip(key_types.iter().map(String::as_str))
                .collect())
        }
    }
}

/// Derive the storage address for `path` with the given key parameters.
///
/// Each parameter is encoded by the codec factory as the key type declared
/// in metadata and hashed with the hasher declared for its position; the
/// encoder never assumes a key's binary layout. Key arity must match the
/// resolved shape exactly: parameters against a plain entry are rejected
/// rather than silently ignored.
pub fn storage_key<F: CodecFactory + ?Sized>(
    factory: &F,
    path: &StoragePath,
    params: &[Value],
) -> Result<StorageKey, StorageQueryError> {
    let entry = factory
        .storage_entry(&path.module_name, &path.item_name)
        .ok_or_else(|| StorageQueryError::InvalidStoragePath(path.clone()))?;

    let positions = key_positions(path, &entry.ty)?;

    if positions.is_empty() && !params.is_empty() {
        return Err(StorageQueryError::incompatible(
            path,
            "plain entries take no key parameters",
        ));
    }
    if !positions.is_empty() && params.is_empty() {
        return Err(StorageQueryError::MissingRequiredParams(path.clone()));
    }
    if params.len() != positions.len() {
        return Err(StorageQueryError::incompatible(
            path,
            format!(
                "entry takes {} key parameter(s), got {}",
                positions.len(),
                params.len()
            ),
        ));
    }

    let mut key = storage_prefix(path);
    for ((hasher, key_type), param) in positions.into_iter().zip(params) {
        let encoded = factory.encode(param, key_type)?;
        key.extend(hasher.hash(&encoded));
    }

    Ok(StorageKey(key))
}

/// Recover the key parameter(s) embedded in a full storage address.
///
/// Only possible when every declared hasher preserves the original encoded
/// key (identity or the concat variants). Multi-key entries yield a JSON
/// array of the positional values.
pub fn decode_map_key<F: CodecFactory + ?Sized>(
    factory: &F,
    path: &StoragePath,
    ty: &StorageEntryType,
    raw: &StorageKey,
) -> Result<Value, StorageQueryError> {
    let prefix = storage_prefix(path);
    let mut input = raw.0.strip_prefix(prefix.as_slice()).ok_or_else(|| {
        StorageQueryError::DataCorruption(format!(
            "storage key 0x{} does not belong to entry `{}`",
            hex::encode(&raw.0),
            path
        ))
    })?;

    let positions = key_positions(path, ty)?;
    if positions.is_empty() {
        return Err(StorageQueryError::incompatible(
            path,
            "plain entries embed no key parameters",
        ));
    }

    let mut parts = Vec::with_capacity(positions.len());
    for (hasher, key_type) in positions {
        let digest_len = hasher.transparent_prefix_len().ok_or_else(|| {
            StorageQueryError::incompatible(
                path,
                format!("hasher {:?} does not preserve the original key", hasher),
            )
        })?;
        if input.len() < digest_len {
            return Err(StorageQueryError::DataCorruption(format!(
                "storage key 0x{} is truncated",
                hex::encode(&raw.0)
            )));
        }
        input = &input[digest_len..];
        parts.push(factory.decode(&mut input, key_type)?);
    }

    if parts.len() == 1 {
        Ok(parts.remove(0))
    } else {
        Ok(Value::Array(parts))
    }
}
