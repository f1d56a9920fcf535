use std::fmt;

use sp_crypto_hashing::{blake2_128, blake2_256, twox_128, twox_256, twox_64};

/// The `(module, item)` pair identifying a storage entry in runtime metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoragePath {
    pub module_name: String,
    pub item_name: String,
}

impl StoragePath {
    pub fn new(module_name: impl Into<String>, item_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            item_name: item_name.into(),
        }
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module_name, self.item_name)
    }
}

/// Hash function applied to an encoded key before it becomes part of a
/// storage address.
///
/// The hasher declared in metadata must be applied exactly as-is per key
/// position. A mismatched hasher produces a syntactically valid but
/// unreachable address, so this is correctness-critical, not cosmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageHasher {
    Blake2_128,
    Blake2_256,
    Blake2_128Concat,
    Twox128,
    Twox256,
    Twox64Concat,
    Identity,
}

impl StorageHasher {
    /// Apply the hash function to an encoded key.
    pub fn hash(&self, encoded: &[u8]) -> Vec<u8> {
        match self {
            Self::Blake2_128 => blake2_128(encoded).to_vec(),
            Self::Blake2_256 => blake2_256(encoded).to_vec(),
            Self::Blake2_128Concat => {
                let mut out = blake2_128(encoded).to_vec();
                out.extend_from_slice(encoded);
                out
            }
            Self::Twox128 => twox_128(encoded).to_vec(),
            Self::Twox256 => twox_256(encoded).to_vec(),
            Self::Twox64Concat => {
                let mut out = twox_64(encoded).to_vec();
                out.extend_from_slice(encoded);
                out
            }
            Self::Identity => encoded.to_vec(),
        }
    }

    /// Number of digest bytes preceding the original encoded key in the
    /// hasher output, for hashers that preserve the key. `None` means the
    /// key cannot be recovered from the address.
    pub fn transparent_prefix_len(&self) -> Option<usize> {
        match self {
            Self::Identity => Some(0),
            Self::Twox64Concat => Some(8),
            Self::Blake2_128Concat => Some(16),
            Self::Blake2_128 | Self::Blake2_256 | Self::Twox128 | Self::Twox256 => None,
        }
    }
}

/// The declared shape of a storage entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageEntryType {
    Plain {
        value_type: String,
    },
    Map {
        hasher: StorageHasher,
        key_type: String,
        value_type: String,
    },
    DoubleMap {
        hasher1: StorageHasher,
        key1_type: String,
        hasher2: StorageHasher,
        key2_type: String,
        value_type: String,
    },
    NMap {
        hashers: Vec<StorageHasher>,
        key_types: Vec<String>,
        value_type: String,
    },
}

impl StorageEntryType {
    /// The named type of the stored value.
    pub fn value_type(&self) -> &str {
        match self {
            Self::Plain { value_type }
            | Self::Map { value_type, .. }
            | Self::DoubleMap { value_type, .. }
            | Self::NMap { value_type, .. } => value_type,
        }
    }
}

/// A storage entry as resolved from runtime metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntryMetadata {
    pub ty: StorageEntryType,
    /// SCALE-encoded default value declared by the runtime, decoded on
    /// behalf of the caller when an absent entry is queried with the
    /// default-value strategy. Empty when the runtime declares none.
    pub default_value: Vec<u8>,
    /// Alternate value type to try when the primary type fails to decode.
    /// Set for entries whose on-chain type changed across a runtime upgrade
    /// while old values are still present.
    pub fallback_value_type: Option<String>,
}

impl StorageEntryMetadata {
    pub fn new(ty: StorageEntryType) -> Self {
        Self {
            ty,
            default_value: Vec::new(),
            fallback_value_type: None,
        }
    }

    pub fn with_default_value(mut self, default_value: Vec<u8>) -> Self {
        self.default_value = default_value;
        self
    }

    pub fn with_fallback_value_type(mut self, type_name: impl Into<String>) -> Self {
        self.fallback_value_type = Some(type_name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_hasher_returns_encoded_key() {
        assert_eq!(StorageHasher::Identity.hash(&[1, 2, 3]), vec![1, 2, 3]);
    }

    #[test]
    fn concat_hashers_preserve_the_encoded_key() {
        let encoded = 42u32.to_le_bytes();

        let twox = StorageHasher::Twox64Concat.hash(&encoded);
        assert_eq!(twox.len(), 8 + encoded.len());
        assert_eq!(&twox[8..], &encoded);

        let blake = StorageHasher::Blake2_128Concat.hash(&encoded);
        assert_eq!(blake.len(), 16 + encoded.len());
        assert_eq!(&blake[16..], &encoded);
    }

    #[test]
    fn opaque_hashers_have_fixed_width_and_no_transparent_prefix() {
        let encoded = b"some encoded key".as_slice();
        assert_eq!(StorageHasher::Twox128.hash(encoded).len(), 16);
        assert_eq!(StorageHasher::Twox256.hash(encoded).len(), 32);
        assert_eq!(StorageHasher::Blake2_128.hash(encoded).len(), 16);
        assert_eq!(StorageHasher::Blake2_256.hash(encoded).len(), 32);

        assert_eq!(StorageHasher::Twox128.transparent_prefix_len(), None);
        assert_eq!(StorageHasher::Blake2_256.transparent_prefix_len(), None);
        assert_eq!(StorageHasher::Identity.transparent_prefix_len(), Some(0));
        assert_eq!(StorageHasher::Twox64Concat.transparent_prefix_len(), Some(8));
        assert_eq!(
            StorageHasher::Blake2_128Concat.transparent_prefix_len(),
            Some(16)
        );
    }

    #[test]
    fn hashing_is_deterministic() {
        let encoded = b"encoded".as_slice();
        assert_eq!(
            StorageHasher::Twox64Concat.hash(encoded),
            StorageHasher::Twox64Concat.hash(encoded)
        );
        assert_eq!(
            StorageHasher::Blake2_128.hash(encoded),
            StorageHasher::Blake2_128.hash(encoded)
        );
    }

    #[test]
    fn storage_path_displays_as_module_dot_item() {
        assert_eq!(
            StoragePath::new("System", "Number").to_string(),
            "System.Number"
        );
    }
}
