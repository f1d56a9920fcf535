use std::time::Duration;

use sp_core::{
    storage::{StorageData, StorageKey},
    H256,
};
use tokio_util::sync::CancellationToken;

/// Default per-transport-call timeout.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(60);

/// Transport page limit for `state_queryStorageAt` and `state_getKeysPaged`.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Upper bound on pages in flight at once when the snapshot is already
/// pinned to an explicit block hash.
pub const DEFAULT_MAX_CONCURRENT_PAGES: usize = 4;

/// Static configuration of the query engine.
#[derive(Debug, Clone)]
pub struct StorageQueryConfig {
    /// Maximum number of keys per `state_queryStorageAt` call and per
    /// `state_getKeysPaged` page.
    pub page_size: usize,
    /// Bound on concurrently in-flight pages for pinned requests.
    pub max_concurrent_pages: usize,
}

impl Default for StorageQueryConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_concurrent_pages: DEFAULT_MAX_CONCURRENT_PAGES,
        }
    }
}

/// What to report for a key that has no value on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingEntryStrategy {
    /// Absence is success: `data` and `value` are both `None`.
    #[default]
    ReturnAbsent,
    /// Decode the entry's metadata-declared default value on the caller's
    /// behalf.
    DefaultValue,
    /// Treat absence as corruption and fail the whole request.
    Fail,
}

/// Per-call decoding policy.
///
/// Scoped per call rather than per storage path, so two callers reading the
/// same entry can opt into different fallback behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodePolicy {
    /// Retry decoding against the entry's fallback value type when the
    /// primary type fails, accommodating values written before a runtime
    /// upgrade.
    pub uses_runtime_fallback: bool,
    pub missing_entry: MissingEntryStrategy,
}

/// Options shared by every facade operation.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Block hash to pin the whole request to. When `None`, the engine
    /// resolves one from the first page so that all pages observe a single
    /// snapshot.
    pub at: Option<H256>,
    /// Per-transport-call timeout; expiry is reported as a transport
    /// failure and never retried internally.
    pub timeout: Duration,
    /// Cancels the request as a unit: not-yet-issued pages are never sent
    /// and in-flight results are discarded instead of merged.
    pub cancellation: CancellationToken,
    pub policy: DecodePolicy,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            at: None,
            timeout: DEFAULT_RPC_TIMEOUT,
            cancellation: CancellationToken::new(),
            policy: DecodePolicy::default(),
        }
    }
}

impl QueryOptions {
    /// Options pinned to an explicit block hash.
    pub fn pinned(at: H256) -> Self {
        Self {
            at: Some(at),
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, policy: DecodePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }
}

/// One queried storage entry.
///
/// `data == None` means the key is absent from chain state, which is not an
/// error. Non-empty `data` always comes with a decoded `value`; undecodable
/// bytes fail the whole request instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageResponse<T> {
    pub key: StorageKey,
    pub data: Option<StorageData>,
    pub value: Option<T>,
}

/// One queried entry of a child (nested) storage trie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildStorageResponse<T> {
    pub storage_key: StorageKey,
    pub child_key: StorageKey,
    pub data: Option<StorageData>,
    pub value: Option<T>,
}
