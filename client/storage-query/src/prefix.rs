//! Cursor-paged enumeration of every key under a storage prefix.

use log::debug;
use sp_core::storage::StorageKey;

use crate::{
    batch::ensure_not_cancelled,
    error::StorageQueryError,
    transport::{self, StateRpcEngine},
    types::{QueryOptions, StorageQueryConfig},
};

const LOG_TARGET: &str = "storage-query-prefix";

/// Enumerate all keys under `prefix`.
///
/// Each page's cursor is the previous page's last key, so the pages form a
/// true sequential dependency and cannot be parallelized. Enumeration stops
/// at the first page shorter than the requested page size.
///
/// Without an explicit block hash in `options`, pages may observe different
/// chain heads; full-prefix enumeration against a moving head cannot be made
/// consistent without snapshot support from the transport, so the caller
/// accepts that point-in-time skew by omitting the pin.
pub(crate) async fn enumerate_keys<E: StateRpcEngine + ?Sized>(
    engine: &E,
    config: &StorageQueryConfig,
    prefix: &StorageKey,
    options: &QueryOptions,
) -> Result<Vec<StorageKey>, StorageQueryError> {
    let page_size = config.page_size as u32;
    let mut keys: Vec<StorageKey> = Vec::new();
    let mut cursor: Option<StorageKey> = None;
    let mut pages = 0usize;

    loop {
        ensure_not_cancelled(&options.cancellation)?;

        let page = tokio::select! {
            _ = options.cancellation.cancelled() => Err(StorageQueryError::Cancelled),
            result = transport::get_keys_paged(
                engine,
                prefix,
                page_size,
                cursor.as_ref(),
                options.at,
                options.timeout,
            ) => result,
        }?;

        pages += 1;
        let fetched = page.len();
        cursor = page.last().cloned();
        keys.extend(page);

        if fetched < page_size as usize {
            break;
        }
    }

    debug!(
        target: LOG_TARGET,
        "enumerated {} key(s) under 0x{} in {} page(s)",
        keys.len(),
        hex::encode(&prefix.0),
        pages,
    );

    Ok(keys)
}
