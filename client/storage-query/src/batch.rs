//! Batched, paginated fetching of raw storage values.
//!
//! A logical request is split into pages of at most
//! [`StorageQueryConfig::page_size`] keys. When the caller pins a block hash
//! the pages are independent and fan out through a bounded buffer; when it
//! does not, the first page resolves the snapshot and every later page is
//! pinned to the block hash it reports, so the whole request observes one
//! consistent state even if the chain head advances between calls.
//!
//! All-or-nothing: any page failure aborts the request and no partial result
//! ever reaches the caller.

use futures::{stream, StreamExt, TryStreamExt};
use log::debug;
use sp_core::{
    storage::{StorageChangeSet, StorageKey},
    H256,
};
use tokio_util::sync::CancellationToken;

use crate::{
    error::StorageQueryError,
    transport::{self, StateRpcEngine},
    types::{QueryOptions, StorageQueryConfig},
};

const LOG_TARGET: &str = "storage-query-batch";

pub(crate) fn ensure_not_cancelled(token: &CancellationToken) -> Result<(), StorageQueryError> {
    if token.is_cancelled() {
        Err(StorageQueryError::Cancelled)
    } else {
        Ok(())
    }
}

/// One page call, raced against cancellation. A result arriving after the
/// token fires is discarded, never merged.
///
/// Every page queries at least one key, so a successful response with zero
/// change sets is structurally invalid.
async fn query_page<E: StateRpcEngine + ?Sized>(
    engine: &E,
    page: &[StorageKey],
    at: Option<H256>,
    options: &QueryOptions,
) -> Result<Vec<StorageChangeSet<H256>>, StorageQueryError> {
    let sets = tokio::select! {
        _ = options.cancellation.cancelled() => Err(StorageQueryError::Cancelled),
        result = transport::query_storage_at(engine, page, at, options.timeout) => result,
    }?;
    if sets.is_empty() {
        return Err(StorageQueryError::DataCorruption(
            "state query returned no change sets for a non-empty page".to_string(),
        ));
    }
    Ok(sets)
}

/// Fan out already-pinned pages, at most `max_concurrent_pages` in flight.
async fn fetch_pages_pinned<E: StateRpcEngine + ?Sized>(
    engine: &E,
    config: &StorageQueryConfig,
    pages: &[&[StorageKey]],
    at: H256,
    options: &QueryOptions,
) -> Result<Vec<StorageChangeSet<H256>>, StorageQueryError> {
    stream::iter(pages.iter().map(|page| query_page(engine, page, Some(at), options)))
        .buffered(config.max_concurrent_pages)
        .try_concat()
        .await
}

/// Fetch the raw values for `keys`, split into pages and re-aggregated.
///
/// Returns the change sets exactly as reported by the transport; ordering
/// and decoding are the merge stage's concern.
pub(crate) async fn fetch_raw<E: StateRpcEngine + ?Sized>(
    engine: &E,
    config: &StorageQueryConfig,
    keys: &[StorageKey],
    options: &QueryOptions,
) -> Result<Vec<StorageChangeSet<H256>>, StorageQueryError> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    ensure_not_cancelled(&options.cancellation)?;

    let pages: Vec<&[StorageKey]> = keys.chunks(config.page_size).collect();
    debug!(
        target: LOG_TARGET,
        "fetching {} key(s) in {} page(s), pinned at {:?}",
        keys.len(),
        pages.len(),
        options.at,
    );

    if let Some(at) = options.at {
        return fetch_pages_pinned(engine, config, &pages, at, options).await;
    }

    // No explicit pin: the first page resolves the snapshot for the rest.
    // query_page rejects empty responses, so the first change set exists.
    let mut all = query_page(engine, pages[0], None, options).await?;
    let resolved = all[0].block;

    if pages.len() > 1 {
        ensure_not_cancelled(&options.cancellation)?;
        debug!(
            target: LOG_TARGET,
            "pinning {} remaining page(s) at resolved block {:?}",
            pages.len() - 1,
            resolved,
        );
        let rest = fetch_pages_pinned(engine, config, &pages[1..], resolved, options).await?;
        all.extend(rest);
    }

    Ok(all)
}
