use log::{debug, info};
use std::panic::{self, AssertUnwindSafe};

use crate::engine::http::{FetchResponse, Fetcher};
use crate::engine::storage::{ArtifactHandle, ArtifactStore};
use crate::{FetchOutcome, ItemDescriptor};

/// Retrieve one item and persist it. Not-found yields [`FetchOutcome::Skipped`]; transport and
/// storage errors (and panics) yield [`FetchOutcome::Failed`] so sibling tasks keep running.
pub fn fetch_task(item: &ItemDescriptor, fetcher: &dyn Fetcher, store: &ArtifactStore) -> FetchOutcome {
    let run = || -> anyhow::Result<Option<ArtifactHandle>> {
        match fetcher.fetch(&item.url)? {
            FetchResponse::NotFound => Ok(None),
            FetchResponse::Found(bytes) => {
                let handle = store.persist(item, &bytes)?;
                info!("Downloading {}", item.name);
                Ok(Some(handle))
            }
        }
    };
    match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(Ok(Some(handle))) => FetchOutcome::Fetched(handle),
        Ok(Ok(None)) => {
            debug!("{}: not found at {}", item.name, item.url);
            FetchOutcome::Skipped
        }
        Ok(Err(e)) => FetchOutcome::Failed(format!("{e:#}")),
        Err(payload) => FetchOutcome::Failed(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let msg = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("fetch task panicked: {msg}")
}
