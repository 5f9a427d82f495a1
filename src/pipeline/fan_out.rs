//! Fan-out stage: run fetch tasks concurrently and forward handles in completion order.
//!
//! Concurrency is bounded: descriptors go through a pool of `min(workers, n)` fetch threads
//! (`fetch_workers`, 4..=64 by default), not one thread per descriptor. Delivery is still in
//! completion order; with `workers >= n` every fetch runs at once.

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, warn};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crate::engine::http::Fetcher;
use crate::engine::progress::{ProgressBar, update_progress_bar};
use crate::engine::storage::{ArtifactHandle, ArtifactStore};
use crate::{FanOutReport, FetchOutcome, ItemDescriptor, ItemFailure};

use super::channel::StageSender;
use super::fetch::fetch_task;

/// What the fan-out stage needs besides its input and output.
#[derive(Clone)]
pub struct FanOutContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub store: Arc<ArtifactStore>,
    pub workers: usize,
    pub progress: Option<ProgressBar>,
}

/// One finished fetch task, in the order it finished.
struct Completion {
    name: String,
    outcome: FetchOutcome,
}

/// Split off descriptors whose storage path is already claimed by an earlier descriptor.
fn dedupe_by_storage_path(
    items: Vec<ItemDescriptor>,
    store: &ArtifactStore,
) -> (Vec<ItemDescriptor>, Vec<ItemDescriptor>) {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .partition(|item| seen.insert(store.path_for(item)))
}

/// Single fetch worker: pull descriptors from job_rx, run the task, report on done_tx.
/// Stops picking up new descriptors once `stop` is set.
fn fetch_worker_loop(
    job_rx: Receiver<ItemDescriptor>,
    done_tx: Sender<Completion>,
    ctx: FanOutContext,
    stop: Arc<AtomicBool>,
) {
    while let Ok(item) = job_rx.recv() {
        if stop.load(Ordering::Acquire) {
            break;
        }
        let outcome = fetch_task(&item, ctx.fetcher.as_ref(), &ctx.store);
        let completion = Completion {
            name: item.name,
            outcome,
        };
        if done_tx.send(completion).is_err() {
            // Stage loop is gone; nobody will forward this result.
            break;
        }
    }
}

fn spawn_fetch_workers(
    job_rx: Receiver<ItemDescriptor>,
    done_tx: &Sender<Completion>,
    ctx: &FanOutContext,
    num_workers: usize,
    stop: &Arc<AtomicBool>,
) -> Result<Vec<JoinHandle<()>>> {
    let mut workers = Vec::with_capacity(num_workers);
    for i in 0..num_workers {
        let job_rx = job_rx.clone();
        let done_tx = done_tx.clone();
        let ctx = ctx.clone();
        let worker_stop = Arc::clone(stop);
        let spawned = thread::Builder::new()
            .name(format!("fetch-{i}"))
            .spawn(move || fetch_worker_loop(job_rx, done_tx, ctx, worker_stop));
        match spawned {
            Ok(h) => workers.push(h),
            Err(e) => {
                stop.store(true, Ordering::Release);
                join_fetch_workers(workers);
                return Err(e).context("spawn fetch worker");
            }
        }
    }
    Ok(workers)
}

/// Join every worker; returns how many panicked.
fn join_fetch_workers(workers: Vec<JoinHandle<()>>) -> usize {
    workers
        .into_iter()
        .map(JoinHandle::join)
        .filter(Result::is_err)
        .count()
}

/// Run the fan-out stage on the current thread.
///
/// Every descriptor is queued at once and picked up by up to `ctx.workers` fetch workers.
/// Completions are drained in the order they finish; each fetched handle is `put` on `out`
/// (blocking under backpressure). Exactly one end-of-stream marker follows, and only after every
/// worker has exited. Item failures land in the report; only an output failure is an error,
/// and it is returned only after the workers have been stopped and joined.
pub fn run_fan_out(
    items: Vec<ItemDescriptor>,
    ctx: &FanOutContext,
    out: &StageSender<ArtifactHandle>,
) -> Result<FanOutReport> {
    let mut report = FanOutReport {
        submitted: items.len(),
        ..Default::default()
    };

    let (items, duplicates) = dedupe_by_storage_path(items, &ctx.store);
    for dup in duplicates {
        let reason = format!("duplicate storage path {}", ctx.store.path_for(&dup).display());
        warn!("{}: {}", dup.name, reason);
        if let Some(pb) = &ctx.progress {
            update_progress_bar(pb, 1);
        }
        report.failed.push(ItemFailure {
            name: dup.name,
            reason,
        });
    }

    let num_workers = ctx.workers.max(1).min(items.len());
    let (job_tx, job_rx) = unbounded::<ItemDescriptor>();
    for item in items {
        let _ = job_tx.send(item);
    }
    drop(job_tx);

    let (done_tx, done_rx) = unbounded::<Completion>();
    let stop = Arc::new(AtomicBool::new(false));
    let workers = spawn_fetch_workers(job_rx, &done_tx, ctx, num_workers, &stop)?;
    // Dropping our sender lets the drain loop end once every worker exits.
    drop(done_tx);
    debug!("{} fetch workers started", workers.len());

    let drained = drain_completions(&done_rx, ctx, out, &mut report);
    if drained.is_err() {
        // Downstream is gone: no new fetches, and in-flight ones see a closed completion channel.
        stop.store(true, Ordering::Release);
        drop(done_rx);
    }

    // Join on every path so no fetch task outlives the stage.
    let panicked = join_fetch_workers(workers);
    for _ in 0..panicked {
        report.failed.push(ItemFailure {
            name: "<fetch worker>".to_string(),
            reason: "fetch worker panicked".to_string(),
        });
    }
    drained?;

    out.close()?;
    debug!(
        "fan-out done: {} fetched, {} skipped, {} failed",
        report.fetched,
        report.skipped,
        report.failed.len()
    );
    Ok(report)
}

/// Forward completions in the order they arrive until every worker is done.
fn drain_completions(
    done_rx: &Receiver<Completion>,
    ctx: &FanOutContext,
    out: &StageSender<ArtifactHandle>,
    report: &mut FanOutReport,
) -> Result<()> {
    while let Ok(Completion { name, outcome }) = done_rx.recv() {
        if let Some(pb) = &ctx.progress {
            update_progress_bar(pb, 1);
        }
        match outcome {
            FetchOutcome::Fetched(handle) => {
                report.fetched += 1;
                debug!("{} -> {}", name, handle.path().display());
                out.put(handle)?;
            }
            FetchOutcome::Skipped => report.skipped += 1,
            FetchOutcome::Failed(reason) => {
                warn!("{}: {}", name, reason);
                report.failed.push(ItemFailure { name, reason });
            }
        }
    }
    Ok(())
}
