use anyhow::{Context, Result};
use log::{debug, error, info};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::engine::decode::Decoder;
use crate::engine::http::Fetcher;
use crate::engine::progress::fetch_progress;
use crate::engine::storage::ArtifactStore;
use crate::pipeline;
use crate::{ItemDescriptor, PipelineConfig, PipelineReport};

use super::consumer::{CleanupSink, ObserveSink, RecordSink, run_consumer};
use super::context::FirstError;
use super::fan_out::{FanOutContext, run_fan_out};
use super::transform::{TransformContext, run_transform};

/// Fetch → decode → consume pipeline for one batch of descriptors.
///
/// ```ignore
/// let pipeline = Pipeline::new(config, Arc::new(HttpFetcher::new(timeout)), Arc::new(ImageDecoder))
///     .with_default_sinks();
/// let report = pipeline.run(descriptors)?;
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    fetcher: Arc<dyn Fetcher>,
    decoder: Arc<dyn Decoder>,
    sinks: Vec<Box<dyn RecordSink>>,
}

impl Pipeline {
    /// A pipeline with no consumers yet. Add them with [`with_sink`](Self::with_sink).
    pub fn new(config: PipelineConfig, fetcher: Arc<dyn Fetcher>, decoder: Arc<dyn Decoder>) -> Self {
        Self {
            config,
            fetcher,
            decoder,
            sinks: Vec::new(),
        }
    }

    /// Add one consumer stage. Each consumer gets its own channel and sees every record.
    pub fn with_sink(mut self, sink: impl RecordSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Observe + cleanup consumers.
    pub fn with_default_sinks(self) -> Self {
        self.with_sink(ObserveSink).with_sink(CleanupSink)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn num_consumers(&self) -> usize {
        self.sinks.len()
    }

    /// Clear the output root, start every stage on its own thread and wait for all of them.
    ///
    /// The first stage-level failure (by time) becomes the returned error. A failed stage drops
    /// its channel ends, so its neighbours see a disconnect instead of waiting forever.
    pub fn run(self, items: Vec<ItemDescriptor>) -> Result<PipelineReport> {
        let Pipeline {
            config,
            fetcher,
            decoder,
            sinks,
        } = self;
        config.validate()?;
        let started = Instant::now();

        let store = Arc::new(ArtifactStore::new(
            &config.output_root,
            &config.artifact_extension,
        ));
        store.prepare()?;

        let pipeline::PipelineChannels {
            handle_tx,
            handle_rx,
            record_txs,
            record_rxs,
            first_error,
        } = pipeline::create_pipeline_channels(config.channel_capacity, sinks.len());

        debug!(
            "{} descriptors, {} consumers, channel capacity {}",
            items.len(),
            sinks.len(),
            config.channel_capacity
        );

        let fan_ctx = FanOutContext {
            fetcher,
            store: Arc::clone(&store),
            workers: config.fetch_workers,
            progress: fetch_progress(config.progress, items.len()),
        };
        let fan_out = spawn_stage("fan-out", &first_error, handle_tx, move |tx| {
            run_fan_out(items, &fan_ctx, tx)
        })?;

        let transform_ctx = TransformContext {
            decoder,
            decode_delay: config.decode_delay,
        };
        let transform = spawn_stage(
            "transform",
            &first_error,
            (handle_rx, record_txs),
            move |(rx, txs)| run_transform(rx, txs, &transform_ctx),
        )?;

        let consumers = record_rxs
            .into_iter()
            .zip(sinks)
            .map(|(rx, sink)| {
                let name = format!("consume-{}", sink.label());
                spawn_stage(&name, &first_error, (rx, sink), |(rx, sink)| {
                    run_consumer(rx, &mut **sink)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut report = PipelineReport {
            fan_out: join_stage("fan-out", fan_out, &first_error).unwrap_or_default(),
            transform: join_stage("transform", transform, &first_error).unwrap_or_default(),
            ..Default::default()
        };
        for (i, h) in consumers.into_iter().enumerate() {
            if let Some(r) = join_stage(&format!("consumer {i}"), h, &first_error) {
                report.consumers.push(r);
            }
        }
        report.leftover_artifacts = store.leftover_artifacts();
        report.elapsed = started.elapsed();

        pipeline::check_for_first_error_or_item_failures(&config, &first_error, &report)?;
        info!(
            "{} fetched, {} not found, {} decoded in {:.2} s",
            report.fan_out.fetched,
            report.fan_out.skipped,
            report.transform.decoded,
            report.elapsed.as_secs_f64()
        );
        Ok(report)
    }
}

/// Start a stage thread that owns `state` (its channel ends) and runs `f` on it.
///
/// A returned error or a panic is recorded in `first_error` before `state` is dropped, so a
/// neighbour that fails because of the resulting disconnect can never be recorded first.
/// The thread yields `None` on failure.
pub fn spawn_stage<S, R, F>(
    name: &str,
    first_error: &FirstError,
    state: S,
    f: F,
) -> Result<JoinHandle<Option<R>>>
where
    S: Send + 'static,
    R: Send + 'static,
    F: FnOnce(&mut S) -> Result<R> + Send + 'static,
{
    let stage = name.to_string();
    let first_error = Arc::clone(first_error);
    thread::Builder::new()
        .name(stage.clone())
        .spawn(move || {
            let mut state = state;
            let result = panic::catch_unwind(AssertUnwindSafe(|| f(&mut state)))
                .unwrap_or_else(|_| Err(anyhow::anyhow!("stage thread panicked")));
            let out = match result {
                Ok(r) => Some(r),
                Err(e) => {
                    error!("{} stage failed: {:#}", stage, e);
                    pipeline::record_stage_error(&first_error, &stage, &e);
                    None
                }
            };
            drop(state);
            out
        })
        .with_context(|| format!("spawn {name} stage"))
}

/// Join a stage thread started by [`spawn_stage`].
pub fn join_stage<R>(name: &str, handle: JoinHandle<Option<R>>, first_error: &FirstError) -> Option<R> {
    match handle.join() {
        Ok(r) => r,
        Err(_) => {
            pipeline::record_stage_error(first_error, name, &anyhow::anyhow!("thread panicked"));
            None
        }
    }
}
