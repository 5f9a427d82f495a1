//! Spriteflow: a bounded, multi-stage fetch pipeline.
//!
//! Fetch tasks run concurrently and hand transient files, in completion order, to a decode
//! stage through a bounded channel; decoded records are broadcast to every consumer stage
//! (observe, cleanup, or your own [`RecordSink`](pipeline::RecordSink)). Every channel ends
//! with a typed end-of-stream marker, one per consumer.

pub mod engine;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

use std::sync::Arc;

use engine::{HttpFetcher, ImageDecoder};
use pipeline::Pipeline;

/// Result alias used by public spriteflow API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: fetch every descriptor over HTTP, decode as images, log and clean up.
///
/// For a custom transport, decoder or consumers, build a [`Pipeline`] directly.
pub fn fetch_all(config: PipelineConfig, items: Vec<ItemDescriptor>) -> Result<PipelineReport> {
    let fetcher = Arc::new(HttpFetcher::new(config.http_timeout));
    Pipeline::new(config, fetcher, Arc::new(ImageDecoder))
        .with_default_sinks()
        .run(items)
}
