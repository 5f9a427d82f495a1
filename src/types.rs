//! Public and internal types for the spriteflow API and pipeline.

use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::engine::storage::ArtifactHandle;

/// Category used when a descriptor has none (or an empty one).
pub const DEFAULT_CATEGORY: &str = "uncategorized";

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Input metadata for one unit of work. Immutable once read from the item source.
///
/// Field names accept both the generic spelling (`name`, `url`, `category`) and the
/// sprite-sheet CSV headers (`Pokemon`, `Sprite`, `Type1`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ItemDescriptor {
    #[serde(alias = "Pokemon")]
    pub name: String,
    #[serde(alias = "Sprite")]
    pub url: String,
    #[serde(alias = "Type1", default = "default_category")]
    pub category: String,
}

impl ItemDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            category: category.into(),
        }
    }
}

/// Decoded in-memory pixel buffer.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Row-major pixel bytes (RGBA8 for [`ImageDecoder`](crate::engine::decode::ImageDecoder)).
    pub pixels: Vec<u8>,
}

/// Decoded form of one artifact. Read-only once built; shared between consumers via `Arc`.
#[derive(Debug)]
pub struct MaterializedRecord {
    pub name: String,
    pub category: String,
    pub image: DecodedImage,
    /// Handle to the transient file the record was decoded from. Only the cleanup consumer removes it.
    pub artifact: ArtifactHandle,
    /// When the transform stage took the originating handle off its input channel.
    pub requested_at: Instant,
}

/// Records travel between transform and consumers behind an `Arc`: one decode, N readers.
pub type SharedRecord = Arc<MaterializedRecord>;

/// Per-task result of a fetch: a handle, nothing to forward, or an isolated failure.
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched(ArtifactHandle),
    Skipped,
    Failed(String),
}

/// One item-level hard failure (transport, storage, decode). Reported, never fatal.
#[derive(Clone, Debug)]
pub struct ItemFailure {
    pub name: String,
    pub reason: String,
}

/// Fan-out stage summary.
#[derive(Clone, Debug, Default)]
pub struct FanOutReport {
    pub submitted: usize,
    pub fetched: usize,
    pub skipped: usize,
    pub failed: Vec<ItemFailure>,
}

/// Transform stage summary.
#[derive(Clone, Debug, Default)]
pub struct TransformReport {
    pub decoded: usize,
    pub failed: Vec<ItemFailure>,
}

/// Consumer stage summary. `end_of_stream` is true when the stage stopped on its own marker.
#[derive(Clone, Debug, Default)]
pub struct ConsumerReport {
    pub label: String,
    pub records: usize,
    pub errors: usize,
    pub end_of_stream: bool,
}

/// Everything a finished run reports.
#[derive(Clone, Debug, Default)]
pub struct PipelineReport {
    pub fan_out: FanOutReport,
    pub transform: TransformReport,
    pub consumers: Vec<ConsumerReport>,
    /// Files still present under the output root after the run.
    pub leftover_artifacts: Vec<PathBuf>,
    pub elapsed: Duration,
}

impl PipelineReport {
    /// Every item-level hard failure across all stages.
    pub fn item_failures(&self) -> impl Iterator<Item = &ItemFailure> {
        self.fan_out.failed.iter().chain(self.transform.failed.iter())
    }
}

/// Options for one pipeline run. Owned by the orchestrator for the lifetime of the run.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Root of the transient artifact tree. Cleared and recreated at the start of a run.
    pub output_root: PathBuf,
    /// Capacity of every stage channel (1 = strict producer/consumer alternation).
    pub channel_capacity: usize,
    /// Upper bound on concurrently running fetch tasks.
    pub fetch_workers: usize,
    /// Pause after each decode.
    pub decode_delay: Duration,
    /// File extension for persisted artifacts.
    pub artifact_extension: String,
    /// Timeout applied to each remote fetch by [`HttpFetcher`](crate::engine::http::HttpFetcher).
    pub http_timeout: Duration,
    /// Show a fetch progress bar.
    pub progress: bool,
    /// Verbose output (debug logging, list item failures).
    pub verbose: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        use crate::utils::config::{FetchWorkerLimits, PipelineDefaults};
        Self {
            output_root: PathBuf::from(PipelineDefaults::OUTPUT_DIR),
            channel_capacity: PipelineDefaults::CHANNEL_CAPACITY,
            fetch_workers: FetchWorkerLimits::current().default_workers(),
            decode_delay: Duration::from_millis(PipelineDefaults::DECODE_DELAY_MS),
            artifact_extension: PipelineDefaults::EXTENSION.to_string(),
            http_timeout: Duration::from_secs(PipelineDefaults::HTTP_TIMEOUT_SECS),
            progress: false,
            verbose: false,
        }
    }
}

impl PipelineConfig {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.channel_capacity == 0 {
            anyhow::bail!("channel capacity must be at least 1");
        }
        if self.fetch_workers == 0 {
            anyhow::bail!("fetch workers must be at least 1");
        }
        if self.artifact_extension.contains(['/', '\\']) {
            anyhow::bail!(
                "artifact extension must not contain path separators: {}",
                self.artifact_extension
            );
        }
        Ok(())
    }
}
