//! Pipeline components: channels, stages, wiring, error handling.
//!
//! ```text
//! descriptors → [fan-out + fetch workers] → handles → [transform] → records[0..K] → [consumer 0..K]
//! ```

pub mod channel;
pub mod consumer;
pub mod context;
pub mod error_handler;
pub mod fan_out;
pub mod fetch;
pub mod orchestrator;
pub mod transform;

pub use channel::{Message, StageReceiver, StageSender, stage_channel};
pub use consumer::{CleanupSink, ObserveSink, RecordSink, run_consumer};
pub use context::{FirstError, PipelineChannels, create_pipeline_channels};
pub use error_handler::{check_for_first_error_or_item_failures, record_stage_error};
pub use fan_out::{FanOutContext, run_fan_out};
pub use fetch::fetch_task;
pub use orchestrator::{Pipeline, join_stage, spawn_stage};
pub use transform::{TransformContext, broadcast_end_of_stream, run_transform};
