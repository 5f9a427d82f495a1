//! Transform stage: decode artifacts into records and broadcast them to every consumer channel.

use anyhow::Result;
use log::{debug, warn};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::engine::decode::Decoder;
use crate::engine::storage::ArtifactHandle;
use crate::{ItemFailure, MaterializedRecord, SharedRecord, TransformReport};

use super::channel::{Message, StageReceiver, StageSender};

pub struct TransformContext {
    pub decoder: Arc<dyn Decoder>,
    /// Pause after each decode so slower stages get a turn.
    pub decode_delay: Duration,
}

/// Put one end-of-stream marker on each output: one per consumer.
pub fn broadcast_end_of_stream<T>(outputs: &[StageSender<T>]) -> Result<()> {
    for out in outputs {
        out.close()?;
    }
    Ok(())
}

/// Run the transform stage on the current thread.
///
/// Every output channel feeds exactly one consumer, so a record is put on each of them (shared
/// through an `Arc`) and the end-of-stream marker is broadcast the same way. A decode failure
/// is an item failure: logged, recorded, and the artifact is left where it is.
pub fn run_transform(
    input: &StageReceiver<ArtifactHandle>,
    outputs: &[StageSender<SharedRecord>],
    ctx: &TransformContext,
) -> Result<TransformReport> {
    let mut report = TransformReport::default();
    loop {
        let handle = match input.take()? {
            Message::EndOfStream => {
                input.task_done();
                broadcast_end_of_stream(outputs)?;
                break;
            }
            Message::Item(handle) => handle,
        };
        let requested_at = Instant::now();
        let name = handle.name().to_string();
        match ctx.decoder.decode(handle.path()) {
            Ok(image) => {
                if !ctx.decode_delay.is_zero() {
                    thread::sleep(ctx.decode_delay);
                }
                debug!("decoded {} ({}x{})", name, image.width, image.height);
                let record: SharedRecord = Arc::new(MaterializedRecord {
                    name,
                    category: handle.category().to_string(),
                    image,
                    artifact: handle,
                    requested_at,
                });
                for out in outputs {
                    out.put(Arc::clone(&record))?;
                }
                report.decoded += 1;
            }
            Err(e) => {
                let reason = format!("{e:#}");
                warn!("{}: {}", name, reason);
                report.failed.push(ItemFailure { name, reason });
            }
        }
        input.task_done();
    }
    Ok(report)
}
