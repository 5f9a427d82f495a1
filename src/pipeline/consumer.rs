//! Consumer stages: drain one record channel into a side-effecting sink until end-of-stream.

use anyhow::Result;
use log::{debug, info, warn};
use std::time::{Duration, Instant};

use crate::{ConsumerReport, MaterializedRecord, SharedRecord};

use super::channel::{Message, StageReceiver};

/// Per-record side effect of a consumer stage. Errors are item-level: counted, never fatal.
pub trait RecordSink: Send {
    fn label(&self) -> &str;

    /// Handle one record. `waited` is how long the stage blocked on `take` for it.
    fn accept(&mut self, record: &MaterializedRecord, waited: Duration) -> Result<()>;
}

/// Logs each record and how long the consumer waited for it.
#[derive(Default)]
pub struct ObserveSink;

impl RecordSink for ObserveSink {
    fn label(&self) -> &str {
        "observe"
    }

    fn accept(&mut self, record: &MaterializedRecord, waited: Duration) -> Result<()> {
        info!(
            "Loaded {} ({}x{}) in {:.2} s",
            record.name,
            record.image.width,
            record.image.height,
            waited.as_secs_f64()
        );
        debug!(
            "{}: {:.2} s since decode started",
            record.name,
            record.requested_at.elapsed().as_secs_f64()
        );
        Ok(())
    }
}

/// Deletes the transient artifact behind each record. The only stage allowed to delete.
#[derive(Default)]
pub struct CleanupSink;

impl RecordSink for CleanupSink {
    fn label(&self) -> &str {
        "cleanup"
    }

    fn accept(&mut self, record: &MaterializedRecord, _waited: Duration) -> Result<()> {
        info!("Deleting {}", record.artifact.path().display());
        record.artifact.remove()
    }
}

/// Run one consumer stage on the current thread until its own end-of-stream marker.
pub fn run_consumer(
    input: &StageReceiver<SharedRecord>,
    sink: &mut dyn RecordSink,
) -> Result<ConsumerReport> {
    let mut report = ConsumerReport {
        label: sink.label().to_string(),
        ..Default::default()
    };
    loop {
        let start = Instant::now();
        let record = match input.take()? {
            Message::EndOfStream => {
                input.task_done();
                report.end_of_stream = true;
                break;
            }
            Message::Item(record) => record,
        };
        let waited = start.elapsed();
        report.records += 1;
        if let Err(e) = sink.accept(&record, waited) {
            report.errors += 1;
            warn!("{} [{}]: {:#}", record.name, report.label, e);
        }
        input.task_done();
    }
    debug!(
        "{} consumer done: {} records, {} errors",
        report.label, report.records, report.errors
    );
    Ok(report)
}
