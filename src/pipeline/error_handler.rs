use anyhow::Result;
use log::warn;

use crate::{PipelineConfig, PipelineReport};

use super::context::FirstError;

/// Remember a stage failure unless an earlier one is already recorded.
pub fn record_stage_error(first_error: &FirstError, stage: &str, err: &anyhow::Error) {
    let mut slot = first_error.lock().unwrap();
    if slot.is_none() {
        *slot = Some((stage.to_string(), format!("{err:#}")));
    } else {
        log::debug!("{stage} also failed: {err:#}");
    }
}

/// Check pipeline result: a recorded stage failure becomes the run's error; otherwise log item
/// failures and leftovers. Call after joining every stage.
pub fn check_for_first_error_or_item_failures(
    config: &PipelineConfig,
    first_error: &FirstError,
    report: &PipelineReport,
) -> Result<()> {
    if let Some((stage, msg)) = first_error.lock().unwrap().take() {
        return Err(anyhow::anyhow!("{stage} stage failed: {msg}"));
    }
    let failed = report.item_failures().count();
    if failed > 0 {
        warn!("{} items failed and were skipped", failed);
        if config.verbose {
            for f in report.item_failures() {
                eprintln!("  failed: {} ({})", f.name, f.reason);
            }
        }
    }
    if !report.leftover_artifacts.is_empty() {
        warn!(
            "{} transient artifacts left under {}",
            report.leftover_artifacts.len(),
            config.output_root.display()
        );
    }
    Ok(())
}
