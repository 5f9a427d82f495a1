//! Pipeline wiring: the channels between stages and the shared first-error slot.

use std::sync::{Arc, Mutex};

use crate::SharedRecord;
use crate::engine::storage::ArtifactHandle;

use super::channel::{StageReceiver, StageSender, stage_channel};

/// Earliest stage-level failure, as `(stage, message)`. Set once, at the moment it happens.
pub type FirstError = Arc<Mutex<Option<(String, String)>>>;

/// Channels and shared state for one run. Fan-out gets `handle_tx`; transform gets
/// `handle_rx` and every `record_tx`; consumer `i` gets `record_rxs[i]`.
pub struct PipelineChannels {
    pub handle_tx: StageSender<ArtifactHandle>,
    pub handle_rx: StageReceiver<ArtifactHandle>,
    pub record_txs: Vec<StageSender<SharedRecord>>,
    pub record_rxs: Vec<StageReceiver<SharedRecord>>,
    pub first_error: FirstError,
}

/// One handle channel, plus one record channel per consumer so each consumer sees every
/// record and its own end-of-stream marker.
pub fn create_pipeline_channels(channel_cap: usize, num_consumers: usize) -> PipelineChannels {
    let (handle_tx, handle_rx) = stage_channel::<ArtifactHandle>("handles", channel_cap);
    let (record_txs, record_rxs): (Vec<_>, Vec<_>) = (0..num_consumers)
        .map(|i| stage_channel::<SharedRecord>(&format!("records[{i}]"), channel_cap))
        .unzip();

    PipelineChannels {
        handle_tx,
        handle_rx,
        record_txs,
        record_rxs,
        first_error: Arc::new(Mutex::new(None)),
    }
}
