//! Progress bar utilities for displaying fetch status

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Configuration for creating a progress bar
pub struct ProgressBarConfig {
    pub total: usize,
    pub desc: &'static str,
    pub animation: Animation,
}

impl ProgressBarConfig {
    pub fn new(total: usize, desc: &'static str, animation: Animation) -> Self {
        Self {
            total,
            desc,
            animation,
        }
    }
}

/// Create a progress bar with the given configuration
pub fn create_progress_bar(config: ProgressBarConfig) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = config.total,
        desc = config.desc,
        animation = config.animation,
        unit = " items"
    )))
}

/// Update progress bar. Uses try_lock so a contended bar never stalls a pipeline stage.
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut pb) = pb.try_lock() {
        let _ = pb.update(n);
    }
}

/// Fetch progress bar when enabled, sized to the number of submitted descriptors.
pub fn fetch_progress(enabled: bool, total: usize) -> Option<ProgressBar> {
    enabled.then(|| {
        create_progress_bar(ProgressBarConfig::new(
            total,
            crate::utils::config::ProgressConsts::FETCH_DESC,
            Animation::Classic,
        ))
    })
}
