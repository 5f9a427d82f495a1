//! Load `.spriteflow.toml` from a directory (CLI only). Lib callers build [`PipelineConfig`] themselves.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::PipelineConfig;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub struct SpriteflowToml {
    #[serde(default)]
    settings: PipelineSection,
}

#[derive(Debug, Default, Deserialize)]
struct PipelineSection {
    output_dir: Option<String>,
    capacity: Option<usize>,
    workers: Option<usize>,
    decode_delay_ms: Option<u64>,
    extension: Option<String>,
    http_timeout_secs: Option<u64>,
    progress: Option<bool>,
    verbose: Option<bool>,
}

/// Parse settings from a TOML string.
pub fn parse_spriteflow_toml(s: &str) -> anyhow::Result<SpriteflowToml> {
    Ok(toml::from_str(s)?)
}

/// Load the settings file from `dir` if present. Returns None if the file is missing or unreadable.
pub fn load_spriteflow_toml(dir: &Path) -> Option<SpriteflowToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_spriteflow_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

/// Overwrite config field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $cfg:expr, $sec_field:ident => $cfg_field:ident) => {
        if let Some(v) = $sec.$sec_field.clone() {
            $cfg.$cfg_field = v;
        }
    };
}

/// Apply file settings to config (only fields present in the file). Call before applying CLI flags.
pub fn apply_file_to_config(file: &SpriteflowToml, config: &mut PipelineConfig) {
    let sec = &file.settings;
    if let Some(ref p) = sec.output_dir {
        config.output_root = PathBuf::from(p);
    }
    apply_file_opt!(sec, config, capacity => channel_capacity);
    apply_file_opt!(sec, config, workers => fetch_workers);
    apply_file_opt!(sec, config, extension => artifact_extension);
    apply_file_opt!(sec, config, progress => progress);
    apply_file_opt!(sec, config, verbose => verbose);
    if let Some(ms) = sec.decode_delay_ms {
        config.decode_delay = Duration::from_millis(ms);
    }
    if let Some(secs) = sec.http_timeout_secs {
        config.http_timeout = Duration::from_secs(secs);
    }
}
