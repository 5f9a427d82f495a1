//! CLI command handler: build the config (defaults → settings file → env → flags) and run.

use anyhow::Result;
use log::debug;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::PipelineConfig;
use crate::engine::arg_parser::Cli;
use crate::engine::decode::{Decoder, ImageDecoder, RawDecoder};
use crate::engine::http::HttpFetcher;
use crate::engine::source::load_descriptors;
use crate::pipeline::Pipeline;
use crate::utils::{apply_file_to_config, http_timeout_from_env, load_spriteflow_toml, setup_logging};

/// Overwrite config field from a CLI flag when given.
macro_rules! apply_cli_opt {
    ($cli:expr, $cfg:expr, $cli_field:ident => $cfg_field:ident) => {
        if let Some(v) = $cli.$cli_field.clone() {
            $cfg.$cfg_field = v;
        }
    };
}

/// Layer the settings file in `dir`, the environment and the CLI flags over the defaults.
pub fn build_config(cli: &Cli, dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    if let Some(file) = load_spriteflow_toml(dir) {
        apply_file_to_config(&file, &mut config);
    }
    if let Some(timeout) = http_timeout_from_env(dir) {
        config.http_timeout = timeout;
    }
    config.output_root = cli.output_dir.clone();
    apply_cli_opt!(cli, config, capacity => channel_capacity);
    apply_cli_opt!(cli, config, workers => fetch_workers);
    apply_cli_opt!(cli, config, extension => artifact_extension);
    apply_cli_opt!(cli, config, progress => progress);
    apply_cli_opt!(cli, config, verbose => verbose);
    if let Some(ms) = cli.decode_delay_ms {
        config.decode_delay = Duration::from_millis(ms);
    }
    config
}

/// Load descriptors and run the pipeline with the HTTP fetcher and default consumers.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let config = build_config(cli, Path::new("."));
    setup_logging(config.verbose);
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        config
    );
    config.validate()?;

    let items = load_descriptors(&cli.inputs)?;
    let decoder: Arc<dyn Decoder> = if cli.raw {
        Arc::new(RawDecoder)
    } else {
        Arc::new(ImageDecoder)
    };
    let fetcher = Arc::new(HttpFetcher::new(config.http_timeout));
    Pipeline::new(config, fetcher, decoder)
        .with_default_sinks()
        .run(items)?;
    Ok(())
}
