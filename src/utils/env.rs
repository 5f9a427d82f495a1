//! Environment overrides: process env first, then `.env` in the working directory.

use log::{debug, warn};
use std::path::Path;
use std::time::Duration;

use crate::utils::config::PackagePaths;

fn try_env_then_dotenv(key: &str, dir: &Path) -> Option<String> {
    if let Ok(s) = std::env::var(key) {
        let s = s.trim().to_string();
        if !s.is_empty() {
            return Some(s);
        }
    }
    let env_path = dir.join(".env");
    if env_path.is_file() {
        let _ = dotenvy::from_path(&env_path);
        if let Ok(s) = std::env::var(key) {
            let s = s.trim().to_string();
            if !s.is_empty() {
                return Some(s);
            }
        }
    }
    None
}

/// HTTP timeout from `SPRITEFLOW_HTTP_TIMEOUT_SECS` (env or `.env` in `dir`). Invalid values are ignored.
pub fn http_timeout_from_env(dir: &Path) -> Option<Duration> {
    let key = PackagePaths::get().http_timeout_env_key();
    let raw = try_env_then_dotenv(&key, dir)?;
    match raw.parse::<u64>() {
        Ok(secs) => {
            debug!("{key}={secs}");
            Some(Duration::from_secs(secs))
        }
        Err(e) => {
            warn!("Ignoring {key}={raw}: {e}");
            None
        }
    }
}
