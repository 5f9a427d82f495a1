//! Application configuration constants.
//! Defaults and limits in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    env_prefix: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
                env_prefix: pkg.to_uppercase(),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Optional settings file looked up in the working directory (e.g. `.spriteflow.toml`).
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Environment variable carrying the HTTP timeout in seconds.
    pub fn http_timeout_env_key(&self) -> String {
        format!("{}_HTTP_TIMEOUT_SECS", self.env_prefix)
    }
}

// ---- Pipeline defaults ----

/// Defaults used when neither the settings file nor the CLI set a value.
pub struct PipelineDefaults;

impl PipelineDefaults {
    pub const OUTPUT_DIR: &'static str = "sprites";
    /// Rendezvous-style hand-off: each put waits for the previous take.
    pub const CHANNEL_CAPACITY: usize = 1;
    /// Simulated decode cost per item (milliseconds).
    pub const DECODE_DELAY_MS: u64 = 200;
    pub const EXTENSION: &'static str = "png";
    pub const HTTP_TIMEOUT_SECS: u64 = 30;
}

// ---- Fetch workers ----

/// Limits for the fetch worker pool. Fetches are I/O bound, so the pool is a multiple of the
/// available threads. Use [`FetchWorkerLimits::current()`] to fill `all_threads` from rayon.
#[derive(Clone, Copy, Debug)]
pub struct FetchWorkerLimits {
    /// Available threads (from rayon); set by [`FetchWorkerLimits::current()`].
    pub all_threads: usize,
    pub per_thread: usize,
    pub floor: usize,
    pub max: usize,
}

impl Default for FetchWorkerLimits {
    fn default() -> Self {
        Self {
            all_threads: 0, // use current() to set from rayon
            per_thread: Self::WORKERS_PER_THREAD,
            floor: Self::FLOOR_WORKERS,
            max: Self::MAX_WORKERS,
        }
    }
}

impl FetchWorkerLimits {
    pub const WORKERS_PER_THREAD: usize = 4;
    pub const FLOOR_WORKERS: usize = 4;
    pub const MAX_WORKERS: usize = 64;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }

    pub fn default_workers(&self) -> usize {
        (self.all_threads * self.per_thread).clamp(self.floor, self.max)
    }
}

// ---- Progress ----

pub struct ProgressConsts;

impl ProgressConsts {
    pub const FETCH_DESC: &'static str = "Fetching";
}
