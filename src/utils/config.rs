//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    profile_dir_prefix: String,
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
                profile_dir_prefix: format!("{pkg}-browser-"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Per-project config file looked up in the input directory.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Prefix of the temporary browser profile directory.
    pub fn profile_dir_prefix(&self) -> &str {
        &self.profile_dir_prefix
    }

    /// Directory names never descended into, on top of user patterns.
    pub fn default_exclude_patterns(&self) -> Vec<String> {
        vec!["node_modules".to_string(), "vendor".to_string()]
    }
}

// ---- Sizes ----

/// Size ceilings and the part-size heuristic.
pub struct SizeConsts;

impl SizeConsts {
    /// Bytes per "megabyte" when converting the user's part size. Deliberately under 10^6.
    pub const BYTES_PER_MB: f64 = 0.8 * 1000.0 * 1000.0;
    /// Default part ceiling in megabytes.
    pub const DEFAULT_PART_MB: f64 = 10.0;
    /// Files at or above this many kilobytes (10^3) are skipped by the walk.
    pub const MAX_FILE_KB: u64 = 2000;
    /// Multiplier from serialized Markdown length to estimated rendered size.
    pub const AMPLIFICATION: usize = 2;

    pub fn bytes_for_mb(mb: f64) -> usize {
        if !mb.is_finite() || mb <= 0.0 {
            return usize::MAX;
        }
        (mb * Self::BYTES_PER_MB) as usize
    }

    /// True when the walk should skip a file of `len` bytes.
    pub fn is_oversized(len: u64) -> bool {
        len / 1000 >= Self::MAX_FILE_KB
    }
}

// ---- Render workers ----

/// Worker limits for the render pool.
/// Use [`RenderLimits::current()`] to fill `all_threads` from rayon; the rest are const.
#[derive(Clone, Copy, Debug)]
pub struct RenderLimits {
    /// Available threads (from rayon); set by [`RenderLimits::current()`].
    pub all_threads: usize,
    /// Upper bound for the default policy. Each worker drives a whole renderer process.
    pub default_max: usize,
}

impl Default for RenderLimits {
    fn default() -> Self {
        Self {
            all_threads: 1,
            default_max: Self::DEFAULT_MAX_WORKERS,
        }
    }
}

impl RenderLimits {
    pub const DEFAULT_MAX_WORKERS: usize = 4;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }
}

// ---- Render timeouts ----

/// Per-job time limits handed to the backends.
#[derive(Clone, Copy, Debug)]
pub struct RenderTimeouts {
    /// Page load inside the renderer (browser `--timeout`).
    pub page_load: Duration,
    /// Whole artifact; the renderer process is killed past this.
    pub artifact: Duration,
}

impl Default for RenderTimeouts {
    fn default() -> Self {
        Self {
            page_load: Duration::from_secs(10),
            artifact: Duration::from_secs(3 * 60),
        }
    }
}

/// Poll interval while waiting on a renderer process.
pub const PROCESS_POLL_INTERVAL: Duration = Duration::from_millis(50);
