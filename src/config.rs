//! Configuration management with environment variable support.
//!
//! Every path the harness touches is configurable, so the runner and the
//! analysis commands can agree on a results tree without relying on the
//! current working directory.
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `RF_HARNESS_RESULTS_DIR` | Root holding one folder per run | `results` |
//! | `RF_HARNESS_SCREENSHOTS_DIR` | Root for organized screenshots | `screenshots` |
//! | `RF_HARNESS_TESTS_DIR` | Root of the suite sources | `tests` |
//! | `RF_HARNESS_SCRATCH_RUN` | Run folder reserved for manual runs | `test_run` |
//! | `RF_HARNESS_OUTPUT_FILE` | Report file name inside a run folder | `output.xml` |
//! | `RF_HARNESS_ROBOT_BIN` | Engine binary for serial runs | `robot` |
//! | `RF_HARNESS_PABOT_BIN` | Engine binary for parallel runs | `pabot` |
//! | `RF_HARNESS_IMAGE_EXTENSIONS` | Comma-separated screenshot extensions | `png` |
//!
//! # Example
//!
//! ```bash
//! export RF_HARNESS_RESULTS_DIR="/var/ci/results"
//! export RF_HARNESS_IMAGE_EXTENSIONS="png,jpg"
//! ```

use std::env;
use std::sync::OnceLock;

// ============================================================================
// Default Values
// ============================================================================

/// Default results root
pub const DEFAULT_RESULTS_DIR: &str = "results";

/// Default screenshots root
pub const DEFAULT_SCREENSHOTS_DIR: &str = "screenshots";

/// Name of the organized tree below the screenshots root
pub const ORGANIZED_DIR_NAME: &str = "organized";

/// Name of the generated index page inside the organized tree
pub const INDEX_FILE_NAME: &str = "index.html";

/// Default suite sources root
pub const DEFAULT_TESTS_DIR: &str = "tests";

/// Default reserved run folder for scratch/manual runs
pub const DEFAULT_SCRATCH_RUN: &str = "test_run";

/// Default report file name written by the engine
pub const DEFAULT_OUTPUT_FILE: &str = "output.xml";

/// Default engine binary for serial runs
pub const DEFAULT_ROBOT_BIN: &str = "robot";

/// Default engine binary for parallel runs
pub const DEFAULT_PABOT_BIN: &str = "pabot";

/// Default screenshot extensions
pub const DEFAULT_IMAGE_EXTENSIONS: &str = "png";

/// Failure messages longer than this many characters are truncated
pub const MESSAGE_TRUNCATE_AT: usize = 100;

// ============================================================================
// Environment Variable Names
// ============================================================================

pub const ENV_RESULTS_DIR: &str = "RF_HARNESS_RESULTS_DIR";
pub const ENV_SCREENSHOTS_DIR: &str = "RF_HARNESS_SCREENSHOTS_DIR";
pub const ENV_TESTS_DIR: &str = "RF_HARNESS_TESTS_DIR";
pub const ENV_SCRATCH_RUN: &str = "RF_HARNESS_SCRATCH_RUN";
pub const ENV_OUTPUT_FILE: &str = "RF_HARNESS_OUTPUT_FILE";
pub const ENV_ROBOT_BIN: &str = "RF_HARNESS_ROBOT_BIN";
pub const ENV_PABOT_BIN: &str = "RF_HARNESS_PABOT_BIN";
pub const ENV_IMAGE_EXTENSIONS: &str = "RF_HARNESS_IMAGE_EXTENSIONS";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for the harness
#[derive(Debug, Clone)]
pub struct Config {
    /// Filesystem layout shared by the runner and the analysis commands
    pub paths: PathSettings,
    /// Engine invocation settings
    pub engine: EngineSettings,
    /// Screenshot selection settings
    pub screenshots: ScreenshotSettings,
}

/// Filesystem layout
#[derive(Debug, Clone)]
pub struct PathSettings {
    pub results_dir: String,
    pub screenshots_dir: String,
    pub tests_dir: String,
    /// Run folder ignored by the locator and by pruning
    pub scratch_run: String,
    /// Report file name inside each run folder
    pub output_file: String,
}

/// Engine binaries
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub robot_bin: String,
    pub pabot_bin: String,
}

/// Screenshot selection
#[derive(Debug, Clone)]
pub struct ScreenshotSettings {
    /// Lowercase extensions without the leading dot
    pub extensions: Vec<String>,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            paths: PathSettings::from_env(),
            engine: EngineSettings::from_env(),
            screenshots: ScreenshotSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            paths: PathSettings::defaults(),
            engine: EngineSettings::defaults(),
            screenshots: ScreenshotSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl PathSettings {
    pub fn from_env() -> Self {
        Self {
            results_dir: env_or(ENV_RESULTS_DIR, DEFAULT_RESULTS_DIR),
            screenshots_dir: env_or(ENV_SCREENSHOTS_DIR, DEFAULT_SCREENSHOTS_DIR),
            tests_dir: env_or(ENV_TESTS_DIR, DEFAULT_TESTS_DIR),
            scratch_run: env_or(ENV_SCRATCH_RUN, DEFAULT_SCRATCH_RUN),
            output_file: env_or(ENV_OUTPUT_FILE, DEFAULT_OUTPUT_FILE),
        }
    }

    pub fn defaults() -> Self {
        Self {
            results_dir: DEFAULT_RESULTS_DIR.to_string(),
            screenshots_dir: DEFAULT_SCREENSHOTS_DIR.to_string(),
            tests_dir: DEFAULT_TESTS_DIR.to_string(),
            scratch_run: DEFAULT_SCRATCH_RUN.to_string(),
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
        }
    }
}

impl EngineSettings {
    pub fn from_env() -> Self {
        Self {
            robot_bin: env_or(ENV_ROBOT_BIN, DEFAULT_ROBOT_BIN),
            pabot_bin: env_or(ENV_PABOT_BIN, DEFAULT_PABOT_BIN),
        }
    }

    pub fn defaults() -> Self {
        Self {
            robot_bin: DEFAULT_ROBOT_BIN.to_string(),
            pabot_bin: DEFAULT_PABOT_BIN.to_string(),
        }
    }
}

impl ScreenshotSettings {
    pub fn from_env() -> Self {
        let raw = env_or(ENV_IMAGE_EXTENSIONS, DEFAULT_IMAGE_EXTENSIONS);
        let extensions = parse_extensions(&raw);
        if extensions.is_empty() {
            return Self::defaults();
        }
        Self { extensions }
    }

    pub fn defaults() -> Self {
        Self {
            extensions: parse_extensions(DEFAULT_IMAGE_EXTENSIONS),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parse a comma-separated extension list ("PNG, .jpg" -> ["png", "jpg"])
pub fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_start_matches('.').to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
