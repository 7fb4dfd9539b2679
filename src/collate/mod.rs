//! Screenshot collation.
//!
//! Walks every run folder under the results root, copies each screenshot to
//! `<screenshots-root>/organized/<run>/<file>` and rewrites
//! `organized/index.html` from everything the organized tree holds, including
//! runs since removed from the results root. Screenshots are copied, never
//! moved, and a copy failure is reported for that file alone.

pub mod index;
pub mod lock;

pub use index::OrganizedIndex;
pub use lock::{CollationLock, LOCK_FILE_NAME};

use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{self, INDEX_FILE_NAME, ORGANIZED_DIR_NAME};
use crate::error::{HarnessError, HarnessResult};

/// Configuration for a collation pass
#[derive(Debug, Clone)]
pub struct CollateConfig {
    /// Root holding one folder per run
    pub results_root: PathBuf,
    /// Root under which `organized/` is written
    pub screenshots_root: PathBuf,
    /// Lowercase screenshot extensions without the leading dot
    pub extensions: Vec<String>,
}

impl CollateConfig {
    pub fn new(results_root: impl Into<PathBuf>, screenshots_root: impl Into<PathBuf>) -> Self {
        Self {
            results_root: results_root.into(),
            screenshots_root: screenshots_root.into(),
            extensions: config::get().screenshots.extensions.clone(),
        }
    }

    pub fn extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn organized_dir(&self) -> PathBuf {
        self.screenshots_root.join(ORGANIZED_DIR_NAME)
    }

    pub fn index_path(&self) -> PathBuf {
        self.organized_dir().join(INDEX_FILE_NAME)
    }

    fn is_screenshot(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }
}

/// A screenshot found under the results root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    /// Run folder the file lives in (first path segment below the root)
    pub run: String,
    pub file_name: String,
    pub source: PathBuf,
}

/// Outcome of a collation pass
#[derive(Debug)]
pub struct CollationReport {
    /// Files copied successfully
    pub copied: usize,
    /// Per-file copy failures; the rest of the pass still ran
    pub failures: Vec<HarnessError>,
    pub index: OrganizedIndex,
    pub index_path: PathBuf,
}

/// Run one collation pass.
///
/// Fails with `MissingDirectory` if the results root is absent and with
/// `NoScreenshots` (leaving any existing index untouched) when the tree holds
/// no screenshots.
pub fn collate(config: &CollateConfig) -> HarnessResult<CollationReport> {
    if !config.results_root.is_dir() {
        return Err(HarnessError::MissingDirectory(config.results_root.clone()));
    }

    let _lock = CollationLock::acquire(&config.screenshots_root)?;

    let screenshots = find_screenshots(config)?;
    if screenshots.is_empty() {
        return Err(HarnessError::NoScreenshots(config.results_root.clone()));
    }
    info!(count = screenshots.len(), "found screenshots");

    let organized = config.organized_dir();
    let mut copied = 0;
    let mut failures = Vec::new();

    for shot in &screenshots {
        match copy_screenshot(shot, &organized) {
            Ok(_) => copied += 1,
            Err(e) => {
                warn!(error = %e, "skipping screenshot");
                failures.push(e);
            }
        }
    }

    // Earlier passes may have organized runs that are gone from the results tree
    let index = scan_organized(config)?;
    let index_path = config.index_path();
    if !index.is_empty() {
        fs::create_dir_all(&organized)?;
        fs::write(&index_path, index.render_html())?;
        info!(
            runs = index.run_count(),
            screenshots = index.screenshot_count(),
            index = %index_path.display(),
            "wrote screenshot index"
        );
    }

    Ok(CollationReport {
        copied,
        failures,
        index,
        index_path,
    })
}

/// Enumerate screenshots under the results root in path order.
///
/// Files directly in the root belong to no run and are skipped, as is the
/// organized tree when it sits inside the results root.
pub fn find_screenshots(config: &CollateConfig) -> HarnessResult<Vec<Screenshot>> {
    let root = &config.results_root;
    if !root.is_dir() {
        return Err(HarnessError::MissingDirectory(root.clone()));
    }
    let organized = config.organized_dir().canonicalize().ok();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && organized.is_some()
                && entry.path().canonicalize().ok() == organized)
        });

    let mut screenshots = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() || !config.is_screenshot(entry.path()) {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let Some(run) = run_segment(relative) else {
            debug!(path = %entry.path().display(), "screenshot outside any run folder");
            continue;
        };
        let Some(file_name) = entry.file_name().to_str() else {
            warn!(path = %entry.path().display(), "skipping screenshot with non-UTF-8 name");
            continue;
        };

        screenshots.push(Screenshot {
            run,
            file_name: file_name.to_string(),
            source: entry.path().to_path_buf(),
        });
    }

    Ok(screenshots)
}

/// Index everything currently in the organized tree: one entry per run
/// folder, one per screenshot file inside it.
pub fn scan_organized(config: &CollateConfig) -> HarnessResult<OrganizedIndex> {
    let organized = config.organized_dir();
    let mut index = OrganizedIndex::new();
    if !organized.is_dir() {
        return Ok(index);
    }

    for run_entry in fs::read_dir(&organized)? {
        let run_entry = run_entry?;
        if !run_entry.file_type()?.is_dir() {
            continue;
        }
        let Some(run) = run_entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if run.starts_with('.') {
            continue;
        }

        for shot_entry in fs::read_dir(run_entry.path())? {
            let shot_entry = shot_entry?;
            let path = shot_entry.path();
            if !shot_entry.file_type()?.is_file() || !config.is_screenshot(&path) {
                continue;
            }
            let Some(file_name) = shot_entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            index.insert(&run, &file_name, image::image_dimensions(&path).ok());
        }
    }

    Ok(index)
}

/// First path segment of `relative`, if it names a folder above the file
fn run_segment(relative: &Path) -> Option<String> {
    let mut components = relative.components();
    let first = match components.next()? {
        Component::Normal(name) => name.to_str()?.to_string(),
        _ => return None,
    };
    // at least one more segment must follow (the file itself)
    components.next()?;
    Some(first)
}

fn copy_screenshot(shot: &Screenshot, organized: &Path) -> HarnessResult<PathBuf> {
    let dest_dir = organized.join(&shot.run);
    let dest = dest_dir.join(&shot.file_name);

    fs::create_dir_all(&dest_dir)
        .and_then(|_| fs::copy(&shot.source, &dest))
        .map_err(|source| HarnessError::FileCopy {
            from: shot.source.clone(),
            to: dest.clone(),
            source,
        })?;

    debug!(from = %shot.source.display(), to = %dest.display(), "copied screenshot");
    Ok(dest)
}
