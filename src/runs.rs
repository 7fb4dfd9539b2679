//! Run folder management for the results tree.
//!
//! Every engine invocation writes into its own folder under the results
//! root, named after the local time it started (`YYYYMMDD_HHMMSS`). The
//! names are zero-padded, so lexicographic order is chronological order and
//! the latest run is simply the greatest name.
//!
//! One folder name is reserved for scratch/manual runs; it is never reported
//! as the latest run and never pruned.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

use crate::error::{HarnessError, HarnessResult};

/// Name of the metadata file written into each run folder
pub const RUN_METADATA_FILE: &str = ".run.json";

/// Subfolder the suites save their own screenshots into
pub const RUN_SCREENSHOTS_DIR: &str = "screenshots";

/// File name prefix the browser library uses for failure screenshots
pub const SELENIUM_SCREENSHOT_PREFIX: &str = "selenium-screenshot";

/// HTML report written by the engine
pub const REPORT_FILE: &str = "report.html";

/// HTML log written by the engine
pub const LOG_FILE: &str = "log.html";

/// A single run folder under the results root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRun {
    /// Folder name (timestamp-derived)
    pub name: String,
    /// Full path to the folder
    pub path: PathBuf,
}

impl ResultRun {
    fn from_path(path: PathBuf) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_string();
        Some(Self { name, path })
    }

    /// Path of the structured results document inside this run
    pub fn output_path(&self, output_file: &str) -> PathBuf {
        self.path.join(output_file)
    }

    /// Inspect the side files the engine and the suites left in this run
    pub fn artifacts(&self) -> HarnessResult<RunArtifacts> {
        let screenshots_dir = self.path.join(RUN_SCREENSHOTS_DIR);
        let screenshots = if screenshots_dir.is_dir() {
            let mut count = 0;
            for entry in fs::read_dir(&screenshots_dir)? {
                let entry = entry?;
                if entry.file_name().to_string_lossy().ends_with(".png") {
                    count += 1;
                }
            }
            Some(count)
        } else {
            None
        };

        let mut selenium_screenshots = 0;
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if entry
                .file_name()
                .to_string_lossy()
                .starts_with(SELENIUM_SCREENSHOT_PREFIX)
            {
                selenium_screenshots += 1;
            }
        }

        let existing = |name: &str| Some(self.path.join(name)).filter(|p| p.exists());

        Ok(RunArtifacts {
            screenshots,
            selenium_screenshots,
            report: existing(REPORT_FILE),
            log: existing(LOG_FILE),
        })
    }
}

/// Side files found in a run folder next to the structured report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunArtifacts {
    /// PNG count in the run's `screenshots/` subfolder, `None` when absent
    pub screenshots: Option<usize>,
    /// Files in the run folder named `selenium-screenshot*`
    pub selenium_screenshots: usize,
    /// `report.html`, when the engine wrote one
    pub report: Option<PathBuf>,
    /// `log.html`, when the engine wrote one
    pub log: Option<PathBuf>,
}

/// Create a fresh run folder under `results_root`.
///
/// If a folder with the current timestamp already exists (two runs in the
/// same second), a numeric suffix is appended. Suffixed names still sort
/// after the bare timestamp.
pub fn create_run(results_root: &Path) -> HarnessResult<ResultRun> {
    fs::create_dir_all(results_root)?;

    let base = generate_run_name();
    let mut name = base.clone();
    let mut attempt = 0u32;
    loop {
        let path = results_root.join(&name);
        match fs::create_dir(&path) {
            Ok(()) => {
                debug!(run = %name, "created run folder");
                return Ok(ResultRun { name, path });
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                attempt += 1;
                name = format!("{}_{}", base, attempt);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Write the run's metadata file
pub fn write_metadata(run: &ResultRun, details: &serde_json::Value) -> HarnessResult<()> {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let metadata = serde_json::json!({
        "name": run.name,
        "created": chrono::Local::now().to_rfc3339(),
        "host": host,
        "config": details,
    });

    fs::write(
        run.path.join(RUN_METADATA_FILE),
        serde_json::to_string_pretty(&metadata)?,
    )?;
    Ok(())
}

/// List all run folders under `results_root`, sorted by name.
///
/// The reserved scratch folder and hidden folders are excluded.
pub fn list_runs(results_root: &Path, reserved: &str) -> HarnessResult<Vec<ResultRun>> {
    if !results_root.is_dir() {
        return Err(HarnessError::MissingDirectory(results_root.to_path_buf()));
    }

    let mut runs = Vec::new();
    for entry in fs::read_dir(results_root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(run) = ResultRun::from_path(entry.path()) else {
            warn!(path = %entry.path().display(), "skipping run folder with non-UTF-8 name");
            continue;
        };
        if run.name == reserved || run.name.starts_with('.') {
            continue;
        }
        runs.push(run);
    }
    runs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(runs)
}

/// Find the most recent run folder: the greatest name among the qualifying
/// subdirectories of `results_root`.
pub fn latest_run(results_root: &Path, reserved: &str) -> HarnessResult<ResultRun> {
    list_runs(results_root, reserved)?
        .pop()
        .ok_or_else(|| HarnessError::NoResults(results_root.to_path_buf()))
}

/// Find a run folder by name
pub fn find_run(results_root: &Path, name: &str) -> HarnessResult<ResultRun> {
    let path = results_root.join(name);
    if !path.is_dir() {
        return Err(HarnessError::MissingDirectory(path));
    }
    Ok(ResultRun {
        name: name.to_string(),
        path,
    })
}

/// Remove run folders whose modification time is older than `max_age`.
/// Returns the number of folders removed.
pub fn prune_runs(results_root: &Path, reserved: &str, max_age: Duration) -> HarnessResult<usize> {
    let now = SystemTime::now();
    let mut removed = 0;

    for run in list_runs(results_root, reserved)? {
        let modified = match fs::metadata(&run.path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                warn!(run = %run.name, error = %e, "cannot read run folder age");
                continue;
            }
        };
        let Ok(age) = now.duration_since(modified) else {
            continue;
        };
        if age > max_age {
            match fs::remove_dir_all(&run.path) {
                Ok(()) => {
                    info!(run = %run.name, "pruned run folder");
                    removed += 1;
                }
                Err(e) => warn!(run = %run.name, error = %e, "failed to prune run folder"),
            }
        }
    }

    Ok(removed)
}

/// Generate a run folder name in YYYYMMDD_HHMMSS format
pub fn generate_run_name() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_dirs(root: &Path, names: &[&str]) {
        for name in names {
            fs::create_dir_all(root.join(name)).unwrap();
        }
    }

    #[test]
    fn test_latest_run_picks_greatest_name() {
        let tmp = TempDir::new().unwrap();
        make_dirs(
            tmp.path(),
            &["20240101_090000", "20241231_235959", "20240615_120000"],
        );

        let run = latest_run(tmp.path(), "test_run").unwrap();
        assert_eq!(run.name, "20241231_235959");
        assert_eq!(run.path, tmp.path().join("20241231_235959"));
    }

    #[test]
    fn test_latest_run_ignores_scratch_folder() {
        let tmp = TempDir::new().unwrap();
        make_dirs(tmp.path(), &["20240101_090000", "test_run"]);

        // "test_run" sorts after any digit-led name, so it must be excluded explicitly
        let run = latest_run(tmp.path(), "test_run").unwrap();
        assert_eq!(run.name, "20240101_090000");
    }

    #[test]
    fn test_only_scratch_folder_reports_no_results() {
        let tmp = TempDir::new().unwrap();
        make_dirs(tmp.path(), &["test_run"]);
        fs::write(tmp.path().join("stray.txt"), "x").unwrap();

        let err = latest_run(tmp.path(), "test_run").unwrap_err();
        assert!(matches!(err, HarnessError::NoResults(_)));
    }

    #[test]
    fn test_missing_root_reports_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let err = latest_run(&tmp.path().join("nope"), "test_run").unwrap_err();
        assert!(matches!(err, HarnessError::MissingDirectory(_)));
    }

    #[test]
    fn test_list_runs_sorted_and_files_skipped() {
        let tmp = TempDir::new().unwrap();
        make_dirs(tmp.path(), &["b", "a", ".hidden", "test_run"]);
        fs::write(tmp.path().join("c"), "not a dir").unwrap();

        let names: Vec<String> = list_runs(tmp.path(), "test_run")
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_create_run_avoids_collisions() {
        let tmp = TempDir::new().unwrap();
        let first = create_run(tmp.path()).unwrap();
        let second = create_run(tmp.path()).unwrap();

        assert_ne!(first.name, second.name);
        assert!(first.path.is_dir());
        assert!(second.path.is_dir());
        assert_eq!(first.name.len(), "YYYYMMDD_HHMMSS".len());
    }

    #[test]
    fn test_write_metadata() {
        let tmp = TempDir::new().unwrap();
        let run = create_run(tmp.path()).unwrap();
        write_metadata(&run, &serde_json::json!({ "suite": "auth" })).unwrap();

        let raw = fs::read_to_string(run.path.join(RUN_METADATA_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["name"], run.name.as_str());
        assert_eq!(value["config"]["suite"], "auth");
    }

    #[cfg(unix)]
    fn backdate(path: &Path, age: Duration) {
        let dir = fs::File::open(path).unwrap();
        dir.set_modified(SystemTime::now() - age).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_prune_keeps_recent_and_scratch() {
        let tmp = TempDir::new().unwrap();
        make_dirs(
            tmp.path(),
            &["20240101_090000", "20240102_090000", "test_run"],
        );
        let two_days = Duration::from_secs(2 * 24 * 3600);
        backdate(&tmp.path().join("20240101_090000"), two_days);
        backdate(&tmp.path().join("test_run"), two_days);

        let removed = prune_runs(tmp.path(), "test_run", Duration::from_secs(3 * 24 * 3600)).unwrap();
        assert_eq!(removed, 0);

        let removed = prune_runs(tmp.path(), "test_run", Duration::from_secs(24 * 3600)).unwrap();
        assert_eq!(removed, 1);
        assert!(!tmp.path().join("20240101_090000").exists());
        assert!(tmp.path().join("20240102_090000").is_dir());
        assert!(tmp.path().join("test_run").is_dir());
    }

    #[test]
    fn test_artifacts_of_full_run() {
        let tmp = TempDir::new().unwrap();
        make_dirs(tmp.path(), &["20240101_090000/screenshots"]);
        let run = find_run(tmp.path(), "20240101_090000").unwrap();
        fs::write(run.path.join("screenshots/login.png"), "x").unwrap();
        fs::write(run.path.join("screenshots/home.png"), "x").unwrap();
        fs::write(run.path.join("screenshots/notes.txt"), "x").unwrap();
        fs::write(run.path.join("selenium-screenshot-1.png"), "x").unwrap();
        fs::write(run.path.join("selenium-screenshot-2.png"), "x").unwrap();
        fs::write(run.path.join("selenium-screenshot-3.png"), "x").unwrap();
        fs::write(run.path.join(REPORT_FILE), "<html/>").unwrap();
        fs::write(run.path.join(LOG_FILE), "<html/>").unwrap();

        let artifacts = run.artifacts().unwrap();
        assert_eq!(artifacts.screenshots, Some(2));
        assert_eq!(artifacts.selenium_screenshots, 3);
        assert_eq!(artifacts.report, Some(run.path.join(REPORT_FILE)));
        assert_eq!(artifacts.log, Some(run.path.join(LOG_FILE)));
    }

    #[test]
    fn test_artifacts_of_bare_run() {
        let tmp = TempDir::new().unwrap();
        make_dirs(tmp.path(), &["20240101_090000"]);
        let run = find_run(tmp.path(), "20240101_090000").unwrap();

        assert_eq!(run.artifacts().unwrap(), RunArtifacts::default());
    }

    #[test]
    fn test_find_run() {
        let tmp = TempDir::new().unwrap();
        make_dirs(tmp.path(), &["20240101_090000"]);
        assert!(find_run(tmp.path(), "20240101_090000").is_ok());
        assert!(matches!(
            find_run(tmp.path(), "20990101_000000"),
            Err(HarnessError::MissingDirectory(_))
        ));
    }
}
