//! Types for engine runs.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config;

/// Suite subset to execute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Suite {
    /// Every suite under the tests root
    All,
    Auth,
    Exercises,
    Routines,
    Workouts,
    Profile,
}

impl Suite {
    /// Folder below the tests root holding this suite (`None` for `all`)
    pub fn dir_name(&self) -> Option<&'static str> {
        match self {
            Suite::All => None,
            Suite::Auth => Some("auth"),
            Suite::Exercises => Some("exercises"),
            Suite::Routines => Some("routines"),
            Suite::Workouts => Some("workouts"),
            Suite::Profile => Some("profile"),
        }
    }
}

/// Browser the suites drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    Chrome,
    Firefox,
    Safari,
    Edge,
}

/// Title-cased, the way the suites' browser library expects it
impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Browser::Chrome => "Chrome",
            Browser::Firefox => "Firefox",
            Browser::Safari => "Safari",
            Browser::Edge => "Edge",
        };
        f.write_str(name)
    }
}

/// Configuration for one engine run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub suite: Suite,

    /// Only run tests carrying this tag
    pub tag: Option<String>,

    pub browser: Browser,

    pub headless: bool,

    /// Number of engine processes; more than one switches to the parallel engine
    pub parallel: u16,

    /// Ask the engine for trace-level logs
    pub verbose: bool,

    /// Root of the suite sources
    pub tests_root: PathBuf,

    /// Root under which the run folder is created
    pub results_root: PathBuf,

    pub robot_bin: String,

    pub pabot_bin: String,
}

impl RunConfig {
    pub fn new(suite: Suite, browser: Browser) -> Self {
        let cfg = config::get();
        Self {
            suite,
            tag: None,
            browser,
            headless: false,
            parallel: 1,
            verbose: false,
            tests_root: PathBuf::from(&cfg.paths.tests_dir),
            results_root: PathBuf::from(&cfg.paths.results_dir),
            robot_bin: cfg.engine.robot_bin.clone(),
            pabot_bin: cfg.engine.pabot_bin.clone(),
        }
    }

    pub fn tag(mut self, tag: Option<String>) -> Self {
        self.tag = tag.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the process count (values below one are raised to one)
    pub fn parallel(mut self, processes: u16) -> Self {
        self.parallel = processes.max(1);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn tests_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tests_root = dir.into();
        self
    }

    pub fn results_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_root = dir.into();
        self
    }

    pub fn robot_bin(mut self, bin: impl Into<String>) -> Self {
        self.robot_bin = bin.into();
        self
    }

    pub fn pabot_bin(mut self, bin: impl Into<String>) -> Self {
        self.pabot_bin = bin.into();
        self
    }

    /// Path handed to the engine as the suite to execute
    pub fn suite_path(&self) -> PathBuf {
        match self.suite.dir_name() {
            Some(dir) => self.tests_root.join(dir),
            None => self.tests_root.clone(),
        }
    }

    /// Build the engine command line writing into `output_dir`
    pub fn engine_command(&self, output_dir: &Path) -> EngineCommand {
        let mut args = Vec::new();

        let program = if self.parallel > 1 {
            args.push("--processes".to_string());
            args.push(self.parallel.to_string());
            self.pabot_bin.clone()
        } else {
            self.robot_bin.clone()
        };

        args.push("--outputdir".to_string());
        args.push(output_dir.display().to_string());
        args.push("--variable".to_string());
        args.push(format!("BROWSER:{}", self.browser));
        args.push("--variable".to_string());
        args.push(format!("HEADLESS:{}", if self.headless { "True" } else { "False" }));

        if let Some(tag) = &self.tag {
            args.push("--include".to_string());
            args.push(tag.clone());
        }
        if self.verbose {
            args.push("--loglevel".to_string());
            args.push("TRACE".to_string());
        }

        args.push(self.suite_path().display().to_string());

        EngineCommand { program, args }
    }
}

/// A fully resolved engine command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// What the engine process reported
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,
    /// Captured diagnostic output
    pub diagnostics: String,
}

impl Invocation {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base() -> RunConfig {
        RunConfig::new(Suite::Auth, Browser::Firefox)
            .tests_root("tests")
            .robot_bin("robot")
            .pabot_bin("pabot")
    }

    #[test]
    fn test_serial_command() {
        let cmd = base().engine_command(Path::new("results/20240101_000000"));
        assert_eq!(cmd.program, "robot");
        assert_eq!(
            cmd.args,
            vec![
                "--outputdir",
                "results/20240101_000000",
                "--variable",
                "BROWSER:Firefox",
                "--variable",
                "HEADLESS:False",
                "tests/auth",
            ]
        );
    }

    #[test]
    fn test_parallel_command_with_filters() {
        let cmd = base()
            .headless(true)
            .parallel(4)
            .verbose(true)
            .tag(Some("checkout".to_string()))
            .engine_command(Path::new("out"));

        assert_eq!(cmd.program, "pabot");
        assert_eq!(&cmd.args[..2], &["--processes", "4"]);
        assert!(cmd.args.contains(&"HEADLESS:True".to_string()));
        let include = cmd.args.iter().position(|a| a == "--include").unwrap();
        assert_eq!(cmd.args[include + 1], "checkout");
        let loglevel = cmd.args.iter().position(|a| a == "--loglevel").unwrap();
        assert_eq!(cmd.args[loglevel + 1], "TRACE");
        assert_eq!(cmd.args.last().unwrap(), "tests/auth");
    }

    #[test]
    fn test_all_suite_uses_tests_root() {
        let config = RunConfig::new(Suite::All, Browser::Chrome).tests_root("suites");
        assert_eq!(config.suite_path(), PathBuf::from("suites"));
    }

    #[test]
    fn test_blank_tag_and_zero_parallel_normalized() {
        let config = base().tag(Some("  ".to_string())).parallel(0);
        assert_eq!(config.tag, None);
        assert_eq!(config.parallel, 1);
        assert_eq!(config.engine_command(Path::new("o")).program, "robot");
    }

    #[test]
    fn test_suite_folders_and_browser_names() {
        let folders: Vec<_> = Suite::value_variants()
            .iter()
            .map(|s| s.dir_name())
            .collect();
        assert_eq!(
            folders,
            vec![
                None,
                Some("auth"),
                Some("exercises"),
                Some("routines"),
                Some("workouts"),
                Some("profile"),
            ]
        );

        let names: Vec<String> = Browser::value_variants()
            .iter()
            .map(|b| b.to_string())
            .collect();
        assert_eq!(names, vec!["Chrome", "Firefox", "Safari", "Edge"]);
        assert_eq!(
            Browser::from_str("safari", true).unwrap(),
            Browser::Safari
        );
    }

    #[test]
    fn test_command_display_quotes_spaces() {
        let cmd = EngineCommand {
            program: "robot".to_string(),
            args: vec!["--outputdir".to_string(), "my results".to_string()],
        };
        assert_eq!(cmd.to_string(), "robot --outputdir \"my results\"");
    }
}
