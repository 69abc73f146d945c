//! Application settings.
//!
//! Settings are read, lowest priority first, from:
//! 1. Built-in defaults
//! 2. The YAML file named by `GIT_SYNCER_SETTINGS_YAML`, if set
//! 3. Environment variables prefixed with `GIT_SYNCER_`, with `__` between
//!    nested keys (e.g. `GIT_SYNCER_SCHEDULER__ONE_TIME=true`)
//!
//! Repository addresses then go through placeholder expansion, see
//! [`crate::expand`].

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use syncer_core::{JitteredDelay, SyncRepoTask};
use syncer_git::JobDelays;
use tracing::warn;

use crate::error::SettingsError;
use crate::expand::{Secrets, expand};

/// Variable naming the optional YAML settings file.
pub const SETTINGS_FILE_VAR: &str = "GIT_SYNCER_SETTINGS_YAML";

const ENV_PREFIX: &str = "GIT_SYNCER";

/// Root of the settings tree.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: AppSettings,
    pub logs: LogSettings,
    pub metrics: MetricsSettings,
    pub scheduler: SchedulerSettings,
    pub repos: Vec<RepoSettings>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub env: String,
    pub debug: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            env: "production".to_string(),
            debug: false,
        }
    }
}

impl AppSettings {
    /// Returns true when running in the `development` environment.
    pub fn is_development(&self) -> bool {
        self.env == "development"
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Logs a warning when debug is enabled outside development. Returns
    /// whether it warned.
    pub fn warn_if_debug_outside_development(&self) -> bool {
        let misplaced = self.debug && !self.is_development();
        if misplaced {
            warn!("app.debug is enabled in the {} environment", self.env);
        }
        misplaced
    }
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Compact => write!(f, "compact"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Filter directive, e.g. `info` or `git_syncer=debug,info`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Full,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// Address of the Prometheus scrape endpoint. Metrics are not exported
    /// when unset.
    pub listen: Option<SocketAddr>,
}

/// Job timing and worker settings. Delays and jitters are in seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Finish every job after its first attempt.
    pub one_time: bool,
    /// Worker pool size; defaults to `min(32, cpus + 4)`.
    pub executor_max_workers: Option<usize>,
    pub startup_delay: f64,
    pub startup_jitter: f64,
    pub success_delay: f64,
    pub success_jitter: f64,
    pub retry_delay: f64,
    pub retry_jitter: f64,
    /// Overall time budget in seconds; 0 disables it.
    pub total_timeout: u64,
    /// How long shutdown waits for jobs and workers, in seconds.
    pub close_timeout: u64,
    /// Parent directory for temporary mirrors; the system temp dir if unset.
    pub workspace_dir: Option<PathBuf>,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            one_time: false,
            executor_max_workers: None,
            startup_delay: 0.0,
            startup_jitter: 0.0,
            success_delay: 300.0,
            success_jitter: 0.0,
            retry_delay: 60.0,
            retry_jitter: 0.0,
            total_timeout: 0,
            close_timeout: 10,
            workspace_dir: None,
        }
    }
}

impl SchedulerSettings {
    /// Returns the three job delays.
    pub fn delays(&self) -> JobDelays {
        JobDelays {
            startup: JitteredDelay::from_secs_f64(self.startup_delay, self.startup_jitter),
            success: JitteredDelay::from_secs_f64(self.success_delay, self.success_jitter),
            retry: JitteredDelay::from_secs_f64(self.retry_delay, self.retry_jitter),
        }
    }

    /// Returns the overall time budget, `None` if unbounded.
    pub fn total_timeout(&self) -> Option<Duration> {
        (self.total_timeout > 0).then(|| Duration::from_secs(self.total_timeout))
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_secs(self.close_timeout)
    }
}

/// One repository to mirror.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RepoSettings {
    pub source: String,
    pub target: String,
    pub include_ref: Vec<String>,
    pub include_ref_regex: Vec<String>,
    pub exclude_ref: Vec<String>,
    pub exclude_ref_regex: Vec<String>,
}

impl RepoSettings {
    /// Builds the sync task, compiling every pattern.
    pub fn to_task(&self) -> syncer_core::Result<SyncRepoTask> {
        SyncRepoTask::builder()
            .source(&self.source)
            .target(&self.target)
            .include_refs(&self.include_ref)
            .include_ref_patterns(&self.include_ref_regex)
            .exclude_refs(&self.exclude_ref)
            .exclude_ref_patterns(&self.exclude_ref_regex)
            .build()
    }
}

impl Settings {
    /// Loads settings from the process environment.
    ///
    /// Secrets revealed while expanding repository addresses are registered
    /// in `secrets`.
    ///
    /// # Errors
    ///
    /// Any [`SettingsError`]; all of them should abort startup.
    pub fn load(secrets: &Secrets) -> Result<Self, SettingsError> {
        Self::load_with(None, secrets)
    }

    /// Loads settings with `vars` standing in for the process environment.
    pub fn load_from_vars(
        vars: HashMap<String, String>,
        secrets: &Secrets,
    ) -> Result<Self, SettingsError> {
        Self::load_with(Some(vars), secrets)
    }

    /// Parses settings from a YAML document, without environment overrides.
    pub fn from_yaml_str(yaml: &str, secrets: &Secrets) -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()?;

        settings.expanded(|name| std::env::var(name).ok(), secrets)
    }

    fn load_with(
        vars: Option<HashMap<String, String>>,
        secrets: &Secrets,
    ) -> Result<Self, SettingsError> {
        let lookup = |name: &str| match &vars {
            Some(vars) => vars.get(name).cloned(),
            None => std::env::var(name).ok(),
        };

        let mut builder = Config::builder();

        if let Some(path) = lookup(SETTINGS_FILE_VAR).filter(|p| !p.is_empty()) {
            let path = PathBuf::from(path);
            if !path.exists() {
                return Err(SettingsError::FileNotFound(path));
            }
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Yaml));
        }

        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(vars.clone());

        let settings: Settings = builder.add_source(environment).build()?.try_deserialize()?;
        settings.expanded(lookup, secrets)
    }

    fn expanded<F>(mut self, lookup: F, secrets: &Secrets) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for repo in &mut self.repos {
            repo.source = expand(&repo.source, &lookup, secrets)?;
            repo.target = expand(&repo.target, &lookup, secrets)?;
        }
        Ok(self)
    }

    /// Builds one sync task per configured repository.
    ///
    /// # Errors
    ///
    /// [`SettingsError::InvalidRepo`] for the first repository missing an
    /// address or carrying an invalid pattern.
    pub fn tasks(&self) -> Result<Vec<SyncRepoTask>, SettingsError> {
        self.repos
            .iter()
            .enumerate()
            .map(|(index, repo)| {
                repo.to_task()
                    .map_err(|source| SettingsError::InvalidRepo { index, source })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();

        assert_eq!(settings.app.env, "production");
        assert!(!settings.app.is_debug());
        assert_eq!(settings.logs.level, "info");
        assert_eq!(settings.logs.format, LogFormat::Full);
        assert!(settings.metrics.listen.is_none());
        assert!(!settings.scheduler.one_time);
        assert_eq!(settings.scheduler.total_timeout(), None);
        assert_eq!(settings.scheduler.close_timeout(), Duration::from_secs(10));
        assert!(settings.repos.is_empty());
    }

    #[test]
    fn test_default_delays() {
        let delays = SchedulerSettings::default().delays();

        assert_eq!(delays.startup, JitteredDelay::default());
        assert_eq!(delays.success, JitteredDelay::fixed(Duration::from_secs(300)));
        assert_eq!(delays.retry, JitteredDelay::fixed(Duration::from_secs(60)));
    }

    #[test]
    fn test_fractional_delays() {
        let scheduler = SchedulerSettings {
            retry_delay: 1.5,
            retry_jitter: 0.5,
            ..SchedulerSettings::default()
        };

        let retry = scheduler.delays().retry;
        assert_eq!(retry.delay, Duration::from_millis(1500));
        assert_eq!(retry.jitter, Duration::from_millis(500));
    }

    #[test]
    fn test_development_debug() {
        let app = AppSettings {
            env: "development".to_string(),
            debug: true,
        };
        assert!(app.is_development());
        assert!(app.is_debug());
        assert!(!app.warn_if_debug_outside_development());
    }

    #[test]
    fn test_debug_outside_development_warns() {
        let app = AppSettings {
            env: "staging".to_string(),
            debug: true,
        };
        assert!(app.is_debug());
        assert!(app.warn_if_debug_outside_development());

        assert!(!AppSettings::default().warn_if_debug_outside_development());
    }

    #[test]
    fn test_repo_to_task() {
        let repo = RepoSettings {
            source: "https://example.com/a.git".to_string(),
            target: "https://example.com/b.git".to_string(),
            exclude_ref_regex: vec!["refs/heads/tmp.*".to_string()],
            ..RepoSettings::default()
        };

        let task = repo.to_task().unwrap();
        assert!(task.includes("refs/heads/main"));
        assert!(!task.includes("refs/heads/tmp1"));
    }

    #[test]
    fn test_invalid_pattern_names_repository() {
        let settings = Settings {
            repos: vec![
                RepoSettings {
                    source: "a".to_string(),
                    target: "b".to_string(),
                    ..RepoSettings::default()
                },
                RepoSettings {
                    source: "c".to_string(),
                    target: "d".to_string(),
                    include_ref_regex: vec!["refs/(".to_string()],
                    ..RepoSettings::default()
                },
            ],
            ..Settings::default()
        };

        let err = settings.tasks().unwrap_err();
        assert!(matches!(err, SettingsError::InvalidRepo { index: 1, .. }));
    }

    #[test]
    fn test_log_format_display() {
        assert_eq!(LogFormat::Json.to_string(), "json");
        assert_eq!(LogFormat::default().to_string(), "full");
    }
}
