//! Engine configuration.
//!
//! Environment variables are read once into an [`Environment`] snapshot so
//! that every component sees a consistent view and tests can inject their own
//! values without touching the process environment.

use crate::executor::trust::ImagePolicy;
use crate::graph::reachability::ReachabilityPolicy;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const TIMEOUT_ENV: &str = "SURFACE_TIMEOUT_SECS";
pub const ALLOW_UNTRUSTED_ENV: &str = "SURFACE_ALLOW_UNTRUSTED_IMAGES";
pub const TOOLS_DIR_ENV: &str = "SURFACE_TOOLS_DIR";
pub const HOME_ENV: &str = "SURFACE_HOME";
pub const WORKSPACE_ROOT_ENV: &str = "SURFACE_WORKSPACE_ROOT";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 64 * 1024 * 1024;
pub const DEFAULT_MAX_STDERR_BYTES: usize = 1024 * 1024;

/// Snapshot of the variables the engine cares about.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// `1`, `true`, `yes` and `on` (any case) enable a flag.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
    }

    /// Operation timeout; non-numeric or non-positive values fall back to the default.
    pub fn timeout(&self) -> Duration {
        self.get(TIMEOUT_ENV)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub timeout: Duration,
    pub max_output_bytes: usize,
    pub max_stderr_bytes: usize,
    /// Targets must canonicalize to a path under this root when set.
    pub workspace_root: Option<PathBuf>,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            max_stderr_bytes: DEFAULT_MAX_STDERR_BYTES,
            workspace_root: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Base directory for logs and artifacts.
    pub home: PathBuf,
    /// Where prebuilt native binaries and collaborator scripts live.
    pub tools_dir: PathBuf,
    pub artifact_dir: PathBuf,
    pub executor: ExecutorSettings,
    pub image_policy: ImagePolicy,
    pub reachability: ReachabilityPolicy,
    pub env: Environment,
}

impl EngineSettings {
    pub fn from_env(env: Environment) -> Self {
        let home = env
            .get(HOME_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(default_home);
        let tools_dir = env
            .get(TOOLS_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("tools"));
        let executor = ExecutorSettings {
            timeout: env.timeout(),
            workspace_root: env.get(WORKSPACE_ROOT_ENV).map(PathBuf::from),
            ..Default::default()
        };
        let image_policy = ImagePolicy::default().allow_untrusted(env.flag(ALLOW_UNTRUSTED_ENV));

        Self {
            artifact_dir: home.join("artifacts"),
            tools_dir,
            home,
            executor,
            image_policy,
            reachability: ReachabilityPolicy::default(),
            env,
        }
    }

    pub fn from_process_env() -> Self {
        Self::from_env(Environment::from_process())
    }

    /// Settings rooted in an arbitrary directory; used by tests and embedders.
    pub fn rooted_at(home: impl Into<PathBuf>, env: Environment) -> Self {
        let home = home.into();
        let mut settings = Self::from_env(env);
        settings.tools_dir = home.join("tools");
        settings.artifact_dir = home.join("artifacts");
        settings.home = home;
        settings
    }

    /// Confine analyzed packages to `root`.
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.executor.workspace_root = Some(root.into());
        self
    }

    pub fn log_dir(&self) -> PathBuf {
        self.home.join("logs")
    }
}

/// `~/.surface`, or `./.surface` when no home directory is known.
pub fn default_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".surface")
}
