//! Container tier: `docker`/`podman` run with the network disabled and every
//! host path mounted read-only.

use super::process::{self, Invocation};
use crate::config::ExecutorSettings;
use crate::error::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use surface_api::{ExecOutput, Language};
use tokio_util::sync::CancellationToken;

/// Where the analyzed package is mounted inside the container.
pub const WORKSPACE_MOUNT: &str = "/workspace";
/// Where auxiliary inputs (usage-mode API file) are mounted.
pub const INPUT_MOUNT: &str = "/surface-input";

const REMOVE_TIMEOUT: Duration = Duration::from_secs(15);

static CONTAINER_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub host: PathBuf,
    pub container: String,
}

impl Mount {
    /// `--mount` value; unlike `-v`, tolerates `:` in host paths.
    pub fn arg(&self) -> String {
        format!(
            "type=bind,source={},target={},readonly",
            self.host.display(),
            self.container
        )
    }
}

#[derive(Debug, Clone)]
pub struct ContainerRun {
    pub runtime: String,
    pub image: String,
    pub name: String,
    pub mounts: Vec<Mount>,
    /// Arguments handed to the image's entrypoint.
    pub args: Vec<String>,
}

impl ContainerRun {
    pub fn new(runtime: impl Into<String>, image: impl Into<String>, language: &Language) -> Self {
        Self {
            runtime: runtime.into(),
            image: image.into(),
            name: container_name(language),
            mounts: Vec::new(),
            args: Vec::new(),
        }
    }

    pub fn mount(mut self, host: &Path, container: impl Into<String>) -> Self {
        self.mounts.push(Mount {
            host: host.to_path_buf(),
            container: container.into(),
        });
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn invocation(&self) -> Invocation {
        let mut argv = vec![
            "run".to_string(),
            "--rm".to_string(),
            "--network".to_string(),
            "none".to_string(),
            "--name".to_string(),
            self.name.clone(),
        ];
        for mount in &self.mounts {
            argv.push("--mount".to_string());
            argv.push(mount.arg());
        }
        argv.push(self.image.clone());
        argv.extend(self.args.iter().cloned());
        Invocation::new(self.runtime.clone(), argv)
    }
}

/// Unique per process and call: `surface-<lang>-<pid>-<seq>`.
pub fn container_name(language: &Language) -> String {
    let seq = CONTAINER_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("surface-{}-{}-{}", language.as_str(), std::process::id(), seq)
}

pub async fn run(
    container: &ContainerRun,
    settings: &ExecutorSettings,
    cancel: &CancellationToken,
) -> Result<ExecOutput> {
    let out = process::run(&container.invocation(), settings, cancel).await?;
    if needs_removal(&out) {
        remove(&container.runtime, &container.name).await;
    }
    Ok(out)
}

/// `--rm` only covers a clean exit; a killed client or a failed run can leave
/// the container behind.
fn needs_removal(out: &ExecOutput) -> bool {
    !out.completed() || !out.exit_success || out.output_truncated
}

/// Best-effort `rm -f`; killing the client process does not always stop the
/// container itself.
async fn remove(runtime: &str, name: &str) {
    let inv = Invocation::new(runtime, ["rm", "-f", name]);
    let settings = ExecutorSettings {
        timeout: REMOVE_TIMEOUT,
        ..Default::default()
    };
    match process::run(&inv, &settings, &CancellationToken::new()).await {
        Ok(out) if out.exit_success => tracing::debug!(container = name, "container removed"),
        Ok(out) => tracing::debug!(container = name, stderr = %out.stderr.trim(), "container removal failed"),
        Err(e) => tracing::debug!(container = name, error = %e, "container removal failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_is_sandboxed() {
        let run = ContainerRun::new("docker", "ghcr.io/surface-tools/go:1", &Language::GO)
            .mount(Path::new("/src/pkg"), WORKSPACE_MOUNT)
            .args([WORKSPACE_MOUNT, "--json"]);
        let inv = run.invocation();
        assert_eq!(inv.program, "docker");
        assert_eq!(&inv.args[..4], ["run", "--rm", "--network", "none"]);
        assert_eq!(inv.args[5], run.name);
        assert!(
            inv.args
                .windows(2)
                .any(|w| w == ["--mount", "type=bind,source=/src/pkg,target=/workspace,readonly"])
        );
        assert_eq!(
            &inv.args[inv.args.len() - 3..],
            ["ghcr.io/surface-tools/go:1", "/workspace", "--json"]
        );
    }

    #[test]
    fn test_mount_accepts_colons_in_host_path() {
        let mount = Mount {
            host: PathBuf::from("/data/c:/pkg"),
            container: WORKSPACE_MOUNT.to_string(),
        };
        assert_eq!(
            mount.arg(),
            "type=bind,source=/data/c:/pkg,target=/workspace,readonly"
        );
    }

    #[test]
    fn test_removal_after_any_unclean_exit() {
        let clean = ExecOutput {
            exit_success: true,
            exit_code: Some(0),
            ..Default::default()
        };
        assert!(!needs_removal(&clean));

        let failed = ExecOutput {
            exit_code: Some(125),
            ..Default::default()
        };
        assert!(needs_removal(&failed));
        assert!(needs_removal(&ExecOutput {
            timed_out: true,
            ..Default::default()
        }));
        assert!(needs_removal(&ExecOutput {
            output_truncated: true,
            ..clean.clone()
        }));
    }

    #[test]
    fn test_names_are_unique() {
        let a = container_name(&Language::PYTHON);
        let b = container_name(&Language::PYTHON);
        assert_ne!(a, b);
        assert!(a.starts_with("surface-python-"));
    }
}
