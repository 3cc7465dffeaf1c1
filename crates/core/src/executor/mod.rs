//! Sandboxed execution of extraction tools.
//!
//! [`SandboxedExecutor`] turns an [`AvailabilityResult`] into a concrete
//! invocation for the selected tier and runs it under the configured time and
//! output limits. Every tier uses the same argument convention:
//! `tool <target> <output-flag>` for extraction and
//! `tool --usage <api-file> <samples>` for usage analysis.

pub mod container;
pub mod path;
pub mod process;
pub mod trust;

use crate::config::ExecutorSettings;
use crate::error::{Result, SurfaceError};
use container::{ContainerRun, INPUT_MOUNT, WORKSPACE_MOUNT};
use process::Invocation;
use std::path::{Path, PathBuf};
use surface_api::{AvailabilityResult, EngineDescriptor, ExecOutput, ExecutionMode};
use tokio_util::sync::CancellationToken;
use trust::{ImagePolicy, TrustDecision};

/// What the tool is asked to do.
#[derive(Debug, Clone)]
enum Request {
    Extract { target: PathBuf },
    Usage { api_file: PathBuf, samples: PathBuf },
}

pub struct SandboxedExecutor {
    settings: ExecutorSettings,
    image_policy: ImagePolicy,
}

impl SandboxedExecutor {
    pub fn new(settings: ExecutorSettings, image_policy: ImagePolicy) -> Self {
        Self {
            settings,
            image_policy,
        }
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    pub fn image_policy(&self) -> &ImagePolicy {
        &self.image_policy
    }

    /// Canonicalize and check a target against the configured workspace root.
    pub fn validate_target(&self, target: &Path) -> Result<PathBuf> {
        path::validate_target(target, self.settings.workspace_root.as_deref())
    }

    pub async fn execute(
        &self,
        availability: &AvailabilityResult,
        desc: &EngineDescriptor,
        target: &Path,
        cancel: &CancellationToken,
    ) -> Result<ExecOutput> {
        let target = self.validate_target(target)?;
        self.run(availability, desc, Request::Extract { target }, cancel)
            .await
    }

    pub async fn execute_usage(
        &self,
        availability: &AvailabilityResult,
        desc: &EngineDescriptor,
        api_file: &Path,
        samples: &Path,
        cancel: &CancellationToken,
    ) -> Result<ExecOutput> {
        let samples = self.validate_target(samples)?;
        let api_file = path::validate_target(api_file, None)?;
        self.run(availability, desc, Request::Usage { api_file, samples }, cancel)
            .await
    }

    async fn run(
        &self,
        availability: &AvailabilityResult,
        desc: &EngineDescriptor,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<ExecOutput> {
        if cancel.is_cancelled() {
            return Err(SurfaceError::Cancelled);
        }

        match availability.mode {
            ExecutionMode::Unavailable => Err(SurfaceError::Unavailable {
                language: desc.language.clone(),
                reason: availability
                    .unavailable_reason
                    .clone()
                    .unwrap_or_else(|| "no execution tier was resolved".to_string()),
            }),
            ExecutionMode::NativeBinary => {
                let program = self.executable(availability, desc)?;
                let inv = Invocation::new(program, host_args(desc, &request));
                process::run(&inv, &self.settings, cancel).await
            }
            ExecutionMode::RuntimeInterpreter => {
                let program = self.executable(availability, desc)?;
                let mut args = desc.runtime_prefix_args.clone();
                if let Some(script) = &availability.script {
                    args.push(script.display().to_string());
                }
                args.extend(host_args(desc, &request));
                let mut inv = Invocation::new(program, args);
                inv.cwd = availability
                    .script
                    .as_deref()
                    .and_then(Path::parent)
                    .map(Path::to_path_buf);
                process::run(&inv, &self.settings, cancel).await
            }
            ExecutionMode::Container => {
                let image = self.executable(availability, desc)?;
                let warning = match self.image_policy.check(&image)? {
                    TrustDecision::Trusted => None,
                    TrustDecision::Bypassed { warning } => Some(warning),
                };
                let runtime = availability
                    .container_runtime
                    .clone()
                    .unwrap_or_else(|| "docker".to_string());
                let container_run = container_request(
                    ContainerRun::new(runtime, image, &desc.language),
                    desc,
                    &request,
                );
                let mut out = container::run(&container_run, &self.settings, cancel).await?;
                out.warnings.extend(warning);
                Ok(out)
            }
        }
    }

    fn executable(&self, availability: &AvailabilityResult, desc: &EngineDescriptor) -> Result<String> {
        availability
            .executable
            .clone()
            .ok_or_else(|| SurfaceError::Unavailable {
                language: desc.language.clone(),
                reason: format!("{} tier resolved without an executable", availability.mode),
            })
    }
}

fn host_args(desc: &EngineDescriptor, request: &Request) -> Vec<String> {
    match request {
        Request::Extract { target } => {
            vec![target.display().to_string(), desc.output_flag.clone()]
        }
        Request::Usage { api_file, samples } => vec![
            "--usage".to_string(),
            api_file.display().to_string(),
            samples.display().to_string(),
        ],
    }
}

fn container_request(run: ContainerRun, desc: &EngineDescriptor, request: &Request) -> ContainerRun {
    match request {
        Request::Extract { target } => run
            .mount(target, WORKSPACE_MOUNT)
            .args([WORKSPACE_MOUNT.to_string(), desc.output_flag.clone()]),
        Request::Usage { api_file, samples } => {
            let dir = api_file.parent().unwrap_or(Path::new("/"));
            let file_name = api_file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            run.mount(samples, WORKSPACE_MOUNT)
                .mount(dir, INPUT_MOUNT)
                .args([
                    "--usage".to_string(),
                    format!("{INPUT_MOUNT}/{file_name}"),
                    WORKSPACE_MOUNT.to_string(),
                ])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surface_api::Language;
    use tempfile::TempDir;

    fn desc() -> EngineDescriptor {
        EngineDescriptor::new(Language::PYTHON, "python")
    }

    #[tokio::test]
    async fn test_unavailable_is_terminal_error() {
        let exec = SandboxedExecutor::new(ExecutorSettings::default(), ImagePolicy::default());
        let dir = TempDir::new().unwrap();
        let avail = AvailabilityResult::unavailable(Language::PYTHON, "native: missing".into());
        let err = exec
            .execute(&avail, &desc(), dir.path(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_terminal());
        assert!(err.to_string().contains("native: missing"));
    }

    #[tokio::test]
    async fn test_untrusted_image_refused_before_running() {
        let exec = SandboxedExecutor::new(ExecutorSettings::default(), ImagePolicy::default());
        let dir = TempDir::new().unwrap();
        let avail = AvailabilityResult::container(
            Language::PYTHON,
            "docker.io/random/extractor:1".into(),
            "/definitely/not/docker".into(),
        );
        let err = exec
            .execute(&avail, &desc(), dir.path(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SurfaceError::UntrustedImage { .. }));
    }

    #[test]
    fn test_usage_container_mounts_inputs() {
        let request = Request::Usage {
            api_file: PathBuf::from("/tmp/x/api.json"),
            samples: PathBuf::from("/src/samples"),
        };
        let run = container_request(
            ContainerRun::new("podman", "img", &Language::PYTHON),
            &desc(),
            &request,
        );
        assert_eq!(run.args, ["--usage", "/surface-input/api.json", "/workspace"]);
        assert_eq!(run.mounts.len(), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_native_invocation_convention() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let tool = dir.path().join("tool.sh");
        std::fs::write(&tool, "#!/bin/sh\necho \"$1|$2\"\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        let target = dir.path().join("pkg");
        std::fs::create_dir(&target).unwrap();

        let exec = SandboxedExecutor::new(ExecutorSettings::default(), ImagePolicy::default());
        let avail = AvailabilityResult::native(Language::PYTHON, tool);
        let out = exec
            .execute(&avail, &desc(), &target, &CancellationToken::new())
            .await
            .unwrap();
        let canonical = target.canonicalize().unwrap();
        assert_eq!(out.stdout.trim(), format!("{}|--json", canonical.display()));
    }
}
