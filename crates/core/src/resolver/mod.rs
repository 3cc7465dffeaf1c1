//! Engine resolution.
//!
//! Decides, per language, which execution tier can run the extraction tool:
//! a prebuilt native binary, the language runtime running a collaborator
//! script, or a trusted container image. The first tier that validates wins.
//! Results are cached per language until [`EngineResolver::reset`]; concurrent
//! first calls for a language share one probe.

pub mod probe;

use crate::artifact::ArtifactCache;
use crate::config::Environment;
use crate::executor::trust::{self, ImagePolicy, TrustDecision};
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use surface_api::{AvailabilityResult, EngineDescriptor, Language};
use tokio::sync::OnceCell;

pub use probe::{CommandProbe, SystemProbe};

/// Container runtimes, in preference order.
pub const CONTAINER_RUNTIMES: &[&str] = &["docker", "podman"];

pub struct EngineResolver {
    probe: Arc<dyn CommandProbe>,
    tools_dir: PathBuf,
    artifacts: Arc<ArtifactCache>,
    image_policy: ImagePolicy,
    env: Environment,
    container_runtimes: Vec<String>,
    /// Also look next to the running executable.
    search_exe_dir: bool,
    cache: DashMap<Language, Arc<OnceCell<AvailabilityResult>>>,
}

impl EngineResolver {
    pub fn new(
        probe: Arc<dyn CommandProbe>,
        tools_dir: PathBuf,
        artifacts: Arc<ArtifactCache>,
        image_policy: ImagePolicy,
        env: Environment,
    ) -> Self {
        Self {
            probe,
            tools_dir,
            artifacts,
            image_policy,
            env,
            container_runtimes: CONTAINER_RUNTIMES.iter().map(|s| s.to_string()).collect(),
            search_exe_dir: true,
            cache: DashMap::new(),
        }
    }

    pub fn with_container_runtimes<I, S>(mut self, runtimes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.container_runtimes = runtimes.into_iter().map(Into::into).collect();
        self
    }

    /// Skip the running executable's directory; keeps tests hermetic.
    pub fn without_exe_dir(mut self) -> Self {
        self.search_exe_dir = false;
        self
    }

    pub fn tools_dir(&self) -> &PathBuf {
        &self.tools_dir
    }

    /// Resolve the execution tier for `desc`. Never fails: when no tier works
    /// the result is `Unavailable` with a reason naming every attempt.
    pub async fn resolve(&self, desc: &EngineDescriptor, force_recheck: bool) -> AvailabilityResult {
        if force_recheck {
            let fresh = self.probe_tiers(desc).await;
            let cell = Arc::new(OnceCell::new_with(Some(fresh.clone())));
            self.cache.insert(desc.language.clone(), cell);
            return fresh;
        }

        let cell = self
            .cache
            .entry(desc.language.clone())
            .or_default()
            .clone();
        cell.get_or_init(|| self.probe_tiers(desc)).await.clone()
    }

    /// Cached result for a language, without probing.
    pub fn cached(&self, language: &Language) -> Option<AvailabilityResult> {
        self.cache
            .get(language)
            .and_then(|cell| cell.get().cloned())
    }

    pub fn reset(&self) {
        self.cache.clear();
    }

    /// Native binary candidates in lookup order.
    pub fn native_locations(&self, desc: &EngineDescriptor) -> Vec<PathBuf> {
        let binary = format!("{}{}", desc.native_binary, std::env::consts::EXE_SUFFIX);
        let mut locations = vec![self.tools_dir.join(&binary)];
        if let Some(live) = self.artifacts.live_artifact(&desc.language, &binary) {
            locations.push(live);
        }
        if self.search_exe_dir
            && let Ok(exe) = std::env::current_exe()
            && let Some(dir) = exe.parent()
        {
            locations.push(dir.join(&binary));
        }
        locations.dedup();
        locations
    }

    async fn probe_tiers(&self, desc: &EngineDescriptor) -> AvailabilityResult {
        let language = desc.language.clone();
        let mut attempts: Vec<String> = Vec::new();

        match self.probe_native(desc).await {
            Ok(path) => {
                tracing::info!(language = %language, path = %path.display(), "using native binary");
                return AvailabilityResult::native(language, path);
            }
            Err(reason) => attempts.push(reason),
        }

        match self.probe_runtime(desc).await {
            Ok(result) => return result,
            Err(reason) => attempts.push(reason),
        }

        match self.probe_container(desc).await {
            Ok(result) => return result,
            Err(reason) => attempts.push(reason),
        }

        let reason = attempts.join("; ");
        tracing::info!(language = %language, reason = %reason, "no extraction engine available");
        AvailabilityResult::unavailable(language, reason)
    }

    async fn probe_native(&self, desc: &EngineDescriptor) -> Result<PathBuf, String> {
        let mut failed = Vec::new();
        for path in self.native_locations(desc) {
            if !path.is_file() {
                continue;
            }
            let program = path.display().to_string();
            if self.probe.probe(&program, &desc.native_validation_args).await {
                return Ok(path);
            }
            tracing::debug!(path = %program, "native binary failed validation");
            failed.push(program);
        }
        if failed.is_empty() {
            Err(format!(
                "native binary '{}' not found in {}",
                desc.native_binary,
                self.tools_dir.display()
            ))
        } else {
            Err(format!(
                "native binary failed validation ({})",
                failed.join(", ")
            ))
        }
    }

    async fn probe_runtime(&self, desc: &EngineDescriptor) -> Result<AvailabilityResult, String> {
        let script = match &desc.runtime_script {
            Some(name) => {
                let path = self.tools_dir.join(name);
                if !path.is_file() {
                    return Err(format!(
                        "runtime tool '{}' skipped: script {} is missing",
                        desc.runtime_tool,
                        path.display()
                    ));
                }
                Some(path)
            }
            None => None,
        };

        let primary = desc.runtime_candidates.first().cloned().unwrap_or_default();
        for (idx, candidate) in desc.runtime_candidates.iter().enumerate() {
            if !self.probe.probe(candidate, &desc.runtime_validation_args).await {
                continue;
            }
            let warning = (idx > 0).then(|| {
                format!(
                    "using '{candidate}' for {} because the primary candidate '{primary}' is not available",
                    desc.runtime_tool
                )
            });
            if let Some(w) = &warning {
                tracing::warn!(language = %desc.language, "{}", w);
            }
            tracing::info!(language = %desc.language, program = %candidate, "using runtime interpreter");
            return Ok(
                AvailabilityResult::runtime(desc.language.clone(), candidate.clone(), script)
                    .with_warning(warning),
            );
        }

        Err(format!(
            "runtime tool '{}' not found (tried {})",
            desc.runtime_tool,
            desc.runtime_candidates.join(", ")
        ))
    }

    async fn probe_container(&self, desc: &EngineDescriptor) -> Result<AvailabilityResult, String> {
        let Some(image) = trust::resolve_image(desc, &self.env) else {
            return Err(format!(
                "container: no image configured (set {})",
                desc.image_env_var
            ));
        };

        let mut runtime = None;
        for candidate in &self.container_runtimes {
            if self.probe.probe(candidate, &["--version".to_string()]).await {
                runtime = Some(candidate.clone());
                break;
            }
        }
        let Some(runtime) = runtime else {
            return Err(format!(
                "container: no container runtime found (tried {})",
                self.container_runtimes.join(", ")
            ));
        };

        let warning = match self.image_policy.check(&image) {
            Ok(TrustDecision::Trusted) => None,
            Ok(TrustDecision::Bypassed { warning }) => Some(warning),
            Err(e) => return Err(format!("container: {e}")),
        };

        tracing::info!(language = %desc.language, image = %image, runtime = %runtime, "using container image");
        Ok(AvailabilityResult::container(desc.language.clone(), image, runtime).with_warning(warning))
    }
}
