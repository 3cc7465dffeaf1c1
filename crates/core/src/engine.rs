//! The extraction pipeline: resolve, execute, parse, build, analyze, cache.

use crate::artifact::ArtifactCache;
use crate::cache::{ResultCache, fingerprint};
use crate::config::EngineSettings;
use crate::error::{Result, SurfaceError, stderr_excerpt};
use crate::executor::SandboxedExecutor;
use crate::graph::{build_graph, reachable, unresolved_references};
use crate::resolver::{CommandProbe, EngineResolver, SystemProbe};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use surface_api::{
    ApiSurface, AvailabilityResult, Diagnostic, EngineDescriptor, ExecOutput, ExecutionMode,
    Language, UsageReport,
};
use surface_plugin::{DynAdapter, LanguageAdapter};
use tokio_util::sync::CancellationToken;

pub const TRUNCATED_ID: &str = "SURF-TRUNC";
pub const ENGINE_WARNING_ID: &str = "SURF-ENGINE";
pub const IMAGE_WARNING_ID: &str = "SURF-UNTRUSTED-IMAGE";

pub struct SurfaceEngineBuilder {
    settings: EngineSettings,
    adapters: Vec<DynAdapter>,
    probe: Option<Arc<dyn CommandProbe>>,
    container_runtimes: Option<Vec<String>>,
    search_exe_dir: bool,
}

impl SurfaceEngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            adapters: Vec::new(),
            probe: None,
            container_runtimes: None,
            search_exe_dir: true,
        }
    }

    pub fn register_adapter(mut self, adapter: DynAdapter) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn probe(mut self, probe: Arc<dyn CommandProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn container_runtimes<I, S>(mut self, runtimes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.container_runtimes = Some(runtimes.into_iter().map(Into::into).collect());
        self
    }

    /// Do not look for native binaries next to the running executable.
    pub fn without_exe_dir(mut self) -> Self {
        self.search_exe_dir = false;
        self
    }

    pub fn build(self) -> SurfaceEngine {
        let artifacts = Arc::new(ArtifactCache::new(self.settings.artifact_dir.clone()));
        let probe = self.probe.unwrap_or_else(|| Arc::new(SystemProbe));

        let mut resolver = EngineResolver::new(
            probe,
            self.settings.tools_dir.clone(),
            artifacts.clone(),
            self.settings.image_policy.clone(),
            self.settings.env.clone(),
        );
        if let Some(runtimes) = self.container_runtimes {
            resolver = resolver.with_container_runtimes(runtimes);
        }
        if !self.search_exe_dir {
            resolver = resolver.without_exe_dir();
        }

        let executor = SandboxedExecutor::new(
            self.settings.executor.clone(),
            self.settings.image_policy.clone(),
        );

        let adapters = self
            .adapters
            .into_iter()
            .map(|a| (a.language().clone(), a))
            .collect();

        SurfaceEngine {
            settings: self.settings,
            adapters,
            resolver,
            executor,
            artifacts,
            results: ResultCache::new(),
        }
    }
}

pub struct SurfaceEngine {
    settings: EngineSettings,
    adapters: BTreeMap<Language, DynAdapter>,
    resolver: EngineResolver,
    executor: SandboxedExecutor,
    artifacts: Arc<ArtifactCache>,
    results: ResultCache<Arc<ApiSurface>>,
}

impl SurfaceEngine {
    pub fn builder(settings: EngineSettings) -> SurfaceEngineBuilder {
        SurfaceEngineBuilder::new(settings)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn artifacts(&self) -> &ArtifactCache {
        &self.artifacts
    }

    pub fn resolver(&self) -> &EngineResolver {
        &self.resolver
    }

    pub fn languages(&self) -> impl Iterator<Item = &Language> {
        self.adapters.keys()
    }

    pub fn adapter(&self, language: &Language) -> Result<&DynAdapter> {
        self.adapters
            .get(language)
            .ok_or_else(|| SurfaceError::UnsupportedLanguage(language.to_string()))
    }

    pub async fn availability(&self, language: &Language, force_recheck: bool) -> Result<AvailabilityResult> {
        let adapter = self.adapter(language)?;
        Ok(self.resolver.resolve(adapter.descriptor(), force_recheck).await)
    }

    /// The analyzed surface of the package at `path`, served from cache while
    /// its recognized files are unchanged.
    pub async fn surface(
        &self,
        path: &Path,
        language: &Language,
        cancel: &CancellationToken,
    ) -> Result<Arc<ApiSurface>> {
        let adapter = self.adapter(language)?;
        let target = self.executor.validate_target(path)?;
        let fp = self.fingerprint(&target, adapter.descriptor()).await?;

        self.results
            .get_or_compute((target.clone(), language.clone()), &fp, || {
                self.compute(adapter.as_ref(), target.clone(), fp.clone(), cancel)
            })
            .await
    }

    pub async fn render(
        &self,
        path: &Path,
        language: &Language,
        max_length: usize,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let surface = self.surface(path, language, cancel).await?;
        Ok(crate::render::render(&surface.graph, &surface.reachable, max_length))
    }

    /// Which operations of the package's client types the samples exercise.
    pub async fn usage(
        &self,
        path: &Path,
        language: &Language,
        samples: &Path,
        cancel: &CancellationToken,
    ) -> Result<UsageReport> {
        let adapter = self.adapter(language)?;
        let desc = adapter.descriptor();
        let surface = self.surface(path, language, cancel).await?;

        let mut api_file = tempfile::Builder::new()
            .prefix("surface-api-")
            .suffix(".json")
            .tempfile()?;
        api_file.write_all(surface.payload.as_bytes())?;
        api_file.flush()?;

        let availability = self.resolve_available(desc).await?;
        let out = self
            .executor
            .execute_usage(&availability, desc, api_file.path(), samples, cancel)
            .await?;
        self.check_completion(&out, desc, availability.mode)?;
        if !out.exit_success && !out.output_truncated {
            return Err(SurfaceError::ProcessFailure {
                language: desc.language.clone(),
                mode: availability.mode,
                exit_code: out.exit_code,
                stderr: stderr_excerpt(&out.stderr),
            });
        }
        if out.output_truncated {
            return Err(SurfaceError::OutputTooLarge {
                language: desc.language.clone(),
                mode: availability.mode,
                limit: self.settings.executor.max_output_bytes,
            });
        }

        serde_json::from_str(&out.stdout).map_err(|e| SurfaceError::MalformedOutput {
            language: desc.language.clone(),
            mode: availability.mode,
            detail: format!("usage report: {e}"),
        })
    }

    /// Install a compiled native tool for `language`, evicting older builds,
    /// and forget cached tier decisions so the next call picks it up.
    pub async fn install_tool(&self, language: &Language, binary: &Path) -> Result<PathBuf> {
        let adapter = self.adapter(language)?;
        let name = format!(
            "{}{}",
            adapter.descriptor().native_binary,
            std::env::consts::EXE_SUFFIX
        );
        let installed = self.artifacts.install(language, &name, binary).await?;
        self.resolver.reset();
        Ok(installed)
    }

    /// Drop every cached availability decision and surface.
    pub fn reset(&self) {
        self.resolver.reset();
        self.results.clear();
    }

    pub fn invalidate(&self, path: &Path, language: &Language) {
        if let Ok(target) = self.executor.validate_target(path) {
            self.results.invalidate(&(target, language.clone()));
        }
    }

    pub fn cached_surfaces(&self) -> usize {
        self.results.len()
    }

    async fn fingerprint(&self, target: &Path, desc: &EngineDescriptor) -> Result<String> {
        let root = target.to_path_buf();
        let extensions = desc.extensions.clone();
        tokio::task::spawn_blocking(move || fingerprint(&root, &extensions))
            .await
            .map_err(|e| SurfaceError::Io(std::io::Error::other(e.to_string())))?
    }

    async fn resolve_available(&self, desc: &EngineDescriptor) -> Result<AvailabilityResult> {
        let availability = self.resolver.resolve(desc, false).await;
        if !availability.is_available() {
            return Err(SurfaceError::Unavailable {
                language: desc.language.clone(),
                reason: availability
                    .unavailable_reason
                    .unwrap_or_else(|| "no execution tier succeeded".to_string()),
            });
        }
        Ok(availability)
    }

    async fn compute(
        &self,
        adapter: &dyn LanguageAdapter,
        target: PathBuf,
        fp: String,
        cancel: &CancellationToken,
    ) -> Result<Arc<ApiSurface>> {
        let desc = adapter.descriptor();
        let availability = self.resolve_available(desc).await?;
        let mode = availability.mode;

        tracing::info!(path = %target.display(), language = %desc.language, %mode, "extracting api surface");
        let out = self.executor.execute(&availability, desc, &target, cancel).await?;
        self.check_completion(&out, desc, mode)?;

        if !out.exit_success && !out.output_truncated {
            return Err(SurfaceError::ProcessFailure {
                language: desc.language.clone(),
                mode,
                exit_code: out.exit_code,
                stderr: stderr_excerpt(&out.stderr),
            });
        }

        let raw = match adapter.parse_payload(&out.stdout) {
            Ok(raw) => raw,
            Err(_) if out.output_truncated => {
                return Err(SurfaceError::OutputTooLarge {
                    language: desc.language.clone(),
                    mode,
                    limit: self.settings.executor.max_output_bytes,
                });
            }
            Err(e) => {
                return Err(SurfaceError::MalformedOutput {
                    language: desc.language.clone(),
                    mode,
                    detail: e.to_string(),
                });
            }
        };

        let mut diagnostics = Vec::new();
        if let Some(warning) = &availability.warning {
            diagnostics.push(Diagnostic::warning(ENGINE_WARNING_ID, warning.clone()));
        }
        for warning in &out.warnings {
            diagnostics.push(Diagnostic::warning(IMAGE_WARNING_ID, warning.clone()));
        }
        if out.output_truncated {
            diagnostics.push(Diagnostic::warning(
                TRUNCATED_ID,
                format!(
                    "tool output was cut at {} bytes; the surface may be incomplete",
                    self.settings.executor.max_output_bytes
                ),
            ));
        }
        diagnostics.extend(adapter.parse_diagnostics(&out.stderr));

        let graph = build_graph(&raw, adapter);
        let reachable = reachable(&graph, &self.settings.reachability);
        diagnostics.extend(unresolved_references(&graph, &reachable, adapter));

        tracing::info!(
            language = %desc.language,
            nodes = graph.len(),
            reachable = reachable.len(),
            diagnostics = diagnostics.len(),
            "api surface computed"
        );

        Ok(Arc::new(ApiSurface {
            language: desc.language.clone(),
            mode,
            fingerprint: fp,
            graph,
            reachable,
            diagnostics,
            payload: out.stdout,
        }))
    }

    /// Map timeout and cancellation to their distinct errors.
    fn check_completion(&self, out: &ExecOutput, desc: &EngineDescriptor, mode: ExecutionMode) -> Result<()> {
        if out.cancelled {
            return Err(SurfaceError::Cancelled);
        }
        if out.timed_out {
            return Err(SurfaceError::Timeout {
                language: desc.language.clone(),
                mode,
                timeout: self.settings.executor.timeout,
            });
        }
        Ok(())
    }
}
