use std::sync::Arc;
use surface_api::Language;
use surface_core::SurfaceEngine;
use surface_core::config::EngineSettings;
use surface_plugin::DynAdapter;

/// Every adapter shipped with the runtime.
pub fn default_adapters() -> Vec<DynAdapter> {
    vec![
        Arc::new(surface_python::PythonAdapter::new()),
        Arc::new(surface_go::GoAdapter::new()),
        Arc::new(surface_java::JavaAdapter::new()),
    ]
}

/// Bootstraps an engine with all bundled language adapters registered.
pub fn build_default_engine(settings: EngineSettings) -> Arc<SurfaceEngine> {
    let mut builder = SurfaceEngine::builder(settings);
    for adapter in default_adapters() {
        tracing::debug!(language = %adapter.language(), "Registering language adapter");
        builder = builder.register_adapter(adapter);
    }
    Arc::new(builder.build())
}

/// Initializes logging for a component under the settings' log directory.
/// Logging is best effort: a log directory that cannot be created only
/// costs the file output.
pub fn init_logging(settings: &EngineSettings, component: &str, to_stderr: bool) -> Option<impl Drop + use<>> {
    match surface_core::logging::init_logging(&settings.log_dir(), component, to_stderr) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!(
                "warning: logging disabled, cannot write to {}: {e}",
                settings.log_dir().display()
            );
            None
        }
    }
}

/// Parse a language name, accepting file extensions as aliases.
pub fn parse_language(name: &str) -> Language {
    Language::from_extension(name).unwrap_or_else(|| Language::from(name))
}

/// Remove every installed native tool.
pub fn clear_artifacts(engine: &SurfaceEngine) -> surface_core::Result<()> {
    engine.artifacts().clear()?;
    engine.reset();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use surface_core::config::Environment;

    #[test]
    fn test_default_engine_registers_all_languages() {
        let dir = tempfile::tempdir().unwrap();
        let engine = build_default_engine(EngineSettings::rooted_at(
            dir.path(),
            Environment::default(),
        ));
        let mut langs: Vec<_> = engine.languages().cloned().collect();
        langs.sort();
        assert_eq!(langs, vec![Language::GO, Language::JAVA, Language::PYTHON]);
        assert!(engine.adapter(&Language::from("Rust")).is_err());
    }

    #[test]
    fn test_parse_language_aliases() {
        assert_eq!(parse_language("py"), Language::PYTHON);
        assert_eq!(parse_language("Java"), Language::JAVA);
        assert_eq!(parse_language("go"), Language::GO);
    }

    #[test]
    fn test_clear_artifacts_on_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let engine = build_default_engine(EngineSettings::rooted_at(
            dir.path(),
            Environment::default(),
        ));
        clear_artifacts(&engine).unwrap();
        assert!(engine.artifacts().scan().is_empty());
    }

    #[test]
    fn test_logging_guard_outlives_moved_settings() {
        let dir = tempfile::tempdir().unwrap();
        let settings = EngineSettings::rooted_at(dir.path(), Environment::default());
        let guard = init_logging(&settings, "runtime-test", false);
        let engine = build_default_engine(settings);
        assert!(guard.is_some());
        assert!(dir.path().join("logs").is_dir());
        drop(engine);
        drop(guard);
    }
}
