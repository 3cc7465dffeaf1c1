use super::language::Language;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Prefix shared by every per-language container image override variable.
pub const IMAGE_ENV_PREFIX: &str = "SURFACE_IMAGE_";

/// Static, per-language configuration describing how to run an extraction tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EngineDescriptor {
    pub language: Language,
    /// File name of the prebuilt native binary (looked up in install locations).
    pub native_binary: String,
    /// Human-readable runtime tool name (e.g. "python", "go", "java").
    pub runtime_tool: String,
    /// Executable names tried in order; the first one is the primary candidate.
    pub runtime_candidates: Vec<String>,
    /// Collaborator script run by the runtime interpreter, if any.
    pub runtime_script: Option<String>,
    /// Arguments inserted between the interpreter and the script (e.g. `run` for `go run`).
    #[serde(default)]
    pub runtime_prefix_args: Vec<String>,
    pub native_validation_args: Vec<String>,
    pub runtime_validation_args: Vec<String>,
    /// Environment variable overriding the container image reference.
    pub image_env_var: String,
    pub default_image: Option<String>,
    /// Flag asking the tool for its machine-readable payload.
    pub output_flag: String,
    /// Source file extensions that participate in fingerprinting.
    pub extensions: Vec<String>,
}

impl EngineDescriptor {
    /// Create a descriptor with the conventional defaults for a language.
    pub fn new(language: Language, runtime_tool: impl Into<String>) -> Self {
        let runtime_tool = runtime_tool.into();
        let image_env_var = format!("{}{}", IMAGE_ENV_PREFIX, language.env_suffix());
        Self {
            native_binary: format!("surface-{}", language.as_str()),
            runtime_candidates: vec![runtime_tool.clone()],
            runtime_tool,
            runtime_script: None,
            runtime_prefix_args: Vec::new(),
            native_validation_args: vec!["--help".to_string()],
            runtime_validation_args: vec!["--version".to_string()],
            image_env_var,
            default_image: None,
            output_flag: "--json".to_string(),
            extensions: Vec::new(),
            language,
        }
    }

    pub fn with_native_binary(mut self, name: impl Into<String>) -> Self {
        self.native_binary = name.into();
        self
    }

    pub fn with_runtime_candidates<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runtime_candidates = candidates.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_runtime_script(mut self, script: impl Into<String>) -> Self {
        self.runtime_script = Some(script.into());
        self
    }

    pub fn with_runtime_prefix_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runtime_prefix_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_native_validation_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.native_validation_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_runtime_validation_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runtime_validation_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_image(mut self, image: impl Into<String>) -> Self {
        self.default_image = Some(image.into());
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// True if `ext` (without the dot) is a recognized source extension.
    pub fn recognizes_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Unavailable,
    NativeBinary,
    RuntimeInterpreter,
    Container,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionMode::Unavailable => "unavailable",
            ExecutionMode::NativeBinary => "native",
            ExecutionMode::RuntimeInterpreter => "runtime",
            ExecutionMode::Container => "container",
        };
        f.write_str(s)
    }
}

/// Outcome of probing the execution tiers for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AvailabilityResult {
    pub language: Language,
    pub mode: ExecutionMode,
    /// Native binary path, interpreter program, or container image reference.
    pub executable: Option<String>,
    /// Collaborator script for the runtime tier.
    pub script: Option<PathBuf>,
    /// `docker` / `podman` for the container tier.
    pub container_runtime: Option<String>,
    pub warning: Option<String>,
    pub unavailable_reason: Option<String>,
}

impl AvailabilityResult {
    pub fn native(language: Language, binary: PathBuf) -> Self {
        Self {
            language,
            mode: ExecutionMode::NativeBinary,
            executable: Some(binary.display().to_string()),
            script: None,
            container_runtime: None,
            warning: None,
            unavailable_reason: None,
        }
    }

    pub fn runtime(language: Language, program: String, script: Option<PathBuf>) -> Self {
        Self {
            language,
            mode: ExecutionMode::RuntimeInterpreter,
            executable: Some(program),
            script,
            container_runtime: None,
            warning: None,
            unavailable_reason: None,
        }
    }

    pub fn container(language: Language, image: String, container_runtime: String) -> Self {
        Self {
            language,
            mode: ExecutionMode::Container,
            executable: Some(image),
            script: None,
            container_runtime: Some(container_runtime),
            warning: None,
            unavailable_reason: None,
        }
    }

    pub fn unavailable(language: Language, reason: String) -> Self {
        Self {
            language,
            mode: ExecutionMode::Unavailable,
            executable: None,
            script: None,
            container_runtime: None,
            warning: None,
            unavailable_reason: Some(reason),
        }
    }

    pub fn with_warning(mut self, warning: Option<String>) -> Self {
        self.warning = warning;
        self
    }

    pub fn is_available(&self) -> bool {
        self.mode != ExecutionMode::Unavailable
    }
}
