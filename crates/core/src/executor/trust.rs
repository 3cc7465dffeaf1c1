//! Registry trust policy for container images.

use crate::config::Environment;
use crate::error::{Result, SurfaceError};
use surface_api::EngineDescriptor;

/// Registry prefixes whose images run without an explicit opt-in.
pub const DEFAULT_TRUSTED_REGISTRIES: &[&str] = &["mcr.microsoft.com/", "ghcr.io/surface-tools/"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustDecision {
    Trusted,
    /// The image is untrusted but the global opt-in is set.
    Bypassed { warning: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePolicy {
    trusted_prefixes: Vec<String>,
    allow_untrusted: bool,
}

impl Default for ImagePolicy {
    fn default() -> Self {
        Self::with_trusted_prefixes(DEFAULT_TRUSTED_REGISTRIES.iter().copied())
    }
}

impl ImagePolicy {
    /// Prefixes are compared case-insensitively and always end in `/`, so
    /// `ghcr.io/org/` never matches `ghcr.io/org-evil/...`.
    pub fn with_trusted_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let trusted_prefixes = prefixes
            .into_iter()
            .map(|p| {
                let mut p = p.as_ref().trim().to_ascii_lowercase();
                if !p.ends_with('/') {
                    p.push('/');
                }
                p
            })
            .collect();
        Self {
            trusted_prefixes,
            allow_untrusted: false,
        }
    }

    pub fn allow_untrusted(mut self, allow: bool) -> Self {
        self.allow_untrusted = allow;
        self
    }

    pub fn allows_untrusted(&self) -> bool {
        self.allow_untrusted
    }

    pub fn trusted_prefixes(&self) -> &[String] {
        &self.trusted_prefixes
    }

    pub fn is_trusted(&self, image: &str) -> bool {
        let image = image.trim().to_ascii_lowercase();
        self.trusted_prefixes.iter().any(|p| image.starts_with(p))
    }

    pub fn check(&self, image: &str) -> Result<TrustDecision> {
        if self.is_trusted(image) {
            return Ok(TrustDecision::Trusted);
        }
        if self.allow_untrusted {
            let warning = format!(
                "running untrusted container image '{image}' because {} is set",
                crate::config::ALLOW_UNTRUSTED_ENV
            );
            tracing::warn!(image, "{}", warning);
            return Ok(TrustDecision::Bypassed { warning });
        }
        Err(SurfaceError::UntrustedImage {
            image: image.to_string(),
            trusted: self.trusted_prefixes.join(", "),
        })
    }
}

/// Image for a language: the per-language override variable, else the
/// descriptor's default.
pub fn resolve_image(desc: &EngineDescriptor, env: &Environment) -> Option<String> {
    env.get(&desc.image_env_var)
        .map(|s| s.trim().to_string())
        .or_else(|| desc.default_image.clone())
}
