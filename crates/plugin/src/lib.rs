//! Language capability interface.
//!
//! Every supported source language plugs into the core through a thin
//! [`LanguageAdapter`]: a static [`EngineDescriptor`] telling the core how to
//! run the language's extraction tool, plus a normalizer turning the tool's
//! language-specific payload into the canonical [`RawPackage`]. Resolution,
//! execution, caching, reachability and rendering are written once in the core
//! against this trait.

use std::sync::Arc;
use surface_api::{Diagnostic, EngineDescriptor, Language};

pub mod canonical;
pub mod diagnostics;
pub mod error;
pub mod normalize;
pub mod raw;

pub use canonical::CanonicalAdapter;
pub use error::PayloadError;
pub use raw::{RawDependency, RawField, RawModule, RawOperation, RawPackage, RawType};

/// The capability interface implemented once per source language.
pub trait LanguageAdapter: Send + Sync {
    /// Static description of the language's extraction tool.
    fn descriptor(&self) -> &EngineDescriptor;

    fn language(&self) -> &Language {
        &self.descriptor().language
    }

    /// Normalize the tool's primary-channel payload into the canonical shape.
    fn parse_payload(&self, payload: &str) -> Result<RawPackage, PayloadError>;

    /// Parse the tool's secondary channel into diagnostics.
    fn parse_diagnostics(&self, stderr: &str) -> Vec<Diagnostic> {
        diagnostics::parse_side_channel(stderr)
    }

    /// Abstract/marker base types that must never seed reachability
    /// (e.g. `ABC`, `Protocol`).
    fn is_marker_base(&self, _name: &str) -> bool {
        false
    }

    /// Language builtins that are not worth reporting as unresolved.
    fn is_builtin_type(&self, _name: &str) -> bool {
        false
    }

    /// Naming convention used when the collaborator does not flag entry points.
    fn infer_entry_point(&self, ty: &RawType) -> bool {
        ty.name.ends_with("Client") && !ty.operations.is_empty()
    }
}

pub type DynAdapter = Arc<dyn LanguageAdapter>;
