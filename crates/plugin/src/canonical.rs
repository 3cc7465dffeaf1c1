use crate::error::PayloadError;
use crate::raw::RawPackage;
use crate::LanguageAdapter;
use surface_api::EngineDescriptor;

/// Adapter for tools that already emit the canonical [`RawPackage`] JSON.
pub struct CanonicalAdapter {
    descriptor: EngineDescriptor,
}

impl CanonicalAdapter {
    pub fn new(descriptor: EngineDescriptor) -> Self {
        Self { descriptor }
    }
}

impl LanguageAdapter for CanonicalAdapter {
    fn descriptor(&self) -> &EngineDescriptor {
        &self.descriptor
    }

    fn parse_payload(&self, payload: &str) -> Result<RawPackage, PayloadError> {
        if payload.trim().is_empty() {
            return Err(PayloadError::Empty);
        }
        Ok(serde_json::from_str(payload)?)
    }
}
