use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    #[default]
    Warning,
    Error,
}

impl Severity {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" | "information" | "note" => Some(Severity::Info),
            "warn" | "warning" => Some(Severity::Warning),
            "error" | "err" | "fatal" => Some(Severity::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

/// Non-fatal finding reported alongside an extracted surface.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, JsonSchema)]
pub struct Diagnostic {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub severity: Severity,
}

impl Diagnostic {
    pub fn new(id: impl Into<String>, text: impl Into<String>, severity: Severity) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            severity,
        }
    }

    pub fn warning(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, text, Severity::Warning)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.severity, self.id, self.text)
    }
}
