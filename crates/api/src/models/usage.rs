use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Which operations of the public surface a set of sample files exercises.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    #[serde(default)]
    pub file_count: usize,
    #[serde(default)]
    pub covered: Vec<CoveredOperation>,
    #[serde(default)]
    pub uncovered: Vec<UncoveredOperation>,
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct CoveredOperation {
    pub client: String,
    pub method: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct UncoveredOperation {
    pub client: String,
    pub method: String,
    #[serde(default)]
    pub sig: String,
}

impl UsageReport {
    /// Fraction of known operations exercised by the samples.
    pub fn coverage(&self) -> f64 {
        let total = self.covered.len() + self.uncovered.len();
        if total == 0 {
            return 0.0;
        }
        self.covered.len() as f64 / total as f64
    }
}
