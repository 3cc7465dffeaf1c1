use serde::{Deserialize, Serialize};

/// Captured result of one sandboxed tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_success: bool,
    pub exit_code: Option<i32>,
    /// The configured wall-clock timeout expired.
    pub timed_out: bool,
    /// The caller's cancellation token fired.
    pub cancelled: bool,
    /// Stdout exceeded the capture limit and was cut short.
    pub output_truncated: bool,
    /// Non-fatal notes raised while running, e.g. a bypassed image trust check.
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ExecOutput {
    /// The tool ran to completion on its own.
    pub fn completed(&self) -> bool {
        !self.timed_out && !self.cancelled
    }
}
