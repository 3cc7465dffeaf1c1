use crate::config::ExecutorSettings;
use crate::executor::process::{self, Invocation};
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Timeout for a single validation invocation.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Answers "does this program run and accept these arguments?".
#[async_trait]
pub trait CommandProbe: Send + Sync {
    async fn probe(&self, program: &str, args: &[String]) -> bool;
}

/// Spawns the program for real, with a short timeout and small output caps.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

#[async_trait]
impl CommandProbe for SystemProbe {
    async fn probe(&self, program: &str, args: &[String]) -> bool {
        let settings = ExecutorSettings {
            timeout: PROBE_TIMEOUT,
            max_output_bytes: 64 * 1024,
            max_stderr_bytes: 64 * 1024,
            workspace_root: None,
        };
        let inv = Invocation::new(program, args.iter().cloned());
        match process::run(&inv, &settings, &CancellationToken::new()).await {
            Ok(out) => {
                tracing::debug!(program, success = out.exit_success, "probe finished");
                out.exit_success
            }
            Err(e) => {
                tracing::debug!(program, error = %e, "probe failed to spawn");
                false
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_system_probe() {
        assert!(SystemProbe.probe("/bin/sh", &["-c".into(), "exit 0".into()]).await);
        assert!(!SystemProbe.probe("/bin/sh", &["-c".into(), "exit 1".into()]).await);
        assert!(!SystemProbe.probe("surface-no-such-program", &[]).await);
    }
}
