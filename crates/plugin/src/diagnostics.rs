//! Side-channel (stderr) diagnostics.
//!
//! Tools may write one JSON object per line (`{"id","text","severity"}`) or a
//! plain `warning: ...` / `error: ...` / `info: ...` line. Anything else on
//! stderr is treated as noise.

use serde::Deserialize;
use surface_api::{Diagnostic, Severity};

const PLAIN_ID_PREFIX: &str = "TOOL";

#[derive(Deserialize)]
struct JsonDiagnostic {
    #[serde(default)]
    id: Option<String>,
    #[serde(alias = "message")]
    text: String,
    #[serde(default)]
    severity: Option<String>,
}

pub fn parse_side_channel(stderr: &str) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for line in stderr.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('{') {
            if let Ok(d) = serde_json::from_str::<JsonDiagnostic>(line) {
                let severity = d
                    .severity
                    .as_deref()
                    .and_then(Severity::parse)
                    .unwrap_or_default();
                let id = d
                    .id
                    .unwrap_or_else(|| format!("{}-{}", PLAIN_ID_PREFIX, severity));
                out.push(Diagnostic::new(id, d.text, severity));
            }
            continue;
        }
        if let Some(diag) = parse_plain(line) {
            out.push(diag);
        }
    }
    out
}

fn parse_plain(line: &str) -> Option<Diagnostic> {
    let (head, rest) = line.split_once(':')?;
    let severity = Severity::parse(head)?;
    let text = rest.trim();
    if text.is_empty() {
        return None;
    }
    Some(Diagnostic::new(
        format!("{}-{}", PLAIN_ID_PREFIX, severity),
        text,
        severity,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_lines() {
        let stderr = r#"{"id":"PY001","text":"could not parse foo.py","severity":"error"}"#;
        let diags = parse_side_channel(stderr);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].id, "PY001");
        assert_eq!(diags[0].severity, Severity::Error);
    }

    #[test]
    fn test_plain_prefixed_lines() {
        let stderr = "Warning: skipped vendored dir\nsome progress output\nINFO: 12 files\n";
        let diags = parse_side_channel(stderr);
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].severity, Severity::Warning);
        assert_eq!(diags[0].text, "skipped vendored dir");
        assert_eq!(diags[1].severity, Severity::Info);
    }

    #[test]
    fn test_noise_is_ignored() {
        assert!(parse_side_channel("Traceback (most recent call last):\n  File x").is_empty());
        assert!(parse_side_channel("{not json").is_empty());
    }
}
