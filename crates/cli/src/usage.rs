use std::path::PathBuf;
use std::sync::Arc;
use surface_core::SurfaceEngine;
use tokio_util::sync::CancellationToken;

pub async fn run(
    engine: &Arc<SurfaceEngine>,
    path: PathBuf,
    lang: &str,
    samples: PathBuf,
    pretty: bool,
    cancel: &CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let language = surface_runtime::parse_language(lang);
    let report = engine.usage(&path, &language, &samples, cancel).await?;
    tracing::info!(
        files = report.file_count,
        covered = report.covered.len(),
        uncovered = report.uncovered.len(),
        "Usage analysis complete"
    );
    crate::print_json(&report, pretty)
}
