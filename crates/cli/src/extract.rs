use std::path::PathBuf;
use std::sync::Arc;
use surface_core::SurfaceEngine;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub async fn surface(
    engine: &Arc<SurfaceEngine>,
    path: PathBuf,
    lang: &str,
    pretty: bool,
    cancel: &CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let language = surface_runtime::parse_language(lang);
    let surface = engine.surface(&path, &language, cancel).await?;
    info!(
        path = %path.display(),
        mode = %surface.mode,
        nodes = surface.graph.nodes.len(),
        reachable = surface.reachable.len(),
        "Extracted surface"
    );
    for diag in &surface.diagnostics {
        eprintln!("{diag}");
    }
    crate::print_json(surface.as_ref(), pretty)
}

pub async fn render(
    engine: &Arc<SurfaceEngine>,
    path: PathBuf,
    lang: &str,
    max_length: usize,
    cancel: &CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let language = surface_runtime::parse_language(lang);
    let text = engine.render(&path, &language, max_length, cancel).await?;
    print!("{text}");
    Ok(())
}
