use std::path::PathBuf;
use std::sync::Arc;
use surface_core::SurfaceEngine;
use tabled::{Table, Tabled};
use tracing::info;

#[derive(Tabled)]
struct ToolRow {
    #[tabled(rename = "Language")]
    language: String,
    #[tabled(rename = "Hash")]
    hash: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Path")]
    path: String,
}

pub async fn install(
    engine: &Arc<SurfaceEngine>,
    lang: &str,
    binary: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let language = surface_runtime::parse_language(lang);
    let installed = engine.install_tool(&language, &binary).await?;
    println!("{}", installed.display());
    Ok(())
}

pub fn list(engine: &Arc<SurfaceEngine>) -> Result<(), Box<dyn std::error::Error>> {
    let artifacts = engine.artifacts().scan();
    if artifacts.is_empty() {
        println!("No tools installed in {}", engine.artifacts().root().display());
        return Ok(());
    }
    let rows: Vec<ToolRow> = artifacts
        .into_iter()
        .map(|a| ToolRow {
            language: a.language,
            hash: a.hash,
            size: format_size(a.size_bytes),
            path: a.path.display().to_string(),
        })
        .collect();
    println!("{}", Table::new(rows));
    Ok(())
}

pub fn clear(engine: &Arc<SurfaceEngine>) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Clearing installed tools at: {}...",
        engine.artifacts().root().display()
    );
    surface_runtime::clear_artifacts(engine)?;
    info!("Installed tools cleared.");
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
