use std::sync::Arc;
use surface_api::Language;
use surface_core::SurfaceEngine;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct AvailabilityRow {
    #[tabled(rename = "Language")]
    language: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Executable")]
    executable: String,
    #[tabled(rename = "Note")]
    note: String,
}

pub async fn run(
    engine: &Arc<SurfaceEngine>,
    lang: Option<&str>,
    recheck: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let languages: Vec<Language> = match lang {
        Some(name) => vec![surface_runtime::parse_language(name)],
        None => {
            let mut all: Vec<Language> = engine.languages().cloned().collect();
            all.sort();
            all
        }
    };

    let mut rows = Vec::with_capacity(languages.len());
    for language in &languages {
        let result = engine.availability(language, recheck).await?;
        let executable = match (&result.executable, &result.script) {
            (Some(exe), Some(script)) => format!("{} {}", exe, script.display()),
            (Some(exe), None) => exe.clone(),
            _ => "-".to_string(),
        };
        let note = result
            .unavailable_reason
            .clone()
            .or_else(|| result.warning.clone())
            .or_else(|| result.container_runtime.as_ref().map(|r| format!("via {r}")))
            .unwrap_or_default();
        rows.push(AvailabilityRow {
            language: language.to_string(),
            mode: result.mode.to_string(),
            executable,
            note,
        });
    }

    println!("{}", Table::new(rows));
    Ok(())
}
