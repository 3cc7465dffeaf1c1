mod availability;
mod extract;
mod schema;
mod tools;
mod usage;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use surface_core::config::EngineSettings;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(
    name = "surface",
    version,
    about = "Extract and render the public API surface of a source package",
    long_about = "Surface runs a language-specific extraction tool (native binary, runtime \
                  interpreter, or container) against a package, builds a symbol graph of its \
                  public types, keeps only what is reachable from the package's entry points, \
                  and renders it as compact, budget-limited text."
)]
pub struct Cli {
    /// Also log to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only analyze packages under this directory (overrides SURFACE_WORKSPACE_ROOT)
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the analyzed surface as JSON
    Extract {
        #[arg(value_name = "PACKAGE_PATH")]
        path: PathBuf,
        /// Source language (python, go, java)
        #[arg(short, long)]
        lang: String,
        #[arg(long)]
        pretty: bool,
    },
    /// Render the reachable surface as text within a length budget
    Render {
        #[arg(value_name = "PACKAGE_PATH")]
        path: PathBuf,
        #[arg(short, long)]
        lang: String,
        /// Maximum output length in bytes
        #[arg(long, default_value_t = 32_000)]
        max_length: usize,
    },
    /// Show how each language's extraction tool would be run
    #[command(
        long_about = "Probes the native, runtime and container tiers in order and reports the \
                      first usable one, or the reason none is."
    )]
    Availability {
        /// Only this language
        #[arg(short, long)]
        lang: Option<String>,
        /// Ignore cached decisions and probe again
        #[arg(long)]
        recheck: bool,
    },
    /// Report which client operations a set of samples exercises
    Usage {
        #[arg(value_name = "PACKAGE_PATH")]
        path: PathBuf,
        #[arg(short, long)]
        lang: String,
        /// Directory holding sample code
        #[arg(long, value_name = "SAMPLES_PATH")]
        samples: PathBuf,
        #[arg(long)]
        pretty: bool,
    },
    /// Install a compiled extraction tool, replacing older versions
    InstallTool {
        #[arg(short, long)]
        lang: String,
        #[arg(value_name = "BINARY")]
        binary: PathBuf,
    },
    /// List installed extraction tools
    Tools,
    /// Print the JSON schema of the output models
    Schema,
    /// Remove every installed extraction tool
    Clear,
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut settings = EngineSettings::from_process_env();
    if let Some(root) = &cli.root {
        settings = settings.with_workspace_root(root);
    }
    let _guard = surface_runtime::init_logging(&settings, "cli", cli.verbose);

    if let Commands::Schema = cli.command {
        return schema::run();
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let engine = surface_runtime::build_default_engine(settings);
        let cancel = cancel_on_ctrl_c();

        match cli.command {
            Commands::Extract { path, lang, pretty } => {
                extract::surface(&engine, path, &lang, pretty, &cancel).await
            }
            Commands::Render {
                path,
                lang,
                max_length,
            } => extract::render(&engine, path, &lang, max_length, &cancel).await,
            Commands::Availability { lang, recheck } => {
                availability::run(&engine, lang.as_deref(), recheck).await
            }
            Commands::Usage {
                path,
                lang,
                samples,
                pretty,
            } => usage::run(&engine, path, &lang, samples, pretty, &cancel).await,
            Commands::InstallTool { lang, binary } => tools::install(&engine, &lang, binary).await,
            Commands::Tools => tools::list(&engine),
            Commands::Clear => tools::clear(&engine),
            Commands::Schema => schema::run(),
        }
    })
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling running extraction");
            child.cancel();
        }
    });
    token
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<(), Box<dyn std::error::Error>> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{text}");
    Ok(())
}
