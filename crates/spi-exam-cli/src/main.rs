//! SPI Exam Server CLI
//!
//! Main entry point for serving the exam flow over HTTP.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use spi_exam_server::{create_router, AppState, Catalog, Config, TranslateClient};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// SPI Exam Server
///
/// Serves multiple-choice exam sessions from JSON question-set files,
/// resolved through a layered directory lookup (EXAM_DATA_DIR, repo-root
/// `exams/`, bundled `data/exams`).
#[derive(Parser, Debug)]
#[command(name = "spi-exam")]
#[command(version, about, long_about = None)]
struct Args {
    /// Exam data directory (overrides config; EXAM_DATA_DIR overrides both)
    #[arg(short, long, value_name = "DIR")]
    data_dir: Option<String>,

    /// Path to configuration file (default: exam-server.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Port for the HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize tracing subscriber with appropriate filter
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("SPI exam server starting");
    tracing::debug!(config = ?args.config, "Config file");
    tracing::debug!(data_dir = ?args.data_dir, "Data directory override");

    match run_server(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Runs the exam server.
///
/// Startup sequence:
/// 1. Load config and apply CLI overrides
/// 2. Resolve the exam data directory
/// 3. Build the catalog, reporting skipped files
/// 4. Serve HTTP
///
/// A failed directory resolution does not abort startup: the server comes
/// up without a catalog so `/healthz` answers truthfully while exam routes
/// return 503 until a reload succeeds.
async fn run_server(args: Args) -> anyhow::Result<()> {
    // Load configuration
    let mut config = load_config(args.config.as_deref())?;

    // Apply CLI argument overrides
    if let Some(ref data_dir) = args.data_dir {
        config.data_dir = Some(data_dir.clone());
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    // Re-validate after overrides
    config.validate()?;

    print_config(&config);

    // Resolve the data directory and build the catalog
    let state = match build_catalog(&config) {
        Some(catalog) => AppState::with_catalog(config.clone(), catalog),
        None => AppState::new(config.clone()),
    };

    // Attach the translation collaborator when a key is configured
    let state = match TranslateClient::from_env(&config.translator) {
        Some(client) => {
            tracing::info!(endpoint = %config.translator.endpoint, "Translation enabled");
            state.with_translator(client)
        }
        None => {
            tracing::info!(
                key_env = %config.translator.api_key_env,
                "Translation disabled (no API key)"
            );
            state
        }
    };

    // Serve
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let router = create_router(state);

    println!();
    println!("Listening on http://{addr}");
    tracing::info!(%addr, "HTTP server started");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

/// Loads configuration from the given path or the current directory.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    let config = match config_path {
        Some(path) => Config::load_from_file(Path::new(path))?,
        None => Config::load()?,
    };
    Ok(config)
}

/// Resolves the data directory and loads the catalog.
///
/// Returns `None` when no candidate directory exists; the error is logged
/// and the caller starts without a catalog.
fn build_catalog(config: &Config) -> Option<Catalog> {
    let config_dir = config.data_dir.as_deref().map(PathBuf::from);
    let root = match spi_exam_server::resolve_from_env(config_dir.as_deref()) {
        Ok(root) => root,
        Err(e) => {
            tracing::error!(error = %e, "No exam data directory; exam routes disabled");
            eprintln!("Warning: {e}");
            return None;
        }
    };

    println!();
    println!("Loading exams from {}", root.display());

    let load = match Catalog::load(&root) {
        Ok(load) => load,
        Err(e) => {
            tracing::error!(root = %root.display(), error = %e, "Catalog load failed");
            eprintln!("Warning: {e}");
            return None;
        }
    };

    for skipped in &load.skipped {
        println!("  Skipped {}: {}", skipped.path.display(), skipped.reason);
    }
    println!(
        "Loaded {} question set(s), skipped {}",
        load.catalog.len(),
        load.skipped.len()
    );

    Some(load.catalog)
}

/// Prints the loaded configuration.
fn print_config(config: &Config) {
    println!("Configuration loaded:");
    println!(
        "  Data directory override: {}",
        config.data_dir.as_deref().unwrap_or("(none)")
    );
    println!("  Port: {}", config.port);
    println!("  Session TTL: {}s", config.session_ttl_secs);
    println!("  Translator key env: {}", config.translator.api_key_env);
}
