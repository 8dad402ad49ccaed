//! ftpwatch entry point.

mod app;
mod config;

use std::io::{BufRead, Write};
use std::path::Path;
use std::process::ExitCode;

use ftpwatch_coordinator::CoordinatorError;
use tracing_subscriber::EnvFilter;

use crate::config::{CONFIG_FILE, EXAMPLE_CONFIG, FileConfig};

fn main() -> ExitCode {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("ftpwatch {} - FTP folder upload", env!("CARGO_PKG_VERSION"));
    println!("Checking configuration and connecting to the FTP server...");

    let path = Path::new(CONFIG_FILE);
    if !path.exists() {
        eprintln!(
            "Configuration file {CONFIG_FILE} not found. Create it next to the program \
             with the FTP server address, credentials and the folder to watch."
        );
        eprintln!("Example:\n\n{EXAMPLE_CONFIG}");
        wait_for_enter();
        return ExitCode::FAILURE;
    }

    match run(path) {
        Ok(()) => {
            tracing::info!("ftpwatch shut down cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("Error: {e:#}");
            eprintln!("Hint: {}", hint(&e));
            wait_for_enter();
            ExitCode::FAILURE
        }
    }
}

fn run(path: &Path) -> anyhow::Result<()> {
    let config = FileConfig::load(path)?.into_core();
    tracing::info!(
        server = %config.endpoint.address(),
        path = %config.watched_path.display(),
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config))
}

fn hint(e: &anyhow::Error) -> &'static str {
    match e.downcast_ref::<CoordinatorError>() {
        Some(e) => e.hint(),
        None => "check the contents of ftpwatch.toml",
    }
}

/// Keeps the console window open until the operator has read the message.
fn wait_for_enter() {
    print!("Press Enter to exit...");
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);
}
