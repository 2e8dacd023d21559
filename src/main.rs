//! Newsletter service entry point.
//!
//! Reads configuration, sets up logging, wires the database-backed signup
//! service into the HTTP server, and hands the server to the lifecycle
//! coordinator together with the OS shutdown token.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use newsletter::lifecycle::{exit_code, signals, Coordinator, EXIT_FAILURE};
use newsletter::observability::{logging, metrics};
use newsletter::{config, Database, Newsletter, Server, ServerOptions};

/// Build identifier, normally a git hash supplied at compile time.
const RELEASE: &str = match option_env!("NEWSLETTER_RELEASE") {
    Some(release) => release,
    None => env!("CARGO_PKG_VERSION"),
};

#[derive(Parser)]
#[command(name = "newsletter")]
#[command(about = "Newsletter signup service", long_about = None)]
struct Cli {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    ExitCode::from(run(cli).await)
}

async fn run(cli: Cli) -> u8 {
    let _ = dotenvy::dotenv();

    let config = match config::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error loading configuration: {}", err);
            return EXIT_FAILURE;
        }
    };

    if let Err(err) = logging::init(&config.observability, RELEASE) {
        eprintln!("Error setting up the logger: {}", err);
        return EXIT_FAILURE;
    }

    let code = serve(config).await;
    logging::flush();
    code
}

async fn serve(config: config::AppConfig) -> u8 {
    tracing::info!(
        host = %config.listener.host,
        port = config.listener.port,
        grace_period_secs = config.shutdown.grace_period_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Address was checked during validation.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            if let Err(err) = metrics::init_metrics(addr) {
                tracing::error!(error = %err, "Failed to start metrics endpoint");
                return EXIT_FAILURE;
            }
        }
    }

    let shutdown = match signals::shutdown_token() {
        Ok(token) => token,
        Err(err) => {
            tracing::error!(error = %err, "Failed to install signal handlers");
            return EXIT_FAILURE;
        }
    };

    let database = Database::new(config.database.clone());
    let newsletter = Newsletter::new(Arc::new(database.clone()));
    let server = Arc::new(Server::new(ServerOptions::from_config(&config, newsletter)));

    let outcome = Coordinator::new(RELEASE).run(server, shutdown).await;
    database.close().await;

    exit_code(&outcome)
}
