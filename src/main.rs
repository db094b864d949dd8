/// Main entry point for the Habit Coach MCP server
///
/// This file sets up logging, parses command line arguments, and starts the MCP server.
/// The server listens for JSON-RPC requests over stdin/stdout following the MCP protocol.

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use habit_coach_mcp::{Args, HabitCoachServer, Settings};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // RUST_LOG wins over the command line flags when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("habit_coach_mcp={}", args.log_level())));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr) // Send logs to stderr, not stdout
        .init();

    info!("Starting Habit Coach MCP server");

    let settings = Settings::from_args(&args)?;
    info!("Using database at: {}", settings.database_path.display());
    if let Some(model_path) = &settings.model_path {
        info!("Model artifact path: {}", model_path.display());
    }

    let server = HabitCoachServer::new(settings).await?;

    if args.run_nightly {
        let today = chrono::Utc::now().date_naive();
        let summary = server.run_nightly(today);
        info!("Nightly batch finished: {} predictions created", summary.total_created());
        return Ok(());
    }

    // Run the MCP server - this will handle JSON-RPC communication over stdin/stdout
    server.run().await?;

    info!("Habit Coach MCP server shutdown complete");
    Ok(())
}
