//! Risk serving CLI
//!
//! Entry point for the `risk-serve` binary.
//!
//! # Usage
//!
//! ```bash
//! # Serve the built-in demo bundle
//! risk-serve serve --host 0.0.0.0 --port 8080
//!
//! # Serve a trained artifact bundle
//! risk-serve serve --artifacts /var/lib/risk-serving/artifacts
//!
//! # Validate an artifact bundle without serving
//! risk-serve check --artifacts /var/lib/risk-serving/artifacts
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 3: Invalid input or arguments
//! - 5: Artifact bundle missing or inconsistent
//! - 10: Internal error

use clap::Parser;
use risk_serving::{run_cli, ServeCli};

#[tokio::main]
async fn main() {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .init();

    // Parse CLI arguments
    let cli = ServeCli::parse();

    // Run the CLI and exit with the appropriate code
    let exit_code = run_cli(cli).await;
    std::process::exit(exit_code.into());
}
