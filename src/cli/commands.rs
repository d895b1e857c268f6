//! Command definitions and execution for the serving CLI

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::artifacts::ArtifactBundle;
use crate::context::{ServingConfig, ServingContext};
use crate::error::{Result, ServingError};
use crate::handler::create_router;

/// Credit risk serving CLI
#[derive(Debug, Parser)]
#[command(name = "risk-serve", version, about)]
pub struct ServeCli {
    #[command(subcommand)]
    pub command: ServeCommands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum ServeCommands {
    /// Run the HTTP serving layer
    Serve {
        /// Artifact directory; the built-in bundle is used when omitted
        #[arg(long, env = "RISK_SERVING_ARTIFACTS")]
        artifacts: Option<PathBuf>,

        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Bind port
        #[arg(long, default_value_t = 8080)]
        port: u16,

        /// Disable the explanation capability for this deployment
        #[arg(long)]
        disable_explanations: bool,
    },

    /// Load and validate an artifact bundle, then exit
    Check {
        /// Artifact directory; the built-in bundle is used when omitted
        #[arg(long, env = "RISK_SERVING_ARTIFACTS")]
        artifacts: Option<PathBuf>,
    },
}

fn load_bundle(artifacts: Option<&PathBuf>) -> Result<ArtifactBundle> {
    match artifacts {
        Some(dir) => ArtifactBundle::load(dir),
        None => Ok(ArtifactBundle::builtin()),
    }
}

/// Build the serving context and run the HTTP server until shutdown.
pub async fn execute_serve(
    artifacts: Option<PathBuf>,
    host: String,
    port: u16,
    disable_explanations: bool,
) -> Result<()> {
    let bundle = load_bundle(artifacts.as_ref())?;
    let config = ServingConfig {
        explanations_enabled: !disable_explanations,
        ..ServingConfig::default()
    };
    let context = ServingContext::from_bundle(bundle, config)?;

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| ServingError::invalid_input(format!("invalid bind address: {e}")))?;

    tracing::info!(
        %addr,
        model = %context.inference.identity().model_name,
        version = %context.inference.identity().model_version,
        explanations = context.explanations.available(),
        "Starting risk serving layer"
    );

    let router = create_router(Arc::clone(&context));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServingError::internal(format!("cannot bind {addr}: {e}")))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| ServingError::internal(format!("server error: {e}")))
}

/// Load and validate the artifact bundle without serving.
pub fn execute_check(artifacts: Option<PathBuf>) -> Result<()> {
    let bundle = load_bundle(artifacts.as_ref())?;

    // Resolving the scorecard against the manifest exercises every
    // cross-artifact consistency requirement.
    crate::model::LogisticScorecard::from_spec(&bundle.scorecard, &bundle.manifest)?;

    println!(
        "artifact bundle ok: model {} v{}, {} raw fields, {} features, thresholds ({}, {})",
        bundle.identity.model_name,
        bundle.identity.model_version,
        bundle.raw_schema.len(),
        bundle.manifest.expected_count(),
        bundle.thresholds.approve(),
        bundle.thresholds.conditional(),
    );
    Ok(())
}
