//! CLI module for the risk serving layer
//!
//! Two commands: `serve` runs the HTTP layer until shutdown, `check`
//! loads and validates an artifact bundle and exits.

pub mod commands;

pub use commands::{ServeCli, ServeCommands};

use crate::error::ServingError;

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful execution
    Success = 0,
    /// Invalid input or arguments
    InvalidInput = 3,
    /// Artifact bundle missing or inconsistent
    ArtifactError = 5,
    /// Internal error
    InternalError = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Classify a serving error into an exit code.
    pub fn from_error(error: &ServingError) -> Self {
        match error {
            ServingError::Artifact(_) => ExitCode::ArtifactError,
            e if e.is_client_error() => ExitCode::InvalidInput,
            _ => ExitCode::InternalError,
        }
    }
}

/// Run the CLI with the given arguments and return the exit code.
pub async fn run(cli: ServeCli) -> ExitCode {
    let result = match cli.command {
        ServeCommands::Serve {
            artifacts,
            host,
            port,
            disable_explanations,
        } => commands::execute_serve(artifacts, host, port, disable_explanations).await,
        ServeCommands::Check { artifacts } => commands::execute_check(artifacts),
    };

    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from_error(&e)
        }
    }
}
