//! Command implementations

pub mod exec;

use crate::cli::{CliError, Commands};
use crate::launcher::Launch;

/// Run the async part of a subcommand.
///
/// # Errors
///
/// Propagates the subcommand's error.
pub async fn prepare(command: Commands) -> Result<Launch, CliError> {
    match command {
        Commands::Exec {
            region,
            on_error,
            concurrency,
            command,
        } => {
            exec::prepare(exec::ExecRequest {
                command,
                region,
                policy: on_error,
                concurrency,
            })
            .await
        }
    }
}
