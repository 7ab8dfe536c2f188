//! Exec command implementation
//!
//! Resolves every secret reference in the current environment and prepares
//! the target command. The actual process replacement happens after the
//! async runtime has been torn down, see [`Launch::exec`].

use crate::cli::CliError;
use crate::launcher::{self, Launch};
use awsenv_aws::AwsSettings;
use awsenv_secrets::{
    Backends, CommandEnvironment, EnvironmentSnapshot, ErrorPolicy, Resolver, apply,
};
use tracing::instrument;

/// Command execution request for `exec`.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    /// Command followed by its arguments.
    pub command: Vec<String>,
    /// Region override for the AWS clients.
    pub region: Option<String>,
    /// How per-variable failures are handled.
    pub policy: ErrorPolicy,
    /// Maximum number of concurrent backend calls.
    pub concurrency: usize,
}

/// Resolve the environment and locate the command.
///
/// # Errors
///
/// Returns a usage error when no command was given, a startup error when the
/// command cannot be found or no region is available, and a resolution error
/// when the policy rejects the result.
#[instrument(name = "exec_prepare", skip_all, fields(command = ?request.command.first()))]
pub async fn prepare(request: ExecRequest) -> Result<Launch, CliError> {
    let Some(program) = request.command.first() else {
        return Err(CliError::usage_with_help(
            "please supply a command to run",
            "awsenv exec -- <command> [args...]",
        ));
    };
    let path = launcher::locate(program)?;

    let settings = AwsSettings {
        region: request.region,
    };
    let backends = awsenv_aws::load_backends(&settings).await?;

    let snapshot = EnvironmentSnapshot::capture();
    let env =
        resolve_environment(backends, &snapshot, request.policy, request.concurrency).await?;

    Ok(Launch {
        path,
        argv: request.command,
        env: env.into_vars(),
    })
}

/// Resolve `snapshot` and build the child environment.
///
/// # Errors
///
/// Returns [`CliError::Resolution`] when `policy` rejects the collected errors.
pub async fn resolve_environment(
    backends: Backends,
    snapshot: &EnvironmentSnapshot,
    policy: ErrorPolicy,
    concurrency: usize,
) -> Result<CommandEnvironment, CliError> {
    let mut result = Resolver::new(backends)
        .with_concurrency(concurrency)
        .resolve(snapshot)
        .await;

    let mut env = CommandEnvironment::from_snapshot(snapshot);
    apply(&mut env, &mut result);
    policy.check(&result)?;
    Ok(env)
}
