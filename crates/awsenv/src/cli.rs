use crate::launcher::LaunchError;
use crate::tracing::{LogLevel, TracingFormat};
use awsenv_aws::AwsError;
use awsenv_secrets::{DEFAULT_CONCURRENCY, ErrorPolicy, ResolutionFailed};
use clap::{Parser, Subcommand};
use miette::{Diagnostic, Report};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use thiserror::Error;

/// Exit code for help and version output
pub const EXIT_OK: i32 = 0;
/// Exit code for every failure awsenv itself reports
pub const EXIT_FAILURE: i32 = 1;

/// CLI-specific error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Invalid invocation
    #[error("{message}")]
    #[diagnostic(code(awsenv::cli::usage))]
    Usage {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },

    /// Failure before any secret was fetched
    #[error("{message}")]
    #[diagnostic(code(awsenv::cli::startup))]
    Startup {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },

    /// One or more variables failed and the policy is `fail`
    #[error(transparent)]
    #[diagnostic(
        code(awsenv::cli::resolution),
        help("each failing variable is logged above; pass --on-error warn to launch anyway")
    )]
    Resolution(#[from] ResolutionFailed),

    /// The target command could not replace this process
    #[error(transparent)]
    #[diagnostic(code(awsenv::cli::launch))]
    Launch(LaunchError),
}

impl CliError {
    /// Create a new usage error with help text
    #[must_use]
    pub fn usage_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new startup error with help text
    #[must_use]
    pub fn startup_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Startup {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Short machine-readable category
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Usage { .. } => "usage",
            Self::Startup { .. } => "startup",
            Self::Resolution(_) => "resolution",
            Self::Launch(_) => "launch",
        }
    }
}

impl From<AwsError> for CliError {
    fn from(err: AwsError) -> Self {
        match err {
            AwsError::NoRegion => Self::startup_with_help(
                err.to_string(),
                "pass --region or export AWS_REGION",
            ),
        }
    }
}

impl From<LaunchError> for CliError {
    fn from(err: LaunchError) -> Self {
        match err {
            LaunchError::NotFound { .. } => Self::startup_with_help(
                err.to_string(),
                "check that the command is installed and on PATH",
            ),
            LaunchError::Exec { .. } => Self::Launch(err),
        }
    }
}

/// Render error appropriately based on JSON flag
pub fn render_error(err: CliError, json_mode: bool) {
    if json_mode {
        let error_envelope = ErrorEnvelope::new(serde_json::json!({
            "code": err.code(),
            "message": err.to_string(),
            "correlation_id": crate::tracing::correlation_id(),
        }));

        match serde_json::to_string(&error_envelope) {
            Ok(json) => eprintln!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        let report = Report::new(err);
        eprintln!("{report:?}");
    }
    let _ = io::stderr().flush();
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator - always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Resolve `sm://`, `ssm://` and `kms://` references in the environment,
/// then run a command with the result.
#[derive(Parser, Debug)]
#[command(name = "awsenv")]
#[command(about = "Resolve AWS secret references in the environment, then exec a command")]
#[command(long_about = None)]
#[command(version, arg_required_else_help = true)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum,
        env = "AWSENV_LOG_LEVEL"
    )]
    pub level: LogLevel,

    /// Log line format.
    #[arg(
        long,
        global = true,
        help = "Set log format",
        default_value = "compact",
        value_enum,
        env = "AWSENV_LOG_FORMAT"
    )]
    pub log_format: TracingFormat,

    /// Emit JSON logs and a JSON error envelope.
    #[arg(long, global = true, help = "Emit JSON logs and JSON errors")]
    pub json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve secret references, then replace this process with a command.
    #[command(about = "Resolve secret references, then exec a command")]
    Exec {
        /// AWS region overriding `AWS_REGION`/`AWS_DEFAULT_REGION`.
        #[arg(long, help = "AWS region for all backends")]
        region: Option<String>,

        /// What to do when a variable fails to resolve.
        #[arg(
            long = "on-error",
            help = "Abort (fail) or launch anyway (warn) when a variable fails",
            default_value = "fail",
            value_name = "fail|warn",
            env = "AWSENV_ON_ERROR"
        )]
        on_error: ErrorPolicy,

        /// Maximum number of in-flight backend calls.
        #[arg(
            long,
            help = "Maximum number of concurrent backend calls",
            default_value_t = DEFAULT_CONCURRENCY,
            env = "AWSENV_CONCURRENCY"
        )]
        concurrency: usize,

        /// Command and its arguments.
        #[arg(
            help = "Command to run and its arguments",
            value_name = "COMMAND",
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        command: Vec<String>,
    },
}
