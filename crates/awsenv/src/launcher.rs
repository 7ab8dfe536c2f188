//! Locating and replacing the process with the target command

use indexmap::IndexMap;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Failures while locating or launching the target command
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The command is not an executable on `PATH`
    #[error("failed to validate command: {command}: {source}")]
    NotFound {
        /// The command as given on the command line
        command: String,
        /// Lookup failure
        #[source]
        source: which::Error,
    },

    /// The process image could not be replaced
    #[error("failed to execute {}: {source}", path.display())]
    Exec {
        /// Resolved executable path
        path: PathBuf,
        /// OS error from the exec call
        #[source]
        source: std::io::Error,
    },
}

/// Find the executable for `command` using the `PATH` search rules.
///
/// # Errors
///
/// Returns [`LaunchError::NotFound`] when no executable matches.
pub fn locate(command: &str) -> Result<PathBuf, LaunchError> {
    which::which(command).map_err(|source| LaunchError::NotFound {
        command: command.to_string(),
        source,
    })
}

/// A resolved command ready to take over the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    /// Executable found by [`locate`]
    pub path: PathBuf,
    /// Full argument vector, `argv[0]` as typed by the user
    pub argv: Vec<String>,
    /// Variables overlaid on the inherited environment
    pub env: IndexMap<String, String>,
}

impl Launch {
    fn command(&self) -> Command {
        let mut command = Command::new(&self.path);
        command.args(self.argv.iter().skip(1)).envs(&self.env);
        command
    }

    /// Replace the current process with the target command.
    ///
    /// On success this never returns. On non-unix targets the command runs as
    /// a child and this process exits with its status code.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::Exec`] when the OS refuses to start the command.
    #[cfg(unix)]
    pub fn exec(self) -> Result<Infallible, LaunchError> {
        use std::os::unix::process::CommandExt;

        let mut command = self.command();
        if let Some(arg0) = self.argv.first() {
            command.arg0(arg0);
        }
        tracing::debug!(path = %self.path.display(), "Replacing process");
        let source = command.exec();
        Err(exec_error(&self.path, source))
    }

    /// Replace the current process with the target command.
    ///
    /// On success this never returns. On non-unix targets the command runs as
    /// a child and this process exits with its status code.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::Exec`] when the OS refuses to start the command.
    #[cfg(not(unix))]
    pub fn exec(self) -> Result<Infallible, LaunchError> {
        tracing::debug!(path = %self.path.display(), "Spawning command");
        let status = self
            .command()
            .status()
            .map_err(|source| exec_error(&self.path, source))?;
        std::process::exit(status.code().unwrap_or(1))
    }
}

fn exec_error(path: &Path, source: std::io::Error) -> LaunchError {
    LaunchError::Exec {
        path: path.to_path_buf(),
        source,
    }
}
