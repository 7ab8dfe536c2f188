// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

//! awsenv - resolve AWS secret references, then exec a command
//!
//! Environment variables whose value starts with `sm://`, `ssm://` or
//! `kms://` are replaced by the secret they point at, then the process is
//! replaced by the target command:
//!
//! ```text
//! DB_PASSWORD=sm://prod/db#password awsenv exec -- ./server
//! ```
//!
//! Resolution lives in `awsenv-secrets`, the AWS clients in `awsenv-aws`.
//! This crate holds the CLI surface, logging setup and the launcher.

// CLI binary needs to output to stderr - this is intentional
#![allow(clippy::print_stderr)]

/// CLI argument parsing, errors and exit codes.
pub mod cli;
/// Command implementations.
pub mod commands;
/// Command lookup and process replacement.
pub mod launcher;
/// Tracing setup.
pub mod tracing;

pub use cli::{CliError, EXIT_FAILURE, EXIT_OK};
