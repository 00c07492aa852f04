//! datalab CLI - browse configured and stored datasets
//!
//! Command-line interface for datalab operations.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::process::ExitCode;

fn main() -> ExitCode {
    datalab::cli::run()
}
