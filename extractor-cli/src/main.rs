//! Binary crate for the `weatherapi-extractor` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Logging setup and exit-code mapping
//! - Interactive credential configuration

use clap::Parser;
use extractor_core::ExtractorError;
use log::error;
use std::process::ExitCode;

mod cli;

// Exit codes: user-actionable errors vs. unexpected internal ones.
const EXIT_USER_ERROR: u8 = 1;
const EXIT_INTERNAL_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cmd = cli::Cli::parse();
    match cmd.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            let user_error = err
                .downcast_ref::<ExtractorError>()
                .map(ExtractorError::is_user_error)
                .unwrap_or(false);
            ExitCode::from(if user_error { EXIT_USER_ERROR } else { EXIT_INTERNAL_ERROR })
        }
    }
}
