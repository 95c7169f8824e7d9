//! Command-line entry point.
//!
//! Prints the extracted text on stdout and nothing else; diagnostics go to
//! stderr through `tracing`. Control verbosity with `RUST_LOG`, e.g.
//! `RUST_LOG=mail_extract=debug`.

use clap::Parser;
use mail_extract::{ErrorCategory, ExtractorConfig, ImapMailbox, Scanner};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Print the first capture group of a pattern found in the newest matching
/// message of an IMAP inbox.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON configuration file
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mail_extract=warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let outcome = run(&args.config).await;
    ExitCode::from(report(outcome, &mut std::io::stdout().lock()))
}

async fn run(config_path: &Path) -> mail_extract::Result<String> {
    let config = ExtractorConfig::load(config_path)?;

    let mut mailbox = ImapMailbox::connect(&config).await?;
    let outcome = Scanner::from_config(&config).scan(&mut mailbox).await;

    if let Err(e) = mailbox.logout().await {
        warn!(error = %e, "Logout failed");
    }

    outcome
}

/// Writes the extracted text to `out`, or logs the error, and returns the
/// process exit status.
fn report(outcome: mail_extract::Result<String>, out: &mut impl Write) -> u8 {
    match outcome {
        Ok(found) => match writeln!(out, "{found}") {
            Ok(()) => 0,
            Err(e) => {
                error!(error = %e, "Failed to write result");
                ErrorCategory::Network.exit_code()
            }
        },
        Err(e) => {
            error!(category = %e.category(), "{}", error_chain(&e));
            e.category().exit_code()
        }
    }
}

/// Renders an error followed by its sources, `outer: inner: root`.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
