#![allow(clippy::enum_variant_names)]

use clap::Parser as _;
use supports_color::Stream;
use tracing::debug;

use crate::{
    application::{Application, ApplicationError},
    cli::Cli,
};

mod application;
mod cli;
mod config;
mod diff;
mod ext;
mod filesystem;
mod hashing;
mod maintainer;
mod snapshot;

#[compio::main]
#[snafu::report]
async fn main() -> Result<(), ApplicationError> {
    let cli_args = Cli::parse();
    setup_tracing(&cli_args);
    debug!("Parsed CLI arguments: {cli_args:?}");

    Application::run(cli_args).await?;

    Ok(())
}

fn setup_tracing(cli_args: &Cli) {
    colored::control::set_override(supports_color::on(Stream::Stdout).is_some());

    // Logs go to stderr so `--once` output stays parseable.
    tracing_subscriber::fmt()
        .with_max_level(cli_args.log_level.to_level_filter())
        .with_ansi(supports_color::on(Stream::Stderr).is_some())
        .with_writer(std::io::stderr)
        .without_time()
        .compact()
        .init();
}
