use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;

/// Keeps a snapshot of a resource directory current and serves it.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,

    /// The directory holding config.yml and the resource directory
    #[clap(long, short, default_value = ".")]
    pub root: PathBuf,

    /// Config file to use instead of <root>/config.yml
    #[clap(long, short)]
    pub config: Option<PathBuf>,

    /// Regenerate once, print the snapshot JSON and exit
    #[clap(long)]
    pub once: bool,
}
