use std::path::PathBuf;

use crate::cli::Cli;
use crate::config::ServerConfig;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub once: bool,
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        let config_path = cli
            .config
            .unwrap_or_else(|| ServerConfig::default_path(&cli.root));
        Self {
            root: cli.root,
            config_path,
            once: cli.once,
        }
    }
}
