use std::io::Write;
use std::sync::Arc;

use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info, warn};

use crate::application::{RegenerationError, Regenerator, RuntimeConfig, console};
use crate::config::{ConfigError, ServerConfig};
use crate::maintainer::SnapshotService;

pub struct Application;

impl Application {
    pub async fn run(runtime: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let runtime: RuntimeConfig = runtime.into();
        let config = ServerConfig::read(&runtime.config_path)
            .await
            .context(ConfigSnafu)?;
        debug!("Loaded config: {:?}", config);

        let service = Arc::new(SnapshotService::from_config(&runtime.root, &config));
        match service.index_document() {
            Ok(index) => debug!("Index document: {}", String::from_utf8_lossy(&index)),
            Err(err) => warn!("Index document unavailable: {err}"),
        }
        let regenerator = Regenerator::new(service).context(DispatcherCreationSnafu)?;

        if runtime.once {
            let bytes = regenerator
                .regenerate_and_read()
                .await
                .context(RegenerationSnafu)?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes).context(OutputSnafu)?;
            writeln!(stdout).context(OutputSnafu)?;
            return Ok(());
        }

        let report = regenerator.regenerate().await.context(RegenerationSnafu)?;
        console::print_report(&report);
        info!("Watching {}", runtime.root.join(&config.resource_dir).display());

        console::run(&regenerator).await;
        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered during configuration stage"))]
    ConfigError { source: ConfigError },
    #[snafu(display("Failed to create the regeneration dispatcher"))]
    DispatcherCreationError { source: std::io::Error },
    #[snafu(display("Critical failure encountered during snapshot regeneration"))]
    RegenerationError { source: RegenerationError },
    #[snafu(display("Failed to write the snapshot to stdout"))]
    OutputError { source: std::io::Error },
}
