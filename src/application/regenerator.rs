use std::num::NonZeroUsize;
use std::sync::Arc;

use compio::dispatcher::{Dispatcher, DispatcherBuilder};
use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::maintainer::{CycleReport, ServiceError, SnapshotService};

/// Runs snapshot cycles on a dispatcher worker so the blocking filesystem work
/// stays off the console's runtime thread.
pub struct Regenerator {
    dispatcher: Dispatcher,
    service: Arc<SnapshotService>,
}

impl Regenerator {
    pub fn new(service: Arc<SnapshotService>) -> std::io::Result<Self> {
        // Cycles are serialized by the service lock, more workers would only wait.
        let dispatcher = DispatcherBuilder::new()
            .worker_threads(NonZeroUsize::MIN)
            .build()?;
        Ok(Self {
            dispatcher,
            service,
        })
    }

    pub async fn regenerate(&self) -> Result<CycleReport, RegenerationError> {
        let service = self.service.clone();
        let receiver = self
            .dispatcher
            .dispatch(move || async move { service.regenerate() })
            .map_err(|e| RegenerationError::DispatchError {
                error: e.to_string(),
            })?;
        debug!("Dispatched snapshot regeneration");

        receiver
            .await
            .context(CanceledSnafu)?
            .context(ServiceSnafu)
    }

    /// Regenerates and returns the snapshot JSON as clients would receive it.
    pub async fn regenerate_and_read(&self) -> Result<Arc<Vec<u8>>, RegenerationError> {
        let service = self.service.clone();
        let receiver = self
            .dispatcher
            .dispatch(move || async move {
                service
                    .regenerate()
                    .and_then(|_| service.current_snapshot_bytes())
            })
            .map_err(|e| RegenerationError::DispatchError {
                error: e.to_string(),
            })?;

        receiver
            .await
            .context(CanceledSnafu)?
            .context(ServiceSnafu)
    }
}

#[derive(Debug, Snafu)]
pub enum RegenerationError {
    #[snafu(display("Failed to dispatch regeneration: {}", error))]
    DispatchError { error: String },
    #[snafu(display("Regeneration got cancelled"))]
    CanceledError {
        source: futures_channel::oneshot::Canceled,
    },
    #[snafu(display("Regeneration failed"))]
    ServiceError { source: ServiceError },
}
